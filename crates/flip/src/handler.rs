//! Command handler for the interactive prompt

use std::path::Path;
use std::time::Instant;

use flipview::Viewer;

/// What the caller should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print this and read the next command
    Continue(String),
    /// Stop reading commands
    Quit,
}

pub struct CommandHandler {
    viewer: Viewer,
}

impl CommandHandler {
    pub fn new(viewer: Viewer) -> Self {
        Self { viewer }
    }

    /// Describe the current image, decoding it if needed
    pub fn show(&self) -> String {
        let Some(path) = self.viewer.current_path() else {
            return "no image".to_string();
        };
        let name = file_name(path);
        let position = self.viewer.position().map_or(0, |p| p + 1);

        let started = Instant::now();
        let pixels = self.viewer.current_pixel_buffer();
        let elapsed = started.elapsed();

        let (cached, capacity) = self.viewer.cache_stats();
        let body = match pixels {
            Some(pixels) => format!("{}x{}", pixels.width, pixels.height),
            None => "failed to load image".to_string(),
        };
        format!(
            "[{}/{}] {} {} in {} ms (cached {}/{})",
            position,
            self.viewer.len(),
            name,
            body,
            elapsed.as_millis(),
            cached,
            capacity
        )
    }

    pub fn handle(&mut self, line: &str) -> Reply {
        let command = line.trim().to_lowercase();

        match command.as_str() {
            "" | "n" | "next" => {
                self.viewer.advance();
                Reply::Continue(self.show())
            }
            "p" | "prev" => {
                self.viewer.retreat();
                Reply::Continue(self.show())
            }
            "s" | "stats" => Reply::Continue(self.handle_stats()),
            "l" | "list" => Reply::Continue(self.handle_list()),
            "q" | "quit" => Reply::Quit,
            _ => Reply::Continue(format!(
                "unknown command '{}' (next, prev, stats, list, quit)",
                command
            )),
        }
    }

    fn handle_stats(&self) -> String {
        let (cached, capacity) = self.viewer.cache_stats();
        format!(
            "cached: {}/{}\n{}",
            cached,
            capacity,
            self.viewer.stats().snapshot()
        )
    }

    fn handle_list(&self) -> String {
        let keys = self.viewer.cached_keys();
        if keys.is_empty() {
            return "(cache empty)".to_string();
        }
        keys.iter()
            .enumerate()
            .map(|(i, key)| format!("{:>3}) {}", i + 1, file_name(Path::new(key))))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Stop background work before exit
    pub fn shutdown(&self) {
        self.viewer.preloader().cancel();
        self.viewer.preloader().wait_idle();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
