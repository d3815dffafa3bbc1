//! flip - step through a folder of images from the terminal

mod handler;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use flipview::{Viewer, ViewerConfig, DEFAULT_CAPACITY, DEFAULT_PRELOAD_THREADS};
use tracing::{error, info};

use crate::handler::{CommandHandler, Reply};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image file or directory of images
    path: PathBuf,

    /// Cache capacity (number of decoded images)
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Background decode threads
    #[arg(short = 't', long, default_value_t = DEFAULT_PRELOAD_THREADS)]
    preload_threads: usize,
}

fn main() -> Result<()> {
    // Logs go to stderr so they do not interleave with command output
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    info!("Starting flip v{}", env!("CARGO_PKG_VERSION"));
    info!("Cache capacity: {}", args.capacity);
    info!("Preload threads: {}", args.preload_threads);

    let config = ViewerConfig {
        capacity: args.capacity,
        preload_threads: args.preload_threads,
        ..ViewerConfig::default()
    };
    let mut viewer = Viewer::new(config).context("Failed to start viewer")?;

    if let Err(e) = viewer.initialize(&args.path) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let mut handler = CommandHandler::new(viewer);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("Commands: [n]ext (or Enter), [p]rev, [s]tats, [l]ist, [q]uit");
    println!("{}", handler.show());

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read command")?;
        match handler.handle(&line) {
            Reply::Continue(text) => println!("{}", text),
            Reply::Quit => break,
        }
        stdout.flush()?;
    }

    handler.shutdown();
    info!("Bye");
    Ok(())
}
