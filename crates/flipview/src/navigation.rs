//! Cyclic, ordered sequence of images with a cursor

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::source::{is_supported, DirectoryLister, EntryKind};

/// The images of one viewing session and the one currently shown
///
/// The sequence is fixed once built; only the position moves, wrapping
/// around at both ends.
#[derive(Debug, Clone)]
pub struct NavigationIndex {
    identifiers: Arc<[PathBuf]>,
    position: usize,
}

/// An index with nothing in it
impl Default for NavigationIndex {
    fn default() -> Self {
        Self {
            identifiers: Arc::from(Vec::new()),
            position: 0,
        }
    }
}

impl NavigationIndex {
    /// Build the sequence rooted at `root`
    ///
    /// A supported file yields a one-image sequence. A directory yields its
    /// direct supported files sorted by full path; subdirectories are not
    /// descended into.
    ///
    /// # Errors
    /// * `Error::NotFound` - `root` does not exist
    /// * `Error::InvalidInput` - `root` is an unsupported file, or neither file nor directory
    /// * `Error::EmptyCollection` - the directory has no supported files
    /// * `Error::Io` - the directory could not be read
    pub fn initialize(root: &Path, lister: &dyn DirectoryLister) -> Result<Self> {
        let identifiers = match lister.probe(root)? {
            None => return Err(Error::NotFound(root.to_path_buf())),
            Some(EntryKind::File) if is_supported(root) => vec![root.to_path_buf()],
            Some(EntryKind::File) | Some(EntryKind::Other) => {
                return Err(Error::InvalidInput(root.to_path_buf()))
            }
            Some(EntryKind::Directory) => {
                let mut files: Vec<PathBuf> = lister
                    .list(root)?
                    .into_iter()
                    .filter(|entry| entry.is_file && is_supported(&entry.path))
                    .map(|entry| entry.path)
                    .collect();
                if files.is_empty() {
                    return Err(Error::EmptyCollection(root.to_path_buf()));
                }
                // Byte order of the full path: "B.jpg" sorts before "a.jpg".
                files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
                files
            }
        };

        Ok(Self {
            identifiers: identifiers.into(),
            position: 0,
        })
    }

    /// Identifier under the cursor, or `None` for an empty sequence
    pub fn current(&self) -> Option<&Path> {
        self.identifiers.get(self.position).map(PathBuf::as_path)
    }

    /// Cursor position, or `None` for an empty sequence
    pub fn position(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.position)
    }

    /// Move to the next image, wrapping to the first
    pub fn advance(&mut self) {
        if !self.is_empty() {
            self.position = (self.position + 1) % self.len();
        }
    }

    /// Move to the previous image, wrapping to the last
    pub fn retreat(&mut self) {
        if !self.is_empty() {
            self.position = (self.position + self.len() - 1) % self.len();
        }
    }

    /// Number of images in the sequence
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// True if there is nothing to show
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Shared handle to the whole sequence, for background workers
    pub fn identifiers(&self) -> Arc<[PathBuf]> {
        Arc::clone(&self.identifiers)
    }
}
