//! Collaborator seams: directory listing and image decoding
//!
//! The viewer never touches the filesystem or an image codec directly; it
//! goes through [`DirectoryLister`] and [`Decoder`]. [`FsLister`] and
//! [`ImageDecoder`] are the production implementations.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::ImageReader;

/// Extensions (lowercase, without the dot) the viewer will open
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// True if `path` has a supported extension, compared case-insensitively
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Normalize `path` into the key used by the image store
///
/// Relative paths are resolved against the working directory so the same
/// file always maps to the same key. Falls back to the path as given if it
/// cannot be made absolute.
pub fn cache_key(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// What a path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Anything else (socket, device, ...)
    Other,
}

/// One entry yielded by a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    /// Full path of the entry
    pub path: PathBuf,
    /// True for regular files
    pub is_file: bool,
}

/// Enumerates collections of images
pub trait DirectoryLister: Send + Sync {
    /// Classify `path`, or `Ok(None)` if it does not exist
    fn probe(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Direct children of `dir`, in no particular order
    fn list(&self, dir: &Path) -> io::Result<Vec<ListedEntry>>;
}

/// [`DirectoryLister`] backed by `std::fs`
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    fn probe(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => Ok(Some(EntryKind::File)),
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::Other)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<ListedEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // Follow symlinks, like the probe does for the root.
            let is_file = fs::metadata(entry.path())
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            entries.push(ListedEntry {
                path: entry.path(),
                is_file,
            });
        }
        Ok(entries)
    }
}

/// Decoded RGBA8 image
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long
    pub rgba: Vec<u8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// A path that could not be turned into pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Offending file
    pub path: PathBuf,
    /// Why decoding failed
    pub reason: String,
}

impl DecodeError {
    /// Build an error for `path`
    pub fn new(path: &Path, reason: impl fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to decode {}: {}", self.path.display(), self.reason)
    }
}

impl std::error::Error for DecodeError {}

/// Turns a path into pixels
///
/// Implementations must be callable from several preload threads at once.
pub trait Decoder: Send + Sync {
    /// Decode the image at `path`
    fn decode(&self, path: &Path) -> Result<PixelBuffer, DecodeError>;
}

impl<F> Decoder for F
where
    F: Fn(&Path) -> Result<PixelBuffer, DecodeError> + Send + Sync,
{
    fn decode(&self, path: &Path) -> Result<PixelBuffer, DecodeError> {
        self(path)
    }
}

/// [`Decoder`] backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    fn decode(&self, path: &Path) -> Result<PixelBuffer, DecodeError> {
        let img = ImageReader::open(path)
            .map_err(|e| DecodeError::new(path, e))?
            .with_guessed_format()
            .map_err(|e| DecodeError::new(path, e))?
            .decode()
            .map_err(|e| DecodeError::new(path, e))?;

        let rgba = img.to_rgba8();
        Ok(PixelBuffer {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    }
}
