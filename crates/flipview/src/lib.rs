//! # flipview
//!
//! Step through a folder of images with the next few already decoded.
//!
//! ## Architecture
//! - **NavigationIndex**: sorted, cyclic list of image paths plus a cursor
//! - **ImageStore** (from `flipcache`): bounded LRU of decoded pixels, shared
//! - **Preloader**: rayon pool refilling the store around the cursor,
//!   forward-biased, superseded by generation on every move
//! - **Viewer**: the facade a UI drives (`initialize`, `advance`, `retreat`,
//!   `current_pixel_buffer`, `cache_stats`)
//!
//! Filesystem listing and decoding sit behind the [`DirectoryLister`] and
//! [`Decoder`] traits.

#![warn(missing_docs)]

mod config;
mod error;
mod navigation;
mod preload;
mod source;
mod viewer;

pub use config::{ViewerConfig, DEFAULT_CAPACITY, DEFAULT_PRELOAD_THREADS};
pub use error::{Error, Result};
pub use navigation::NavigationIndex;
pub use preload::{PreloadWindow, Preloader};
pub use source::{
    cache_key, is_supported, DecodeError, Decoder, DirectoryLister, EntryKind, FsLister,
    ImageDecoder, ListedEntry, PixelBuffer, SUPPORTED_EXTENSIONS,
};
pub use viewer::Viewer;

pub use flipcache::{CacheStats, StatsSnapshot};
