//! Viewer: navigation, synchronous loading and preloading behind one handle

use std::path::Path;
use std::sync::Arc;

use flipcache::{CacheStats, ImageStore};
use tracing::{info, warn};

use crate::config::ViewerConfig;
use crate::error::Result;
use crate::navigation::NavigationIndex;
use crate::preload::Preloader;
use crate::source::{cache_key, Decoder, DirectoryLister, FsLister, ImageDecoder, PixelBuffer};

/// What a UI talks to
///
/// Navigation happens on the caller's thread. Every move re-aims the
/// preloader, which refills the shared store in the background; the caller
/// never waits for it.
pub struct Viewer {
    index: NavigationIndex,
    store: Arc<ImageStore<PixelBuffer>>,
    preloader: Preloader,
    decoder: Arc<dyn Decoder>,
    lister: Box<dyn DirectoryLister>,
}

impl Viewer {
    /// Viewer over the local filesystem, decoding with the `image` crate
    pub fn new(config: ViewerConfig) -> Result<Self> {
        Self::with_collaborators(config, FsLister, ImageDecoder)
    }

    /// Viewer using the given directory lister and decoder
    ///
    /// # Errors
    /// * `Error::InvalidConfiguration` - `config` does not validate
    /// * `Error::WorkerPool` - the preload pool could not be started
    pub fn with_collaborators<L, D>(config: ViewerConfig, lister: L, decoder: D) -> Result<Self>
    where
        L: DirectoryLister + 'static,
        D: Decoder + 'static,
    {
        config.validate()?;

        let store = Arc::new(ImageStore::new(config.capacity)?);
        let decoder: Arc<dyn Decoder> = Arc::new(decoder);
        let preloader = Preloader::new(Arc::clone(&store), Arc::clone(&decoder), &config)?;

        Ok(Self {
            index: NavigationIndex::default(),
            store,
            preloader,
            decoder,
            lister: Box::new(lister),
        })
    }

    /// Load the collection at `root` and start warming the cache around its first image
    ///
    /// On failure the viewer is left with an empty collection.
    ///
    /// # Errors
    /// * `Error::NotFound` - `root` does not exist
    /// * `Error::InvalidInput` - `root` is an unsupported file or not a file/directory
    /// * `Error::EmptyCollection` - the directory has no supported images
    /// * `Error::Io` - the directory could not be read
    pub fn initialize(&mut self, root: impl AsRef<Path>) -> Result<()> {
        let root = root.as_ref();
        self.index = NavigationIndex::default();
        self.preloader.cancel();

        self.index = NavigationIndex::initialize(root, self.lister.as_ref())?;
        info!("Loaded {} image(s) from {}", self.index.len(), root.display());

        self.preload();
        Ok(())
    }

    /// Pixels for the current image
    ///
    /// Served from the cache when possible; otherwise decoded on the spot and
    /// cached. `None` when there is no current image or it fails to decode.
    pub fn current_pixel_buffer(&self) -> Option<Arc<PixelBuffer>> {
        let path = self.index.current()?;
        let key = cache_key(path);

        match self.store.get(&key) {
            Ok(Some(pixels)) => return Some(pixels),
            Ok(None) => {}
            Err(e) => {
                warn!("Cache lookup for {} failed: {}", key, e);
                return None;
            }
        }

        let pixels = match self.decoder.decode(path) {
            Ok(pixels) => Arc::new(pixels),
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };
        if let Err(e) = self.store.put(&key, Arc::clone(&pixels)) {
            warn!("Could not cache {}: {}", key, e);
        }
        Some(pixels)
    }

    /// Step to the next image and re-aim the preloader
    pub fn advance(&mut self) {
        self.index.advance();
        self.preload();
    }

    /// Step to the previous image and re-aim the preloader
    pub fn retreat(&mut self) {
        self.index.retreat();
        self.preload();
    }

    /// `(resident images, capacity)`
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.store.len(), self.store.capacity())
    }

    /// Hit/miss/eviction counters of the underlying store
    pub fn stats(&self) -> &CacheStats {
        self.store.stats()
    }

    /// Cache keys, most recently used first
    pub fn cached_keys(&self) -> Vec<String> {
        self.store.keys_by_recency()
    }

    /// Path of the current image
    pub fn current_path(&self) -> Option<&Path> {
        self.index.current()
    }

    /// Cursor position, `None` before a successful `initialize`
    pub fn position(&self) -> Option<usize> {
        self.index.position()
    }

    /// Number of images in the collection
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when there is nothing to show
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The background preloader, for waiting on or cancelling its work
    pub fn preloader(&self) -> &Preloader {
        &self.preloader
    }

    fn preload(&self) {
        if let Some(position) = self.index.position() {
            self.preloader.reload(self.index.identifiers(), position);
        }
    }
}
