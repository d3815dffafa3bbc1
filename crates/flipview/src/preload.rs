//! Predictive background preloading
//!
//! Every [`Preloader::reload`] starts a new generation and hands three lanes
//! of work to a small rayon pool: even forward offsets, odd forward offsets
//! and backward offsets. A lane gives up as soon as it notices a newer
//! generation. The final check happens inside the store's critical section,
//! and generations are bumped under that same lock, so a superseded lane can
//! never write after its successor was issued.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use flipcache::ImageStore;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::config::ViewerConfig;
use crate::error::{Error, Result};
use crate::source::{cache_key, Decoder, PixelBuffer};

/// How many positions ahead of and behind the cursor get preloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadWindow {
    /// Offsets `0..forward`, the cursor itself included
    pub forward: usize,
    /// Offsets `-1..=-backward`
    pub backward: usize,
}

impl PreloadWindow {
    /// Divide `capacity` slots between the two directions by weight,
    /// rounding in favour of the forward direction. Zero weights on both
    /// sides put everything behind the cursor.
    pub fn split(capacity: usize, forward_weight: usize, backward_weight: usize) -> Self {
        // Widened so large capacities or weights cannot overflow; the
        // quotient never exceeds `capacity`, so it narrows back losslessly.
        let total_weight = (forward_weight as u128 + backward_weight as u128).max(1);
        let forward = (capacity as u128 * forward_weight as u128).div_ceil(total_weight) as usize;
        Self {
            forward,
            backward: capacity - forward,
        }
    }

    /// Shrink the window so a collection of `total` items is visited at most once
    pub fn clipped(self, total: usize) -> Self {
        let forward = self.forward.min(total);
        Self {
            forward,
            backward: self.backward.min(total - forward),
        }
    }
}

/// Which slice of the window a worker walks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    ForwardEven,
    ForwardOdd,
    Backward,
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::ForwardEven => write!(f, "forward-even"),
            Lane::ForwardOdd => write!(f, "forward-odd"),
            Lane::Backward => write!(f, "backward"),
        }
    }
}

/// Count of workers that have been spawned but not yet returned
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

/// Decrements the in-flight count when a worker finishes, even by panic
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut count = self.0.count.lock();
        *count -= 1;
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

/// One lane of one generation
struct PreloadJob {
    lane: Lane,
    generation: u64,
    live_generation: Arc<AtomicU64>,
    offsets: Vec<isize>,
    position: usize,
    identifiers: Arc<[PathBuf]>,
    store: Arc<ImageStore<PixelBuffer>>,
    decoder: Arc<dyn Decoder>,
}

impl PreloadJob {
    fn is_stale(&self) -> bool {
        self.live_generation.load(Ordering::SeqCst) != self.generation
    }

    fn run(self) {
        let total = self.identifiers.len() as isize;

        for &offset in &self.offsets {
            if self.is_stale() {
                trace!("{} lane of generation {} superseded", self.lane, self.generation);
                return;
            }

            let index = (self.position as isize + offset).rem_euclid(total) as usize;
            let path = &self.identifiers[index];
            let key = cache_key(path);
            if self.store.contains(&key) {
                continue;
            }

            // Decoding runs outside any lock; a stale result is dropped below.
            let pixels = match self.decoder.decode(path) {
                Ok(pixels) => pixels,
                Err(e) => {
                    debug!("Skipping preload candidate: {}", e);
                    continue;
                }
            };

            match self.store.put_if(&key, pixels, || !self.is_stale()) {
                Ok(true) => debug!("Preloaded {} ({} lane)", key, self.lane),
                Ok(false) => {
                    trace!("{} lane of generation {} superseded", self.lane, self.generation);
                    return;
                }
                Err(e) => warn!("Could not cache {}: {}", key, e),
            }
        }
    }
}

/// Background filler for the image store
pub struct Preloader {
    store: Arc<ImageStore<PixelBuffer>>,
    decoder: Arc<dyn Decoder>,
    generation: Arc<AtomicU64>,
    window: PreloadWindow,
    pool: rayon::ThreadPool,
    in_flight: Arc<InFlight>,
}

impl Preloader {
    /// Create a preloader feeding `store`
    ///
    /// The preload window spans `store.capacity()` positions, divided by the
    /// weights in `config`.
    ///
    /// # Errors
    /// * `Error::InvalidConfiguration` - `config` does not validate
    /// * `Error::WorkerPool` - the thread pool could not be started
    pub fn new(
        store: Arc<ImageStore<PixelBuffer>>,
        decoder: Arc<dyn Decoder>,
        config: &ViewerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.preload_threads)
            .thread_name(|i| format!("preload-{}", i))
            .panic_handler(|_| warn!("Preload worker panicked; candidate dropped"))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;

        Ok(Self {
            window: PreloadWindow::split(
                store.capacity(),
                config.forward_weight,
                config.backward_weight,
            ),
            store,
            decoder,
            generation: Arc::new(AtomicU64::new(0)),
            pool,
            in_flight: Arc::new(InFlight::default()),
        })
    }

    /// Supersede all running work and start preloading around `position`
    ///
    /// Returns immediately; decoding happens on the pool.
    pub fn reload(&self, identifiers: Arc<[PathBuf]>, position: usize) {
        let generation = self.bump_generation();
        let total = identifiers.len();
        if total == 0 {
            return;
        }

        let window = self.window.clipped(total);
        let forward: Vec<isize> = (0..window.forward as isize).collect();
        let backward: Vec<isize> = (1..=window.backward as isize).map(|o| -o).collect();

        let lanes: [(Lane, Vec<isize>); 3] = [
            (Lane::ForwardEven, forward.iter().copied().step_by(2).collect()),
            (Lane::ForwardOdd, forward.iter().copied().skip(1).step_by(2).collect()),
            (Lane::Backward, backward),
        ];

        debug!(
            "Preload generation {} around {}/{} (+{} / -{})",
            generation, position, total, window.forward, window.backward
        );

        for (lane, offsets) in lanes {
            if offsets.is_empty() {
                continue;
            }
            self.spawn(PreloadJob {
                lane,
                generation,
                live_generation: Arc::clone(&self.generation),
                offsets,
                position,
                identifiers: Arc::clone(&identifiers),
                store: Arc::clone(&self.store),
                decoder: Arc::clone(&self.decoder),
            });
        }
    }

    /// Supersede all running work without starting more
    pub fn cancel(&self) {
        self.bump_generation();
    }

    /// Current generation; starts at 0 and grows with every reload or cancel
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// The full-capacity window split used by `reload`
    pub fn window(&self) -> PreloadWindow {
        self.window
    }

    /// Block until every spawned worker has returned
    ///
    /// Meant for tests and shutdown; the viewer never waits on preloading.
    pub fn wait_idle(&self) {
        let mut count = self.in_flight.count.lock();
        while *count > 0 {
            self.in_flight.idle.wait(&mut count);
        }
    }

    fn bump_generation(&self) -> u64 {
        self.store
            .exclusive(|| self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn spawn(&self, job: PreloadJob) {
        *self.in_flight.count.lock() += 1;
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        self.pool.spawn(move || {
            let _guard = guard;
            job.run();
        });
    }
}

impl Drop for Preloader {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DecodeError;
    use std::collections::HashSet;
    use std::path::Path;
    use std::time::{Duration, Instant};

    fn pixels() -> PixelBuffer {
        PixelBuffer {
            width: 1,
            height: 1,
            rgba: vec![0, 0, 0, 255],
        }
    }

    fn identifiers(n: usize) -> Arc<[PathBuf]> {
        (0..n)
            .map(|i| PathBuf::from(format!("/img/{:02}.png", i)))
            .collect::<Vec<_>>()
            .into()
    }

    fn keys(indices: &[usize]) -> HashSet<String> {
        indices.iter().map(|i| format!("/img/{:02}.png", i)).collect()
    }

    fn resident(store: &ImageStore<PixelBuffer>) -> HashSet<String> {
        store.keys_by_recency().into_iter().collect()
    }

    /// Decoder that records every call and fails for chosen paths
    #[derive(Default)]
    struct CountingDecoder {
        calls: Mutex<Vec<PathBuf>>,
        broken: HashSet<PathBuf>,
    }

    impl Decoder for CountingDecoder {
        fn decode(&self, path: &Path) -> std::result::Result<PixelBuffer, DecodeError> {
            self.calls.lock().push(path.to_path_buf());
            if self.broken.contains(path) {
                Err(DecodeError::new(path, "corrupt"))
            } else {
                Ok(pixels())
            }
        }
    }

    /// Decoder that parks every call until the gate opens
    #[derive(Default)]
    struct GatedDecoder {
        open: Mutex<bool>,
        opened: Condvar,
        entered: Mutex<usize>,
        arrived: Condvar,
    }

    impl GatedDecoder {
        fn open(&self) {
            *self.open.lock() = true;
            self.opened.notify_all();
        }

        fn wait_entered(&self, n: usize) -> bool {
            let deadline = Instant::now() + Duration::from_secs(5);
            let mut entered = self.entered.lock();
            while *entered < n {
                if self.arrived.wait_until(&mut entered, deadline).timed_out() {
                    return false;
                }
            }
            true
        }
    }

    impl Decoder for GatedDecoder {
        fn decode(&self, _path: &Path) -> std::result::Result<PixelBuffer, DecodeError> {
            *self.entered.lock() += 1;
            self.arrived.notify_all();

            let deadline = Instant::now() + Duration::from_secs(5);
            let mut open = self.open.lock();
            while !*open {
                if self.opened.wait_until(&mut open, deadline).timed_out() {
                    break;
                }
            }
            Ok(pixels())
        }
    }

    fn preloader(
        capacity: usize,
        decoder: Arc<dyn Decoder>,
    ) -> (Arc<ImageStore<PixelBuffer>>, Preloader) {
        let store = Arc::new(ImageStore::new(capacity).unwrap());
        let preloader =
            Preloader::new(Arc::clone(&store), decoder, &ViewerConfig::with_capacity(capacity))
                .unwrap();
        (store, preloader)
    }

    #[test]
    fn test_window_split() {
        assert_eq!(PreloadWindow::split(3, 2, 1), PreloadWindow { forward: 2, backward: 1 });
        assert_eq!(PreloadWindow::split(100, 2, 1), PreloadWindow { forward: 67, backward: 33 });
        assert_eq!(PreloadWindow::split(5, 2, 1), PreloadWindow { forward: 4, backward: 1 });
        assert_eq!(PreloadWindow::split(1, 2, 1), PreloadWindow { forward: 1, backward: 0 });
        assert_eq!(PreloadWindow::split(4, 1, 1), PreloadWindow { forward: 2, backward: 2 });
        assert_eq!(PreloadWindow::split(7, 1, 0), PreloadWindow { forward: 7, backward: 0 });

        let (_store, preloader) = preloader(9, Arc::new(CountingDecoder::default()));
        assert_eq!(preloader.window(), PreloadWindow { forward: 6, backward: 3 });
    }

    #[test]
    fn test_window_split_large_inputs() {
        let capacity = usize::MAX / 2 + 1;
        let window = PreloadWindow::split(capacity, 2, 1);
        assert_eq!(window.forward + window.backward, capacity);
        assert!(window.forward >= 2 * window.backward);
        assert!(window.forward - 2 * window.backward <= 2);

        assert_eq!(
            PreloadWindow::split(usize::MAX, 1, 0),
            PreloadWindow { forward: usize::MAX, backward: 0 }
        );
        assert_eq!(
            PreloadWindow::split(10, usize::MAX, usize::MAX),
            PreloadWindow { forward: 5, backward: 5 }
        );
    }

    #[test]
    fn test_window_clipped_to_collection() {
        let window = PreloadWindow::split(9, 2, 1);

        assert_eq!(window.clipped(100), window);
        assert_eq!(window.clipped(7), PreloadWindow { forward: 6, backward: 1 });
        assert_eq!(window.clipped(2), PreloadWindow { forward: 2, backward: 0 });
    }

    #[test]
    fn test_reload_fills_window_around_cursor() {
        let decoder = Arc::new(CountingDecoder::default());
        let (store, preloader) = preloader(6, decoder.clone());

        preloader.reload(identifiers(10), 8);
        preloader.wait_idle();

        // forward 8, 9, 0, 1 (wrapping), backward 7, 6
        assert_eq!(resident(&store), keys(&[8, 9, 0, 1, 7, 6]));
        assert_eq!(decoder.calls.lock().len(), 6);
    }

    #[test]
    fn test_cached_candidates_not_decoded_again() {
        let decoder = Arc::new(CountingDecoder::default());
        let (_store, preloader) = preloader(6, decoder.clone());
        let ids = identifiers(10);

        preloader.reload(Arc::clone(&ids), 3);
        preloader.wait_idle();
        preloader.reload(ids, 3);
        preloader.wait_idle();

        assert_eq!(decoder.calls.lock().len(), 6);
    }

    #[test]
    fn test_decode_failures_are_skipped() {
        let decoder = Arc::new(CountingDecoder {
            broken: [PathBuf::from("/img/01.png"), PathBuf::from("/img/09.png")]
                .into_iter()
                .collect(),
            ..CountingDecoder::default()
        });
        let (store, preloader) = preloader(6, decoder.clone());

        preloader.reload(identifiers(10), 0);
        preloader.wait_idle();

        // window: 0, 1, 2, 3 forward and 9, 8 backward; 1 and 9 fail
        assert_eq!(resident(&store), keys(&[0, 2, 3, 8]));
        assert_eq!(decoder.calls.lock().len(), 6);
    }

    #[test]
    fn test_short_collection_visited_once() {
        let decoder = Arc::new(CountingDecoder::default());
        let (store, preloader) = preloader(5, decoder.clone());

        preloader.reload(identifiers(2), 1);
        preloader.wait_idle();

        assert_eq!(resident(&store), keys(&[0, 1]));
        assert_eq!(decoder.calls.lock().len(), 2);
    }

    #[test]
    fn test_empty_collection_only_bumps_generation() {
        let decoder = Arc::new(CountingDecoder::default());
        let (store, preloader) = preloader(4, decoder.clone());

        preloader.reload(identifiers(0), 0);
        preloader.wait_idle();

        assert_eq!(preloader.generation(), 1);
        assert!(store.is_empty());
        assert!(decoder.calls.lock().is_empty());
    }

    #[test]
    fn test_superseded_generation_never_writes() {
        let decoder = Arc::new(GatedDecoder::default());
        let (store, preloader) = preloader(3, decoder.clone());
        let ids = identifiers(9);

        // First generation: one offset per lane (0, 1 and 8), all parked in decode.
        preloader.reload(Arc::clone(&ids), 0);
        assert!(decoder.wait_entered(3), "first generation never started decoding");

        // Second generation around 4: candidates 4, 5 and 3.
        preloader.reload(ids, 4);
        decoder.open();
        preloader.wait_idle();

        assert_eq!(preloader.generation(), 2);
        assert_eq!(resident(&store), keys(&[4, 5, 3]));
    }

    #[test]
    fn test_cancel_discards_in_flight_work() {
        let decoder = Arc::new(GatedDecoder::default());
        let (store, preloader) = preloader(3, decoder.clone());

        preloader.reload(identifiers(9), 0);
        assert!(decoder.wait_entered(3));

        preloader.cancel();
        decoder.open();
        preloader.wait_idle();

        assert!(store.is_empty());
    }
}
