//! Viewer settings

use crate::error::{Error, Result};

/// Default number of decoded images kept resident
pub const DEFAULT_CAPACITY: usize = 100;

/// One thread per preload lane (forward-even, forward-odd, backward)
pub const DEFAULT_PRELOAD_THREADS: usize = 3;

/// Tunable knobs for a [`Viewer`](crate::Viewer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Maximum number of decoded images held in memory
    pub capacity: usize,

    /// Size of the background decode pool
    pub preload_threads: usize,

    /// Share of the preload window spent ahead of the cursor
    pub forward_weight: usize,

    /// Share of the preload window spent behind the cursor
    pub backward_weight: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            preload_threads: DEFAULT_PRELOAD_THREADS,
            forward_weight: 2,
            backward_weight: 1,
        }
    }
}

impl ViewerConfig {
    /// Default settings with a different cache capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Reject settings the viewer cannot run with
    ///
    /// # Errors
    /// * `Error::InvalidConfiguration` - zero capacity or threads, or a
    ///   window that does not favour the forward direction
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidConfiguration(
                "cache capacity must be greater than zero".to_string(),
            ));
        }
        if self.preload_threads == 0 {
            return Err(Error::InvalidConfiguration(
                "preload pool needs at least one thread".to_string(),
            ));
        }
        if self.forward_weight == 0 || self.forward_weight < self.backward_weight {
            return Err(Error::InvalidConfiguration(format!(
                "forward weight ({}) must be non-zero and at least the backward weight ({})",
                self.forward_weight, self.backward_weight
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ViewerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity, 100);
    }

    #[test]
    fn test_rejects_bad_settings() {
        let cases = [
            ViewerConfig::with_capacity(0),
            ViewerConfig {
                preload_threads: 0,
                ..ViewerConfig::default()
            },
            ViewerConfig {
                forward_weight: 0,
                backward_weight: 0,
                ..ViewerConfig::default()
            },
            ViewerConfig {
                forward_weight: 1,
                backward_weight: 2,
                ..ViewerConfig::default()
            },
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfiguration(_))),
                "{:?} should be rejected",
                config
            );
        }
    }
}
