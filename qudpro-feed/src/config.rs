use serde::Deserialize;
use std::{
    num::{NonZeroU64, NonZeroUsize},
    time::Duration,
};

pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(10).unwrap();
pub const DEFAULT_INJECTION_INTERVAL_SECS: NonZeroU64 = NonZeroU64::new(30).unwrap();
pub const DEFAULT_INITIAL_SYNTHETIC_COUNT: NonZeroUsize = NonZeroUsize::new(5).unwrap();

/// Tuning of a single feed view.
///
/// Every field has a default, so an empty environment deserializes to the
/// stock feed: ten posts, one injection every thirty seconds and five
/// generated posts mixed into the initial load.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub capacity: NonZeroUsize,
    pub injection_interval_secs: NonZeroU64,
    pub initial_synthetic_count: NonZeroUsize,
}

impl FeedConfig {
    #[must_use]
    pub fn injection_interval(&self) -> Duration {
        Duration::from_secs(self.injection_interval_secs.get())
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            injection_interval_secs: DEFAULT_INJECTION_INTERVAL_SECS,
            initial_synthetic_count: DEFAULT_INITIAL_SYNTHETIC_COUNT,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::FeedConfig;
    use std::time::Duration;

    #[test]
    fn defaults() {
        let config = FeedConfig::default();

        assert_eq!(config.capacity.get(), 10);
        assert_eq!(config.initial_synthetic_count.get(), 5);
        assert_eq!(config.injection_interval(), Duration::from_secs(30));
    }
}
