use std::time::Duration;

/// Tunables for the dedup store.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Entries older than this are evicted on the next write.
    pub retention: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}
