use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::MemoryBackend;

/// Background task that periodically removes expired cache entries and
/// prunes the tag index. Hygiene only: reads already treat expired entries
/// as missing, so correctness never depends on this task running.
pub async fn run_sweeper(backend: Arc<MemoryBackend>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let purged = backend.purge_expired(Instant::now());
        if purged > 0 {
            metrics::counter!(crate::observability::CACHE_SWEPT_TOTAL).increment(purged as u64);
            debug!(purged, "swept expired cache entries");
        }
        metrics::gauge!(crate::observability::CACHE_ENTRIES).set(backend.len() as f64);
    }
}
