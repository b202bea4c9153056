use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings committed.
pub const BOOKINGS_CREATED_TOTAL: &str = "innkeep_bookings_created_total";

/// Counter: booking attempts rejected with a date conflict.
pub const BOOKING_CONFLICTS_TOTAL: &str = "innkeep_booking_conflicts_total";

/// Counter: bookings cancelled.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "innkeep_bookings_cancelled_total";

// ── Search cache ────────────────────────────────────────────────

/// Counter: live cache hits.
pub const CACHE_HITS_TOTAL: &str = "innkeep_cache_hits_total";

/// Counter: misses (including expired and undecodable entries).
pub const CACHE_MISSES_TOTAL: &str = "innkeep_cache_misses_total";

/// Counter: entries dropped by invalidation.
pub const CACHE_INVALIDATIONS_TOTAL: &str = "innkeep_cache_invalidations_total";

/// Counter: expired entries physically removed by the sweeper.
pub const CACHE_SWEPT_TOTAL: &str = "innkeep_cache_swept_total";

/// Gauge: live entries in the cache backend.
pub const CACHE_ENTRIES: &str = "innkeep_cache_entries";

// ── USE metrics (store contention) ──────────────────────────────

/// Histogram: time spent waiting for a room's exclusive scope, in seconds.
pub const LOCK_WAIT_SECONDS: &str = "innkeep_lock_wait_seconds";

/// Counter: scope acquisitions abandoned on timeout.
pub const LOCK_TIMEOUTS_TOTAL: &str = "innkeep_lock_timeouts_total";

/// Install the tracing subscriber and, if a port is given, the Prometheus
/// metrics exporter. Call once at process start.
pub fn init(metrics_port: Option<u16>) {
    tracing_subscriber::fmt::init();
    let Some(port) = metrics_port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
