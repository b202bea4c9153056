use std::time::Duration;

/// Runtime knobs, overridable through `INNKEEP_*` environment variables.
/// The embedding process builds one of these at startup and wires the
/// pieces together; nothing here is a global.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL for cached search results.
    pub search_cache_ttl: Duration,
    /// Bound on waiting for a room's exclusive scope.
    pub lock_timeout: Duration,
    /// How often the sweeper purges expired cache entries.
    pub sweep_interval: Duration,
    /// Prometheus exporter port; None disables the exporter.
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_cache_ttl: Duration::from_secs(900),
            lock_timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(60),
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            search_cache_ttl: env_secs("INNKEEP_CACHE_TTL_SECS")
                .unwrap_or(defaults.search_cache_ttl),
            lock_timeout: env_secs("INNKEEP_LOCK_TIMEOUT_SECS")
                .unwrap_or(defaults.lock_timeout),
            sweep_interval: env_secs("INNKEEP_SWEEP_INTERVAL_SECS")
                .unwrap_or(defaults.sweep_interval),
            metrics_port: std::env::var("INNKEEP_METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.search_cache_ttl, Duration::from_secs(900));
        assert_eq!(config.lock_timeout, Duration::from_secs(5));
        assert!(config.metrics_port.is_none());
    }
}
