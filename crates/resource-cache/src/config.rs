use std::time::Duration;

use serde::Deserialize;

/// Fine-tuning of a [`ResourceCache`](crate::ResourceCache).
///
/// Durations are given in human readable form, e.g. `ttl = "5s"` or `sweep_interval = "500ms"`.
#[derive(Debug, Clone, Copy, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Duration an entry stays alive after its last lookup.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Period of the background sweep that evicts expired entries.
    ///
    /// An expired entry stays reachable until the next sweep, so this is also the maximum
    /// amount of time an entry may outlive its ttl.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a config with the given ttl and the default sweep interval.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg: CacheConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, CacheConfig::default());
        assert_eq!(cfg.ttl, Duration::from_secs(5));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_humantime_durations() {
        let toml = r#"
            ttl = "2m 30s"
            sweep_interval = "250ms"
        "#;
        let cfg: CacheConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.ttl, Duration::from_secs(150));
        assert_eq!(cfg.sweep_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_partial_override() {
        // Setting one field keeps the default of the other.
        let cfg: CacheConfig = toml::from_str(r#"ttl = "1h""#).unwrap();
        assert_eq!(cfg.ttl, Duration::from_secs(3600));
        assert_eq!(cfg.sweep_interval, CacheConfig::default().sweep_interval);
    }

    #[test]
    fn test_invalid_duration() {
        let result: Result<CacheConfig, _> = toml::from_str(r#"ttl = "soon""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_with_ttl() {
        let cfg = CacheConfig::with_ttl(Duration::from_millis(10));
        assert_eq!(cfg.ttl, Duration::from_millis(10));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(1));
    }
}
