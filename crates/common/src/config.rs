//! Picker configuration types.

use serde::{Deserialize, Serialize};

use crate::types::MapConfig;

/// Top-level picker configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PickerConfig {
    /// Google Maps Geocoding API key.
    #[serde(default)]
    pub google_maps_api_key: String,

    /// Map surface defaults.
    #[serde(default)]
    pub map: MapConfig,

    /// Resolver debounce and query gating.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Shared geocode cache sizing.
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP client and upstream rate limiting.
    #[serde(default)]
    pub http: HttpConfig,

    /// Lifecycle timing.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Debounce and query-length gating for the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Quiescence window before a cache miss dispatches (milliseconds).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Queries shorter than this are dropped without any effect.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            min_query_len: default_min_query_len(),
        }
    }
}

/// Geocode cache capacity and expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Max entries before LRU eviction.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Entry time-to-live in seconds; 0 disables expiry.
    #[serde(default)]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: 0,
        }
    }
}

/// HTTP client tuning for the Google adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upstream geocode requests per second, shared across all pickers.
    #[serde(default = "default_requests_per_sec")]
    pub requests_per_sec: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            requests_per_sec: default_requests_per_sec(),
        }
    }
}

/// Lifecycle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Delay before a retry re-attempts initialization (milliseconds).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_min_query_len() -> usize {
    5
}

fn default_cache_capacity() -> usize {
    512
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_requests_per_sec() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PickerConfig::default();
        assert_eq!(config.resolver.debounce_ms, 500);
        assert_eq!(config.resolver.min_query_len, 5);
        assert_eq!(config.cache.capacity, 512);
        assert_eq!(config.cache.ttl_secs, 0);
        assert_eq!(config.http.requests_per_sec, 10);
        assert_eq!(config.lifecycle.retry_delay_ms, 100);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: PickerConfig = serde_json::from_str(
            r#"{
                "google_maps_api_key": "test-key",
                "resolver": {"debounce_ms": 50},
                "map": {"zoom": 12}
            }"#,
        )
        .expect("config should deserialize");

        assert_eq!(parsed.google_maps_api_key, "test-key");
        assert_eq!(parsed.resolver.debounce_ms, 50);
        assert_eq!(parsed.resolver.min_query_len, 5);
        assert_eq!(parsed.map.zoom, 12);
        assert_eq!(parsed.map.gesture_handling, "greedy");
    }
}
