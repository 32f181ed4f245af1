//! Configuration loader — merges env vars, .env file, and config.toml.

use common::{Error, PickerConfig};
use std::path::Path;

fn parse_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_usize(raw: &str, env_name: &str) -> Result<usize, Error> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn validate_config(config: &PickerConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.resolver.min_query_len == 0 {
        issues.push("resolver.min_query_len must be > 0".into());
    }
    if config.cache.capacity == 0 {
        issues.push("cache.capacity must be > 0".into());
    }
    if config.http.timeout_secs == 0 {
        issues.push("http.timeout_secs must be > 0".into());
    }
    if config.http.requests_per_sec == 0 {
        issues.push("http.requests_per_sec must be > 0".into());
    }
    if config.map.zoom > 21 {
        issues.push("map.zoom must be <= 21".into());
    }
    if config.map.center.lat < -90.0 || config.map.center.lat > 90.0 {
        issues.push("map.center.lat must be in [-90,90]".into());
    }
    if config.map.center.lng < -180.0 || config.map.center.lng > 180.0 {
        issues.push("map.center.lng must be in [-180,180]".into());
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Load picker configuration from environment and optional config file.
/// The API key requirement is waived for offline runs.
pub fn load_config(require_api_key: bool) -> Result<PickerConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = PickerConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    if let Ok(key) = std::env::var("GOOGLE_MAPS_API_KEY") {
        config.google_maps_api_key = key;
    }
    if let Ok(raw) = std::env::var("PICKER_DEBOUNCE_MS") {
        config.resolver.debounce_ms = parse_u64(&raw, "PICKER_DEBOUNCE_MS")?;
    }
    if let Ok(raw) = std::env::var("PICKER_MIN_QUERY_LEN") {
        config.resolver.min_query_len = parse_usize(&raw, "PICKER_MIN_QUERY_LEN")?;
    }
    if let Ok(raw) = std::env::var("PICKER_CACHE_CAPACITY") {
        config.cache.capacity = parse_usize(&raw, "PICKER_CACHE_CAPACITY")?;
    }
    if let Ok(raw) = std::env::var("PICKER_CACHE_TTL_SECS") {
        config.cache.ttl_secs = parse_u64(&raw, "PICKER_CACHE_TTL_SECS")?;
    }
    if let Ok(raw) = std::env::var("PICKER_REQUESTS_PER_SEC") {
        config.http.requests_per_sec = parse_u32(&raw, "PICKER_REQUESTS_PER_SEC")?;
    }

    // 5. Validate required fields.
    if require_api_key && config.google_maps_api_key.trim().is_empty() {
        return Err(Error::Config(
            "GOOGLE_MAPS_API_KEY is required (set in .env or environment, or run with --offline)"
                .into(),
        ));
    }

    validate_config(&config)?;

    Ok(config)
}
