//! Unified error type for the location picker.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Script load failed: {0}")]
    ScriptLoad(String),

    #[error("Map initialization failed: {0}")]
    MapInit(String),

    #[error("Mapping SDK is not loaded")]
    SdkUnavailable,

    #[error("Geocoding failed (status={status}): {message}")]
    Geocode { status: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
