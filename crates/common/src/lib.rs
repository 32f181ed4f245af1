//! Shared types, config, provider traits, and error definitions for the
//! location picker.

pub mod config;
pub mod error;
pub mod provider;
pub mod surface;
pub mod types;

pub use config::PickerConfig;
pub use error::Error;
pub use provider::{GeocodeRequest, MapMarker, MapProvider, MapSurface};
pub use surface::{InMemorySurface, SurfaceHandle, SurfaceSnapshot};
pub use types::*;

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
