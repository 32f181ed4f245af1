//! Capability traits over the external mapping/geocoding provider.
//!
//! The picker never talks to a concrete SDK directly. Production injects
//! the Google adapter, tests inject a fake — both behind these narrow
//! traits so the rest of the system is provider-agnostic.

use async_trait::async_trait;

use crate::surface::SurfaceHandle;
use crate::types::{GeocodeResult, LatLng, MapConfig, SurfaceContainer};
use crate::Result;

/// A single geocoding request.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeRequest {
    /// Forward geocode: free-form address text.
    Address(String),
    /// Reverse geocode: coordinates to address.
    Reverse(LatLng),
}

/// The external mapping provider capability.
///
/// `load` is the one-time heavy initialization (the script-injection
/// analogue); `create_map` fails with `Error::SdkUnavailable` until `load`
/// has succeeded. `geocode` returns the provider's result list — an empty
/// `Vec` is a successful zero-results response, not an error.
#[async_trait]
pub trait MapProvider: Send + Sync {
    /// One-time heavy initialization of the provider.
    async fn load(&self) -> Result<()>;

    /// Whether `load` has completed successfully.
    fn is_loaded(&self) -> bool;

    /// Construct a map surface bound to the host container.
    fn create_map(
        &self,
        container: &SurfaceContainer,
        config: &MapConfig,
    ) -> Result<Box<dyn MapSurface>>;

    /// Resolve a geocoding request to zero or more results.
    async fn geocode(&self, request: &GeocodeRequest) -> Result<Vec<GeocodeResult>>;
}

/// Sender for pointer clicks delivered by a surface.
pub type ClickSender = tokio::sync::mpsc::UnboundedSender<LatLng>;

/// A map surface owning center, zoom, and at most one marker.
pub trait MapSurface: Send {
    fn set_center(&mut self, center: LatLng);

    fn set_zoom(&mut self, zoom: u8);

    /// Register the click listener. At most one listener at a time; a second
    /// registration replaces the first.
    fn add_click_listener(&mut self, listener: ClickSender);

    fn remove_click_listener(&mut self);

    /// Create the surface's marker. Callers enforce the at-most-one-marker
    /// policy by mutating an existing marker in place instead.
    fn create_marker(&mut self, position: LatLng, title: &str) -> Box<dyn MapMarker>;

    /// Shared handle for snapshots and click injection.
    fn handle(&self) -> SurfaceHandle;
}

/// A mutable map annotation for the currently selected location.
pub trait MapMarker: Send {
    fn set_position(&mut self, position: LatLng);

    fn set_title(&mut self, title: &str);

    /// Detach from the surface (the `setMap(null)` analogue).
    fn detach(&mut self);
}
