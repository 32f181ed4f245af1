//! Map surface ownership and marker policy.
//!
//! One controller per mounted picker. It owns the provider surface and at
//! most one marker; an existing marker is always mutated in place, never
//! destroyed and recreated.

use common::provider::ClickSender;
use common::{
    Error, LatLng, MapConfig, MapMarker, MapProvider, MapSurface, Result, SurfaceContainer,
    SurfaceHandle,
};
use tracing::debug;

pub struct MapController {
    surface: Option<Box<dyn MapSurface>>,
    marker: Option<Box<dyn MapMarker>>,
}

impl MapController {
    pub fn new() -> Self {
        Self {
            surface: None,
            marker: None,
        }
    }

    /// Build the map surface. Errors here are promoted by the owner into
    /// the retryable `Error` lifecycle state.
    pub fn initialize(
        &mut self,
        provider: &dyn MapProvider,
        container: &SurfaceContainer,
        config: &MapConfig,
    ) -> Result<SurfaceHandle> {
        let surface = provider.create_map(container, config).map_err(|e| match e {
            Error::SdkUnavailable => Error::SdkUnavailable,
            other => Error::MapInit(other.to_string()),
        })?;
        let handle = surface.handle();
        self.surface = Some(surface);
        self.marker = None;
        Ok(handle)
    }

    pub fn is_initialized(&self) -> bool {
        self.surface.is_some()
    }

    pub fn attach_click_listener(&mut self, listener: ClickSender) {
        if let Some(surface) = self.surface.as_mut() {
            surface.add_click_listener(listener);
        }
    }

    /// Re-center and re-zoom, then move the marker there. If a marker
    /// already exists its position and title are mutated in place.
    pub fn set_position(&mut self, position: LatLng, zoom: u8, title: &str) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.set_center(position);
        surface.set_zoom(zoom);

        match self.marker.as_mut() {
            Some(marker) => {
                marker.set_position(position);
                marker.set_title(title);
            }
            None => {
                self.marker = Some(surface.create_marker(position, title));
            }
        }
        debug!("Map position set to {} (zoom={})", position.to_fixed6(), zoom);
    }

    /// Place or move the marker synchronously on a click. No re-center, no
    /// re-zoom, no geocoding.
    pub fn place_click_marker(&mut self, position: LatLng) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match self.marker.as_mut() {
            Some(marker) => marker.set_position(position),
            None => {
                self.marker = Some(surface.create_marker(position, &position.to_fixed6()));
            }
        }
    }

    /// Tear down the listener, marker, and surface. Never fails, even when
    /// the provider has gone away.
    pub fn cleanup(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.remove_click_listener();
        }
        if let Some(mut marker) = self.marker.take() {
            marker.detach();
        }
        self.surface = None;
    }
}

impl Default for MapController {
    fn default() -> Self {
        Self::new()
    }
}
