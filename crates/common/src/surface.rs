//! Canonical in-memory map surface.
//!
//! Headless adapters (the Google REST adapter and the test fake) both bind
//! the picker to this surface: it tracks center, zoom, and the single
//! marker, delivers injected clicks to the registered listener, and exposes
//! state snapshots through `SurfaceHandle` for hosts and tests.

use std::sync::{Arc, Mutex};

use crate::provider::{ClickSender, MapMarker, MapSurface};
use crate::types::{LatLng, MapConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSnapshot {
    pub position: LatLng,
    pub title: String,
}

/// Point-in-time view of a surface's state.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub center: LatLng,
    pub zoom: u8,
    pub marker: Option<MarkerSnapshot>,
    pub has_click_listener: bool,
}

#[derive(Debug)]
struct SurfaceState {
    center: LatLng,
    zoom: u8,
    marker: Option<MarkerSnapshot>,
    click_listener: Option<ClickSender>,
}

/// The in-memory surface. Owned by exactly one `MapController`.
pub struct InMemorySurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl InMemorySurface {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState {
                center: config.center,
                zoom: config.zoom,
                marker: None,
                click_listener: None,
            })),
        }
    }
}

impl MapSurface for InMemorySurface {
    fn set_center(&mut self, center: LatLng) {
        self.state.lock().unwrap().center = center;
    }

    fn set_zoom(&mut self, zoom: u8) {
        self.state.lock().unwrap().zoom = zoom;
    }

    fn add_click_listener(&mut self, listener: ClickSender) {
        self.state.lock().unwrap().click_listener = Some(listener);
    }

    fn remove_click_listener(&mut self) {
        self.state.lock().unwrap().click_listener = None;
    }

    fn create_marker(&mut self, position: LatLng, title: &str) -> Box<dyn MapMarker> {
        self.state.lock().unwrap().marker = Some(MarkerSnapshot {
            position,
            title: title.to_string(),
        });
        Box::new(InMemoryMarker {
            state: Arc::clone(&self.state),
            detached: false,
        })
    }

    fn handle(&self) -> SurfaceHandle {
        SurfaceHandle {
            state: Arc::clone(&self.state),
        }
    }
}

struct InMemoryMarker {
    state: Arc<Mutex<SurfaceState>>,
    detached: bool,
}

impl MapMarker for InMemoryMarker {
    fn set_position(&mut self, position: LatLng) {
        if self.detached {
            return;
        }
        if let Some(marker) = self.state.lock().unwrap().marker.as_mut() {
            marker.position = position;
        }
    }

    fn set_title(&mut self, title: &str) {
        if self.detached {
            return;
        }
        if let Some(marker) = self.state.lock().unwrap().marker.as_mut() {
            marker.title = title.to_string();
        }
    }

    fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;
        self.state.lock().unwrap().marker = None;
    }
}

/// Cloneable view of a surface for hosts and tests: read state snapshots,
/// inject pointer clicks.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    state: Arc<Mutex<SurfaceState>>,
}

impl SurfaceHandle {
    pub fn snapshot(&self) -> SurfaceSnapshot {
        let state = self.state.lock().unwrap();
        SurfaceSnapshot {
            center: state.center,
            zoom: state.zoom,
            marker: state.marker.clone(),
            has_click_listener: state.click_listener.is_some(),
        }
    }

    /// Deliver a pointer click to the registered listener. Returns false if
    /// no listener is attached (or the listener has gone away).
    pub fn click(&self, lat: f64, lng: f64) -> bool {
        let listener = self.state.lock().unwrap().click_listener.clone();
        match listener {
            Some(sender) => sender.send(LatLng::new(lat, lng)).is_ok(),
            None => false,
        }
    }
}
