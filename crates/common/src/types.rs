//! Domain types shared across the picker.

use serde::{Deserialize, Serialize};

/// Zoom applied when a resolution originated from typed address text.
pub const ADDRESS_ZOOM: u8 = 18;
/// Zoom applied when a resolution originated from raw coordinates or a click.
pub const COORDINATE_ZOOM: u8 = 16;

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Render as `"<lat:.6>,<lng:.6>"` — the canonical coordinate string
    /// used for callbacks, reverse-geocode queries, and cache keys.
    pub fn to_fixed6(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lng)
    }
}

/// Parse a `"lat,lng"` string by splitting on the comma.
pub fn parse_lat_lng(raw: &str) -> Option<LatLng> {
    let (lat_raw, lng_raw) = raw.split_once(',')?;
    let lat = lat_raw.trim().parse::<f64>().ok()?;
    let lng = lng_raw.trim().parse::<f64>().ok()?;
    Some(LatLng::new(lat, lng))
}

/// How a query string should be interpreted by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrigin {
    /// Free-form address text, sent as a forward geocode.
    Address,
    /// A `"lat,lng"` string, sent as a reverse geocode.
    Coordinates,
}

impl QueryOrigin {
    /// A typed address implies higher locational confidence than a clicked
    /// or pasted point, so it zooms in further.
    pub fn zoom(&self) -> u8 {
        match self {
            QueryOrigin::Address => ADDRESS_ZOOM,
            QueryOrigin::Coordinates => COORDINATE_ZOOM,
        }
    }
}

/// A resolved geocode: geometry plus the provider's descriptive fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub position: LatLng,
    #[serde(default)]
    pub formatted_address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    /// Full provider result payload, kept for downstream consumers.
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// The selection delivered to the host on every map click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSelection {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
    pub city: String,
    pub state: String,
    /// `"<lat:.6>,<lng:.6>"`.
    pub coordinates: String,
}

impl LocationSelection {
    /// Build the synchronous click selection. No geocoding has completed at
    /// this point, so `city`/`state` are empty and `address` carries the
    /// raw coordinate string.
    pub fn from_click(lat: f64, lng: f64) -> Self {
        let coordinates = LatLng::new(lat, lng).to_fixed6();
        Self {
            lat,
            lng,
            address: coordinates.clone(),
            city: String::new(),
            state: String::new(),
            coordinates,
        }
    }
}

/// Map configuration handed to the provider when constructing a surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    #[serde(default = "default_center")]
    pub center: LatLng,
    #[serde(default = "default_map_type")]
    pub map_type_id: String,
    #[serde(default)]
    pub map_type_control: bool,
    #[serde(default)]
    pub street_view_control: bool,
    #[serde(default = "default_true")]
    pub fullscreen_control: bool,
    #[serde(default = "default_gesture_handling")]
    pub gesture_handling: String,
    #[serde(default)]
    pub clickable_icons: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            zoom: default_zoom(),
            center: default_center(),
            map_type_id: default_map_type(),
            map_type_control: false,
            street_view_control: false,
            fullscreen_control: true,
            gesture_handling: default_gesture_handling(),
            clickable_icons: false,
        }
    }
}

fn default_zoom() -> u8 {
    5
}

fn default_center() -> LatLng {
    // Nationwide default view for the dashboard.
    LatLng::new(20.5937, 78.9629)
}

fn default_map_type() -> String {
    "roadmap".to_string()
}

fn default_gesture_handling() -> String {
    "greedy".to_string()
}

fn default_true() -> bool {
    true
}

/// Opaque descriptor of the host surface the map binds to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurfaceContainer {
    /// Host-side element identifier.
    #[serde(default)]
    pub id: String,
    /// Forwarded opaquely to the host; the picker never interprets it.
    #[serde(default)]
    pub height: Option<String>,
}

impl SurfaceContainer {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            height: None,
        }
    }
}
