//! Google Maps Geocoding API adapter.
//!
//! Implements the `MapProvider` capability over the Geocoding REST API and
//! binds map surfaces to the shared in-memory surface. All geocode calls
//! pass through a process-wide rate limiter so bursts across picker
//! instances cannot flood the upstream service.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter as GovLimiter};
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::config::HttpConfig;
use common::{
    Error, GeocodeRequest, GeocodeResult, InMemorySurface, LatLng, MapConfig, MapProvider,
    MapSurface, Result, SurfaceContainer,
};

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

type DirectLimiter =
    GovLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// Upstream request rate limiter.
#[derive(Clone)]
struct RateLimiter {
    limiter: Arc<DirectLimiter>,
}

impl RateLimiter {
    fn new(requests_per_sec: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_sec.max(1)).unwrap());
        Self {
            limiter: Arc::new(GovLimiter::direct(quota)),
        }
    }

    /// Wait until a request slot is available.
    async fn wait(&self) {
        self.limiter.until_ready().await;
    }
}

/// Production `MapProvider` over the Google Maps Geocoding API.
pub struct GoogleMapsProvider {
    api_key: String,
    http: HttpConfig,
    client: tokio::sync::OnceCell<reqwest::Client>,
    limiter: RateLimiter,
}

/// Response from `maps/api/geocode/json`.
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResultDto>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeResultDto {
    #[serde(default)]
    pub formatted_address: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    pub location: Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressComponent {
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl GoogleMapsProvider {
    pub fn new(api_key: String, http: HttpConfig) -> Self {
        let limiter = RateLimiter::new(http.requests_per_sec);
        Self {
            api_key,
            http,
            client: tokio::sync::OnceCell::new(),
            limiter,
        }
    }

    fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent("location-picker/0.1 (hr-dashboard map component)")
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(self.http.timeout_secs))
            .build()
            .map_err(|e| Error::ScriptLoad(format!("Failed to build HTTP client: {e}")))
    }
}

#[async_trait]
impl MapProvider for GoogleMapsProvider {
    async fn load(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::ScriptLoad(
                "GOOGLE_MAPS_API_KEY is required (set in .env or environment)".into(),
            ));
        }
        self.client
            .get_or_try_init(|| async { self.build_client() })
            .await?;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.client.get().is_some()
    }

    fn create_map(
        &self,
        container: &SurfaceContainer,
        config: &MapConfig,
    ) -> Result<Box<dyn MapSurface>> {
        if !self.is_loaded() {
            return Err(Error::SdkUnavailable);
        }
        debug!(
            "Creating map surface for container '{}' (zoom={}, center={})",
            container.id,
            config.zoom,
            config.center.to_fixed6()
        );
        Ok(Box::new(InMemorySurface::new(config)))
    }

    async fn geocode(&self, request: &GeocodeRequest) -> Result<Vec<GeocodeResult>> {
        let client = self.client.get().ok_or(Error::SdkUnavailable)?;

        self.limiter.wait().await;

        let (param, value) = match request {
            GeocodeRequest::Address(address) => ("address", address.clone()),
            GeocodeRequest::Reverse(position) => ("latlng", position.to_fixed6()),
        };
        let query = [(param, value.clone()), ("key", self.api_key.clone())];

        debug!("Geocoding {}={}", param, value);

        let resp = client
            .get(GEOCODE_URL)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Geocode request failed for {param}={value}: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http(format!(
                "Geocoding API returned {} for {}={}: {}",
                status,
                param,
                value,
                &body[..body.len().min(500)]
            )));
        }

        let payload: GeocodeResponse = resp
            .json()
            .await
            .map_err(|e| Error::Http(format!("JSON parse error for {param}={value}: {e}")))?;

        map_response(payload)
    }
}

/// Map the provider's status taxonomy: `OK` yields results, `ZERO_RESULTS`
/// is a successful empty set, anything else is a geocoding error.
fn map_response(payload: GeocodeResponse) -> Result<Vec<GeocodeResult>> {
    match payload.status.as_str() {
        "OK" => payload.results.into_iter().map(map_result).collect(),
        "ZERO_RESULTS" => Ok(Vec::new()),
        status => Err(Error::Geocode {
            status: status.to_string(),
            message: payload
                .error_message
                .unwrap_or_else(|| "no error message".to_string()),
        }),
    }
}

fn map_result(dto: GeocodeResultDto) -> Result<GeocodeResult> {
    let raw = serde_json::to_value(&dto)?;
    Ok(GeocodeResult {
        position: LatLng::new(dto.geometry.location.lat, dto.geometry.location.lng),
        city: component_long_name(&dto.address_components, "locality"),
        state: component_long_name(&dto.address_components, "administrative_area_level_1"),
        formatted_address: dto.formatted_address,
        raw,
    })
}

fn component_long_name(components: &[AddressComponent], kind: &str) -> String {
    components
        .iter()
        .find(|c| c.types.iter().any(|t| t == kind))
        .map(|c| c.long_name.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> &'static str {
        r#"{
            "status": "OK",
            "results": [
                {
                    "formatted_address": "1600 Amphitheatre Pkwy, Mountain View, CA 94043, USA",
                    "geometry": {"location": {"lat": 37.4224764, "lng": -122.0842499}},
                    "address_components": [
                        {"long_name": "1600", "short_name": "1600", "types": ["street_number"]},
                        {"long_name": "Mountain View", "short_name": "Mountain View", "types": ["locality", "political"]},
                        {"long_name": "California", "short_name": "CA", "types": ["administrative_area_level_1", "political"]},
                        {"long_name": "United States", "short_name": "US", "types": ["country", "political"]}
                    ]
                }
            ]
        }"#
    }

    #[test]
    fn test_deserialize_geocode_response() {
        let parsed: GeocodeResponse =
            serde_json::from_str(sample_response()).expect("response should deserialize");

        assert_eq!(parsed.status, "OK");
        assert_eq!(parsed.results.len(), 1);
        assert!(parsed.error_message.is_none());
    }

    #[test]
    fn test_map_response_extracts_city_and_state() {
        let parsed: GeocodeResponse =
            serde_json::from_str(sample_response()).expect("response should deserialize");
        let results = map_response(parsed).expect("should map");

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!((result.position.lat - 37.4224764).abs() < 1e-9);
        assert!((result.position.lng + 122.0842499).abs() < 1e-9);
        assert_eq!(result.city, "Mountain View");
        assert_eq!(result.state, "California");
        assert!(result
            .formatted_address
            .starts_with("1600 Amphitheatre Pkwy"));
        assert!(result.raw.get("geometry").is_some());
    }

    #[test]
    fn test_zero_results_is_successful_empty() {
        let parsed: GeocodeResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#)
                .expect("response should deserialize");
        assert!(map_response(parsed).expect("should map").is_empty());
    }

    #[test]
    fn test_error_status_maps_to_geocode_error() {
        let parsed: GeocodeResponse = serde_json::from_str(
            r#"{"status": "REQUEST_DENIED", "results": [], "error_message": "The provided API key is invalid."}"#,
        )
        .expect("response should deserialize");

        match map_response(parsed) {
            Err(Error::Geocode { status, message }) => {
                assert_eq!(status, "REQUEST_DENIED");
                assert!(message.contains("invalid"));
            }
            other => panic!("expected geocode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_map_requires_load() {
        let provider = GoogleMapsProvider::new("test-key".into(), HttpConfig::default());
        assert!(!provider.is_loaded());
        assert!(matches!(
            provider
                .create_map(&SurfaceContainer::new("map"), &MapConfig::default())
                .err(),
            Some(Error::SdkUnavailable)
        ));

        provider.load().await.expect("load should succeed");
        assert!(provider.is_loaded());
        provider
            .create_map(&SurfaceContainer::new("map"), &MapConfig::default())
            .expect("surface should build");
    }

    #[tokio::test]
    async fn test_load_rejects_empty_key() {
        let provider = GoogleMapsProvider::new("  ".into(), HttpConfig::default());
        assert!(matches!(
            provider.load().await,
            Err(Error::ScriptLoad(_))
        ));
        assert!(!provider.is_loaded());
    }
}
