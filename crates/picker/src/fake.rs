//! Scripted in-process provider for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use common::{
    Error, GeocodeRequest, GeocodeResult, InMemorySurface, LatLng, MapConfig, MapProvider,
    MapSurface, Result, SurfaceContainer, SurfaceHandle,
};

/// `MapProvider` whose geocode responses are scripted per query and whose
/// load behavior, latency, and call counts are all controllable.
pub struct FakeMapProvider {
    load_calls: AtomicU32,
    load_failures_remaining: AtomicU32,
    load_latency: Mutex<Option<Duration>>,
    loaded: Mutex<bool>,

    responses: Mutex<HashMap<String, Vec<GeocodeResult>>>,
    failures: Mutex<HashMap<String, String>>,
    geocode_latency: Mutex<Option<Duration>>,
    geocode_calls: AtomicU32,
    geocode_log: Mutex<Vec<String>>,

    surfaces: Mutex<Vec<SurfaceHandle>>,
}

impl FakeMapProvider {
    pub fn new() -> Self {
        Self {
            load_calls: AtomicU32::new(0),
            load_failures_remaining: AtomicU32::new(0),
            load_latency: Mutex::new(None),
            loaded: Mutex::new(false),
            responses: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            geocode_latency: Mutex::new(None),
            geocode_calls: AtomicU32::new(0),
            geocode_log: Mutex::new(Vec::new()),
            surfaces: Mutex::new(Vec::new()),
        }
    }

    /// Build a result in one line for scripting.
    pub fn result(lat: f64, lng: f64, address: &str, city: &str, state: &str) -> GeocodeResult {
        GeocodeResult {
            position: LatLng::new(lat, lng),
            formatted_address: address.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            raw: serde_json::json!({ "formatted_address": address }),
        }
    }

    /// Script the response for a forward (address) geocode.
    pub fn script_address(&self, query: &str, results: Vec<GeocodeResult>) {
        self.responses
            .lock()
            .unwrap()
            .insert(query.to_string(), results);
    }

    /// Script the response for a reverse geocode of the given point.
    pub fn script_reverse(&self, lat: f64, lng: f64, results: Vec<GeocodeResult>) {
        self.responses
            .lock()
            .unwrap()
            .insert(LatLng::new(lat, lng).to_fixed6(), results);
    }

    /// Make geocodes of the given query fail.
    pub fn fail_query(&self, query: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(query.to_string(), message.to_string());
    }

    /// Make the next `n` load attempts fail.
    pub fn fail_next_loads(&self, n: u32) {
        self.load_failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn set_load_latency(&self, latency: Duration) {
        *self.load_latency.lock().unwrap() = Some(latency);
    }

    pub fn set_geocode_latency(&self, latency: Duration) {
        *self.geocode_latency.lock().unwrap() = Some(latency);
    }

    pub fn load_calls(&self) -> u32 {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn geocode_calls(&self) -> u32 {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    /// Query keys in dispatch order (reverse geocodes appear as their
    /// fixed-6 coordinate string).
    pub fn geocode_log(&self) -> Vec<String> {
        self.geocode_log.lock().unwrap().clone()
    }

    /// Handles of every surface created so far.
    pub fn surfaces(&self) -> Vec<SurfaceHandle> {
        self.surfaces.lock().unwrap().clone()
    }

    fn request_key(request: &GeocodeRequest) -> String {
        match request {
            GeocodeRequest::Address(address) => address.clone(),
            GeocodeRequest::Reverse(position) => position.to_fixed6(),
        }
    }
}

impl Default for FakeMapProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MapProvider for FakeMapProvider {
    async fn load(&self) -> Result<()> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.load_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let remaining = self.load_failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.load_failures_remaining
                .store(remaining - 1, Ordering::SeqCst);
            return Err(Error::ScriptLoad("scripted load failure".into()));
        }

        *self.loaded.lock().unwrap() = true;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        *self.loaded.lock().unwrap()
    }

    fn create_map(
        &self,
        _container: &SurfaceContainer,
        config: &MapConfig,
    ) -> Result<Box<dyn MapSurface>> {
        if !self.is_loaded() {
            return Err(Error::SdkUnavailable);
        }
        let surface = InMemorySurface::new(config);
        self.surfaces.lock().unwrap().push(surface.handle());
        Ok(Box::new(surface))
    }

    async fn geocode(&self, request: &GeocodeRequest) -> Result<Vec<GeocodeResult>> {
        let key = Self::request_key(request);
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.geocode_log.lock().unwrap().push(key.clone());

        let latency = *self.geocode_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(message) = self.failures.lock().unwrap().get(&key) {
            return Err(Error::Geocode {
                status: "SCRIPTED_FAILURE".into(),
                message: message.clone(),
            });
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_and_counters() {
        let provider = FakeMapProvider::new();
        provider.load().await.expect("load");
        provider.script_address(
            "1600 Amphitheatre Parkway",
            vec![FakeMapProvider::result(
                37.422476,
                -122.08425,
                "1600 Amphitheatre Pkwy, Mountain View, CA",
                "Mountain View",
                "California",
            )],
        );

        let results = provider
            .geocode(&GeocodeRequest::Address("1600 Amphitheatre Parkway".into()))
            .await
            .expect("geocode");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].city, "Mountain View");

        let empty = provider
            .geocode(&GeocodeRequest::Address("unscripted".into()))
            .await
            .expect("geocode");
        assert!(empty.is_empty());

        assert_eq!(provider.geocode_calls(), 2);
        assert_eq!(
            provider.geocode_log(),
            vec!["1600 Amphitheatre Parkway".to_string(), "unscripted".to_string()]
        );
    }

    #[tokio::test]
    async fn test_reverse_requests_key_by_fixed6() {
        let provider = FakeMapProvider::new();
        provider.load().await.expect("load");
        provider.script_reverse(
            12.345678,
            98.765432,
            vec![FakeMapProvider::result(
                12.345678, 98.765432, "Somewhere", "Town", "State",
            )],
        );

        let results = provider
            .geocode(&GeocodeRequest::Reverse(LatLng::new(12.345678, 98.765432)))
            .await
            .expect("geocode");
        assert_eq!(results[0].formatted_address, "Somewhere");
        assert_eq!(provider.geocode_log(), vec!["12.345678,98.765432".to_string()]);
    }
}
