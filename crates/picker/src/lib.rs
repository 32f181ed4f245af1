//! Interactive location-resolution subsystem.
//!
//! Binds a host UI surface to an injected mapping provider:
//! 1. Loads the provider SDK exactly once across all mounted pickers
//! 2. Resolves address and coordinate queries with debounce + shared cache
//! 3. Owns the map surface and its single marker
//! 4. Forwards pointer clicks to the host and refines them asynchronously

pub mod cache;
pub mod component;
pub mod controller;
pub mod fake;
pub mod loader;
pub mod resolver;

pub use cache::GeocodeCache;
pub use component::{Lifecycle, LocationPicker, PickerHandle, PickerProps, SelectCallback};
pub use controller::MapController;
pub use fake::FakeMapProvider;
pub use loader::{LoadState, SdkLoader};
pub use resolver::{
    spawn_resolver, QueryDisposition, ResolverHandle, ResolverOutcome, ResolverSettings,
};
