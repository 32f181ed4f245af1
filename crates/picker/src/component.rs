//! The mounted location picker.
//!
//! One actor task per mount owns the lifecycle state machine, the map
//! controller, prop handling, and the click flow. Host-facing surface:
//! a command handle, a lifecycle watch channel, and the `on_location_select`
//! callback (invoked only for user clicks, never for prop-driven geocoding).

use std::sync::Arc;
use std::time::Duration;

use common::{
    LatLng, LocationSelection, MapConfig, MapProvider, PickerConfig, QueryOrigin, SurfaceContainer,
    SurfaceHandle,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cache::GeocodeCache;
use crate::controller::MapController;
use crate::loader::SdkLoader;
use crate::resolver::{
    spawn_resolver, QueryDisposition, ResolverHandle, ResolverOutcome, ResolverSettings,
};

/// Component lifecycle, exposed to the host through a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    Uninitialized,
    Loading,
    Ready,
    Error(String),
}

/// Host-supplied props.
#[derive(Debug, Clone, Default)]
pub struct PickerProps {
    pub address: Option<String>,
    /// `"lat,lng"`. Wins over `address` when both are set.
    pub coordinates: Option<String>,
    pub height: Option<String>,
}

/// Callback invoked on every user click.
pub type SelectCallback = Arc<dyn Fn(LocationSelection) + Send + Sync>;

enum Command {
    SetAddress(String),
    SetCoordinates(String),
    Retry,
    Unmount(oneshot::Sender<()>),
}

enum Internal {
    InitComplete(Result<(), String>),
}

/// Handle to a mounted picker.
pub struct PickerHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    lifecycle_rx: watch::Receiver<Lifecycle>,
    surface_rx: watch::Receiver<Option<SurfaceHandle>>,
    task: tokio::task::JoinHandle<()>,
}

impl PickerHandle {
    pub fn set_address(&self, address: impl Into<String>) {
        let _ = self.cmd_tx.send(Command::SetAddress(address.into()));
    }

    pub fn set_coordinates(&self, coordinates: impl Into<String>) {
        let _ = self.cmd_tx.send(Command::SetCoordinates(coordinates.into()));
    }

    /// Re-attempt initialization after a failure. Ignored unless the picker
    /// is in the `Error` state.
    pub fn retry(&self) {
        let _ = self.cmd_tx.send(Command::Retry);
    }

    pub fn lifecycle(&self) -> watch::Receiver<Lifecycle> {
        self.lifecycle_rx.clone()
    }

    pub fn current_state(&self) -> Lifecycle {
        self.lifecycle_rx.borrow().clone()
    }

    /// The surface handle, once initialization has succeeded.
    pub fn surface(&self) -> Option<SurfaceHandle> {
        self.surface_rx.borrow().clone()
    }

    /// Wait until the picker settles as `Ready` or `Error`.
    pub async fn wait_settled(&self) -> Lifecycle {
        let mut rx = self.lifecycle_rx.clone();
        let settled = match rx
            .wait_for(|state| matches!(state, Lifecycle::Ready | Lifecycle::Error(_)))
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => self.current_state(),
        };
        settled
    }

    /// Tear the picker down. After this returns, no further mutation of the
    /// map, marker, or cache happens on behalf of this instance.
    pub async fn unmount(self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Unmount(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
        let _ = self.task.await;
    }
}

/// The picker actor. Constructed through [`LocationPicker::mount`].
pub struct LocationPicker {
    provider: Arc<dyn MapProvider>,
    loader: Arc<SdkLoader>,
    container: SurfaceContainer,
    map_config: MapConfig,
    retry_delay: Duration,
    on_location_select: Option<SelectCallback>,

    lifecycle_tx: watch::Sender<Lifecycle>,
    surface_tx: watch::Sender<Option<SurfaceHandle>>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    click_tx: mpsc::UnboundedSender<LatLng>,

    controller: MapController,
    resolver: Option<ResolverHandle>,
    pending_address: Option<String>,
    pending_coordinates: Option<String>,
    /// Coordinate query of a click refinement that has not settled yet.
    /// Clicks are ignored while this is set.
    pending_click: Option<String>,
}

impl LocationPicker {
    /// Mount a picker. Initialization starts immediately; observe progress
    /// on the handle's lifecycle channel.
    pub fn mount(
        provider: Arc<dyn MapProvider>,
        loader: Arc<SdkLoader>,
        cache: Arc<GeocodeCache>,
        config: &PickerConfig,
        mut container: SurfaceContainer,
        props: PickerProps,
        on_location_select: Option<SelectCallback>,
    ) -> PickerHandle {
        if props.height.is_some() {
            container.height = props.height.clone();
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (click_tx, click_rx) = mpsc::unbounded_channel();
        let (lifecycle_tx, lifecycle_rx) = watch::channel(Lifecycle::Uninitialized);
        let (surface_tx, surface_rx) = watch::channel(None);

        let settings = ResolverSettings {
            debounce: Duration::from_millis(config.resolver.debounce_ms),
            min_query_len: config.resolver.min_query_len,
        };
        let (resolver, outcome_rx) = spawn_resolver(Arc::clone(&provider), cache, settings);

        let picker = Self {
            provider,
            loader,
            container,
            map_config: config.map.clone(),
            retry_delay: Duration::from_millis(config.lifecycle.retry_delay_ms),
            on_location_select,
            lifecycle_tx,
            surface_tx,
            internal_tx,
            click_tx,
            controller: MapController::new(),
            resolver: Some(resolver),
            pending_address: props.address,
            pending_coordinates: props.coordinates,
            pending_click: None,
        };

        let task = tokio::spawn(picker.run(cmd_rx, internal_rx, click_rx, outcome_rx));

        PickerHandle {
            cmd_tx,
            lifecycle_rx,
            surface_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut internal_rx: mpsc::UnboundedReceiver<Internal>,
        mut click_rx: mpsc::UnboundedReceiver<LatLng>,
        mut outcome_rx: mpsc::UnboundedReceiver<ResolverOutcome>,
    ) {
        self.begin_init(Duration::ZERO);

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::SetAddress(address)) => self.on_address_prop(address),
                    Some(Command::SetCoordinates(coordinates)) => {
                        self.on_coordinates_prop(coordinates)
                    }
                    Some(Command::Retry) => self.on_retry(),
                    Some(Command::Unmount(ack)) => {
                        self.teardown().await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        self.teardown().await;
                        break;
                    }
                },
                Some(internal) = internal_rx.recv() => match internal {
                    Internal::InitComplete(result) => self.on_init_complete(result),
                },
                Some(position) = click_rx.recv() => self.on_click(position),
                Some(outcome) = outcome_rx.recv() => self.on_outcome(outcome),
            }
        }
    }

    fn is_ready(&self) -> bool {
        *self.lifecycle_tx.borrow() == Lifecycle::Ready
    }

    fn begin_init(&mut self, delay: Duration) {
        self.lifecycle_tx.send_replace(Lifecycle::Loading);
        let loader = Arc::clone(&self.loader);
        let internal_tx = self.internal_tx.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                sleep(delay).await;
            }
            let result = loader.ensure_loaded().await.map_err(|e| e.to_string());
            let _ = internal_tx.send(Internal::InitComplete(result));
        });
    }

    fn on_init_complete(&mut self, result: Result<(), String>) {
        if let Err(reason) = result {
            warn!("Picker initialization failed: {}", reason);
            self.lifecycle_tx.send_replace(Lifecycle::Error(reason));
            return;
        }

        match self.controller.initialize(
            self.provider.as_ref(),
            &self.container,
            &self.map_config,
        ) {
            Ok(handle) => {
                self.controller.attach_click_listener(self.click_tx.clone());
                self.surface_tx.send_replace(Some(handle));
                self.lifecycle_tx.send_replace(Lifecycle::Ready);
                info!("Picker ready (container '{}')", self.container.id);
                self.apply_pending_props();
            }
            Err(e) => {
                warn!("Map construction failed: {}", e);
                self.lifecycle_tx.send_replace(Lifecycle::Error(e.to_string()));
            }
        }
    }

    fn on_retry(&mut self) {
        if !matches!(*self.lifecycle_tx.borrow(), Lifecycle::Error(_)) {
            return;
        }
        info!("Retrying picker initialization");
        self.begin_init(self.retry_delay);
    }

    fn on_address_prop(&mut self, address: String) {
        if self.is_ready() {
            self.submit_prop_query(address, QueryOrigin::Address);
        } else {
            self.pending_address = Some(address);
        }
    }

    fn on_coordinates_prop(&mut self, coordinates: String) {
        if self.is_ready() {
            self.submit_prop_query(coordinates, QueryOrigin::Coordinates);
        } else {
            self.pending_coordinates = Some(coordinates);
        }
    }

    /// Explicit geometry beats free text when both props were observed
    /// before the picker became ready.
    fn apply_pending_props(&mut self) {
        if let Some(coordinates) = self.pending_coordinates.take() {
            self.pending_address = None;
            self.submit_prop_query(coordinates, QueryOrigin::Coordinates);
        } else if let Some(address) = self.pending_address.take() {
            self.submit_prop_query(address, QueryOrigin::Address);
        }
    }

    fn submit_prop_query(&mut self, query: String, origin: QueryOrigin) {
        // Newer input supersedes an unsettled click refinement.
        self.pending_click = None;
        if let Some(resolver) = &self.resolver {
            resolver.submit(query, origin);
        }
    }

    fn on_click(&mut self, position: LatLng) {
        if !self.is_ready() {
            return;
        }
        if self.pending_click.is_some() {
            debug!("Ignoring click while a refinement is pending");
            return;
        }

        self.controller.place_click_marker(position);

        let selection = LocationSelection::from_click(position.lat, position.lng);
        let query = selection.coordinates.clone();
        if let Some(callback) = &self.on_location_select {
            callback(selection);
        }

        self.pending_click = Some(query.clone());
        if let Some(resolver) = &self.resolver {
            resolver.submit(query, QueryOrigin::Coordinates);
        }
    }

    fn on_outcome(&mut self, outcome: ResolverOutcome) {
        if outcome.origin == QueryOrigin::Coordinates
            && self.pending_click.as_deref() == Some(outcome.query.as_str())
        {
            self.pending_click = None;
        }

        match outcome.disposition {
            QueryDisposition::Applied => {
                if let Some(result) = outcome.result {
                    let title = if result.formatted_address.is_empty() {
                        outcome.query.as_str()
                    } else {
                        result.formatted_address.as_str()
                    };
                    self.controller
                        .set_position(result.position, outcome.origin.zoom(), title);
                }
            }
            other => {
                debug!("Query '{}' settled without applying: {:?}", outcome.query, other);
            }
        }
    }

    async fn teardown(&mut self) {
        if let Some(resolver) = self.resolver.take() {
            resolver.shutdown().await;
        }
        self.controller.cleanup();
        debug!("Picker unmounted");
    }
}
