//! location-picker: interactive location-resolution map component.
//!
//! Single-binary Tokio application that:
//! 1. Loads the geocoding provider (Google, or a scripted offline fake)
//! 2. Mounts a picker bound to an in-memory map surface
//! 3. Drives it from initial props and an interactive command loop
//! 4. Prints every location selection a click produces

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use common::{GeocodeRequest, MapProvider, PickerConfig, SurfaceContainer};
use google_maps_client::GoogleMapsProvider;
use picker::{
    FakeMapProvider, GeocodeCache, Lifecycle, LocationPicker, PickerHandle, PickerProps,
    SdkLoader, SelectCallback,
};

const KEY_CHECK_ADDRESS: &str = "1600 Amphitheatre Parkway, Mountain View, CA";

/// Interactive location-resolution map component
#[derive(Parser)]
#[command(name = "location-picker", about = "Interactive location-resolution map component")]
struct Cli {
    /// Verify the configured geocoding key with one real request, then exit.
    #[arg(long)]
    check_key: bool,

    /// Use a scripted offline provider instead of the Google Geocoding API.
    #[arg(long)]
    offline: bool,

    /// Initial address prop.
    #[arg(long)]
    address: Option<String>,

    /// Initial "lat,lng" prop (wins over --address).
    #[arg(long)]
    coordinates: Option<String>,
}

fn offline_provider() -> FakeMapProvider {
    let provider = FakeMapProvider::new();
    provider.set_geocode_latency(Duration::from_millis(150));
    provider.script_address(
        KEY_CHECK_ADDRESS,
        vec![FakeMapProvider::result(
            37.422476,
            -122.08425,
            "1600 Amphitheatre Pkwy, Mountain View, CA 94043, USA",
            "Mountain View",
            "California",
        )],
    );
    provider.script_address(
        "10 Downing Street, London",
        vec![FakeMapProvider::result(
            51.503363,
            -0.127625,
            "10 Downing St, London SW1A 2AA, UK",
            "London",
            "England",
        )],
    );
    provider.script_reverse(
        28.613939,
        77.209023,
        vec![FakeMapProvider::result(
            28.613939,
            77.209023,
            "Connaught Place, New Delhi, Delhi, India",
            "New Delhi",
            "Delhi",
        )],
    );
    provider
}

fn make_cache(cfg: &PickerConfig) -> Arc<GeocodeCache> {
    let ttl = if cfg.cache.ttl_secs == 0 {
        None
    } else {
        Some(Duration::from_secs(cfg.cache.ttl_secs))
    };
    Arc::new(GeocodeCache::new(cfg.cache.capacity, ttl))
}

async fn run_key_check(provider: &dyn MapProvider, loader: &SdkLoader) -> Result<()> {
    loader.ensure_loaded().await?;
    let results = provider
        .geocode(&GeocodeRequest::Address(KEY_CHECK_ADDRESS.into()))
        .await?;
    match results.first() {
        Some(result) => info!(
            "✅ Key OK — '{}' resolved to {}",
            KEY_CHECK_ADDRESS,
            result.position.to_fixed6()
        ),
        None => info!("✅ Key accepted (zero results for the probe address)"),
    }
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  address <text>     geocode an address");
    println!("  coords <lat,lng>   reverse-geocode a coordinate pair");
    println!("  click <lat> <lng>  inject a map click");
    println!("  retry              re-attempt initialization after an error");
    println!("  state              print lifecycle and surface state");
    println!("  quit               unmount and exit");
}

/// Returns false when the loop should exit.
fn handle_command(handle: &PickerHandle, line: &str) -> bool {
    let mut parts = line.splitn(2, ' ');
    let command = parts.next().unwrap_or("");
    let rest = parts.next().map(str::trim);

    match (command, rest) {
        ("quit", _) | ("exit", _) => return false,
        ("address", Some(text)) if !text.is_empty() => handle.set_address(text),
        ("coords", Some(text)) if !text.is_empty() => handle.set_coordinates(text),
        ("click", Some(text)) => {
            let mut nums = text.split_whitespace();
            let parsed = match (nums.next(), nums.next()) {
                (Some(lat), Some(lng)) => lat.parse::<f64>().ok().zip(lng.parse::<f64>().ok()),
                _ => None,
            };
            match (parsed, handle.surface()) {
                (Some((lat, lng)), Some(surface)) => {
                    if !surface.click(lat, lng) {
                        warn!("Click was not delivered (no listener attached)");
                    }
                }
                (None, _) => warn!("Usage: click <lat> <lng>"),
                (_, None) => warn!("Map surface not ready yet"),
            }
        }
        ("retry", _) => handle.retry(),
        ("state", _) => {
            info!("Lifecycle: {:?}", handle.current_state());
            match handle.surface() {
                Some(surface) => info!("Surface: {:?}", surface.snapshot()),
                None => info!("Surface: not initialized"),
            }
        }
        ("", None) => {}
        _ => print_help(),
    }
    true
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "location_picker=info,picker=info,google_maps_client=info,common=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    info!("🗺️  Location picker starting up...");

    // Load configuration.
    let cfg = match config::load_config(!cli.offline) {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let provider: Arc<dyn MapProvider> = if cli.offline {
        info!("Provider: offline fake (scripted responses)");
        Arc::new(offline_provider())
    } else {
        info!(
            "Provider: Google Geocoding API ({} req/s, {}s timeout)",
            cfg.http.requests_per_sec, cfg.http.timeout_secs
        );
        Arc::new(GoogleMapsProvider::new(
            cfg.google_maps_api_key.clone(),
            cfg.http.clone(),
        ))
    };
    let loader = Arc::new(SdkLoader::new(Arc::clone(&provider)));
    let cache = make_cache(&cfg);

    info!(
        "Resolver: debounce={}ms, min_query_len={}; cache: capacity={}, ttl={}s",
        cfg.resolver.debounce_ms,
        cfg.resolver.min_query_len,
        cfg.cache.capacity,
        cfg.cache.ttl_secs,
    );

    // ── Check-key mode ───────────────────────────────────────────────
    if cli.check_key {
        info!("Running key check...");
        if let Err(e) = run_key_check(provider.as_ref(), &loader).await {
            error!("❌ Key check failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // ── Mount the picker ─────────────────────────────────────────────
    let on_select: SelectCallback = Arc::new(|selection| {
        info!(
            "📍 Selected {} — address='{}' city='{}' state='{}'",
            selection.coordinates, selection.address, selection.city, selection.state
        );
    });

    let handle = LocationPicker::mount(
        Arc::clone(&provider),
        loader,
        cache,
        &cfg,
        SurfaceContainer::new("demo-map"),
        PickerProps {
            address: cli.address,
            coordinates: cli.coordinates,
            height: None,
        },
        Some(on_select),
    );

    let mut lifecycle = handle.lifecycle();
    tokio::spawn(async move {
        while lifecycle.changed().await.is_ok() {
            info!("Lifecycle: {:?}", *lifecycle.borrow());
        }
    });

    match handle.wait_settled().await {
        Lifecycle::Ready => {}
        state => warn!("Picker settled in {:?} — type `retry` to re-attempt", state),
    }

    // ── Interactive command loop ─────────────────────────────────────
    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !handle_command(&handle, line.trim()) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    handle.unmount().await;
    info!("Picker unmounted; bye");
}
