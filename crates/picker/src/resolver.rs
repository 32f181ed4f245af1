//! Debounced, cache-aware geocode resolution.
//!
//! One resolver task per mounted picker. It owns the quiescence timer, the
//! generation counter, the in-flight flag, and the parked query:
//!
//! 1. Queries shorter than `min_query_len` are complete no-ops
//! 2. A cache hit applies immediately — no delay, no network
//! 3. A cache miss dispatches after the debounce window; a newer query
//!    re-arms the window so only the last of a burst is sent
//! 4. At most one provider call is in flight; a query becoming due
//!    mid-flight parks (superseding any previously parked query) and
//!    dispatches when the in-flight call settles
//! 5. Completions apply only while their generation is still the newest —
//!    stale results are cached but never applied

use std::sync::Arc;

use common::{parse_lat_lng, GeocodeRequest, GeocodeResult, MapProvider, QueryOrigin};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, warn};

use crate::cache::GeocodeCache;

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Quiescence window before a cache miss dispatches.
    pub debounce: Duration,
    /// Queries shorter than this are dropped without any effect.
    pub min_query_len: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            min_query_len: 5,
        }
    }
}

/// How a settled query ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryDisposition {
    /// Resolved and safe to apply to the map.
    Applied,
    /// Resolved after a newer query superseded it; cached, never applied.
    Stale,
    /// Provider returned zero results.
    Empty,
    /// Provider call failed, or the coordinate string would not parse.
    Failed(String),
    /// Replaced while parked behind an in-flight call; never dispatched.
    Superseded,
}

/// A settled query, reported to the resolver's owner.
#[derive(Debug, Clone)]
pub struct ResolverOutcome {
    pub query: String,
    pub origin: QueryOrigin,
    pub disposition: QueryDisposition,
    pub result: Option<GeocodeResult>,
}

enum Command {
    Submit { query: String, origin: QueryOrigin },
    Shutdown,
}

struct Scheduled {
    query: String,
    origin: QueryOrigin,
    generation: u64,
}

struct Completion {
    query: String,
    origin: QueryOrigin,
    generation: u64,
    outcome: common::Result<Vec<GeocodeResult>>,
}

/// Handle to a running resolver task.
pub struct ResolverHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    task: tokio::task::JoinHandle<()>,
}

impl ResolverHandle {
    pub fn submit(&self, query: impl Into<String>, origin: QueryOrigin) {
        let _ = self.cmd_tx.send(Command::Submit {
            query: query.into(),
            origin,
        });
    }

    /// Stop the resolver. Cancels any scheduled dispatch; an in-flight
    /// provider call keeps running but its completion has nowhere to land.
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        let _ = self.task.await;
    }
}

/// Spawn a resolver task. Settled queries arrive on the returned receiver.
pub fn spawn_resolver(
    provider: Arc<dyn MapProvider>,
    cache: Arc<GeocodeCache>,
    settings: ResolverSettings,
) -> (ResolverHandle, mpsc::UnboundedReceiver<ResolverOutcome>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = mpsc::unbounded_channel();

    let resolver = Resolver {
        provider,
        cache,
        settings,
        outcome_tx,
        done_tx,
        generation: 0,
        pending: None,
        in_flight: false,
        parked: None,
    };
    let task = tokio::spawn(resolver.run(cmd_rx, done_rx));

    (ResolverHandle { cmd_tx, task }, outcome_rx)
}

struct Resolver {
    provider: Arc<dyn MapProvider>,
    cache: Arc<GeocodeCache>,
    settings: ResolverSettings,
    outcome_tx: mpsc::UnboundedSender<ResolverOutcome>,
    done_tx: mpsc::UnboundedSender<Completion>,
    generation: u64,
    pending: Option<(Scheduled, Instant)>,
    in_flight: bool,
    parked: Option<Scheduled>,
}

impl Resolver {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut done_rx: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            let deadline = self.pending.as_ref().map(|(_, deadline)| *deadline);
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Submit { query, origin }) => self.accept(query, origin),
                    Some(Command::Shutdown) | None => break,
                },
                Some(done) = done_rx.recv() => self.on_completion(done),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_due();
                }
            }
        }
    }

    fn accept(&mut self, query: String, origin: QueryOrigin) {
        if query.chars().count() < self.settings.min_query_len {
            debug!("Ignoring short query '{}'", query);
            return;
        }

        self.generation += 1;
        let generation = self.generation;

        if let Some(result) = self.cache.get(&query) {
            debug!("Cache hit for '{}'", query);
            self.pending = None;
            if let Some(parked) = self.parked.take() {
                self.report(parked.query, parked.origin, QueryDisposition::Superseded, None);
            }
            self.report(query, origin, QueryDisposition::Applied, Some(result));
            return;
        }

        let deadline = Instant::now() + self.settings.debounce;
        self.pending = Some((
            Scheduled {
                query,
                origin,
                generation,
            },
            deadline,
        ));
    }

    fn on_due(&mut self) {
        let Some((scheduled, _)) = self.pending.take() else {
            return;
        };
        if self.in_flight {
            if let Some(old) = self.parked.replace(scheduled) {
                self.report(old.query, old.origin, QueryDisposition::Superseded, None);
            }
            return;
        }
        self.dispatch(scheduled);
    }

    fn dispatch(&mut self, scheduled: Scheduled) {
        let request = match scheduled.origin {
            QueryOrigin::Address => GeocodeRequest::Address(scheduled.query.clone()),
            QueryOrigin::Coordinates => match parse_lat_lng(&scheduled.query) {
                Some(position) => GeocodeRequest::Reverse(position),
                None => {
                    warn!("Unparseable coordinate query '{}'", scheduled.query);
                    self.report(
                        scheduled.query,
                        scheduled.origin,
                        QueryDisposition::Failed("invalid coordinate string".into()),
                        None,
                    );
                    return;
                }
            },
        };

        self.in_flight = true;
        let provider = Arc::clone(&self.provider);
        let done_tx = self.done_tx.clone();
        tokio::spawn(async move {
            let outcome = provider.geocode(&request).await;
            let _ = done_tx.send(Completion {
                query: scheduled.query,
                origin: scheduled.origin,
                generation: scheduled.generation,
                outcome,
            });
        });
    }

    fn on_completion(&mut self, done: Completion) {
        self.in_flight = false;

        match done.outcome {
            Ok(results) => match results.into_iter().next() {
                Some(result) => {
                    self.cache.insert(done.query.clone(), result.clone());
                    let disposition = if done.generation == self.generation {
                        QueryDisposition::Applied
                    } else {
                        QueryDisposition::Stale
                    };
                    self.report(done.query, done.origin, disposition, Some(result));
                }
                None => {
                    debug!("Zero results for '{}'", done.query);
                    self.report(done.query, done.origin, QueryDisposition::Empty, None);
                }
            },
            Err(e) => {
                warn!("Geocode failed for '{}': {}", done.query, e);
                self.report(
                    done.query,
                    done.origin,
                    QueryDisposition::Failed(e.to_string()),
                    None,
                );
            }
        }

        if let Some(parked) = self.parked.take() {
            self.dispatch(parked);
        }
    }

    fn report(
        &self,
        query: String,
        origin: QueryOrigin,
        disposition: QueryDisposition,
        result: Option<GeocodeResult>,
    ) {
        let _ = self.outcome_tx.send(ResolverOutcome {
            query,
            origin,
            disposition,
            result,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeMapProvider;
    use common::LatLng;

    fn make_resolver(
        provider: &Arc<FakeMapProvider>,
        cache: &Arc<GeocodeCache>,
        debounce_ms: u64,
    ) -> (ResolverHandle, mpsc::UnboundedReceiver<ResolverOutcome>) {
        spawn_resolver(
            provider.clone() as Arc<dyn MapProvider>,
            cache.clone(),
            ResolverSettings {
                debounce: Duration::from_millis(debounce_ms),
                min_query_len: 5,
            },
        )
    }

    async fn loaded_provider() -> Arc<FakeMapProvider> {
        let provider = Arc::new(FakeMapProvider::new());
        provider.load().await.expect("load");
        provider
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_dispatches_only_last_query() {
        let provider = loaded_provider().await;
        provider.script_reverse(
            10.0,
            10.2,
            vec![FakeMapProvider::result(10.0, 10.2, "last", "", "")],
        );
        let cache = Arc::new(GeocodeCache::new(16, None));
        let (handle, mut outcomes) = make_resolver(&provider, &cache, 500);

        handle.submit("10.0,10.0", QueryOrigin::Coordinates);
        handle.submit("10.0,10.1", QueryOrigin::Coordinates);
        handle.submit("10.0,10.2", QueryOrigin::Coordinates);

        let outcome = outcomes.recv().await.expect("outcome");
        assert_eq!(outcome.query, "10.0,10.2");
        assert_eq!(outcome.disposition, QueryDisposition::Applied);

        assert_eq!(provider.geocode_calls(), 1);
        assert_eq!(provider.geocode_log(), vec!["10.000000,10.200000".to_string()]);
        assert!(cache.contains("10.0,10.2"));
        assert!(!cache.contains("10.0,10.0"));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_is_a_complete_noop() {
        let provider = loaded_provider().await;
        let cache = Arc::new(GeocodeCache::new(16, None));
        let (handle, mut outcomes) = make_resolver(&provider, &cache, 50);

        handle.submit("abc", QueryOrigin::Address);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(provider.geocode_calls(), 0);
        assert!(cache.is_empty());
        assert!(outcomes.try_recv().is_err());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_debounce_and_network() {
        let provider = loaded_provider().await;
        let cache = Arc::new(GeocodeCache::new(16, None));
        cache.insert(
            "1600 Amphitheatre Parkway".into(),
            FakeMapProvider::result(37.422476, -122.08425, "Googleplex", "Mountain View", "CA"),
        );
        let (handle, mut outcomes) = make_resolver(&provider, &cache, 500);

        let before = Instant::now();
        handle.submit("1600 Amphitheatre Parkway", QueryOrigin::Address);
        let outcome = outcomes.recv().await.expect("outcome");

        assert_eq!(outcome.disposition, QueryDisposition::Applied);
        assert_eq!(outcome.result.expect("result").city, "Mountain View");
        assert_eq!(provider.geocode_calls(), 0);
        // Applied without waiting out the debounce window.
        assert!(before.elapsed() < Duration::from_millis(500));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_parks_latest_and_supersedes_older() {
        let provider = loaded_provider().await;
        provider.set_geocode_latency(Duration::from_millis(2000));
        provider.script_address("query one", vec![FakeMapProvider::result(1.0, 1.0, "one", "", "")]);
        provider.script_address(
            "query three",
            vec![FakeMapProvider::result(3.0, 3.0, "three", "", "")],
        );
        let cache = Arc::new(GeocodeCache::new(16, None));
        let (handle, mut outcomes) = make_resolver(&provider, &cache, 100);

        handle.submit("query one", QueryOrigin::Address);
        tokio::time::sleep(Duration::from_millis(150)).await; // one is now in flight

        handle.submit("query two", QueryOrigin::Address);
        tokio::time::sleep(Duration::from_millis(150)).await; // two parks

        handle.submit("query three", QueryOrigin::Address);
        tokio::time::sleep(Duration::from_millis(150)).await; // three replaces two

        let superseded = outcomes.recv().await.expect("outcome");
        assert_eq!(superseded.query, "query two");
        assert_eq!(superseded.disposition, QueryDisposition::Superseded);

        // One settles after three was accepted, so it is cached but stale.
        let stale = outcomes.recv().await.expect("outcome");
        assert_eq!(stale.query, "query one");
        assert_eq!(stale.disposition, QueryDisposition::Stale);
        assert!(cache.contains("query one"));

        // The parked query dispatches once the in-flight call settles.
        let applied = outcomes.recv().await.expect("outcome");
        assert_eq!(applied.query, "query three");
        assert_eq!(applied.disposition, QueryDisposition::Applied);

        assert_eq!(provider.geocode_calls(), 2);
        assert_eq!(
            provider.geocode_log(),
            vec!["query one".to_string(), "query three".to_string()]
        );

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_coordinate_query_fails_without_network() {
        let provider = loaded_provider().await;
        let cache = Arc::new(GeocodeCache::new(16, None));
        let (handle, mut outcomes) = make_resolver(&provider, &cache, 50);

        handle.submit("not a coordinate", QueryOrigin::Coordinates);
        let outcome = outcomes.recv().await.expect("outcome");
        assert!(matches!(outcome.disposition, QueryDisposition::Failed(_)));
        assert_eq!(provider.geocode_calls(), 0);
        assert!(cache.is_empty());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_and_failed_results_write_nothing() {
        let provider = loaded_provider().await;
        provider.fail_query("failing address", "scripted");
        let cache = Arc::new(GeocodeCache::new(16, None));
        let (handle, mut outcomes) = make_resolver(&provider, &cache, 50);

        handle.submit("unscripted address", QueryOrigin::Address);
        let outcome = outcomes.recv().await.expect("outcome");
        assert_eq!(outcome.disposition, QueryDisposition::Empty);

        handle.submit("failing address", QueryOrigin::Address);
        let outcome = outcomes.recv().await.expect("outcome");
        assert!(matches!(outcome.disposition, QueryDisposition::Failed(_)));

        assert!(cache.is_empty());
        assert_eq!(provider.geocode_calls(), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_resolver_shares_cache() {
        let provider = loaded_provider().await;
        provider.script_address(
            "1600 Amphitheatre Parkway",
            vec![FakeMapProvider::result(
                37.422476,
                -122.08425,
                "Googleplex",
                "Mountain View",
                "CA",
            )],
        );
        let cache = Arc::new(GeocodeCache::new(16, None));

        let (first, mut first_outcomes) = make_resolver(&provider, &cache, 50);
        first.submit("1600 Amphitheatre Parkway", QueryOrigin::Address);
        let outcome = first_outcomes.recv().await.expect("outcome");
        assert_eq!(outcome.disposition, QueryDisposition::Applied);
        assert_eq!(provider.geocode_calls(), 1);
        first.shutdown().await;

        let (second, mut second_outcomes) = make_resolver(&provider, &cache, 50);
        second.submit("1600 Amphitheatre Parkway", QueryOrigin::Address);
        let outcome = second_outcomes.recv().await.expect("outcome");
        assert_eq!(outcome.disposition, QueryDisposition::Applied);
        assert_eq!(
            outcome.result.expect("result").position,
            LatLng::new(37.422476, -122.08425)
        );
        assert_eq!(provider.geocode_calls(), 1);
        second.shutdown().await;
    }
}
