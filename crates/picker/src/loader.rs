//! One-time SDK loading.
//!
//! The loader wraps the provider's heavy `load()` so that across every
//! mounted picker it runs at most once at a time and at most once overall
//! on the success path. Failure is the only thing that resets it — the next
//! `ensure_loaded` re-attempts.

use std::sync::Arc;

use common::{MapProvider, Result};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

/// Observable SDK load lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

/// Serializes and memoizes provider loading.
pub struct SdkLoader {
    provider: Arc<dyn MapProvider>,
    state_tx: watch::Sender<LoadState>,
    // Serializes concurrent ensure_loaded calls; waiters see the outcome of
    // the attempt they waited on.
    gate: Mutex<()>,
}

impl SdkLoader {
    pub fn new(provider: Arc<dyn MapProvider>) -> Self {
        let (state_tx, _) = watch::channel(LoadState::Unloaded);
        Self {
            provider,
            state_tx,
            gate: Mutex::new(()),
        }
    }

    /// Load the provider if it is not loaded yet. Concurrent callers wait
    /// for the in-flight attempt instead of starting a second one; each
    /// caller that observes a failure gets that failure back.
    pub async fn ensure_loaded(&self) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        let _guard = self.gate.lock().await;
        // A concurrent attempt may have finished while we waited.
        if self.is_ready() {
            return Ok(());
        }

        debug!("Loading mapping SDK");
        self.state_tx.send_replace(LoadState::Loading);

        match self.provider.load().await {
            Ok(()) => {
                self.state_tx.send_replace(LoadState::Ready);
                Ok(())
            }
            Err(e) => {
                warn!("SDK load failed: {}", e);
                self.state_tx.send_replace(LoadState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.state_tx.borrow() == LoadState::Ready
    }

    /// Observe load-state transitions without polling.
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeMapProvider;
    use common::Error;

    #[tokio::test]
    async fn test_load_happens_once() {
        let provider = Arc::new(FakeMapProvider::new());
        let loader = SdkLoader::new(provider.clone());

        loader.ensure_loaded().await.expect("first load");
        loader.ensure_loaded().await.expect("second load");
        loader.ensure_loaded().await.expect("third load");

        assert_eq!(provider.load_calls(), 1);
        assert!(loader.is_ready());
        assert_eq!(*loader.subscribe().borrow(), LoadState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_attempt() {
        let provider = Arc::new(FakeMapProvider::new());
        provider.set_load_latency(std::time::Duration::from_millis(20));
        let loader = Arc::new(SdkLoader::new(provider.clone()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let loader = loader.clone();
            handles.push(tokio::spawn(async move { loader.ensure_loaded().await }));
        }
        for handle in handles {
            handle.await.expect("join").expect("load");
        }

        assert_eq!(provider.load_calls(), 1);
    }

    #[tokio::test]
    async fn test_failure_resets_and_reattempts() {
        let provider = Arc::new(FakeMapProvider::new());
        provider.fail_next_loads(1);
        let loader = SdkLoader::new(provider.clone());

        let err = loader.ensure_loaded().await.expect_err("should fail");
        assert!(matches!(err, Error::ScriptLoad(_)));
        assert!(matches!(*loader.subscribe().borrow(), LoadState::Failed(_)));
        assert!(!loader.is_ready());

        loader.ensure_loaded().await.expect("retry should succeed");
        assert!(loader.is_ready());
        assert_eq!(provider.load_calls(), 2);
    }
}
