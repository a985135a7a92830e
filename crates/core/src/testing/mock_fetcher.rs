//! Mock catalog fetcher for testing.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Notify, RwLock};

use crate::catalog::{encode_catalog, Catalog, ParseStats};
use crate::fetcher::{CatalogFetcher, FetchError, FetchProgress, FetchRequest, FetchedCatalog};

/// Mock implementation of the CatalogFetcher trait.
///
/// Provides controllable behavior for testing:
/// - Serve a configured catalog
/// - Fail the next fetch with a given error
/// - Record requests for assertions
/// - Hold fetches in flight until released
///
/// # Example
///
/// ```rust,ignore
/// use filmlist_core::testing::{fixtures, MockCatalogFetcher};
///
/// let fetcher = MockCatalogFetcher::with_catalog(fixtures::catalog(10));
/// fetcher.hold().await;
///
/// // start a cycle on another task, then
/// fetcher.wait_for_fetch().await;
/// fetcher.release().await;
/// ```
pub struct MockCatalogFetcher {
    /// Catalog served by successful fetches.
    catalog: RwLock<Catalog>,
    /// If set, the next fetch will fail with this error.
    next_error: RwLock<Option<FetchError>>,
    /// Recorded requests.
    requests: RwLock<Vec<FetchRequest>>,
    /// `true` while fetches may complete.
    gate: watch::Sender<bool>,
    /// Signalled whenever a fetch starts.
    entered: Notify,
}

impl Default for MockCatalogFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalogFetcher {
    /// Create a fetcher serving an empty catalog.
    pub fn new() -> Self {
        Self::with_catalog(Catalog::new())
    }

    /// Create a fetcher serving `catalog`.
    pub fn with_catalog(catalog: Catalog) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            catalog: RwLock::new(catalog),
            next_error: RwLock::new(None),
            requests: RwLock::new(Vec::new()),
            gate,
            entered: Notify::new(),
        }
    }

    /// Set the catalog served from now on.
    pub async fn set_catalog(&self, catalog: Catalog) {
        *self.catalog.write().await = catalog;
    }

    /// Fail the next fetch with `error`.
    pub async fn fail_next(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get recorded requests.
    pub async fn requests(&self) -> Vec<FetchRequest> {
        self.requests.read().await.clone()
    }

    /// Get number of fetches made.
    pub async fn fetch_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Keep fetches from completing until [`release`](Self::release).
    pub async fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub async fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Wait until a fetch has started.
    pub async fn wait_for_fetch(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl CatalogFetcher for MockCatalogFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_with_progress(
        &self,
        request: FetchRequest,
        progress_tx: mpsc::Sender<FetchProgress>,
    ) -> Result<FetchedCatalog, FetchError> {
        self.requests.write().await.push(request.clone());
        self.entered.notify_one();

        let mut gate = self.gate.subscribe();
        loop {
            if *gate.borrow_and_update() {
                break;
            }
            if gate.changed().await.is_err() {
                break;
            }
        }

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let catalog = self.catalog.read().await.clone();
        let bytes = encode_catalog(&catalog, false)
            .map(|encoded| encoded.len() as u64)
            .unwrap_or_default();
        let _ = progress_tx.try_send(FetchProgress {
            run_id: request.run_id,
            bytes_read: bytes,
            total_bytes: Some(bytes),
        });

        let stats = ParseStats {
            read: catalog.len(),
            kept: catalog.len(),
            ..Default::default()
        };
        Ok(FetchedCatalog {
            catalog,
            stats,
            bytes,
        })
    }
}
