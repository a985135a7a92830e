//! Trait definitions for the fetcher module.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::FetchError;
use super::types::{FetchProgress, FetchRequest, FetchedCatalog};

/// Retrieves and parses one catalog payload.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Fetches and parses the payload named by the request.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchedCatalog, FetchError> {
        let (progress_tx, _) = mpsc::channel(1);
        self.fetch_with_progress(request, progress_tx).await
    }

    /// Fetches with progress reporting.
    ///
    /// If the receiving side is dropped or lags, fetching continues without
    /// progress reporting.
    async fn fetch_with_progress(
        &self,
        request: FetchRequest,
        progress_tx: mpsc::Sender<FetchProgress>,
    ) -> Result<FetchedCatalog, FetchError>;
}
