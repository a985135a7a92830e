//! Film catalog - the in-memory list of media entries and its freshness metadata.
//!
//! The catalog is owned by a [`CatalogContext`] created at process start and
//! handed to the update orchestrator, which is the only writer while an update
//! cycle is in flight.

mod codec;
mod detect;
mod merge;
mod store;
mod types;

pub use codec::{encode_catalog, parse_catalog, write_catalog, ParseOptions, ParseStats};
pub use detect::mark_new;
pub use merge::{merge, MatchStrategy, MergeStats};
pub use store::{CatalogStore, JsonFileStore, StoreError};
pub use types::*;

use std::sync::Arc;

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock, RwLockReadGuard};

/// Process-wide holder of the shared catalog.
///
/// Cheaply cloneable; all clones refer to the same catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogContext {
    catalog: Arc<RwLock<Catalog>>,
}

impl CatalogContext {
    /// Create a context holding an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context around an already loaded catalog.
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().await
    }

    /// Read guard that can be moved into a spawned task.
    pub async fn read_owned(&self) -> OwnedRwLockReadGuard<Catalog> {
        Arc::clone(&self.catalog).read_owned().await
    }

    /// Write guard that can be moved into a blocking task.
    pub(crate) async fn write_owned(&self) -> OwnedRwLockWriteGuard<Catalog> {
        Arc::clone(&self.catalog).write_owned().await
    }

    /// Replace the held catalog wholesale.
    pub async fn replace(&self, catalog: Catalog) {
        *self.catalog.write().await = catalog;
    }

    /// Clone of the current catalog.
    pub async fn snapshot(&self) -> Catalog {
        self.catalog.read().await.clone()
    }

    /// Summary of the current catalog.
    pub async fn summary(&self) -> CatalogSummary {
        let catalog = self.catalog.read().await;
        CatalogSummary {
            id: catalog.meta.id.clone(),
            generated_at: catalog.meta.generated_at,
            entries: catalog.len(),
            new_entries: catalog.count_new(),
            had_updates: catalog.had_updates,
        }
    }
}

/// Catalog statistics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CatalogSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub entries: usize,
    pub new_entries: usize,
    pub had_updates: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_context_clones_share_catalog() {
        let context = CatalogContext::new();
        let other = context.clone();

        context
            .replace(Catalog::with_entries(
                CatalogMeta::default(),
                vec![CatalogEntry::new("ARD", "t", "a", "u1")],
            ))
            .await;

        assert_eq!(other.read().await.len(), 1);
        let summary = other.summary().await;
        assert_eq!(summary.entries, 1);
        assert_eq!(summary.new_entries, 0);
    }

    #[tokio::test]
    async fn test_summary_skips_unknown_generation_date() {
        let summary = CatalogContext::new().summary().await;
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("generated_at"));
    }
}
