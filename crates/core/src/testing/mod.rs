//! Testing utilities and mock implementations.
//!
//! This module provides in-memory implementations of the collaborator traits
//! of the update orchestrator, allowing update cycles to be exercised without
//! network or filesystem.
//!
//! # Example
//!
//! ```rust,ignore
//! use filmlist_core::testing::{fixtures, MemoryCatalogStore, MockCatalogFetcher, MockFreshnessProbe};
//!
//! let fetcher = MockCatalogFetcher::new();
//! fetcher.set_catalog(fixtures::catalog(100)).await;
//!
//! let probe = MockFreshnessProbe::with_id("abc");
//! let store = MemoryCatalogStore::new();
//!
//! // Use in UpdateOrchestrator::new(...)
//! ```

mod memory_store;
mod mock_fetcher;
mod mock_probe;
mod recording_listener;

pub use memory_store::MemoryCatalogStore;
pub use mock_fetcher::MockCatalogFetcher;
pub use mock_probe::MockFreshnessProbe;
pub use recording_listener::RecordingListener;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Duration, Utc};

    use crate::catalog::{Catalog, CatalogEntry, CatalogMeta};

    const CHANNELS: [&str; 4] = ["ARD", "ZDF", "3Sat", "ARTE.DE"];

    /// URL of the `n`th fixture entry.
    pub fn url(n: usize) -> String {
        format!("https://media.example/video/{}.mp4", n)
    }

    /// Create a test entry with reasonable defaults.
    pub fn entry(n: usize) -> CatalogEntry {
        // 2026-10-01T20:00:00Z
        let base = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_790_884_800);
        let mut entry = CatalogEntry::new(
            CHANNELS[n % CHANNELS.len()],
            format!("Topic {}", n / 10),
            format!("Episode {}", n),
            url(n),
        );
        entry.description = format!("Description of episode {}", n);
        entry.duration_secs = 1800;
        entry.size_mb = 450;
        entry.airdate = Some(base + Duration::minutes(n as i64));
        entry
    }

    /// Create a sorted catalog of `count` fixture entries, generated now.
    pub fn catalog(count: usize) -> Catalog {
        catalog_with_entries("fixture", Some(Utc::now()), (0..count).map(entry).collect())
    }

    /// Create a sorted catalog from explicit entries.
    pub fn catalog_with_entries(
        id: &str,
        generated_at: Option<DateTime<Utc>>,
        entries: Vec<CatalogEntry>,
    ) -> Catalog {
        let mut catalog = Catalog::with_entries(
            CatalogMeta {
                generated_at,
                id: id.to_string(),
                version: "3".to_string(),
            },
            entries,
        );
        catalog.sort();
        catalog
    }
}
