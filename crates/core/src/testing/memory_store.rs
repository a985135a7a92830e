//! In-memory catalog store for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::catalog::{Catalog, CatalogStore, ParseOptions, StoreError};

/// Catalog store keeping the last saved catalog in memory.
///
/// Transient state (`is_new`, `had_updates`) is dropped on save, as it would
/// be by a file-backed store.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    stored: Mutex<Option<Catalog>>,
    fail_loads: AtomicBool,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryCatalogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `catalog`.
    pub fn with_catalog(catalog: Catalog) -> Self {
        let store = Self::new();
        *store.slot() = Some(persisted(&catalog));
        store
    }

    fn slot(&self) -> MutexGuard<'_, Option<Catalog>> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The stored catalog, if any.
    pub fn saved(&self) -> Option<Catalog> {
        self.slot().clone()
    }

    /// Forget the stored catalog.
    pub fn clear(&self) {
        *self.slot() = None;
    }

    /// Make subsequent loads fail as if the file were corrupt.
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

fn persisted(catalog: &Catalog) -> Catalog {
    let mut copy = catalog.clone();
    copy.had_updates = false;
    copy.entries.iter_mut().for_each(|e| e.is_new = false);
    copy
}

impl CatalogStore for MemoryCatalogStore {
    fn load(&self, _options: &ParseOptions) -> Result<Catalog, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Malformed("simulated corrupt store".to_string()));
        }
        self.saved()
            .ok_or_else(|| StoreError::NotFound("memory".to_string()))
    }

    fn save(&self, catalog: &Catalog, _human_readable: bool) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.slot() = Some(persisted(catalog));
        Ok(())
    }
}
