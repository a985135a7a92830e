//! Durable storage for the last-known-good catalog.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use super::codec::{parse_catalog, write_catalog, ParseOptions};
use super::Catalog;

/// Errors for catalog storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No stored catalog at {0}")]
    NotFound(String),

    #[error("Stored catalog is malformed: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Trait for durable catalog storage.
pub trait CatalogStore: Send + Sync {
    /// Load the last persisted catalog.
    fn load(&self, options: &ParseOptions) -> Result<Catalog, StoreError>;

    /// Persist a finalized catalog, replacing the previous one.
    ///
    /// `human_readable` selects pretty-printed output over the compact form.
    fn save(&self, catalog: &Catalog, human_readable: bool) -> Result<(), StoreError>;
}

/// Catalog store backed by a single JSON file.
///
/// Writes go to a sibling temp file which is then renamed over the target, so
/// a crash mid-write never leaves a truncated list behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CatalogStore for JsonFileStore {
    fn load(&self, options: &ParseOptions) -> Result<Catalog, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let (catalog, stats) = parse_catalog(&bytes, options, Utc::now())
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        info!(
            "Loaded stored catalog from {:?}: {} entries ({} dropped as too old)",
            self.path, stats.kept, stats.too_old
        );
        Ok(catalog)
    }

    fn save(&self, catalog: &Catalog, human_readable: bool) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            write_catalog(&mut writer, catalog, human_readable)
                .map_err(|e| StoreError::Io(e.into()))?;
            writer.flush()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!("Wrote {} entries to {:?}", catalog.len(), self.path);
        Ok(())
    }
}
