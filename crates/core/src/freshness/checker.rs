use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::probe::FreshnessProbe;
use crate::catalog::Catalog;
use crate::fetcher::CatalogSource;
use crate::notify::{Notice, UpdateNotifier};

/// Gate in front of every fetch.
///
/// Only a catalog that is too old for a diff is checked remotely; a fresher
/// one always passes so the diff path can run.
pub struct FreshnessChecker {
    probe: Arc<dyn FreshnessProbe>,
    diff_window: Duration,
    notifier: UpdateNotifier,
}

impl FreshnessChecker {
    pub fn new(
        probe: Arc<dyn FreshnessProbe>,
        diff_window: Duration,
        notifier: UpdateNotifier,
    ) -> Self {
        Self {
            probe,
            diff_window,
            notifier,
        }
    }

    pub fn diff_window(&self) -> Duration {
        self.diff_window
    }

    /// Whether `source` should be fetched for `catalog`.
    ///
    /// `interactive` turns negative results and probe failures into notices;
    /// otherwise they are only logged.
    pub async fn needs_update(
        &self,
        catalog: &Catalog,
        source: &CatalogSource,
        interactive: bool,
    ) -> bool {
        self.needs_update_at(catalog, source, interactive, Utc::now()).await
    }

    pub async fn needs_update_at(
        &self,
        catalog: &Catalog,
        source: &CatalogSource,
        interactive: bool,
        now: DateTime<Utc>,
    ) -> bool {
        if catalog.is_empty() {
            debug!("Catalog is empty, update needed");
            return true;
        }
        if source.is_file() {
            debug!("Explicit file source {}, update needed", source);
            return true;
        }
        if !catalog.is_too_old_for_diff(self.diff_window, now) {
            debug!("Catalog from {} is within the diff window", catalog.gen_date());
            return true;
        }

        match self.probe.remote_id().await {
            Ok(Some(remote_id)) if remote_id.eq_ignore_ascii_case(catalog.id()) => {
                if interactive {
                    self.notifier.notice(Notice::info(
                        "No new film list",
                        "The film list is already up to date.",
                    ));
                } else {
                    info!("Remote catalog id {} unchanged, no update needed", remote_id);
                }
                false
            }
            Ok(Some(remote_id)) => {
                info!("Remote catalog id changed: {} -> {}", catalog.id(), remote_id);
                true
            }
            Ok(None) => {
                info!("Remote endpoint returned no catalog id, assuming stale");
                true
            }
            Err(e) if e.is_not_found() => {
                info!("Remote catalog id not found, assuming stale");
                true
            }
            Err(e) => {
                warn!("Freshness check failed: {}", e);
                if interactive {
                    self.notifier.notice(Notice::error(
                        "Update check failed",
                        format!("Could not check for a new film list: {}", e),
                    ));
                }
                false
            }
        }
    }
}
