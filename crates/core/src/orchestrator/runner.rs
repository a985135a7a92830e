//! Update orchestrator implementation.
//!
//! A cycle runs as:
//! - Checking: freshness gate and URL snapshot of the current catalog
//! - Fetching: one fetch attempt, interruptible by shutdown
//! - Merging / swap: under the catalog write lock, on a blocking thread
//! - Detecting: new-entry pass against the snapshot
//! - Finalizing: completion events, then persistence on a spawned task

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch, Mutex, OwnedRwLockReadGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::{
    mark_new, merge, Catalog, CatalogContext, CatalogStore, MatchStrategy, MergeStats,
    ParseOptions, UrlSnapshot,
};
use crate::config::Config;
use crate::fetcher::{
    CatalogFetcher, FetchKind, FetchLocation, FetchProgress, FetchRequest, FetchTarget,
    FetchedCatalog,
};
use crate::freshness::{FreshnessChecker, FreshnessProbe};
use crate::metrics;
use crate::notify::{Notice, RunCompleted, UpdateNotifier};

use super::types::{
    LastRun, OrchestratorStatus, UpdateError, UpdateOutcome, UpdatePhase, UpdateReport,
    UpdateRequest,
};

/// Finalized catalog waiting to be persisted.
type PendingWrite = Option<OwnedRwLockReadGuard<Catalog>>;

/// Returns the phase to `Idle` however a cycle ends.
struct PhaseGuard<'a> {
    phase_tx: &'a watch::Sender<UpdatePhase>,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.phase_tx.send_replace(UpdatePhase::Idle);
    }
}

/// The update orchestrator - single-flight controller of catalog updates.
pub struct UpdateOrchestrator {
    config: Config,
    context: CatalogContext,
    fetcher: Arc<dyn CatalogFetcher>,
    checker: FreshnessChecker,
    store: Arc<dyn CatalogStore>,
    notifier: UpdateNotifier,

    // Runtime state
    phase_tx: watch::Sender<UpdatePhase>,
    shutting_down: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    persist_task: Mutex<Option<JoinHandle<()>>>,
    last_run: Mutex<Option<LastRun>>,
}

impl UpdateOrchestrator {
    /// Create a new orchestrator around an existing catalog context.
    pub fn new(
        config: Config,
        context: CatalogContext,
        fetcher: Arc<dyn CatalogFetcher>,
        probe: Arc<dyn FreshnessProbe>,
        store: Arc<dyn CatalogStore>,
        notifier: UpdateNotifier,
    ) -> Self {
        let (phase_tx, _) = watch::channel(UpdatePhase::Idle);
        let (shutdown_tx, _) = broadcast::channel(1);
        let checker = FreshnessChecker::new(probe, config.update.diff_window(), notifier.clone());

        Self {
            config,
            context,
            fetcher,
            checker,
            store,
            notifier,
            phase_tx,
            shutting_down: AtomicBool::new(false),
            shutdown_tx,
            persist_task: Mutex::new(None),
            last_run: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &CatalogContext {
        &self.context
    }

    pub fn notifier(&self) -> &UpdateNotifier {
        &self.notifier
    }

    /// Current phase of the state machine.
    pub fn phase(&self) -> UpdatePhase {
        *self.phase_tx.borrow()
    }

    /// Receiver that observes every phase change.
    pub fn subscribe_phase(&self) -> watch::Receiver<UpdatePhase> {
        self.phase_tx.subscribe()
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let phase = self.phase();
        OrchestratorStatus {
            phase,
            running: phase.is_running(),
            last_run: self.last_run.lock().await.clone(),
        }
    }

    /// Run one update cycle.
    ///
    /// Returns `AlreadyRunning` without touching anything when another cycle
    /// is in flight. Every other call publishes exactly one completion event.
    pub async fn run(&self, request: UpdateRequest) -> UpdateOutcome {
        if !self.try_begin() {
            info!("Catalog update already running, ignoring request");
            metrics::UPDATE_CYCLES
                .with_label_values(&[UpdateOutcome::AlreadyRunning.as_str()])
                .inc();
            return UpdateOutcome::AlreadyRunning;
        }

        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        info!(
            run_id = %run_id,
            source = %request.source,
            force_full = request.force_full,
            merge = request.merge,
            "Starting catalog update"
        );
        self.notifier.started(&run_id, &request.source.to_string());

        let (outcome, pending_write) = {
            let _guard = PhaseGuard {
                phase_tx: &self.phase_tx,
            };
            self.cycle(&run_id, &request).await
        };

        self.finish(&run_id, &outcome, started).await;

        if let Some(catalog) = pending_write {
            self.schedule_persist(catalog).await;
        }

        outcome
    }

    /// Wait for the last scheduled catalog write to finish.
    pub async fn flush(&self) {
        let handle = self.persist_task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Catalog write task failed: {}", e);
            }
        }
    }

    /// Interrupt an in-flight fetch and stop periodic checks.
    pub fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down update orchestrator");
        let _ = self.shutdown_tx.send(());
    }

    /// Spawn a loop running a background update check every `every`.
    pub fn spawn_periodic_checks(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Periodic update checks started (every {:?})", every);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Periodic update checks received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(every) => {
                        if orchestrator.shutting_down.load(Ordering::SeqCst) {
                            break;
                        }
                        let outcome = orchestrator.run(UpdateRequest::auto()).await;
                        debug!("Periodic update check finished: {}", outcome.as_str());
                    }
                }
            }
            info!("Periodic update checks stopped");
        })
    }

    /// Atomically move `Idle -> Checking`.
    fn try_begin(&self) -> bool {
        self.phase_tx.send_if_modified(|phase| {
            if phase.is_running() {
                false
            } else {
                *phase = UpdatePhase::Checking;
                true
            }
        })
    }

    fn set_phase(&self, run_id: &str, phase: UpdatePhase) {
        debug!(run_id, "Update phase: {}", phase.as_str());
        self.phase_tx.send_replace(phase);
        self.notifier.progress(run_id, phase.as_str(), 0, None);
    }

    async fn cycle(&self, run_id: &str, request: &UpdateRequest) -> (UpdateOutcome, PendingWrite) {
        // Checking
        let catalog = self.context.read_owned().await;
        info!(
            run_id,
            "Film list before update: generated {}, {} entries",
            catalog.gen_date(),
            catalog.len()
        );

        if !request.merge
            && !self
                .checker
                .needs_update(&catalog, &request.source, request.interactive)
                .await
        {
            return (UpdateOutcome::NotNeeded, None);
        }

        let target = self.resolve_target(&catalog, request);
        let snapshot = match tokio::task::spawn_blocking(move || catalog.urls()).await {
            Ok(snapshot) => snapshot,
            Err(e) => return (self.recover(run_id, target.kind, e.into()).await, None),
        };

        // Fetching
        self.set_phase(run_id, UpdatePhase::Fetching);
        let fetched = match self.fetch(run_id, &target).await {
            Ok(Some(fetched)) => fetched,
            Ok(None) => return (UpdateOutcome::Cancelled, None),
            Err(e) => return (self.recover(run_id, target.kind, e).await, None),
        };

        match self.apply(run_id, target.kind, fetched, snapshot).await {
            Ok((report, catalog)) => {
                let pending = self.config.catalog.write_on_update.then_some(catalog);
                if pending.is_none() {
                    info!(run_id, "Catalog writes after updates are disabled, skipping");
                }
                (UpdateOutcome::Updated(report), pending)
            }
            Err(e) => (self.recover(run_id, target.kind, e).await, None),
        }
    }

    fn resolve_target(&self, catalog: &Catalog, request: &UpdateRequest) -> FetchTarget {
        if request.merge {
            let location = request
                .source
                .location()
                .unwrap_or_else(|| FetchLocation::Remote(self.config.remote.diff_url.clone()));
            return FetchTarget::diff(location);
        }

        let full_required = request.force_full
            || catalog.is_empty()
            || catalog.is_too_old_for_diff(self.checker.diff_window(), Utc::now());
        request.source.resolve(&self.config.remote, full_required)
    }

    /// Fetch `target`; `Ok(None)` when shutdown interrupted it.
    async fn fetch(
        &self,
        run_id: &str,
        target: &FetchTarget,
    ) -> Result<Option<FetchedCatalog>, UpdateError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if self.shutting_down.load(Ordering::SeqCst) {
            return Ok(None);
        }

        info!(run_id, "Fetching {} catalog from {}", target.kind, target.location);
        let request = FetchRequest {
            run_id: run_id.to_string(),
            target: target.clone(),
            options: ParseOptions::from(&self.config.catalog),
        };

        let (progress_tx, mut progress_rx) = mpsc::channel::<FetchProgress>(16);
        let notifier = self.notifier.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                notifier.progress(
                    &progress.run_id,
                    UpdatePhase::Fetching.as_str(),
                    progress.bytes_read,
                    progress.total_bytes,
                );
            }
        });

        let result = tokio::select! {
            _ = shutdown_rx.recv() => {
                info!(run_id, "Catalog fetch interrupted by shutdown");
                None
            }
            result = self.fetcher.fetch_with_progress(request, progress_tx) => Some(result),
        };
        // the sender went away with the fetch future
        let _ = forwarder.await;

        let kind = target.kind.as_str();
        match result {
            None => Ok(None),
            Some(Ok(fetched)) => {
                metrics::FETCHES_TOTAL.with_label_values(&[kind, "success"]).inc();
                metrics::FETCHED_BYTES.inc_by(fetched.bytes);
                Ok(Some(fetched))
            }
            Some(Err(e)) => {
                metrics::FETCHES_TOTAL.with_label_values(&[kind, "error"]).inc();
                Err(e.into())
            }
        }
    }

    /// Merge or swap the fetched catalog in, then flag new entries.
    async fn apply(
        &self,
        run_id: &str,
        kind: FetchKind,
        fetched: FetchedCatalog,
        snapshot: UrlSnapshot,
    ) -> Result<(UpdateReport, OwnedRwLockReadGuard<Catalog>), UpdateError> {
        let guard = self.context.write_owned().await;
        let mut incoming = fetched.catalog;

        let (guard, merge_stats) = match kind {
            FetchKind::Diff => {
                self.set_phase(run_id, UpdatePhase::Merging);
                let strategy = MatchStrategy::from_flag(self.config.update.match_by_index);
                tokio::task::spawn_blocking(move || {
                    let mut guard = guard;
                    let stats = merge(&mut guard, &mut incoming, strategy);
                    (guard, Some(stats))
                })
                .await?
            }
            FetchKind::Full => {
                tokio::task::spawn_blocking(move || {
                    let mut guard = guard;
                    guard.clear();
                    incoming.sort();
                    *guard = incoming;
                    (guard, None::<MergeStats>)
                })
                .await?
            }
        };

        self.set_phase(run_id, UpdatePhase::Detecting);
        let (guard, new_entries) = tokio::task::spawn_blocking(move || {
            let mut guard = guard;
            let count = mark_new(&mut guard, &snapshot);
            (guard, count)
        })
        .await?;

        self.set_phase(run_id, UpdatePhase::Finalizing);
        let catalog = guard.downgrade();
        let entries = catalog.len();
        info!(
            run_id,
            "Film list after update: generated {}, {} entries, {} new",
            catalog.gen_date(),
            entries,
            new_entries
        );

        metrics::CATALOG_ENTRIES.set(entries as i64);
        metrics::NEW_ENTRIES.inc_by(new_entries as u64);
        if let Some(stats) = merge_stats {
            metrics::MERGED_ENTRIES
                .with_label_values(&["replaced"])
                .inc_by(stats.replaced as u64);
            metrics::MERGED_ENTRIES
                .with_label_values(&["appended"])
                .inc_by(stats.appended as u64);
            metrics::MERGED_ENTRIES
                .with_label_values(&["dropped_duplicate"])
                .inc_by(stats.dropped_duplicates as u64);
        }

        let report = UpdateReport {
            run_id: run_id.to_string(),
            kind,
            entries,
            new_entries,
            merge: merge_stats,
            error: None,
        };
        Ok((report, catalog))
    }

    /// Restore the last-known-good catalog after a failed cycle.
    async fn recover(&self, run_id: &str, kind: FetchKind, error: UpdateError) -> UpdateOutcome {
        self.set_phase(run_id, UpdatePhase::Failed);
        error!(run_id, "Catalog update failed: {}", error);

        self.set_phase(run_id, UpdatePhase::Recovering);
        let store = Arc::clone(&self.store);
        let options = ParseOptions::from(&self.config.catalog);
        match tokio::task::spawn_blocking(move || store.load(&options)).await {
            Ok(Ok(catalog)) => {
                info!(
                    run_id,
                    "Restored last-known-good catalog: generated {}, {} entries",
                    catalog.gen_date(),
                    catalog.len()
                );
                self.context.replace(catalog).await;
            }
            Ok(Err(e)) => {
                warn!(
                    run_id,
                    "Could not reload last-known-good catalog, keeping current one: {}", e
                );
            }
            Err(e) => {
                warn!(run_id, "Catalog reload task failed, keeping current one: {}", e);
            }
        }

        self.notifier.notice(Notice::error(
            "Film list update failed",
            format!("The film list could not be loaded: {}", error),
        ));

        let summary = self.context.summary().await;
        metrics::CATALOG_ENTRIES.set(summary.entries as i64);

        UpdateOutcome::Recovered(UpdateReport {
            run_id: run_id.to_string(),
            kind,
            entries: summary.entries,
            new_entries: summary.new_entries,
            merge: None,
            error: Some(error),
        })
    }

    async fn finish(&self, run_id: &str, outcome: &UpdateOutcome, started: Instant) {
        let elapsed = started.elapsed();
        let label = outcome.as_str();
        metrics::UPDATE_CYCLES.with_label_values(&[label]).inc();
        metrics::UPDATE_DURATION
            .with_label_values(&[label])
            .observe(elapsed.as_secs_f64());

        let report = outcome.report();
        let (entries, new_entries) = match report {
            Some(report) => (report.entries, report.new_entries),
            None => {
                let summary = self.context.summary().await;
                (summary.entries, summary.new_entries)
            }
        };

        *self.last_run.lock().await = Some(LastRun {
            run_id: run_id.to_string(),
            finished_at: Utc::now(),
            duration_ms: elapsed.as_millis() as u64,
            outcome: outcome.clone(),
        });

        info!(run_id, outcome = label, "Catalog update finished in {:?}", elapsed);
        self.notifier.complete(RunCompleted {
            run_id: run_id.to_string(),
            outcome: label.to_string(),
            has_error: outcome.is_error(),
            kind: report.map(|r| r.kind),
            entries,
            new_entries,
            error: report
                .and_then(|r| r.error.as_ref())
                .map(|e| e.to_string()),
        });
    }

    async fn schedule_persist(&self, catalog: OwnedRwLockReadGuard<Catalog>) {
        let store = Arc::clone(&self.store);
        let human_readable = self.config.catalog.human_readable;

        let handle = tokio::task::spawn_blocking(move || {
            match store.save(&catalog, human_readable) {
                Ok(()) => {
                    metrics::PERSISTS_TOTAL.with_label_values(&["success"]).inc();
                    debug!("Persisted catalog with {} entries", catalog.len());
                }
                Err(e) => {
                    metrics::PERSISTS_TOTAL.with_label_values(&["error"]).inc();
                    error!("Failed to persist catalog: {}", e);
                }
            }
        });

        *self.persist_task.lock().await = Some(handle);
    }
}
