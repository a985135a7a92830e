//! Update orchestrator - the single-flight controller of catalog updates.
//!
//! One cycle at a time runs freshness check, fetch, merge (diffs only),
//! new-entry detection and finalization against the shared catalog. Failed
//! cycles restore the last-known-good catalog from the store.

mod runner;
mod types;

pub use runner::UpdateOrchestrator;
pub use types::{
    LastRun, OrchestratorStatus, UpdateError, UpdateOutcome, UpdatePhase, UpdateReport,
    UpdateRequest,
};
