//! Types for the update orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::MergeStats;
use crate::fetcher::{CatalogSource, FetchError, FetchKind};

/// Explicit state of the update state machine.
///
/// `Idle → Checking → Fetching → Merging → Detecting → Finalizing → Idle`,
/// with `Failed → Recovering → Idle` on errors. A full fetch skips `Merging`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePhase {
    #[default]
    Idle,
    Checking,
    Fetching,
    Merging,
    Detecting,
    Finalizing,
    Failed,
    Recovering,
}

impl UpdatePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Fetching => "fetching",
            Self::Merging => "merging",
            Self::Detecting => "detecting",
            Self::Finalizing => "finalizing",
            Self::Failed => "failed",
            Self::Recovering => "recovering",
        }
    }

    /// Whether a cycle is in flight.
    pub fn is_running(&self) -> bool {
        *self != Self::Idle
    }
}

/// Errors that end an update cycle in recovery.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum UpdateError {
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("remote catalog not found: {0}")]
    RemoteNotFound(String),

    #[error("malformed catalog payload: {0}")]
    MalformedPayload(String),

    /// The source answered but refused to deliver (HTTP status, file access).
    #[error("catalog source failed: {0}")]
    Source(String),

    /// A background work unit died.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<FetchError> for UpdateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Network(msg) => Self::NetworkUnavailable(msg),
            FetchError::NotFound(what) => Self::RemoteNotFound(what),
            FetchError::Malformed(msg) => Self::MalformedPayload(msg),
            err @ (FetchError::Http { .. } | FetchError::Io(_)) => Self::Source(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for UpdateError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// What an update attempt should do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRequest {
    pub source: CatalogSource,
    /// Fetch a full catalog even inside the diff window.
    pub force_full: bool,
    /// Apply the source as a diff onto the current catalog, skipping the
    /// freshness gate.
    pub merge: bool,
    /// Requested by a person: publish negative results and failures as notices.
    pub interactive: bool,
}

impl UpdateRequest {
    /// Background check against the configured remote lists.
    pub fn auto() -> Self {
        Self::default()
    }

    /// Load a full catalog from an explicit source (empty string = auto).
    pub fn from_source(source: CatalogSource) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }

    /// Reload the full catalog regardless of its age.
    pub fn force_full() -> Self {
        Self {
            force_full: true,
            ..Default::default()
        }
    }

    /// Merge `source` into the current catalog as a diff.
    pub fn merge_from(source: CatalogSource) -> Self {
        Self {
            source,
            merge: true,
            ..Default::default()
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }
}

/// Result of a cycle that fetched something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub run_id: String,
    pub kind: FetchKind,
    /// Catalog size after the cycle.
    pub entries: usize,
    pub new_entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<UpdateError>,
}

/// How an update attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "report", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Another cycle was in flight; nothing happened.
    AlreadyRunning,
    /// The freshness gate found nothing to fetch.
    NotNeeded,
    Updated(UpdateReport),
    /// The cycle failed and the last-known-good catalog was restored.
    Recovered(UpdateReport),
    /// Shutdown interrupted the fetch.
    Cancelled,
}

impl UpdateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "already_running",
            Self::NotNeeded => "not_needed",
            Self::Updated(_) => "updated",
            Self::Recovered(_) => "recovered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn report(&self) -> Option<&UpdateReport> {
        match self {
            Self::Updated(report) | Self::Recovered(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Recovered(_))
    }
}

/// The most recent finished cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastRun {
    pub run_id: String,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: UpdateOutcome,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    pub phase: UpdatePhase,
    /// Whether a cycle is in flight.
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<LastRun>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_phase_running() {
        assert!(!UpdatePhase::Idle.is_running());
        assert!(UpdatePhase::Checking.is_running());
        assert!(UpdatePhase::Recovering.is_running());
        assert_eq!(UpdatePhase::Detecting.as_str(), "detecting");
    }

    #[test]
    fn test_fetch_error_mapping() {
        assert_eq!(
            UpdateError::from(FetchError::Network("timeout".to_string())),
            UpdateError::NetworkUnavailable("timeout".to_string())
        );
        assert!(matches!(
            UpdateError::from(FetchError::NotFound("x".to_string())),
            UpdateError::RemoteNotFound(_)
        ));
        assert!(matches!(
            UpdateError::from(FetchError::Malformed("eof".to_string())),
            UpdateError::MalformedPayload(_)
        ));
        assert!(matches!(
            UpdateError::from(FetchError::Http {
                status: 500,
                url: "http://x".to_string()
            }),
            UpdateError::Source(_)
        ));
    }

    #[test]
    fn test_request_builders() {
        let auto = UpdateRequest::auto();
        assert_eq!(auto.source, CatalogSource::Auto);
        assert!(!auto.force_full && !auto.merge && !auto.interactive);

        assert!(UpdateRequest::force_full().force_full);

        let merge = UpdateRequest::merge_from(CatalogSource::File(PathBuf::from("/tmp/d.json")))
            .interactive(true);
        assert!(merge.merge);
        assert!(merge.interactive);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = UpdateOutcome::Recovered(UpdateReport {
            run_id: "r1".to_string(),
            kind: FetchKind::Diff,
            entries: 1000,
            new_entries: 0,
            merge: None,
            error: Some(UpdateError::MalformedPayload("eof".to_string())),
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "recovered");
        assert_eq!(json["report"]["error"]["kind"], "malformed_payload");
        assert!(outcome.is_error());

        let json = serde_json::to_value(UpdateOutcome::NotNeeded).unwrap();
        assert_eq!(json["outcome"], "not_needed");
    }
}
