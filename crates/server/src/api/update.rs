//! Update API handlers.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use filmlist_core::{CatalogSource, CatalogSummary, OrchestratorStatus, UpdateRequest};

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Body of `POST /api/v1/update`. An empty body requests an automatic update.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TriggerUpdateRequest {
    /// URL or local path; empty picks the configured lists.
    pub source: String,
    pub force_full: bool,
    /// Apply the source as a diff.
    pub merge: bool,
}

impl TriggerUpdateRequest {
    fn into_update_request(self) -> UpdateRequest {
        let source = CatalogSource::parse(&self.source);
        let request = if self.merge {
            UpdateRequest::merge_from(source)
        } else {
            UpdateRequest {
                force_full: self.force_full,
                ..UpdateRequest::from_source(source)
            }
        };
        request.interactive(true)
    }
}

/// Orchestrator and catalog status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub orchestrator: OrchestratorStatus,
    pub catalog: CatalogSummary,
}

#[derive(Debug, Serialize)]
pub struct UpdateAcceptedResponse {
    pub message: String,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        orchestrator: state.orchestrator().status().await,
        catalog: state.catalog().summary().await,
    })
}

/// POST /api/v1/update
///
/// Starts an interactive update cycle in the background and answers right
/// away. Progress and the result arrive on the WebSocket.
pub async fn trigger_update(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<UpdateAcceptedResponse>), ApiError> {
    let body: TriggerUpdateRequest = if body.iter().all(u8::is_ascii_whitespace) {
        TriggerUpdateRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
        })?
    };

    let orchestrator = Arc::clone(state.orchestrator());
    if orchestrator.phase().is_running() {
        return Err(api_error(StatusCode::CONFLICT, "A film list update is already running"));
    }

    let request = body.into_update_request();
    let source = request.source.to_string();
    info!(
        source = %source,
        force_full = request.force_full,
        merge = request.merge,
        "Update requested via API"
    );

    tokio::spawn(async move {
        let outcome = orchestrator.run(request).await;
        debug!("API-triggered update finished: {}", outcome.as_str());
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UpdateAcceptedResponse {
            message: "Film list update started".to_string(),
            source,
        }),
    ))
}
