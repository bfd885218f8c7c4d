//! Admin API handlers.
//!
//! These endpoints require the `Alertsync-Admin-Authorization` header with
//! the plaintext admin secret.
//!
//! # Endpoints
//!
//! - `POST /resync` rebuilds every projection from the database
//! - `POST /instances/{id}/resync` replays the current state of one instance

use alertsync_core::processors::{FullResync, ResyncInstance, ResyncReport};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use kanau::processor::Processor;
use serde::Serialize;
use uuid::Uuid;

use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/resync", post(resync_all))
        .route("/instances/{instance_id}/resync", post(resync_instance))
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) enum AdminApiError {
    Database(sqlx::Error),
    NotFound,
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> Response {
        match self {
            AdminApiError::Database(e) => {
                tracing::error!(error = %e, "Admin API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            AdminApiError::NotFound => {
                (StatusCode::NOT_FOUND, "resource not found").into_response()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /resync`: walk the whole database and re-project everything.
async fn resync_all(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<ResyncReport>, AdminApiError> {
    let report = state
        .dispatcher
        .process(FullResync {
            batch_size: state.resync_batch_size,
        })
        .await
        .map_err(AdminApiError::Database)?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct InstanceResyncResponse {
    instance_id: Uuid,
    failed: Vec<FailedReaction>,
}

#[derive(Debug, Serialize)]
struct FailedReaction {
    synchronizer: String,
    error: String,
}

/// `POST /instances/{instance_id}/resync`: replay one instance.
async fn resync_instance(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Path(instance_id): Path<Uuid>,
) -> Result<Json<InstanceResyncResponse>, AdminApiError> {
    let report = state
        .dispatcher
        .process(ResyncInstance { instance_id })
        .await
        .map_err(AdminApiError::Database)?
        .ok_or(AdminApiError::NotFound)?;

    let failed = report
        .failures()
        .map(|(synchronizer, e)| FailedReaction {
            synchronizer: synchronizer.to_string(),
            error: e.to_string(),
        })
        .collect();
    Ok(Json(InstanceResyncResponse {
        instance_id,
        failed,
    }))
}
