//! HTTP handlers for the server.

pub mod export;
pub mod meme;
pub mod profiles;

use axum::{Json, http::StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::MemeError;
use crate::session::MemeSession;

use super::state::AppState;

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<Value>);

pub fn status_for(err: &MemeError) -> StatusCode {
    match err {
        MemeError::Validation(_) => StatusCode::BAD_REQUEST,
        MemeError::NotFound(_) => StatusCode::NOT_FOUND,
        MemeError::Busy | MemeError::Stale => StatusCode::CONFLICT,
        MemeError::Load(_) | MemeError::Http(_) => StatusCode::BAD_GATEWAY,
        MemeError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MemeError::Encode(_) | MemeError::Profile(_) | MemeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{"success": false, "error": ...}` with the matching status.
pub fn api_error(err: MemeError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::warn!(target: "server", "Request failed: {}", err);
    }
    (status, Json(json!({"success": false, "error": err.to_string()})))
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    api_error(MemeError::Validation(message.into()))
}

pub fn parse_session_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| bad_request("Invalid session ID"))
}

/// Run `f` against a live session, touching it to keep it alive.
///
/// The sessions lock is held only for the duration of `f`.
pub async fn with_session<T>(
    state: &Arc<AppState>,
    id: &str,
    f: impl FnOnce(&mut MemeSession) -> Result<T, MemeError>,
) -> Result<T, ApiError> {
    let session_id = parse_session_id(id)?;
    let mut sessions = state.sessions.write().await;
    let session = sessions
        .get_mut(&session_id)
        .ok_or_else(|| api_error(MemeError::NotFound("Session not found or expired".to_string())))?;
    session.touch();
    f(session).map_err(api_error)
}
