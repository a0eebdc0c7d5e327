//! Generate, download and share handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::export::{ShareAction, SocialIntent};
use crate::session::{GenerateSummary, Ticket};

use super::super::state::AppState;
use super::{ApiError, parse_session_id, with_session};

/// Puts the session back to idle if a generate request is dropped before its
/// outcome is recorded.
struct RenderGuard {
    state: Arc<AppState>,
    session_id: Uuid,
    ticket: Option<Ticket>,
}

impl RenderGuard {
    fn disarm(&mut self) {
        self.ticket = None;
    }
}

impl Drop for RenderGuard {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        tracing::debug!(target: "server", "Generate for session {} dropped mid-render", self.session_id);
        if let Ok(mut sessions) = self.state.sessions.try_write() {
            if let Some(session) = sessions.get_mut(&self.session_id) {
                session.cancel_compose(ticket);
            }
            return;
        }
        let state = self.state.clone();
        let session_id = self.session_id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Some(session) = state.sessions.write().await.get_mut(&session_id) {
                    session.cancel_compose(ticket);
                }
            });
        }
    }
}

/// POST /api/sessions/:id/generate - Compose the current meme.
///
/// The session is released while rendering; a second generate for the same
/// session during that time answers 409.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GenerateSummary>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let (ticket, request) = with_session(&state, &id, |s| s.begin_compose()).await?;
    let mut guard = RenderGuard {
        state: state.clone(),
        session_id,
        ticket: Some(ticket),
    };
    let outcome = state.compositor.compose(request).await;
    let summary = with_session(&state, &id, move |s| s.finish_compose(ticket, outcome)).await;
    guard.disarm();
    summary.map(Json)
}

/// GET /api/sessions/:id/download - Result bytes as an attachment.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let file = with_session(&state, &id, |s| s.download()).await?;
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes.as_ref().clone(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ShareQuery {
    /// Whether the client can open a native share sheet.
    #[serde(default)]
    pub native: bool,
}

/// GET /api/sessions/:id/share
pub async fn share(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ShareQuery>,
) -> Result<Json<ShareAction>, ApiError> {
    with_session(&state, &id, |s| s.share(query.native)).await.map(Json)
}

/// GET /api/sessions/:id/share/x - Pre-filled post on X.
pub async fn share_x(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SocialIntent>, ApiError> {
    with_session(&state, &id, |s| s.social_intent()).await.map(Json)
}
