//! Meme session editing handlers: sessions, catalog, sources, lines, style.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::catalog::{Catalog, Direction, TemplateDescriptor};
use crate::overlay::{FontFamily, PreviewRect, StyleUpdate, TextPosition};
use crate::session::{MemeSession, SessionSnapshot};
use crate::source::remote::validate_url;
use crate::source::{ActiveImageSource, accept_upload, parse_data_url};

use super::super::state::AppState;
use super::{ApiError, api_error, bad_request, with_session};

/// Response from session creation.
#[derive(Debug, Serialize)]
pub struct CreatedSession {
    pub id: String,
    pub session: SessionSnapshot,
}

/// POST /api/sessions - Start a session with a freshly loaded catalog.
pub async fn create(State(state): State<Arc<AppState>>) -> Result<(StatusCode, Json<CreatedSession>), ApiError> {
    let catalog = Catalog::load(state.templates.as_ref()).await;
    let session = MemeSession::new(catalog);
    let snapshot = session.snapshot();
    let template_count = session.catalog().len();
    let id = Uuid::new_v4();
    state.sessions.write().await.insert(id, session);
    info!(target: "server", "Session {} created ({} templates)", id, template_count);
    Ok((
        StatusCode::CREATED,
        Json(CreatedSession {
            id: id.to_string(),
            session: snapshot,
        }),
    ))
}

/// GET /api/sessions/:id
pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    with_session(&state, &id, |s| Ok(s.snapshot())).await.map(Json)
}

/// Visible carousel page.
#[derive(Debug, Serialize)]
pub struct TemplatePage {
    pub page: usize,
    pub total_pages: usize,
    pub templates: Vec<TemplateDescriptor>,
}

/// GET /api/sessions/:id/templates
pub async fn templates(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TemplatePage>, ApiError> {
    with_session(&state, &id, |s| {
        let catalog = s.catalog();
        Ok(TemplatePage {
            page: catalog.page(),
            total_pages: catalog.total_pages(),
            templates: catalog.visible().to_vec(),
        })
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub direction: Direction,
}

/// POST /api/sessions/:id/templates/navigate
pub async fn navigate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    with_session(&state, &id, |s| {
        s.navigate(req.direction);
        Ok(s.snapshot())
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct SelectTemplateRequest {
    pub id: String,
}

/// POST /api/sessions/:id/source/template
pub async fn select_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SelectTemplateRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    with_session(&state, &id, |s| {
        s.select_template(&req.id)?;
        Ok(s.snapshot())
    })
    .await
    .map(Json)
}

/// POST /api/sessions/:id/source/upload - Multipart `image` file or `data_url` text.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let mut received: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "image" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let mime = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read image: {}", e)))?;
                received = Some((filename, mime, bytes.to_vec()));
                break;
            }
            "data_url" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("Failed to read data URL: {}", e)))?;
                let (mime, bytes) = parse_data_url(&text).map_err(api_error)?;
                received = Some(("upload".to_string(), Some(mime), bytes));
                break;
            }
            _ => {}
        }
    }

    let (filename, mime, bytes) = received.ok_or_else(|| bad_request("Please select an image file"))?;
    let upload = accept_upload(&filename, mime.as_deref(), bytes).map_err(api_error)?;

    with_session(&state, &id, move |s| {
        s.use_upload(upload);
        Ok(s.snapshot())
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

/// POST /api/sessions/:id/source/url
///
/// The URL is resolved without holding the session. A newer source change
/// made meanwhile wins and this request answers 409. A rejected URL leaves the
/// session untouched.
pub async fn load_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UrlRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    validate_url(&req.url).map_err(api_error)?;
    let ticket = with_session(&state, &id, |s| Ok(s.begin_source_change())).await?;
    let remote = state.resolver.resolve(&req.url).await.map_err(api_error)?;
    with_session(&state, &id, move |s| {
        s.commit_source(ticket, ActiveImageSource::Remote(remote))?;
        Ok(s.snapshot())
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// PUT /api/sessions/:id/lines/:index/text
pub async fn update_text(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
    Json(req): Json<TextRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    with_session(&state, &id, move |s| {
        s.update_text(index, req.text)?;
        Ok(s.snapshot())
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct RotationRequest {
    pub degrees: f32,
}

#[derive(Debug, Serialize)]
pub struct RotationResponse {
    pub rotation: f32,
}

/// PUT /api/sessions/:id/lines/:index/rotation
pub async fn set_rotation(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(String, usize)>,
    Json(req): Json<RotationRequest>,
) -> Result<Json<RotationResponse>, ApiError> {
    with_session(&state, &id, |s| s.set_rotation(index, req.degrees))
        .await
        .map(|rotation| Json(RotationResponse { rotation }))
}

#[derive(Debug, Deserialize)]
pub struct DragBeginRequest {
    pub index: usize,
}

/// POST /api/sessions/:id/drag/begin
pub async fn drag_begin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<DragBeginRequest>,
) -> Result<StatusCode, ApiError> {
    with_session(&state, &id, |s| s.begin_drag(req.index)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DragMoveRequest {
    pub x: f32,
    pub y: f32,
    pub rect: PreviewRect,
}

#[derive(Debug, Serialize)]
pub struct DragMoveResponse {
    /// `None` when no line is being dragged.
    pub position: Option<TextPosition>,
}

/// POST /api/sessions/:id/drag/move
pub async fn drag_move(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<DragMoveRequest>,
) -> Result<Json<DragMoveResponse>, ApiError> {
    with_session(&state, &id, |s| Ok(s.pointer_move(req.x, req.y, req.rect)))
        .await
        .map(|position| Json(DragMoveResponse { position }))
}

/// POST /api/sessions/:id/drag/end
pub async fn drag_end(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    with_session(&state, &id, |s| {
        s.end_drag();
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/sessions/:id/style
pub async fn update_style(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<StyleUpdate>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    with_session(&state, &id, |s| {
        s.apply_style(&update);
        Ok(s.snapshot())
    })
    .await
    .map(Json)
}

/// Font picker entry.
#[derive(Debug, Serialize)]
pub struct FontInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub css: &'static str,
}

/// GET /api/fonts
pub async fn fonts() -> Json<Vec<FontInfo>> {
    Json(
        FontFamily::all()
            .iter()
            .map(|f| FontInfo {
                id: f.name(),
                name: f.display_name(),
                css: f.css_stack(),
            })
            .collect(),
    )
}
