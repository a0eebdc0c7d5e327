//! # HTTP Server for Meme Composition
//!
//! JSON API around [`MemeSession`](crate::session::MemeSession): pick a
//! template, upload or link an image, edit text lines, generate, then
//! download or share. Commander profiles live under `/api/profiles`.
//!
//! ## Usage
//!
//! ```bash
//! tankmeme serve --listen 0.0.0.0:8080 --templates-url http://localhost:5000
//! ```

mod handlers;
mod state;

pub use handlers::{ApiError, api_error, status_for};
pub use state::{AppState, ProfileStoreConfig, SESSION_EXPIRATION_SECS, ServerConfig};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::MemeError;
use crate::source::MAX_UPLOAD_BYTES;

/// Multipart framing on top of the largest accepted image, so oversized
/// files still reach the size check and get its message.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 1024 * 1024;

/// Build the application router around shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Sessions
        .route("/api/sessions", post(handlers::meme::create))
        .route("/api/sessions/:id", get(handlers::meme::snapshot))
        // Catalog
        .route("/api/sessions/:id/templates", get(handlers::meme::templates))
        .route(
            "/api/sessions/:id/templates/navigate",
            post(handlers::meme::navigate),
        )
        // Image source
        .route(
            "/api/sessions/:id/source/template",
            post(handlers::meme::select_template),
        )
        .route(
            "/api/sessions/:id/source/upload",
            post(handlers::meme::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/sessions/:id/source/url", post(handlers::meme::load_url))
        // Overlay
        .route(
            "/api/sessions/:id/lines/:index/text",
            put(handlers::meme::update_text),
        )
        .route(
            "/api/sessions/:id/lines/:index/rotation",
            put(handlers::meme::set_rotation),
        )
        .route("/api/sessions/:id/drag/begin", post(handlers::meme::drag_begin))
        .route("/api/sessions/:id/drag/move", post(handlers::meme::drag_move))
        .route("/api/sessions/:id/drag/end", post(handlers::meme::drag_end))
        .route("/api/sessions/:id/style", put(handlers::meme::update_style))
        .route("/api/fonts", get(handlers::meme::fonts))
        // Generate and export
        .route("/api/sessions/:id/generate", post(handlers::export::generate))
        .route("/api/sessions/:id/download", get(handlers::export::download))
        .route("/api/sessions/:id/share", get(handlers::export::share))
        .route("/api/sessions/:id/share/x", get(handlers::export::share_x))
        // Commander profiles
        .route(
            "/api/profiles/leaderboard",
            get(handlers::profiles::leaderboard),
        )
        .route(
            "/api/profiles/names/:name",
            get(handlers::profiles::name_available),
        )
        .route(
            "/api/profiles/:wallet",
            get(handlers::profiles::get)
                .post(handlers::profiles::create)
                .patch(handlers::profiles::update)
                .delete(handlers::profiles::delete),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// ## Example
///
/// ```no_run
/// use tankmeme::server::{serve, ServerConfig};
///
/// # async fn example() -> Result<(), tankmeme::error::MemeError> {
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:8080".to_string(),
///     ..Default::default()
/// };
///
/// serve(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), MemeError> {
    let app_state = Arc::new(AppState::new(config.clone())?);

    // Spawn background session cleanup task
    tokio::spawn(cleanup_sessions(app_state.clone()));

    let app = router(app_state);

    info!(target: "server", "Tank Bank meme server starting");
    info!(target: "server", "Listening on: {}", config.listen_addr);
    info!(target: "server", "Template service: {}", config.template_service_url);
    match &config.watermark_path {
        Some(path) => info!(target: "server", "Watermark: {}", path.display()),
        None => info!(target: "server", "Watermark: disabled"),
    }

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            MemeError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", config.listen_addr, e),
            ))
        })?;

    axum::serve(listener, app).await?;

    Ok(())
}

/// Background task to drop idle sessions.
async fn cleanup_sessions(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(60));
    let expiration = Duration::from_secs(SESSION_EXPIRATION_SECS);

    loop {
        interval.tick().await;
        let removed = expire_sessions(&state, Instant::now(), expiration).await;
        if removed > 0 {
            info!(
                target: "server",
                "Cleaned up {} expired meme sessions ({} remaining)",
                removed,
                state.sessions.read().await.len()
            );
        }
    }
}

/// Remove sessions idle for at least `expiration`; returns how many went.
pub async fn expire_sessions(state: &AppState, now: Instant, expiration: Duration) -> usize {
    let mut sessions = state.sessions.write().await;
    let before = sessions.len();
    sessions.retain(|_, s| now.saturating_duration_since(s.last_accessed) < expiration);
    before - sessions.len()
}
