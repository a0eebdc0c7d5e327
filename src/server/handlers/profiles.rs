//! Commander profile API handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::MemeError;
use crate::profiles::{CommanderProfile, DEFAULT_LEADERBOARD_LIMIT, ProfileUpdate};

use super::super::state::AppState;
use super::{ApiError, api_error};

/// Largest leaderboard a client may ask for.
const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// GET /api/profiles/leaderboard?limit=
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<CommanderProfile>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .min(MAX_LEADERBOARD_LIMIT);
    state.profiles.leaderboard(limit).await.map(Json).map_err(api_error)
}

#[derive(Debug, Serialize)]
pub struct NameAvailability {
    pub name: String,
    pub available: bool,
}

/// GET /api/profiles/names/:name
pub async fn name_available(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<NameAvailability>, ApiError> {
    let available = state.profiles.is_name_available(&name).await.map_err(api_error)?;
    Ok(Json(NameAvailability { name, available }))
}

/// GET /api/profiles/:wallet
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(wallet): Path<String>,
) -> Result<Json<CommanderProfile>, ApiError> {
    state
        .profiles
        .get(&wallet)
        .await
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| api_error(MemeError::NotFound(format!("profile for wallet {}", wallet))))
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub commander_name: String,
}

/// POST /api/profiles/:wallet
pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(wallet): Path<String>,
    Json(req): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<CommanderProfile>), ApiError> {
    let profile = state
        .profiles
        .create(&wallet, &req.commander_name)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// PATCH /api/profiles/:wallet
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(wallet): Path<String>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<CommanderProfile>, ApiError> {
    if update.is_empty() {
        return Err(api_error(MemeError::validation("Nothing to update")));
    }
    state.profiles.update(&wallet, update).await.map(Json).map_err(api_error)
}

/// DELETE /api/profiles/:wallet
pub async fn delete(State(state): State<Arc<AppState>>, Path(wallet): Path<String>) -> Result<StatusCode, ApiError> {
    state.profiles.delete(&wallet).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}
