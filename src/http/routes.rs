//! HTTP route definitions

use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::app::AppState;
use crate::http::middleware::{require_auth, AuthenticatedUser};
use crate::store::highscores::{HighscoreEntry, DEFAULT_LIMIT};
use crate::store::StoreError;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/highscores", get(list_highscores_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/highscores", axum::routing::post(submit_highscore_handler))
        .route("/settings", get(list_settings_handler))
        .route(
            "/settings/:key",
            put(put_setting_handler).delete(delete_setting_handler),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_sessions: usize,
    settings_owners: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_sessions: state.sessions.active_sessions(),
        settings_owners: state.settings.owners(),
    })
}

// ============================================================================
// Highscore endpoints
// ============================================================================

#[derive(Deserialize)]
struct HighscoreQuery {
    limit: Option<usize>,
}

async fn list_highscores_handler(
    State(state): State<AppState>,
    Query(query): Query<HighscoreQuery>,
) -> Result<Json<Vec<HighscoreEntry>>, AppError> {
    let entries = state
        .highscores
        .fetch_highscores(query.limit.unwrap_or(DEFAULT_LIMIT))
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch highscores");
            AppError::Internal("highscores unavailable".to_string())
        })?;

    Ok(Json(entries))
}

#[derive(Deserialize)]
struct SubmitHighscoreRequest {
    /// Falls back to the stored player name
    #[serde(default)]
    username: Option<String>,
    score: u32,
}

#[derive(Serialize)]
struct SubmitHighscoreResponse {
    stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry: Option<HighscoreEntry>,
}

async fn submit_highscore_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(req): Json<SubmitHighscoreRequest>,
) -> Result<Json<SubmitHighscoreResponse>, AppError> {
    let username = req
        .username
        .or_else(|| state.settings.player_name(&auth.user_id.to_string()))
        .unwrap_or_default();

    let entry = state
        .highscores
        .submit_highscore(&username, req.score)
        .await
        .map_err(|e| {
            error!(user_id = %auth.user_id, error = %e, "Failed to submit highscore");
            AppError::Internal("highscores unavailable".to_string())
        })?;

    if let Some(entry) = &entry {
        info!(user_id = %auth.user_id, score = entry.score, "Highscore submitted");
    }

    Ok(Json(SubmitHighscoreResponse {
        stored: entry.is_some(),
        entry,
    }))
}

// ============================================================================
// Settings endpoints
// ============================================================================

async fn list_settings_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Json<BTreeMap<&'static str, String>> {
    Json(state.settings.list(&auth.user_id.to_string()))
}

#[derive(Deserialize)]
struct PutSettingRequest {
    value: serde_json::Value,
}

#[derive(Serialize)]
struct SettingResponse {
    key: String,
    value: String,
}

async fn put_setting_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(key): Path<String>,
    Json(req): Json<PutSettingRequest>,
) -> Result<Json<SettingResponse>, AppError> {
    // Numbers and strings are both accepted
    let raw = match req.value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    let value = state.settings.put(&auth.user_id.to_string(), &key, &raw)?;
    Ok(Json(SettingResponse { key, value }))
}

async fn delete_setting_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(key): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.settings.delete(&auth.user_id.to_string(), &key)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("{key} is not set")))
    }
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnknownKey(_) => AppError::NotFound(e.to_string()),
            StoreError::InvalidValue { .. } => AppError::BadRequest(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
