use std::sync::Arc;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthSession;
use crate::error::AppError;
use crate::models::user::{Identity, Role};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/session", get(session).delete(logout))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub code: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let session =
        state
            .sessions
            .authenticate(&payload.phone, &payload.code, payload.name, payload.role)?;
    Ok(Json(session))
}

async fn session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Identity>, AppError> {
    let identity = current_identity(&state, &headers)?;
    Ok(Json(identity))
}

async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.end_session(token);
    }
    StatusCode::NO_CONTENT
}

fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    raw.strip_prefix("Bearer ")?.parse().ok()
}

/// Resolves the acting identity; every pickup endpoint goes through this
/// before touching the engine.
pub fn current_identity(state: &AppState, headers: &HeaderMap) -> Result<Identity, AppError> {
    bearer_token(headers)
        .and_then(|token| state.sessions.current(token))
        .ok_or(AppError::Unauthenticated)
}
