//! Request handlers for the HTTP surface (spec.md §6).

use axum::extract::{Extension, Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::auth::BearerToken;
use super::state::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    pub session_id: Option<String>,
    #[allow(dead_code)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatApiResponse {
    pub session_id: String,
    pub message_id: String,
    pub response: String,
    pub agent: Option<String>,
    pub intent: Option<String>,
    pub metadata: crate::db::models::AssistantMetadata,
}

pub async fn chat(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    bearer: Option<Extension<BearerToken>>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = bearer.map(|Extension(BearerToken(t))| t);
    let result = state
        .orchestrator
        .dispatch(&tenant_id, &req.user_id, req.session_id, &req.message, token)
        .await?;

    Ok(Json(ChatApiResponse {
        session_id: result.session_id,
        message_id: result.message_id,
        response: result.text,
        agent: result.agent,
        intent: result.intent,
        metadata: result.metadata,
    }))
}

/// Identical contract to `chat`, mounted only when `DisableAuth` is true
/// (spec.md §6 `/test/chat`). Authentication is bypassed entirely, so no
/// `BearerToken` extension is available; the orchestrator falls back to
/// the configured test token.
pub async fn test_chat(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .orchestrator
        .dispatch(&tenant_id, &req.user_id, req.session_id, &req.message, None)
        .await?;

    Ok(Json(ChatApiResponse {
        session_id: result.session_id,
        message_id: result.message_id,
        response: result.text,
        agent: result.agent,
        intent: result.intent,
        metadata: result.metadata,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub user_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(params): Query<SessionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (sessions, total) =
        state.orchestrator.list_sessions(&tenant_id, params.user_id.as_deref(), params.limit, params.offset)?;
    Ok(Json(json!({ "sessions": sessions, "total": total })))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path((tenant_id, session_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let (session, messages) = state.orchestrator.get_session_with_messages(&tenant_id, &session_id)?;
    Ok(Json(json!({ "session": session, "messages": messages })))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.pool.get().is_ok();
    Json(json!({
        "status": if store_ok { "ok" } else { "degraded" },
        "services": {
            "store": if store_ok { "ok" } else { "unreachable" },
            "cache": "ok",
        }
    }))
}
