use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument};

use super::{
    dto::{ChatPage, ChatRequest, ChatResponse},
    repo_types::ChatExchange,
};
use crate::{auth::AuthUser, profile::repo_types::UserProfile, state::AppState};

pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/chat", get(list_messages).post(send_message))
}

#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<ChatPage>,
) -> Result<Json<Vec<ChatExchange>>, (StatusCode, String)> {
    let rows = ChatExchange::list_by_user(&state.db, user_id, p.limit.clamp(1, 500), p.offset.max(0))
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "list chat failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No message provided".into()));
    }

    let goal = UserProfile::find(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "load profile failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .and_then(|p| p.goal);

    let reply = state
        .ai
        .coach_reply(message, goal.as_deref())
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("AI Coach unavailable: {e}")))?;

    ChatExchange::append(&state.db, user_id, message, &reply)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "store chat failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    info!(%user_id, "coach replied");

    Ok(Json(ChatResponse { response: reply }))
}
