use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, instrument};

use super::dto::CheckAiRequest;
use crate::{ai::ConnectivityProbeResult, auth::AdminUser, state::AppState};

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/check-ai", post(check_ai))
}

/// Always answers 200; the probe outcome is carried in the body.
#[instrument(skip(state, payload))]
pub async fn check_ai(
    State(state): State<AppState>,
    AdminUser(admin_id): AdminUser,
    payload: Option<Json<CheckAiRequest>>,
) -> Json<ConnectivityProbeResult> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let result = state.ai.probe_connectivity(payload.api_key.as_deref()).await;
    info!(%admin_id, success = result.success, "ai connectivity probe");
    Json(result)
}
