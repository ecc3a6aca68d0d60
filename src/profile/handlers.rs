use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{error, info, instrument};

use super::{
    dto::{ProfileResponse, UpdateProfileRequest},
    repo_types::UserProfile,
};
use crate::{
    auth::{repo_types::User, AuthUser},
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/me/profile", put(update_profile))
}

async fn load_user(state: &AppState, user_id: uuid::Uuid) -> Result<User, (StatusCode, String)> {
    User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "load user failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let user = load_user(&state, user_id).await?;
    let profile = UserProfile::find(&state.db, user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "load profile failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(ProfileResponse::new(user, profile)))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    payload
        .validate()
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg.to_string()))?;

    let user = load_user(&state, user_id).await?;
    let profile = UserProfile::upsert(&state.db, user_id, &payload)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "upsert profile failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    info!(%user_id, "profile updated");
    Ok(Json(ProfileResponse::new(user, Some(profile))))
}
