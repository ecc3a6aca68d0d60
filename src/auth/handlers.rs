use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, AuthenticateRequest, RefreshRequest},
        jwt::JwtKeys,
        repo_types::User,
        services::{self, is_valid_email, issue_tokens, AuthError},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/authenticate", post(authenticate))
        .route("/auth/refresh", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(payload): Json<AuthenticateRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = payload.email.trim().to_lowercase();

    if email.is_empty() || payload.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and password required".into(),
        ));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = services::authenticate(&state.db, &email, &payload.password, payload.name.as_deref())
        .await
        .map_err(|e| match e {
            AuthError::InvalidPassword => (StatusCode::UNAUTHORIZED, e.to_string()),
            AuthError::WeakPassword => (StatusCode::BAD_REQUEST, e.to_string()),
            AuthError::Store(inner) => {
                error!(error = %inner, "authenticate failed");
                (StatusCode::INTERNAL_SERVER_ERROR, inner.to_string())
            }
        })?;

    let keys = JwtKeys::from_ref(&state);
    let response = issue_tokens(&keys, user).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(|e| {
            error!(error = %e, "load user failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let response = issue_tokens(&keys, user)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request};
    use tower::ServiceExt;

    async fn post_authenticate(body: &str) -> StatusCode {
        let app = auth_routes().with_state(AppState::fake());
        let request = Request::builder()
            .method("POST")
            .uri("/auth/authenticate")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request");
        app.oneshot(request).await.expect("router call").status()
    }

    #[tokio::test]
    async fn missing_credentials_are_rejected() {
        assert_eq!(post_authenticate(r#"{"email": "a@b.co"}"#).await, StatusCode::BAD_REQUEST);
        assert_eq!(post_authenticate(r#"{"password": "x"}"#).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let status = post_authenticate(r#"{"email": "nope", "password": "longenough"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let access = keys.sign_access(uuid::Uuid::new_v4(), false).unwrap();
        let app = auth_routes().with_state(state);

        let request = Request::builder()
            .method("POST")
            .uri("/auth/refresh")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"refresh_token": "{access}"}}"#)))
            .expect("build request");
        let status = app.oneshot(request).await.expect("router call").status();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
