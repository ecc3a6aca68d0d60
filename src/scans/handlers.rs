use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{Pagination, ScanResponse, UpdateScanRequest},
    repo_types::{ScanFeedback, ScanRecord},
    services::{analyze_and_store, presign, to_responses, ScanError},
};
use crate::{auth::AuthUser, state::AppState};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/food/history", get(list_scans))
        .route("/food/scans/:id", get(get_scan).patch(update_scan))
        .route(
            "/food/analyze",
            post(analyze).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

/// POST /food/analyze (multipart, field `image`)
#[instrument(skip(state, mp))]
pub async fn analyze(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<ScanResponse>), (StatusCode, String)> {
    let mut image: Option<(Bytes, String)> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = match field.content_type() {
            None => DEFAULT_IMAGE_TYPE.to_string(),
            Some(ct) if ct.starts_with("image/") => ct.to_string(),
            Some(ct) => {
                warn!(%user_id, content_type = ct, "non-image upload rejected");
                return Err((StatusCode::BAD_REQUEST, format!("Unsupported image type: {ct}")));
            }
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read image: {e}")))?;
        image = Some((data, content_type));
        break;
    }

    let Some((data, content_type)) = image.filter(|(data, _)| !data.is_empty()) else {
        return Err((StatusCode::BAD_REQUEST, "No image provided".into()));
    };
    info!(%user_id, bytes = data.len(), %content_type, "analysing upload");

    let scan = analyze_and_store(&state, user_id, data, &content_type)
        .await
        .map_err(|e| match e {
            ScanError::Analysis(err) => {
                warn!(error = %err, raw = ?err.raw_text(), "analysis rejected");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ScanError::Internal(err) => {
                error!(error = %err, "analyze failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        })?;

    Ok((StatusCode::CREATED, Json(scan)))
}

#[instrument(skip(state))]
pub async fn list_scans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<ScanResponse>>, (StatusCode, String)> {
    let scans = ScanRecord::list_by_user(&state.db, user_id, p.limit.clamp(1, 100), p.offset.max(0))
        .await
        .map_err(internal)?;
    let items = to_responses(&state, scans).await.map_err(internal)?;
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_scan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ScanResponse>, (StatusCode, String)> {
    let scan = ScanRecord::find_owned(&state.db, user_id, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Scan not found".to_string()))?;
    let mut items = to_responses(&state, vec![scan]).await.map_err(internal)?;
    items
        .pop()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Scan not found".to_string()))
}

/// PATCH /food/scans/:id — corrections and feedback; nothing is re-analysed.
#[instrument(skip(state, payload))]
pub async fn update_scan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateScanRequest>,
) -> Result<Json<ScanResponse>, (StatusCode, String)> {
    payload
        .validate()
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    let (scan, feedback): (ScanRecord, Option<ScanFeedback>) =
        ScanRecord::update_owned(&state.db, user_id, id, &payload)
            .await
            .map_err(internal)?
            .ok_or((StatusCode::NOT_FOUND, "Scan not found".to_string()))?;
    info!(scan_id = %scan.id, %user_id, "scan updated");

    let url = presign(&state, &scan.image_key).await.map_err(internal)?;
    Ok(Json(ScanResponse::new(scan, feedback, url)))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "scan request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{service, ScriptedModel};
    use crate::auth::jwt::JwtKeys;
    use crate::state::FakeImageStore;
    use axum::body::{to_bytes, Body};
    use axum::extract::FromRef;
    use axum::http::{header, Request};
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "scanbite-test-boundary";

    fn bearer(state: &AppState) -> String {
        let token = JwtKeys::from_ref(state).sign_access(Uuid::new_v4(), false).unwrap();
        format!("Bearer {token}")
    }

    fn multipart(field: &str, content_type: &str, data: &str) -> Body {
        Body::from(format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"meal.png\"\r\n\
             Content-Type: {content_type}\r\n\r\n\
             {data}\r\n\
             --{BOUNDARY}--\r\n"
        ))
    }

    fn analyze_request(state: &AppState, body: Body) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/food/analyze")
            .header(header::AUTHORIZATION, bearer(state))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .expect("build request")
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn analyze_without_image_is_rejected_before_provider() {
        let model = ScriptedModel::new();
        let state = AppState::fake_with_ai(service(model.clone(), Some("k")));
        let request = analyze_request(&state, multipart("note", "text/plain", "hello"));

        let response = scan_routes().with_state(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "No image provided");
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn analyze_with_empty_image_is_rejected() {
        let model = ScriptedModel::new();
        let state = AppState::fake_with_ai(service(model.clone(), Some("k")));
        let request = analyze_request(&state, multipart("image", "image/png", ""));

        let response = scan_routes().with_state(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn unparseable_analysis_rejects_request() {
        let model = ScriptedModel::new();
        model.push(Ok("not json at all".into()));
        let images = Arc::new(FakeImageStore::default());
        let state = AppState::fake_with(service(model.clone(), Some("k")), images.clone());
        let request = analyze_request(&state, multipart("image", "image/png", "PNGDATA"));

        let response = scan_routes().with_state(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.starts_with("AI Analysis failed"));

        let stored = images.stored();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].ends_with(".png"));
        assert_eq!(images.removed(), stored);

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0].request.parts[1] {
            crate::ai::Part::InlineImage { mime_type, data } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(data.as_ref(), b"PNGDATA");
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let model = ScriptedModel::new();
        let images = Arc::new(FakeImageStore::default());
        let state = AppState::fake_with(service(model.clone(), Some("k")), images.clone());
        let request = analyze_request(&state, multipart("image", "text/plain", "hello"));

        let response = scan_routes().with_state(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Unsupported image type: text/plain");
        assert!(model.calls().is_empty());
        assert!(images.stored().is_empty());
    }

    #[tokio::test]
    async fn analyze_requires_token() {
        let state = AppState::fake();
        let request = Request::builder()
            .method("POST")
            .uri("/food/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(multipart("image", "image/png", "x"))
            .unwrap();

        let response = scan_routes().with_state(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn update_rejects_negative_totals() {
        let state = AppState::fake();
        let request = Request::builder()
            .method("PATCH")
            .uri(format!("/food/scans/{}", Uuid::new_v4()))
            .header(header::AUTHORIZATION, bearer(&state))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"total_calories": -5}"#))
            .unwrap();

        let response = scan_routes().with_state(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
