use bytes::Bytes;
use thiserror::Error;
use time::{macros::format_description, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::ScanResponse,
    repo_types::{ScanFeedback, ScanRecord},
};
use crate::{ai::AnalysisError, state::AppState};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// `scans/<user>/<yyyymmdd_HHMMSS>_<uuid>.<ext>`
pub(crate) fn scan_object_key(user_id: Uuid, at: OffsetDateTime, content_type: &str) -> String {
    let stamp = at
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("scans/{}/{}_{}.{}", user_id, stamp, Uuid::new_v4(), ext)
}

/// Stores the photo, analyses it and persists the scan. When analysis or the
/// insert fails nothing is kept; the uploaded object is removed again.
#[instrument(skip(st, image), fields(bytes = image.len()))]
pub async fn analyze_and_store(
    st: &AppState,
    user_id: Uuid,
    image: Bytes,
    content_type: &str,
) -> Result<ScanResponse, ScanError> {
    let key = scan_object_key(user_id, OffsetDateTime::now_utc(), content_type);
    st.images.store(&key, image.clone(), content_type).await?;

    let estimate = match st.ai.analyze_image(image, content_type).await {
        Ok(estimate) => estimate,
        Err(e) => {
            discard_image(st, &key).await;
            return Err(e.into());
        }
    };

    let scan = match ScanRecord::insert(&st.db, user_id, &key, &estimate).await {
        Ok(scan) => scan,
        Err(e) => {
            discard_image(st, &key).await;
            return Err(e.into());
        }
    };
    info!(scan_id = %scan.id, %user_id, mock = estimate.mock, "scan stored");

    let url = presign(st, &scan.image_key).await?;
    let mut response = ScanResponse::new(scan, None, url);
    response.mock_data = estimate.mock;
    Ok(response)
}

async fn discard_image(st: &AppState, key: &str) {
    if let Err(e) = st.images.remove(key).await {
        warn!(error = %e, %key, "failed to remove image of unsaved scan");
    }
}

pub async fn presign(st: &AppState, key: &str) -> anyhow::Result<String> {
    st.images.signed_url(key).await
}

/// Attaches feedback and presigned URLs to a page of scans.
pub async fn to_responses(
    st: &AppState,
    scans: Vec<ScanRecord>,
) -> anyhow::Result<Vec<ScanResponse>> {
    let ids: Vec<Uuid> = scans.iter().map(|s| s.id).collect();
    let mut feedback = ScanFeedback::for_scans(&st.db, &ids).await?;

    let mut out = Vec::with_capacity(scans.len());
    for scan in scans {
        let fb = feedback
            .iter()
            .position(|f| f.scan_id == scan.id)
            .map(|i| feedback.swap_remove(i));
        let url = presign(st, &scan.image_key).await?;
        out.push(ScanResponse::new(scan, fb, url));
    }
    Ok(out)
}
