//! OCR endpoint
//!
//! POST /ocr - upload one PDF or image, get ordered per-page text back

use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use super::upload::{ensure_rasterizable, read_upload, UploadParams};
use crate::document::DocumentResult;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    pub request_id: Uuid,
    #[serde(flatten)]
    pub result: DocumentResult,
}

/// POST /ocr
///
/// Partial and total page failures are still a 200; callers inspect
/// `overallStatus` and each page's `status`.
pub async fn ocr_document(
    State(state): State<AppState>,
    query: Result<Query<UploadParams>, QueryRejection>,
    request: Request,
) -> Result<Json<OcrResponse>, AppError> {
    let Query(params) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let upload = read_upload(&state, params, request).await?;
    let options = upload.params.into_options(state.config())?;
    let format = ensure_rasterizable(&upload.document)?;

    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        ?format,
        bytes = upload.document.size(),
        language = %options.language,
        "OCR request accepted"
    );

    let result = state
        .coordinator()
        .process(&upload.document, &options, request_id)
        .await?;

    Ok(Json(OcrResponse { request_id, result }))
}
