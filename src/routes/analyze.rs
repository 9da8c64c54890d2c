//! Contract analysis endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    Json,
};
use uuid::Uuid;

use super::upload::{ensure_rasterizable, read_upload, UploadParams};
use crate::analysis::{analyze, clean, AnalysisReport};
use crate::document::{docx_text, DocumentFormat};
use crate::error::AppError;
use crate::state::AppState;

/// POST /analyze
///
/// Plain text and Word documents are read as-is; PDFs and images go through
/// the OCR pipeline first and their successful pages are joined. Anything
/// else is read as UTF-8 when it decodes cleanly.
pub async fn analyze_document(
    State(state): State<AppState>,
    query: Result<Query<UploadParams>, QueryRejection>,
    request: Request,
) -> Result<Json<AnalysisReport>, AppError> {
    let Query(params) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let upload = read_upload(&state, params, request).await?;
    let options = upload.params.into_options(state.config())?;
    let document = upload.document;

    let raw = match document.format {
        Some(DocumentFormat::Text) => String::from_utf8_lossy(&document.data).into_owned(),
        Some(DocumentFormat::Docx) => docx_text(&document.data)?,
        None => std::str::from_utf8(&document.data)
            .map(str::to_string)
            .unwrap_or_default(),
        Some(_) => {
            ensure_rasterizable(&document)?;
            let request_id = Uuid::new_v4();
            tracing::info!(%request_id, bytes = document.size(), "Analysis request accepted");

            state
                .coordinator()
                .process(&document, &options, request_id)
                .await?
                .text()
        }
    };

    let text = clean(&raw);
    if text.is_empty() {
        return Err(AppError::NoText(
            "Could not read any text from the document; try a clearer scan".to_string(),
        ));
    }

    Ok(Json(analyze(&text)))
}
