//! Error types for the Pagescan server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::document::TextError;
use crate::pipeline::PipelineError;
use crate::raster::RasterError;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upload exceeds {max} bytes")]
    PayloadTooLarge { max: usize },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Resource limit: {0}")]
    ResourceLimit(String),

    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    #[error("No readable text: {0}")]
    NoText(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Rasterization(e) => match e {
                RasterError::EmptyDocument => AppError::BadRequest(e.to_string()),
                RasterError::UnsupportedFormat(format) => AppError::UnsupportedFormat(format),
                RasterError::Corrupt(msg) => AppError::UnreadableDocument(msg),
                RasterError::TooManyPages { .. } | RasterError::PageTooLarge { .. } => {
                    AppError::ResourceLimit(e.to_string())
                }
                RasterError::Cancelled => AppError::Timeout(e.to_string()),
                RasterError::Internal(msg) => AppError::Internal(msg),
            },
            e @ PipelineError::RequestTimeout { .. } => AppError::Timeout(e.to_string()),
            PipelineError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<TextError> for AppError {
    fn from(err: TextError) -> Self {
        AppError::NoText(err.to_string())
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "input_error", msg.clone()),
            AppError::PayloadTooLarge { max } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                format!("Upload exceeds the {} byte limit", max),
            ),
            AppError::UnsupportedFormat(format) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_format",
                format!("Unsupported document type: {}", format),
            ),
            AppError::ResourceLimit(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "resource_limit", msg.clone())
            }
            AppError::UnreadableDocument(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "rasterization_error",
                msg.clone(),
            ),
            AppError::NoText(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unreadable_document",
                msg.clone(),
            ),
            AppError::Timeout(msg) => {
                tracing::warn!("Request timed out: {}", msg);
                (StatusCode::GATEWAY_TIMEOUT, "timeout", msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
