//! Upload intake
//!
//! Turns one HTTP request into a [`Document`] plus its processing options.
//! Accepts either `multipart/form-data` (file under `file`, `document` or
//! `upload`, options as text fields) or a raw body carrying the document.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, FromRequest, Multipart, Request},
    http::{header, StatusCode},
};
use serde::Deserialize;

use crate::config::{Config, LimitsConfig};
use crate::document::{Document, DocumentFormat};
use crate::error::AppError;
use crate::ocr::validate_language;
use crate::pipeline::{ProcessMode, ProcessOptions};
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

const FILE_FIELDS: [&str; 3] = ["file", "document", "upload"];

/// Largest request body the router will buffer
pub fn body_limit(limits: &LimitsConfig) -> usize {
    limits.max_upload_bytes + MULTIPART_OVERHEAD
}

/// Optional per-request parameters, from the query string or form fields
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadParams {
    pub lang: Option<String>,
    pub max_pages: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub mode: Option<String>,
}

impl UploadParams {
    fn set_field(&mut self, name: &str, value: String) -> Result<(), AppError> {
        match name {
            "lang" => self.lang = Some(value),
            "maxPages" => self.max_pages = Some(parse_number(name, &value)?),
            "timeoutMs" => self.timeout_ms = Some(parse_number(name, &value)?),
            "mode" => self.mode = Some(value),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
        Ok(())
    }

    /// Validate against the configuration; requests may lower limits, never raise them
    pub fn into_options(self, config: &Config) -> Result<ProcessOptions, AppError> {
        let language = match self.lang.as_deref().map(str::trim) {
            Some(lang) if !lang.is_empty() => lang.to_string(),
            _ => config.ocr.default_language.clone(),
        };
        validate_language(&language).map_err(|e| AppError::BadRequest(e.to_string()))?;

        let limits = &config.limits;
        let max_pages = match self.max_pages {
            Some(0) => {
                return Err(AppError::BadRequest("maxPages must be at least 1".to_string()))
            }
            Some(n) => n.min(limits.max_pages),
            None => limits.max_pages,
        };

        let timeout_ms = match self.timeout_ms {
            Some(0) => {
                return Err(AppError::BadRequest("timeoutMs must be at least 1".to_string()))
            }
            Some(ms) => ms.min(limits.request_timeout_ms),
            None => limits.request_timeout_ms,
        };

        let mode = self
            .mode
            .as_deref()
            .map(str::parse::<ProcessMode>)
            .transpose()
            .map_err(AppError::BadRequest)?
            .unwrap_or_default();

        Ok(ProcessOptions {
            language,
            max_pages,
            request_timeout: std::time::Duration::from_millis(timeout_ms),
            mode,
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be a non-negative integer", name)))
}

/// A received upload
#[derive(Debug)]
pub struct Upload {
    pub document: Document,
    pub params: UploadParams,
}

/// Read the document and any form parameters from the request.
///
/// `params` holds query-string values; form fields override them.
pub async fn read_upload(
    state: &AppState,
    mut params: UploadParams,
    request: Request,
) -> Result<Upload, AppError> {
    let max = state.config().limits.max_upload_bytes;
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let is_multipart = content_type
        .as_deref()
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let header_limit = if is_multipart {
        body_limit(&state.config().limits)
    } else {
        max
    };
    if let Some(length) = declared {
        if length > header_limit as u64 {
            tracing::info!(length, max, "Rejecting oversized upload before reading body");
            return Err(AppError::PayloadTooLarge { max });
        }
    }

    let document = if is_multipart {
        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        let mut document = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, max))?
        {
            let name = field.name().unwrap_or("").to_string();

            if FILE_FIELDS.contains(&name.as_str()) {
                if document.is_some() {
                    tracing::debug!(field = %name, "Ignoring additional file field");
                    continue;
                }
                let file_name = field.file_name().map(str::to_string);
                let field_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| multipart_error(e, max))?;

                tracing::debug!(
                    field = %name,
                    file_name = ?file_name,
                    content_type = ?field_type,
                    bytes = data.len(),
                    "Received file field"
                );
                document = Some(Document::new(data, field_type, file_name));
            } else {
                let value = field.text().await.map_err(|e| multipart_error(e, max))?;
                params.set_field(&name, value)?;
            }
        }

        document.ok_or_else(|| {
            AppError::BadRequest(
                "No file provided. Use field name 'file', 'document' or 'upload'".to_string(),
            )
        })?
    } else {
        let data = Bytes::from_request(request, state).await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge { max }
            } else {
                AppError::BadRequest(e.body_text())
            }
        })?;
        Document::new(data, content_type, None)
    };

    if document.is_empty() {
        return Err(AppError::BadRequest("Uploaded document is empty".to_string()));
    }
    if document.size() > max {
        return Err(AppError::PayloadTooLarge { max });
    }

    Ok(Upload { document, params })
}

fn multipart_error(err: MultipartError, max: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { max }
    } else {
        tracing::warn!("Failed to read multipart upload: {}", err);
        AppError::BadRequest(format!("Failed to read upload: {}", err.body_text()))
    }
}

/// Reject anything the rasterizer cannot take before the pipeline runs
pub fn ensure_rasterizable(document: &Document) -> Result<DocumentFormat, AppError> {
    match document.format {
        Some(format) if format.is_rasterizable() => Ok(format),
        _ => Err(AppError::UnsupportedFormat(document.content_type.clone())),
    }
}
