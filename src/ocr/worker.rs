//! OCR Worker
//!
//! Turns one page into one [`PageResult`]. Every failure (bad image, engine
//! error, timeout, panic) is folded into the result so a single page can
//! never abort its siblings.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;

use super::engine::OcrEngine;
use crate::document::{FailureReason, Page, PageResult, TextSource};

/// Per-page OCR runner
#[derive(Clone)]
pub struct OcrWorker {
    engine: Arc<dyn OcrEngine>,
    page_timeout: Duration,
}

impl OcrWorker {
    pub fn new(engine: Arc<dyn OcrEngine>, page_timeout: Duration) -> Self {
        Self {
            engine,
            page_timeout,
        }
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    /// Recognize one page, consuming it
    pub async fn recognize(&self, page: Page, language: &str) -> PageResult {
        let started = Instant::now();
        let index = page.index;

        if page.image.is_empty() {
            return PageResult::failed(
                index,
                FailureReason::InvalidPageImage,
                "Page image is empty",
                started.elapsed(),
            );
        }
        if image::guess_format(&page.image).is_err() {
            return PageResult::failed(
                index,
                FailureReason::InvalidPageImage,
                "Page image format not recognized",
                started.elapsed(),
            );
        }

        let call = AssertUnwindSafe(self.engine.recognize(&page.image, language)).catch_unwind();

        match tokio::time::timeout(self.page_timeout, call).await {
            Ok(Ok(Ok(output))) => {
                tracing::debug!(
                    page = index,
                    chars = output.text.len(),
                    confidence = ?output.confidence,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Page recognized"
                );
                PageResult::success(
                    index,
                    output.text,
                    output.confidence,
                    TextSource::Ocr,
                    started.elapsed(),
                )
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(page = index, error = %e, "OCR failed for page");
                PageResult::failed(index, FailureReason::OcrFailed, e.to_string(), started.elapsed())
            }
            Ok(Err(_panic)) => {
                tracing::error!(page = index, "OCR engine panicked");
                PageResult::failed(
                    index,
                    FailureReason::Internal,
                    "OCR engine panicked",
                    started.elapsed(),
                )
            }
            Err(_) => {
                tracing::warn!(
                    page = index,
                    timeout_ms = self.page_timeout.as_millis() as u64,
                    "OCR timed out for page"
                );
                PageResult::failed(
                    index,
                    FailureReason::Timeout,
                    format!("OCR exceeded {} ms", self.page_timeout.as_millis()),
                    started.elapsed(),
                )
            }
        }
    }
}
