//! OCR Module
//!
//! Provides OCR (Optical Character Recognition) over rasterized pages.
//!
//! Supports multiple engines:
//! - Tesseract (local CLI, default)
//! - Ollama vision models (local LLM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagescan_server::ocr::{build_engine, OcrWorker};
//!
//! let engine = build_engine(&config.ocr);
//! let worker = OcrWorker::new(engine, config.limits.page_timeout());
//!
//! // Never fails: errors come back as a failed PageResult
//! let result = worker.recognize(page, "eng").await;
//! ```

mod engine;
mod ollama;
mod tesseract;
mod types;
mod worker;

pub use engine::{build_engine, OcrEngine};
pub use ollama::OllamaEngine;
pub use tesseract::{parse_tsv, TesseractEngine};
pub use types::{validate_language, OcrEngineKind, OcrError, OcrOutput};
pub use worker::OcrWorker;

#[cfg(test)]
pub(crate) use engine::mock;
