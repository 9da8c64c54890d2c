//! OCR Engines
//!
//! Defines the engine trait the worker drives, and picks the configured
//! implementation at startup.

use std::sync::Arc;

use async_trait::async_trait;

use super::ollama::OllamaEngine;
use super::tesseract::TesseractEngine;
use super::types::{OcrEngineKind, OcrError, OcrOutput};
use crate::config::OcrConfig;

/// OCR engine trait
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Get the engine type
    fn kind(&self) -> OcrEngineKind;

    /// Check if the engine can be reached
    async fn is_available(&self) -> bool;

    /// Recognize the text in one encoded image
    async fn recognize(&self, image: &[u8], language: &str) -> Result<OcrOutput, OcrError>;
}

/// Build the engine selected by configuration
pub fn build_engine(config: &OcrConfig) -> Arc<dyn OcrEngine> {
    match config.engine {
        OcrEngineKind::Tesseract => Arc::new(TesseractEngine::new(&config.tesseract_path)),
        OcrEngineKind::Ollama => Arc::new(OllamaEngine::new(&config.ollama_url, &config.ollama_model)),
    }
}
