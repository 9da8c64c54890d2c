//! OCR Types
//!
//! Engine selection, recognition output and engine errors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Longest language spec accepted (e.g. "eng+deu+fra+chi_sim")
const MAX_LANGUAGE_LEN: usize = 32;

/// OCR engine type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// Tesseract CLI (local)
    #[default]
    Tesseract,
    /// Ollama vision model (local LLM)
    Ollama,
}

impl FromStr for OcrEngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown OCR engine '{}' (expected tesseract or ollama)", other)),
        }
    }
}

impl fmt::Display for OcrEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tesseract => f.write_str("tesseract"),
            Self::Ollama => f.write_str("ollama"),
        }
    }
}

/// Text recognized from one image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    /// Mean word confidence (0-100), if the engine reports one
    pub confidence: Option<f64>,
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("Invalid language code: {0}")]
    InvalidLanguage(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("API error: {0}")]
    ApiError(String),
}

/// Validate a language spec before it reaches a command line.
///
/// Accepts Tesseract-style codes joined by `+` ("eng", "eng+deu", "chi_sim").
pub fn validate_language(lang: &str) -> Result<(), OcrError> {
    if lang.is_empty() || lang.len() > MAX_LANGUAGE_LEN {
        return Err(OcrError::InvalidLanguage(
            "Invalid language code length".to_string(),
        ));
    }
    if lang.starts_with('+') || lang.ends_with('+') || lang.contains("++") {
        return Err(OcrError::InvalidLanguage(format!(
            "Empty language in '{}'",
            lang
        )));
    }
    for c in lang.chars() {
        if !c.is_ascii_alphanumeric() && c != '+' && c != '_' {
            return Err(OcrError::InvalidLanguage(format!(
                "Invalid character in language code: {}",
                c
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_languages() {
        for lang in ["eng", "eng+deu", "chi_sim", "eng+chi_tra+jpn"] {
            assert!(validate_language(lang).is_ok(), "{} should be valid", lang);
        }
    }

    #[test]
    fn test_invalid_languages() {
        for lang in ["", "eng deu", "-l", "eng;ls", "+eng", "eng++deu", "../eng"] {
            assert!(
                matches!(validate_language(lang), Err(OcrError::InvalidLanguage(_))),
                "{:?} should be rejected",
                lang
            );
        }
        assert!(validate_language(&"a".repeat(40)).is_err());
    }

    #[test]
    fn test_engine_kind_parsing() {
        assert_eq!("Tesseract".parse::<OcrEngineKind>(), Ok(OcrEngineKind::Tesseract));
        assert_eq!("ollama".parse::<OcrEngineKind>(), Ok(OcrEngineKind::Ollama));
        assert!("openai".parse::<OcrEngineKind>().is_err());
        assert_eq!(OcrEngineKind::Ollama.to_string(), "ollama");
    }
}
