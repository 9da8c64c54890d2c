//! Ollama vision engine
//!
//! Sends the page image to a local Ollama vision model and asks for a plain
//! transcription. Ollama reports no confidence.

use async_trait::async_trait;
use base64::Engine;

use super::engine::OcrEngine;
use super::types::{OcrEngineKind, OcrError, OcrOutput};

/// Ollama vision model engine
pub struct OllamaEngine {
    client: reqwest::Client,
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
}

impl OllamaEngine {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn prompt(language: &str) -> String {
        format!(
            "Extract all text from this image exactly as written. The text language code is {}. \
             Return only the extracted text, nothing else.",
            language
        )
    }
}

#[async_trait]
impl OcrEngine for OllamaEngine {
    fn kind(&self) -> OcrEngineKind {
        OcrEngineKind::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(&self, image: &[u8], language: &str) -> Result<OcrOutput, OcrError> {
        let url = format!("{}/api/generate", self.base_url);
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image);

        let request = serde_json::json!({
            "model": self.model,
            "prompt": Self::prompt(language),
            "images": [image_base64],
            "stream": false
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        let text = response_text(&result)?;

        Ok(OcrOutput {
            text,
            confidence: None,
        })
    }
}

/// The generated text of a non-streaming `/api/generate` reply
fn response_text(reply: &serde_json::Value) -> Result<String, OcrError> {
    if let Some(error) = reply["error"].as_str() {
        return Err(OcrError::ApiError(format!("Ollama error: {}", error)));
    }

    reply["response"]
        .as_str()
        .map(|text| text.trim().to_string())
        .ok_or_else(|| OcrError::ApiError("Ollama reply has no 'response' field".to_string()))
}
