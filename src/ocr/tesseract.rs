//! Tesseract engine
//!
//! Runs the `tesseract` CLI with the image on stdin and TSV on stdout, so no
//! temp files are needed. The child is killed if the recognition future is
//! dropped (per-page timeout or request cancellation).

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::engine::OcrEngine;
use super::types::{validate_language, OcrEngineKind, OcrError, OcrOutput};

/// Minimum column count of a TSV row
const TSV_MIN_FIELDS: usize = 12;
/// TSV level of word rows
const TSV_WORD_LEVEL: u32 = 5;

/// Tesseract CLI engine
pub struct TesseractEngine {
    /// Executable name or path
    binary: String,
}

impl TesseractEngine {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn kind(&self) -> OcrEngineKind {
        OcrEngineKind::Tesseract
    }

    async fn is_available(&self) -> bool {
        let result = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        matches!(result, Ok(status) if status.success())
    }

    async fn recognize(&self, image: &[u8], language: &str) -> Result<OcrOutput, OcrError> {
        // The language ends up on the command line
        validate_language(language)?;

        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("3")
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::EngineNotAvailable(format!("Failed to spawn tesseract: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(image).await {
                let _ = child.kill().await;
                return Err(OcrError::ProcessingError(format!(
                    "Failed to write to tesseract stdin: {}",
                    e
                )));
            }
            if let Err(e) = stdin.flush().await {
                let _ = child.kill().await;
                return Err(OcrError::ProcessingError(format!(
                    "Failed to flush tesseract stdin: {}",
                    e
                )));
            }
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to wait for tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Rebuild page text and mean confidence from Tesseract TSV output.
///
/// Words on one line are joined by spaces, lines by newlines, and a blank
/// line separates paragraphs and blocks.
pub fn parse_tsv(tsv: &str) -> OcrOutput {
    let mut text = String::new();
    let mut last: Option<(u32, u32, u32)> = None;
    let mut confidence_sum = 0.0;
    let mut confidence_count = 0usize;

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < TSV_MIN_FIELDS {
            continue;
        }
        if fields[0].trim().parse::<u32>().unwrap_or(0) != TSV_WORD_LEVEL {
            continue;
        }

        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }

        let block = fields[2].parse().unwrap_or(0);
        let paragraph = fields[3].parse().unwrap_or(0);
        let line_num = fields[4].parse().unwrap_or(0);

        match last {
            Some((b, p, l)) if b == block && p == paragraph && l == line_num => text.push(' '),
            Some((b, p, _)) if b == block && p == paragraph => text.push('\n'),
            Some(_) => text.push_str("\n\n"),
            None => {}
        }
        text.push_str(word);
        last = Some((block, paragraph, line_num));

        let conf = fields[10].trim().parse::<f64>().unwrap_or(-1.0);
        if conf >= 0.0 {
            confidence_sum += conf;
            confidence_count += 1;
        }
    }

    OcrOutput {
        text,
        confidence: (confidence_count > 0).then(|| confidence_sum / confidence_count as f64),
    }
}
