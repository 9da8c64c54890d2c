//! Pipeline types

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

/// How pages are turned into text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMode {
    /// Use a PDF page's text layer when it has one, OCR otherwise
    #[default]
    Auto,
    /// OCR every page
    Ocr,
}

impl FromStr for ProcessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "ocr" => Ok(Self::Ocr),
            other => Err(format!("unknown mode '{}', expected 'auto' or 'ocr'", other)),
        }
    }
}

/// Per-request settings, already validated and capped by the handler
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub language: String,
    pub max_pages: usize,
    /// Deadline covering rasterization and all OCR
    pub request_timeout: Duration,
    pub mode: ProcessMode,
}

/// Lifecycle of one request through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Rasterizing,
    OcrInFlight,
    Aggregating,
    Completed,
    Failed,
}

impl Stage {
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Received, Rasterizing)
                | (Received, Failed)
                | (Rasterizing, OcrInFlight)
                | (Rasterizing, Failed)
                | (OcrInFlight, Aggregating)
                | (Aggregating, Completed)
                | (Aggregating, Failed)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Rasterizing => "rasterizing",
            Stage::OcrInFlight => "ocr_in_flight",
            Stage::Aggregating => "aggregating",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks and logs the stage of one request
#[derive(Debug)]
pub struct StageTracker {
    request_id: Uuid,
    current: Stage,
}

impl StageTracker {
    pub fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            current: Stage::Received,
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.current.can_advance_to(next),
            "illegal stage transition {} -> {}",
            self.current,
            next
        );
        tracing::debug!(
            request_id = %self.request_id,
            from = %self.current,
            to = %next,
            "Pipeline stage"
        );
        self.current = next;
    }
}
