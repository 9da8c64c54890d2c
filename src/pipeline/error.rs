//! Pipeline error types

use thiserror::Error;

use super::types::Stage;
use crate::raster::RasterError;

/// Terminal failure of a request; per-page failures never end up here
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Rasterization(#[from] RasterError),

    #[error("Request deadline elapsed after {elapsed_ms} ms while {stage}")]
    RequestTimeout { stage: Stage, elapsed_ms: u64 },

    #[error("Pipeline fault: {0}")]
    Internal(String),
}
