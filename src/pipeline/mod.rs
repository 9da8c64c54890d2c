//! Pipeline Coordinator
//!
//! Rasterize once, fan pages out to OCR under a process-wide permit pool,
//! and fan the results back in by page index.

mod coordinator;
mod error;
mod types;

pub use coordinator::{Coordinator, CoordinatorSettings};
pub use error::PipelineError;
pub use types::{ProcessMode, ProcessOptions, Stage, StageTracker};
