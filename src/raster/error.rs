//! Rasterization error types

use thiserror::Error;

/// Rasterization error type
#[derive(Debug, Error)]
pub enum RasterError {
    /// Zero-byte upload
    #[error("Document is empty")]
    EmptyDocument,

    /// Neither a PDF nor a supported raster image
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Document could not be decoded or rendered
    #[error("Document could not be rasterized: {0}")]
    Corrupt(String),

    /// Page ceiling exceeded (checked before rendering)
    #[error("Document has {actual} pages, limit is {limit}")]
    TooManyPages { actual: usize, limit: usize },

    /// A page would render to more pixels than allowed (checked before rendering)
    #[error("Page {index} would render at {width}x{height} pixels, limit is {limit}")]
    PageTooLarge {
        index: usize,
        width: u64,
        height: u64,
        limit: u64,
    },

    /// The caller stopped waiting for the render
    #[error("Rendering cancelled")]
    Cancelled,

    /// Failure of the rasterization machinery itself
    #[error("Rasterizer failure: {0}")]
    Internal(String),
}

impl From<mupdf::Error> for RasterError {
    fn from(err: mupdf::Error) -> Self {
        RasterError::Corrupt(err.to_string())
    }
}
