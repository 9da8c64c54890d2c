//! Page Rasterizer
//!
//! Turns an uploaded document into an ordered list of page images:
//! - PDF: one PNG per page, rendered by MuPDF at the configured DPI
//! - Raster image: passed through as a single page
//!
//! Page count and page size ceilings are enforced before any page is rendered.

mod error;
mod pdf;

use std::io::Cursor;

use async_trait::async_trait;

pub use error::RasterError;
pub use pdf::MuPdfRasterizer;

use crate::document::{Document, DocumentFormat, Page};

/// Rasterization options
#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Reject documents with more pages than this
    pub max_pages: usize,
    /// Render resolution for PDF pages
    pub dpi: u32,
    /// Reject pages that would render to more pixels than this
    pub max_page_pixels: u64,
    /// Also pull the embedded text layer of each PDF page
    pub extract_text_layer: bool,
}

/// Document to page images
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Rasterize every page, returned with indices `0..n` in order
    async fn rasterize(
        &self,
        document: &Document,
        options: &RasterOptions,
    ) -> Result<Vec<Page>, RasterError>;
}

/// Checks shared by every rasterizer before any decoding happens
pub fn preflight(document: &Document) -> Result<DocumentFormat, RasterError> {
    if document.is_empty() {
        return Err(RasterError::EmptyDocument);
    }

    match document.format {
        Some(format) if format.is_rasterizable() => Ok(format),
        _ => Err(RasterError::UnsupportedFormat(
            document.content_type.clone(),
        )),
    }
}

/// A raster image upload becomes one page holding the original bytes
pub fn image_page(document: &Document) -> Result<Page, RasterError> {
    let (width, height) = image::ImageReader::new(Cursor::new(&document.data[..]))
        .with_guessed_format()
        .map_err(|e| RasterError::Corrupt(e.to_string()))?
        .into_dimensions()
        .map_err(|e| RasterError::Corrupt(format!("Failed to read image header: {}", e)))?;

    Ok(Page {
        index: 0,
        image: document.data.to_vec(),
        width,
        height,
        text_layer: None,
    })
}
