//! MuPDF rasterizer
//!
//! Renders every page of a PDF to PNG in one decode pass on the blocking
//! pool. Raster images skip MuPDF entirely.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document as PdfDocument, Matrix, Pixmap, Rect, TextPageOptions};
use tokio::sync::Semaphore;

use super::{image_page, preflight, RasterError, RasterOptions, Rasterizer};
use crate::document::{Document, Page};

/// PDF user space is 72 units per inch
const PDF_POINTS_PER_INCH: f32 = 72.0;

const DEFAULT_RENDER_CONCURRENCY: usize = 2;

/// Rasterizer backed by MuPDF
#[derive(Debug, Clone)]
pub struct MuPdfRasterizer {
    /// Held for the whole blocking render, even after the caller gives up
    permits: Arc<Semaphore>,
}

impl MuPdfRasterizer {
    pub fn new() -> Self {
        Self::with_concurrency(DEFAULT_RENDER_CONCURRENCY)
    }

    /// Allow at most `concurrency` PDF renders on the blocking pool
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }
}

impl Default for MuPdfRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Flags the blocking render as cancelled when the awaiting future goes away
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl Rasterizer for MuPdfRasterizer {
    async fn rasterize(
        &self,
        document: &Document,
        options: &RasterOptions,
    ) -> Result<Vec<Page>, RasterError> {
        let format = preflight(document)?;
        if format.is_image() {
            return Ok(vec![image_page(document)?]);
        }

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| RasterError::Internal("Render pool closed".to_string()))?;

        let data = document.data.clone();
        let options = options.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel = CancelOnDrop(Arc::clone(&cancelled));

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            render_pdf(&data, &options, &cancelled)
        })
        .await
        .map_err(|e| RasterError::Internal(format!("Task join error: {}", e)))?
    }
}

fn render_pdf(
    data: &[u8],
    options: &RasterOptions,
    cancelled: &AtomicBool,
) -> Result<Vec<Page>, RasterError> {
    let doc = PdfDocument::from_bytes(data, "application/pdf")?;

    let page_count = doc.page_count()?.max(0) as usize;
    if page_count == 0 {
        return Err(RasterError::Corrupt("Document has no pages".to_string()));
    }
    if page_count > options.max_pages {
        return Err(RasterError::TooManyPages {
            actual: page_count,
            limit: options.max_pages,
        });
    }

    let scale = options.dpi as f32 / PDF_POINTS_PER_INCH;
    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();

    // Every page is sized before the first one is rendered
    let mut loaded = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let page = doc
            .load_page(index as i32)
            .map_err(|e| RasterError::Corrupt(format!("Failed to load page {}: {}", index, e)))?;
        let bounds = page.bounds()?;
        let (width, height) = rendered_size(&bounds, scale);
        if width.saturating_mul(height) > options.max_page_pixels {
            return Err(RasterError::PageTooLarge {
                index,
                width,
                height,
                limit: options.max_page_pixels,
            });
        }
        loaded.push(page);
    }

    let mut pages = Vec::with_capacity(page_count);
    for (index, page) in loaded.into_iter().enumerate() {
        if cancelled.load(Ordering::Relaxed) {
            tracing::debug!(rendered = index, "PDF render abandoned by caller");
            return Err(RasterError::Cancelled);
        }

        let pixmap = page
            .to_pixmap(&matrix, &colorspace, false, true)
            .map_err(|e| RasterError::Corrupt(format!("Failed to render page {}: {}", index, e)))?;
        let (image, width, height) = encode_png(&pixmap)?;

        // A page without a readable text layer just goes to OCR
        let text_layer = if options.extract_text_layer {
            page.to_text_page(TextPageOptions::empty())
                .and_then(|text_page| text_page.to_text())
                .ok()
        } else {
            None
        };

        pages.push(Page {
            index,
            image,
            width,
            height,
            text_layer,
        });
    }

    tracing::debug!(pages = pages.len(), dpi = options.dpi, "PDF rasterized");
    Ok(pages)
}

/// Pixel dimensions MuPDF will allocate for a page at `scale`
fn rendered_size(bounds: &Rect, scale: f32) -> (u64, u64) {
    let width = ((bounds.x1 - bounds.x0).abs() * scale).ceil() as u64;
    let height = ((bounds.y1 - bounds.y0).abs() * scale).ceil() as u64;
    (width, height)
}

fn encode_png(pixmap: &Pixmap) -> Result<(Vec<u8>, u32, u32), RasterError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    if n < 3 {
        return Err(RasterError::Internal(format!(
            "Unexpected pixmap component count: {}",
            n
        )));
    }

    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| {
            RasterError::Internal(format!("Pixmap {}x{} is too large to encode", width, height))
        })?;

    let mut rgb_buffer = Vec::with_capacity(len);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            rgb_buffer.extend_from_slice(&[r, g, b]);
        }
    }

    let img = RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| RasterError::Internal("Failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| RasterError::Internal(format!("Failed to encode page: {}", e)))?;

    Ok((output, width, height))
}
