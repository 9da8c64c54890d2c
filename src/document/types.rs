//! Document types
//!
//! The inbound document, the pages rasterized from it, and the per-page and
//! aggregate OCR results returned to callers.

use std::time::Duration;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// How far into a file a PDF header may appear
const PDF_HEADER_SCAN: usize = 1024;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Upload formats, detected from magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Png,
    Jpeg,
    Tiff,
    Bmp,
    Gif,
    Webp,
    /// Word document; a zip archive recognized by its declared type or file name
    Docx,
    /// Plain text, only recognized from the declared type or file name
    Text,
}

impl DocumentFormat {
    /// Detect format from magic bytes
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        let image = match image::guess_format(bytes) {
            Ok(image::ImageFormat::Png) => Some(Self::Png),
            Ok(image::ImageFormat::Jpeg) => Some(Self::Jpeg),
            Ok(image::ImageFormat::Tiff) => Some(Self::Tiff),
            Ok(image::ImageFormat::Bmp) => Some(Self::Bmp),
            Ok(image::ImageFormat::Gif) => Some(Self::Gif),
            Ok(image::ImageFormat::WebP) => Some(Self::Webp),
            _ => None,
        };
        if image.is_some() {
            return image;
        }

        // Some producers emit junk before the header; readers accept it within the first 1KB
        let head = &bytes[..bytes.len().min(PDF_HEADER_SCAN)];
        if head.windows(5).any(|w| w == b"%PDF-") {
            return Some(Self::Pdf);
        }

        None
    }

    /// Map a MIME type to a format
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/tiff" => Some(Self::Tiff),
            "image/bmp" => Some(Self::Bmp),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            "text/plain" => Some(Self::Text),
            DOCX_MIME => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, Self::Pdf | Self::Docx | Self::Text)
    }

    /// Whether the rasterizer can turn this format into pages
    pub fn is_rasterizable(self) -> bool {
        self == Self::Pdf || self.is_image()
    }
}

/// One uploaded document, alive for the duration of a single request
#[derive(Debug, Clone)]
pub struct Document {
    pub data: Bytes,
    /// Declared content type, or one guessed from the file name
    pub content_type: String,
    pub file_name: Option<String>,
    /// Detected format; `None` when the bytes match nothing supported
    pub format: Option<DocumentFormat>,
}

impl Document {
    pub fn new(data: Bytes, content_type: Option<String>, file_name: Option<String>) -> Self {
        let content_type = resolve_content_type(content_type, file_name.as_deref());

        // Magic bytes win over whatever the client declared
        let format = DocumentFormat::from_magic_bytes(&data).or_else(|| {
            match DocumentFormat::from_mime(&content_type) {
                Some(DocumentFormat::Text) => Some(DocumentFormat::Text),
                Some(DocumentFormat::Docx) if data.starts_with(ZIP_MAGIC) => {
                    Some(DocumentFormat::Docx)
                }
                _ => None,
            }
        });

        Self {
            data,
            content_type,
            file_name,
            format,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn resolve_content_type(declared: Option<String>, file_name: Option<&str>) -> String {
    match declared {
        Some(ct) if !ct.is_empty() && !ct.starts_with("application/octet-stream") => ct,
        _ => file_name
            .and_then(|name| mime_guess::from_path(name).first())
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    }
}

/// One rasterized page
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-based position in the source document
    pub index: usize,
    /// Encoded image (PNG for rendered PDF pages, original bytes for images)
    pub image: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Text embedded in the PDF page, when extracted
    pub text_layer: Option<String>,
}

/// Outcome status of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Success,
    Failed,
}

/// Why a page failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Empty or unrecognizable page image; the engine was not called
    InvalidPageImage,
    /// The per-page timeout elapsed
    Timeout,
    /// The whole-request deadline elapsed before this page finished
    RequestTimeout,
    /// The OCR engine reported an error
    OcrFailed,
    /// The page's task never produced a result
    Internal,
}

/// Where a page's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Ocr,
    TextLayer,
}

/// OCR outcome for one page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub index: usize,
    /// Extracted text; empty for blank or failed pages
    pub text: String,
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Mean word confidence (0-100), when the engine reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<TextSource>,
    pub elapsed_ms: u64,
}

impl PageResult {
    pub fn success(
        index: usize,
        text: String,
        confidence: Option<f64>,
        source: TextSource,
        elapsed: Duration,
    ) -> Self {
        Self {
            index,
            text,
            status: PageStatus::Success,
            reason: None,
            message: None,
            confidence,
            source: Some(source),
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn failed(
        index: usize,
        reason: FailureReason,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            index,
            text: String::new(),
            status: PageStatus::Failed,
            reason: Some(reason),
            message: Some(message.into()),
            confidence: None,
            source: None,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PageStatus::Success
    }
}

/// Aggregate status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// Every page succeeded
    Success,
    /// At least one page succeeded and at least one failed
    Partial,
    /// No page succeeded
    Failed,
}

impl OverallStatus {
    pub fn from_pages(pages: &[PageResult]) -> Self {
        let succeeded = pages.iter().filter(|p| p.is_success()).count();
        if succeeded == 0 {
            Self::Failed
        } else if succeeded == pages.len() {
            Self::Success
        } else {
            Self::Partial
        }
    }
}

/// Ordered results for every page of one document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResult {
    pub pages: Vec<PageResult>,
    pub overall_status: OverallStatus,
    pub page_count: usize,
    /// OCR language the pages were recognized with
    pub language: String,
    pub elapsed_ms: u64,
}

impl DocumentResult {
    /// Build from page results whose indices are exactly `0..pages.len()`
    pub fn assemble(mut pages: Vec<PageResult>, language: String, elapsed: Duration) -> Self {
        pages.sort_by_key(|p| p.index);
        debug_assert!(pages.iter().enumerate().all(|(i, p)| p.index == i));

        Self {
            overall_status: OverallStatus::from_pages(&pages),
            page_count: pages.len(),
            pages,
            language,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.pages.iter().filter(|p| p.is_success()).count()
    }

    /// Text of all successful pages, in page order
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .filter(|p| p.is_success())
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
