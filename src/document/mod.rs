//! Document module
//!
//! Format-agnostic data model shared by the rasterizer, the OCR worker and
//! the pipeline coordinator.
//!
//! A [`Document`] is rasterized into [`Page`]s, each page is recognized into a
//! [`PageResult`], and the coordinator folds those into a [`DocumentResult`]
//! ordered by page index. Word documents skip all of that and are read
//! directly by [`docx_text`].

mod text;
mod types;

#[cfg(test)]
pub(crate) use text::sample_docx;
pub use text::{docx_text, TextError};
pub use types::{
    Document, DocumentFormat, DocumentResult, FailureReason, OverallStatus, Page, PageResult,
    PageStatus, TextSource, DOCX_MIME,
};
