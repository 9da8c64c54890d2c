//! Pagescan Server Library
//!
//! OCR service that turns uploaded PDFs and images into ordered page text.
//! The binary in main.rs wires these modules into an axum server; tests
//! drive the same router directly.
//!
//! # Modules
//!
//! - `document`: Documents, pages and per-page/aggregate results
//! - `raster`: Document to page-image conversion (MuPDF)
//! - `ocr`: OCR engines and the per-page worker
//! - `pipeline`: Rasterize, fan out OCR, fan in ordered results
//! - `routes`: HTTP surface
//! - `analysis`: Contract clause heuristics over extracted text

pub mod analysis;
pub mod config;
pub mod document;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod raster;
pub mod routes;
pub mod state;

pub use config::Config;
pub use state::AppState;
