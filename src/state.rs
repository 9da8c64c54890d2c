//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::ocr::{build_engine, OcrEngine};
use crate::pipeline::{Coordinator, CoordinatorSettings};
use crate::raster::{MuPdfRasterizer, Rasterizer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    coordinator: Coordinator,
}

impl AppState {
    /// Create the state with the configured engine and the MuPDF rasterizer
    pub fn new(config: Config) -> Self {
        let engine = build_engine(&config.ocr);
        let rasterizer = Arc::new(MuPdfRasterizer::with_concurrency(config.raster.concurrency));
        Self::with_components(config, rasterizer, engine)
    }

    /// Create the state around explicit capabilities
    pub fn with_components(
        config: Config,
        rasterizer: Arc<dyn Rasterizer>,
        engine: Arc<dyn OcrEngine>,
    ) -> Self {
        let coordinator = Coordinator::new(
            rasterizer,
            engine,
            CoordinatorSettings {
                dpi: config.raster.dpi,
                max_page_pixels: config.limits.max_page_pixels,
                ocr_concurrency: config.limits.ocr_concurrency,
                page_timeout: config.limits.page_timeout(),
            },
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                coordinator,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the pipeline coordinator
    pub fn coordinator(&self) -> &Coordinator {
        &self.inner.coordinator
    }
}
