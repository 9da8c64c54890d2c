//! Configuration management for Pagescan Server
//!
//! Read once at startup from the environment (optionally seeded by a `.env`
//! file) and passed explicitly to the router and the pipeline afterwards.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::ocr::{validate_language, OcrEngineKind};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub raster: RasterConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Resource ceilings enforced per request and process-wide
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsConfig {
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
    /// Largest accepted page count per document
    pub max_pages: usize,
    /// Largest rendered page, in pixels (width x height)
    pub max_page_pixels: u64,
    /// OCR invocations allowed in flight across all requests
    pub ocr_concurrency: usize,
    pub page_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl LimitsConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone)]
pub struct RasterConfig {
    /// Render resolution for PDF pages
    pub dpi: u32,
    /// PDF renders allowed on the blocking pool at once
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub engine: OcrEngineKind,
    pub default_language: String,
    pub tesseract_path: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            limits: LimitsConfig {
                max_upload_bytes: 25 * 1024 * 1024,
                max_pages: 20,
                max_page_pixels: 40_000_000,
                ocr_concurrency: 3,
                page_timeout_ms: 30_000,
                request_timeout_ms: 120_000,
            },
            raster: RasterConfig {
                dpi: 200,
                concurrency: 2,
            },
            ocr: OcrConfig {
                engine: OcrEngineKind::Tesseract,
                default_language: "eng".to_string(),
                tesseract_path: "tesseract".to_string(),
                ollama_url: "http://localhost:11434".to_string(),
                ollama_model: "llava".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// Unset variables fall back to defaults; set but unparseable ones are
    /// rejected rather than silently replaced.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        // PORT is what container platforms inject; SERVER_PORT is the long form
        let port_key = if lookup("PORT").is_some() {
            "PORT"
        } else {
            "SERVER_PORT"
        };

        let config = Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var(&lookup, port_key, defaults.server.port)?,
            },
            limits: LimitsConfig {
                max_upload_bytes: parse_var(
                    &lookup,
                    "MAX_UPLOAD_BYTES",
                    defaults.limits.max_upload_bytes,
                )?,
                max_pages: parse_var(&lookup, "MAX_PAGES", defaults.limits.max_pages)?,
                max_page_pixels: parse_var(
                    &lookup,
                    "MAX_PAGE_PIXELS",
                    defaults.limits.max_page_pixels,
                )?,
                ocr_concurrency: parse_var(
                    &lookup,
                    "OCR_CONCURRENCY",
                    defaults.limits.ocr_concurrency,
                )?,
                page_timeout_ms: parse_var(
                    &lookup,
                    "OCR_PAGE_TIMEOUT_MS",
                    defaults.limits.page_timeout_ms,
                )?,
                request_timeout_ms: parse_var(
                    &lookup,
                    "REQUEST_TIMEOUT_MS",
                    defaults.limits.request_timeout_ms,
                )?,
            },
            raster: RasterConfig {
                dpi: parse_var(&lookup, "RASTER_DPI", defaults.raster.dpi)?,
                concurrency: parse_var(
                    &lookup,
                    "RENDER_CONCURRENCY",
                    defaults.raster.concurrency,
                )?,
            },
            ocr: OcrConfig {
                engine: parse_var(&lookup, "OCR_ENGINE", defaults.ocr.engine)?,
                default_language: lookup("OCR_LANGUAGE").unwrap_or(defaults.ocr.default_language),
                tesseract_path: lookup("TESSERACT_PATH").unwrap_or(defaults.ocr.tesseract_path),
                ollama_url: lookup("OLLAMA_URL").unwrap_or(defaults.ocr.ollama_url),
                ollama_model: lookup("OLLAMA_MODEL").unwrap_or(defaults.ocr.ollama_model),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        positive("MAX_UPLOAD_BYTES", limits.max_upload_bytes as u64)?;
        positive("MAX_PAGES", limits.max_pages as u64)?;
        positive("MAX_PAGE_PIXELS", limits.max_page_pixels)?;
        positive("OCR_CONCURRENCY", limits.ocr_concurrency as u64)?;
        positive("OCR_PAGE_TIMEOUT_MS", limits.page_timeout_ms)?;
        positive("REQUEST_TIMEOUT_MS", limits.request_timeout_ms)?;
        positive("RENDER_CONCURRENCY", self.raster.concurrency as u64)?;

        if !(36..=600).contains(&self.raster.dpi) {
            return Err(ConfigError::Invalid {
                key: "RASTER_DPI",
                value: self.raster.dpi.to_string(),
                reason: "must be between 36 and 600".to_string(),
            });
        }

        validate_language(&self.ocr.default_language).map_err(|e| ConfigError::Invalid {
            key: "OCR_LANGUAGE",
            value: self.ocr.default_language.clone(),
            reason: e.to_string(),
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn positive(key: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
