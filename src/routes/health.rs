//! Health check endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::LimitsConfig;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "pagescan-server",
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub version: &'static str,
    pub engine: String,
    pub engine_available: bool,
    pub default_language: String,
    pub raster_dpi: u32,
    pub limits: LimitsConfig,
}

/// Engine and limit details, probing the engine on each call
pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    let engine = state.coordinator().engine();
    let config = state.config();

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION"),
        engine: engine.kind().to_string(),
        engine_available: engine.is_available().await,
        default_language: config.ocr.default_language.clone(),
        raster_dpi: config.raster.dpi,
        limits: config.limits.clone(),
    })
}
