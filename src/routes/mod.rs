//! Route modules for Pagescan Server

pub mod analyze;
pub mod health;
pub mod ocr;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = upload::body_limit(&state.config().limits);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/info", get(health::info))
        .route("/ocr", post(ocr::ocr_document))
        .route("/analyze", post(analyze::analyze_document))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Router and request builders for handler tests
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request},
        response::Response,
        Router,
    };

    use crate::config::Config;
    use crate::ocr::OcrEngine;
    use crate::raster::Rasterizer;
    use crate::state::AppState;

    pub const TEST_MAX_UPLOAD: usize = 4096;
    const BOUNDARY: &str = "pagescan-test-boundary";

    pub fn test_config() -> Config {
        let mut config = Config::default();
        config.limits.max_upload_bytes = TEST_MAX_UPLOAD;
        config
    }

    pub fn app_with(rasterizer: Arc<dyn Rasterizer>, engine: Arc<dyn OcrEngine>) -> Router {
        super::router(AppState::with_components(test_config(), rasterizer, engine))
    }

    pub enum Part<'a> {
        File {
            name: &'a str,
            file_name: &'a str,
            content_type: &'a str,
            data: &'a [u8],
        },
        Text {
            name: &'a str,
            value: &'a str,
        },
    }

    impl<'a> Part<'a> {
        pub fn file(name: &'a str, file_name: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
            Part::File {
                name,
                file_name,
                content_type,
                data,
            }
        }

        pub fn text(name: &'a str, value: &'a str) -> Self {
            Part::Text { name, value }
        }
    }

    pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::File {
                    name,
                    file_name,
                    content_type,
                    data,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            name, file_name, content_type
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(data);
                }
                Part::Text { name, value } => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    pub fn raw_request(uri: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(data.to_vec()))
            .unwrap()
    }

    pub fn raw_request_with_length(
        uri: &str,
        content_type: &str,
        data: &[u8],
        declared_length: usize,
    ) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, declared_length.to_string())
            .body(Body::from(data.to_vec()))
            .unwrap()
    }

    pub async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
