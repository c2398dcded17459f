use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisResult, AnalyzeImageBody, EncodedImage, DEFAULT_MEDIA_TYPE};
use crate::pipeline::Analyzer;
use crate::preprocess::{self, PrepareOptions, SourceImage};

// Raw phone photos easily exceed axum's 2 MB default.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub struct AppState {
    pub analyzer: Analyzer,
    pub prepare: PrepareOptions,
}

pub fn router(state: Arc<AppState>, static_dir: Option<PathBuf>) -> Router {
    let app = Router::new()
        .route(
            "/api/analyzeImage",
            post(analyze_image_handler).fallback(method_not_allowed),
        )
        .route(
            "/api/analyze",
            post(upload_handler).fallback(method_not_allowed),
        )
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match static_dir {
        Some(dir) => {
            info!("Serving static files from {}", dir.display());
            app.fallback_service(ServeDir::new(dir))
        }
        None => app,
    }
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method Not Allowed" })),
    )
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "backend": state.analyzer.backend().kind().as_str(),
    }))
}

async fn analyze_image_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AnalysisResult>> {
    // A body that is not the expected JSON is handled as one without images.
    let body: AnalyzeImageBody = serde_json::from_slice(&body).unwrap_or_else(|e| {
        warn!("Unreadable analyze body: {}", e);
        AnalyzeImageBody::default()
    });

    let images = body.encoded_images();
    info!("Received {} image(s) for analysis", images.len());

    run(&state, images, body.model).await
}

async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResult>> {
    let mut sources = Vec::new();
    let mut model = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AnalysisError::Validation(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "images" => {
                let media_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_MEDIA_TYPE)
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    AnalysisError::Validation(format!("Failed to read image: {}", e))
                })?;
                if !bytes.is_empty() {
                    sources.push(SourceImage {
                        bytes: bytes.to_vec(),
                        media_type,
                    });
                }
            }
            "model" => {
                model = Some(field.text().await.map_err(|e| {
                    AnalysisError::Validation(format!("Failed to read model: {}", e))
                })?);
            }
            _ => {}
        }
    }

    if sources.is_empty() {
        return Err(AnalysisError::no_images());
    }

    info!("Received {} upload(s), preparing...", sources.len());

    let images = preprocess::prepare_batch(sources, state.prepare)
        .await
        .map_err(|e| {
            error!("Image preparation failed: {}", e);
            e
        })?;

    run(&state, images, model).await
}

async fn run(
    state: &AppState,
    images: Vec<EncodedImage>,
    model: Option<String>,
) -> Result<Json<AnalysisResult>> {
    let result = state.analyzer.analyze(images, model).await.map_err(|e| {
        error!("Analysis failed: {}", e);
        e
    })?;

    info!("Analysis complete: {}", result.product_name);
    Ok(Json(result))
}
