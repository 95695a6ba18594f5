use crate::error::ApiError;
use crate::quality::{self, Grade, QualityIssue, Verdict};
use crate::render::Renderer;
use crate::state::AppState;
use crate::upload::{self, Upload};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use image::RgbImage;
use inference::{Detection, Detector};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

pub const SERVICE_NAME: &str = "YOLOv3 Detection Service";
pub const MODEL_NAME: &str = "Custom YOLOv3";
pub const ENDPOINTS: [&str; 4] = ["/health", "/detect", "/quality-check", "/batch-detect"];

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub service: &'static str,
    pub status: &'static str,
    pub model_loaded: bool,
    pub version: &'static str,
    pub endpoints: [&'static str; 4],
}

#[derive(Debug, Serialize)]
pub struct ThresholdInfo {
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: &'static str,
    pub classes: Vec<String>,
    pub total_classes: usize,
    pub backend: String,
    pub config: ThresholdInfo,
    pub ready: bool,
}

#[derive(Debug, Serialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub classes: usize,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub success: bool,
    pub detections: Vec<Detection>,
    pub count: usize,
    pub image_with_boxes: String,
    pub image_size: ImageSize,
    pub model_info: ModelInfo,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Detected {
        filename: Option<String>,
        detections: Vec<Detection>,
        count: usize,
    },
    Failed {
        filename: Option<String>,
        error: String,
    },
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub total_images: usize,
    pub results: Vec<BatchItem>,
}

#[derive(Debug, Serialize)]
pub struct QualityResponse {
    pub success: bool,
    pub quality_score: u32,
    pub grade: Grade,
    pub issues: Vec<QualityIssue>,
    pub detections: Vec<Detection>,
    pub status: Verdict,
    pub image_with_boxes: String,
}

pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    state.metrics.record_request("/");
    Json(RootResponse {
        service: SERVICE_NAME,
        status: "running",
        model_loaded: state.model.is_ready(),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS,
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    state.metrics.record_request("/health");
    let ready = state.model.is_ready();
    let classes = state
        .model
        .detector()
        .map(|detector| detector.labels().names().to_vec())
        .unwrap_or_default();

    Json(HealthResponse {
        status: if ready { "healthy" } else { "model_not_loaded" },
        model: MODEL_NAME,
        total_classes: classes.len(),
        classes,
        backend: state.model.backend_description().to_string(),
        config: ThresholdInfo {
            confidence_threshold: state.model_config.confidence_threshold,
            nms_threshold: state.model_config.nms_threshold,
        },
        ready,
    })
}

pub async fn detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    state.metrics.record_request("/detect");
    let detector = state.detector()?;
    let mut multipart = upload::accept(multipart)?;
    let Upload { filename, bytes } = upload::single_file(&mut multipart, "file").await?;
    let image = upload::decode_image(&bytes)?;
    let (width, height) = image.dimensions();
    tracing::info!(?filename, width, height, "Detect request");

    let (detections, image_with_boxes) = detect_and_render(&state, detector.clone(), image)
        .await
        .map_err(ApiError::DetectionFailed)?;

    Ok(Json(DetectResponse {
        success: true,
        count: detections.len(),
        detections,
        image_with_boxes,
        image_size: ImageSize { width, height },
        model_info: ModelInfo {
            classes: detector.labels().len(),
            confidence_threshold: detector.confidence_threshold(),
            nms_threshold: detector.nms_threshold(),
        },
    }))
}

pub async fn batch_detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    state.metrics.record_request("/batch-detect");
    let detector = state.detector()?;
    let mut multipart = upload::accept(multipart)?;
    let uploads = upload::all_files(&mut multipart, "files").await?;
    tracing::info!(files = uploads.len(), "Batch detect request");

    let mut results = Vec::with_capacity(uploads.len());
    for Upload { filename, bytes } in uploads {
        let outcome = match upload::decode_image(&bytes) {
            Ok(image) => detect_only(&state, detector.clone(), image).await,
            Err(e) => Err(e.to_string()),
        };

        results.push(match outcome {
            Ok(detections) => BatchItem::Detected {
                filename,
                count: detections.len(),
                detections,
            },
            Err(error) => {
                tracing::warn!(?filename, %error, "Batch item failed");
                BatchItem::Failed { filename, error }
            }
        });
    }

    Ok(Json(BatchResponse {
        success: true,
        total_images: results.len(),
        results,
    }))
}

pub async fn quality_check(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<QualityResponse>, ApiError> {
    state.metrics.record_request("/quality-check");
    let detector = state.detector()?;
    let mut multipart = upload::accept(multipart)?;
    let Upload { bytes, .. } = upload::single_file(&mut multipart, "file").await?;
    let image = upload::decode_image(&bytes)?;

    let (detections, image_with_boxes) = detect_and_render(&state, detector, image)
        .await
        .map_err(ApiError::QualityCheckFailed)?;

    let report = quality::assess(&detections);
    tracing::info!(
        score = report.quality_score,
        grade = ?report.grade,
        issues = report.issues.len(),
        "Quality check complete"
    );

    Ok(Json(QualityResponse {
        success: true,
        quality_score: report.quality_score,
        grade: report.grade,
        issues: report.issues,
        detections,
        status: report.status,
        image_with_boxes,
    }))
}

/// Inference and rendering on the blocking pool; errors are flattened to
/// their message for the caller to wrap.
async fn detect_and_render(
    state: &AppState,
    detector: Arc<Detector>,
    image: RgbImage,
) -> Result<(Vec<Detection>, String), String> {
    let renderer: Arc<Renderer> = state.renderer.clone();
    let metrics = state.metrics.clone();

    tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let started = Instant::now();
        let detections = detector.detect(&image)?;
        metrics.record_inference(started.elapsed(), detections.len());
        let encoded = renderer.render_base64(&image, &detections, detector.labels())?;
        Ok((detections, encoded))
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| e.to_string())
}

async fn detect_only(
    state: &AppState,
    detector: Arc<Detector>,
    image: RgbImage,
) -> Result<Vec<Detection>, String> {
    let metrics = state.metrics.clone();

    tokio::task::spawn_blocking(move || {
        let started = Instant::now();
        let detections = detector.detect(&image)?;
        metrics.record_inference(started.elapsed(), detections.len());
        Ok::<_, inference::InferenceError>(detections)
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| e.to_string())
}
