use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::render::Renderer;
use inference::{Detector, ModelConfig, ModelStatus};
use std::sync::Arc;

/// Read-only service context built once at startup and shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelStatus>,
    pub model_config: Arc<ModelConfig>,
    pub renderer: Arc<Renderer>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(model: ModelStatus, model_config: ModelConfig, renderer: Renderer) -> Self {
        Self {
            model: Arc::new(model),
            model_config: Arc::new(model_config),
            renderer: Arc::new(renderer),
            metrics: Metrics::new(),
        }
    }

    pub fn detector(&self) -> Result<Arc<Detector>, ApiError> {
        self.model.detector().cloned().ok_or(ApiError::ModelNotLoaded)
    }
}
