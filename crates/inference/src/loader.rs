//! Startup loading of the detection network.
//!
//! Loading never aborts the process: any missing file or runtime failure
//! leaves the service up with a [`ModelStatus::NotReady`] explaining why.

use crate::backend::{DefaultBackend, ExecutionTarget, InferenceBackend, describe_backend};
use crate::config::ModelConfig;
use crate::detector::Detector;
use crate::errors::InferenceError;
use crate::labels::ClassLabels;
use std::sync::Arc;

pub enum ModelStatus {
    Ready(Arc<Detector>),
    NotReady {
        reason: String,
        /// Backend that would have been used, for health reporting.
        backend: String,
    },
}

impl ModelStatus {
    pub fn detector(&self) -> Option<&Arc<Detector>> {
        match self {
            ModelStatus::Ready(detector) => Some(detector),
            ModelStatus::NotReady { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStatus::Ready(_))
    }

    pub fn backend_description(&self) -> &str {
        match self {
            ModelStatus::Ready(detector) => detector.backend_description(),
            ModelStatus::NotReady { backend, .. } => backend,
        }
    }
}

/// Load with whichever backend the crate was built for.
pub fn load_default_model(config: &ModelConfig) -> ModelStatus {
    load_model::<DefaultBackend>(config)
}

/// Whether backend `B` can run on a CUDA device in this process.
pub fn detect_accelerator<B: InferenceBackend>() -> bool {
    let available = B::cuda_available();
    tracing::info!(runtime = B::runtime_name(), cuda = available, "Accelerator detection");
    available
}

pub fn load_model<B: InferenceBackend + 'static>(config: &ModelConfig) -> ModelStatus {
    let target = ExecutionTarget::select(detect_accelerator::<B>(), config.prefer_gpu);
    let backend = describe_backend(B::runtime_name(), target);

    match try_load::<B>(config, target) {
        Ok(detector) => {
            tracing::info!(
                backend = %detector.backend_description(),
                target = %detector.target(),
                classes = detector.labels().len(),
                outputs = ?detector.output_names(),
                confidence_threshold = detector.confidence_threshold(),
                nms_threshold = detector.nms_threshold(),
                "Model ready"
            );
            ModelStatus::Ready(Arc::new(detector))
        }
        Err(e) => {
            if let InferenceError::MissingFile(path) = &e {
                tracing::warn!(
                    path = %path.display(),
                    model_dir = %config.model_dir.display(),
                    "Model file not found; place the model files in the model directory"
                );
            } else {
                tracing::error!(error = %e, "Failed to load model");
            }
            ModelStatus::NotReady {
                reason: e.to_string(),
                backend,
            }
        }
    }
}

fn try_load<B: InferenceBackend + 'static>(
    config: &ModelConfig,
    target: ExecutionTarget,
) -> Result<Detector, InferenceError> {
    if let Some(missing) = B::required_files(config)
        .into_iter()
        .find(|path| !path.exists())
    {
        return Err(InferenceError::MissingFile(missing));
    }

    let labels = ClassLabels::from_file(&config.classes_path())?;
    tracing::info!(count = labels.len(), "Loaded class names");

    tracing::info!(runtime = B::runtime_name(), %target, "Loading network");
    let backend = B::load_model(config, target)?;

    Ok(Detector::new(Box::new(backend), labels, config))
}
