use super::{ExecutionTarget, InferenceBackend, InferenceOutput, describe_backend};
use crate::config::ModelConfig;
use crate::errors::InferenceError;
use ndarray::{Array, IxDyn};
use ort::{
    execution_providers::{CUDAExecutionProvider, ExecutionProvider},
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use std::path::PathBuf;

const RUNTIME_NAME: &str = "ONNX Runtime";

/// YOLOv3 exported to ONNX, emitting Darknet-style rows per output layer.
pub struct OrtBackend {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
    target: ExecutionTarget,
}

impl OrtBackend {
    /// Load model with specified execution target
    pub fn load_model_with_target(
        path: &str,
        target: ExecutionTarget,
    ) -> Result<Self, InferenceError> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()
            .map_err(InferenceError::backend)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(InferenceError::backend)?
            .with_intra_threads(4)
            .map_err(InferenceError::backend)?;

        match target {
            ExecutionTarget::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder
                    .with_execution_providers([CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure()])
                    .map_err(InferenceError::backend)?;
            }
            ExecutionTarget::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder
            .commit_from_file(path)
            .map_err(InferenceError::backend)?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| InferenceError::Backend("model declares no inputs".to_string()))?;

        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();

        tracing::info!(
            path,
            input = %input_name,
            outputs = ?output_names,
            "Model loaded"
        );

        Ok(Self {
            session,
            input_name,
            output_names,
            target,
        })
    }
}

impl InferenceBackend for OrtBackend {
    fn runtime_name() -> &'static str {
        RUNTIME_NAME
    }

    fn required_files(config: &ModelConfig) -> Vec<PathBuf> {
        vec![config.onnx_path(), config.classes_path()]
    }

    fn cuda_available() -> bool {
        CUDAExecutionProvider::default()
            .is_available()
            .unwrap_or(false)
    }

    fn load_model(config: &ModelConfig, target: ExecutionTarget) -> Result<Self, InferenceError> {
        let path = config.onnx_path();
        Self::load_model_with_target(&path.to_string_lossy(), target)
    }

    fn infer(&mut self, blob: &Array<f32, IxDyn>) -> Result<InferenceOutput, InferenceError> {
        let input = TensorRef::from_array_view(blob.view()).map_err(InferenceError::backend)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(InferenceError::backend)?;

        let mut layers = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let layer = outputs[name.as_str()]
                .try_extract_array::<f32>()
                .map_err(InferenceError::backend)?;
            layers.push(layer.into_owned());
        }

        Ok(InferenceOutput { layers })
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn target(&self) -> ExecutionTarget {
        self.target
    }

    fn description(&self) -> String {
        describe_backend(RUNTIME_NAME, self.target)
    }
}
