use super::{ExecutionTarget, InferenceBackend, InferenceOutput, describe_backend};
use crate::config::ModelConfig;
use crate::errors::InferenceError;
use ndarray::{Array, IxDyn};
use opencv::{
    core::{self, Mat, Scalar, Vector},
    dnn,
    prelude::*,
};
use std::path::PathBuf;

const RUNTIME_NAME: &str = "OpenCV DNN";

/// Darknet cfg + weights executed by the OpenCV DNN module.
pub struct DarknetBackend {
    net: dnn::Net,
    output_layers: Vector<String>,
    output_names: Vec<String>,
    target: ExecutionTarget,
}

impl DarknetBackend {
    pub fn load_model_with_target(
        cfg_path: &str,
        weights_path: &str,
        target: ExecutionTarget,
    ) -> Result<Self, InferenceError> {
        let mut net = dnn::read_net_from_darknet(cfg_path, weights_path)?;

        match target {
            ExecutionTarget::Cuda => {
                tracing::info!("Using CUDA backend for OpenCV DNN");
                net.set_preferable_backend(dnn::DNN_BACKEND_CUDA)?;
                net.set_preferable_target(dnn::DNN_TARGET_CUDA)?;
            }
            ExecutionTarget::Cpu => {
                tracing::info!("Using CPU backend for OpenCV DNN");
                net.set_preferable_backend(dnn::DNN_BACKEND_OPENCV)?;
                net.set_preferable_target(dnn::DNN_TARGET_CPU)?;
            }
        }

        let output_layers = net.get_unconnected_out_layers_names()?;
        let output_names: Vec<String> = output_layers.iter().collect();

        tracing::info!(
            cfg = cfg_path,
            weights = weights_path,
            outputs = ?output_names,
            "Darknet network loaded"
        );

        Ok(Self {
            net,
            output_layers,
            output_names,
            target,
        })
    }

    fn blob_to_mat(blob: &Array<f32, IxDyn>) -> Result<Mat, InferenceError> {
        let sizes: Vec<i32> = blob.shape().iter().map(|&d| d as i32).collect();
        let data = blob
            .as_slice()
            .ok_or_else(|| InferenceError::Preprocess("blob is not contiguous".to_string()))?;

        let mut mat = Mat::new_nd_with_default(&sizes, core::CV_32F, Scalar::all(0.0))?;
        mat.data_typed_mut::<f32>()?.copy_from_slice(data);
        Ok(mat)
    }

    fn mat_to_array(mat: &Mat) -> Result<ndarray::ArrayD<f32>, InferenceError> {
        let rows = mat.rows().max(0) as usize;
        let cols = mat.cols().max(0) as usize;
        let data = mat.data_typed::<f32>()?.to_vec();

        Array::from_shape_vec(IxDyn(&[rows, cols]), data)
            .map_err(|_| InferenceError::OutputShape(vec![rows, cols]))
    }
}

impl InferenceBackend for DarknetBackend {
    fn runtime_name() -> &'static str {
        RUNTIME_NAME
    }

    fn required_files(config: &ModelConfig) -> Vec<PathBuf> {
        vec![
            config.cfg_path(),
            config.weights_path(),
            config.classes_path(),
        ]
    }

    fn cuda_available() -> bool {
        core::get_cuda_enabled_device_count()
            .map(|count| count > 0)
            .unwrap_or(false)
    }

    fn load_model(config: &ModelConfig, target: ExecutionTarget) -> Result<Self, InferenceError> {
        Self::load_model_with_target(
            &config.cfg_path().to_string_lossy(),
            &config.weights_path().to_string_lossy(),
            target,
        )
    }

    fn infer(&mut self, blob: &Array<f32, IxDyn>) -> Result<InferenceOutput, InferenceError> {
        let input = Self::blob_to_mat(blob)?;
        self.net.set_input(&input, "", 1.0, Scalar::default())?;

        let mut outputs: Vector<Mat> = Vector::new();
        self.net.forward(&mut outputs, &self.output_layers)?;

        let layers = outputs
            .iter()
            .map(|mat| Self::mat_to_array(&mat))
            .collect::<Result<Vec<_>, _>>()?;

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
