use crate::errors::InferenceError;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;

/// Where the model lives and how its output is filtered.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    /// Darknet network definition.
    pub cfg_file: String,
    /// Darknet trained weights.
    pub weights_file: String,
    /// ONNX export carrying definition and weights in one file.
    pub onnx_file: String,
    pub classes_file: String,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    pub prefer_gpu: bool,
}

impl ModelConfig {
    pub fn cfg_path(&self) -> PathBuf {
        self.model_dir.join(&self.cfg_file)
    }

    pub fn weights_path(&self) -> PathBuf {
        self.model_dir.join(&self.weights_file)
    }

    pub fn onnx_path(&self) -> PathBuf {
        self.model_dir.join(&self.onnx_file)
    }

    pub fn classes_path(&self) -> PathBuf {
        self.model_dir.join(&self.classes_file)
    }

    pub fn input_size(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }

    pub fn validate(&self) -> Result<(), InferenceError> {
        for (name, value) in [
            ("confidence_threshold", self.confidence_threshold),
            ("nms_threshold", self.nms_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(InferenceError::InvalidConfig(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.input_width == 0 || self.input_height == 0 {
            return Err(InferenceError::InvalidConfig(format!(
                "input size must be non-zero, got {}x{}",
                self.input_width, self.input_height
            )));
        }

        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let (input_width, input_height) = preprocess::DEFAULT_INPUT_SIZE;
        Self {
            model_dir: PathBuf::from("models"),
            cfg_file: "yolov3.cfg".to_string(),
            weights_file: "yolov3.weights".to_string(),
            onnx_file: "yolov3.onnx".to_string(),
            classes_file: "classes.txt".to_string(),
            input_width,
            input_height,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            prefer_gpu: true,
        }
    }
}
