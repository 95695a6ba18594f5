//! YOLOv3 object detection: model loading, forward pass and decoding.

pub mod backend;
pub mod config;
pub mod detection;
pub mod detector;
pub mod errors;
pub mod labels;
pub mod loader;
pub mod processing;

pub use backend::{DefaultBackend, ExecutionTarget, InferenceBackend, InferenceOutput};
pub use config::ModelConfig;
pub use detection::{BoundingBox, Detection, Point};
pub use detector::Detector;
pub use errors::InferenceError;
pub use labels::{ClassLabels, Color};
pub use loader::{ModelStatus, detect_accelerator, load_default_model, load_model};
