use crate::config::ModelConfig;
use crate::errors::InferenceError;
use ndarray::{Array, ArrayD, IxDyn};
use std::fmt;
use std::path::PathBuf;

#[cfg(feature = "ort-backend")]
pub mod ort;

#[cfg(feature = "darknet-backend")]
pub mod darknet;

#[cfg(feature = "darknet-backend")]
pub use darknet::DarknetBackend as DefaultBackend;

#[cfg(all(feature = "ort-backend", not(feature = "darknet-backend")))]
pub use self::ort::OrtBackend as DefaultBackend;

#[cfg(not(any(feature = "ort-backend", feature = "darknet-backend")))]
compile_error!("At least one backend feature must be enabled: 'ort-backend' or 'darknet-backend'");

/// Hardware a backend runs the forward pass on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionTarget {
    Cpu,
    Cuda,
}

impl ExecutionTarget {
    /// Pick CUDA only when a device is present and the caller wants it.
    pub fn select(cuda_available: bool, prefer_gpu: bool) -> Self {
        if cuda_available && prefer_gpu {
            ExecutionTarget::Cuda
        } else {
            ExecutionTarget::Cpu
        }
    }
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTarget::Cpu => write!(f, "CPU"),
            ExecutionTarget::Cuda => write!(f, "CUDA"),
        }
    }
}

/// Human-readable runtime + target, e.g. "ONNX Runtime with CUDA".
pub fn describe_backend(runtime: &str, target: ExecutionTarget) -> String {
    match target {
        ExecutionTarget::Cuda => format!("{} with CUDA", runtime),
        ExecutionTarget::Cpu => format!("{} (CPU)", runtime),
    }
}

pub trait InferenceBackend: Send {
    /// Name of the runtime, used in health reports.
    fn runtime_name() -> &'static str
    where
        Self: Sized;

    /// Files that must exist before loading is attempted.
    fn required_files(config: &ModelConfig) -> Vec<PathBuf>
    where
        Self: Sized;

    /// Whether a CUDA device is usable by this runtime.
    fn cuda_available() -> bool
    where
        Self: Sized;

    fn load_model(config: &ModelConfig, target: ExecutionTarget) -> Result<Self, InferenceError>
    where
        Self: Sized;

    /// Run a forward pass on a `[1, 3, H, W]` blob.
    fn infer(&mut self, blob: &Array<f32, IxDyn>) -> Result<InferenceOutput, InferenceError>;

    /// Names of the terminal layers whose tensors `infer` returns.
    fn output_names(&self) -> &[String];

    fn target(&self) -> ExecutionTarget;

    fn description(&self) -> String;
}

/// One array per output layer; each row is
/// `[cx, cy, w, h, objectness, class scores...]`, boxes normalized to 0-1.
pub struct InferenceOutput {
    pub layers: Vec<ArrayD<f32>>,
}
