use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Class list {} contains no class names", .0.display())]
    EmptyClassList(PathBuf),

    #[error("Invalid model configuration: {0}")]
    InvalidConfig(String),

    #[error("Preprocessing failed: {0}")]
    Preprocess(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Unexpected output tensor shape {0:?}")]
    OutputShape(Vec<usize>),

    #[error("Inference engine lock poisoned")]
    Poisoned,
}

impl InferenceError {
    pub(crate) fn backend(err: impl fmt::Display) -> Self {
        InferenceError::Backend(err.to_string())
    }
}

#[cfg(feature = "darknet-backend")]
impl From<opencv::Error> for InferenceError {
    fn from(err: opencv::Error) -> Self {
        InferenceError::Backend(err.to_string())
    }
}
