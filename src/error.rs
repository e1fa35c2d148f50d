use thiserror::Error;

/// Failures of the classification gate.
///
/// Every variant is recoverable: the caller may log it and try again with
/// another image.
#[derive(Error, Debug)]
pub enum GateError {
    /// The image could not be decoded or converted into the model input.
    #[error("image conversion failed: {0}")]
    Conversion(String),

    /// The model or its label file is missing or corrupt.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// The runtime failed, or produced no usable classification.
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GateError {
    pub fn conversion(err: impl std::fmt::Display) -> Self {
        Self::Conversion(err.to_string())
    }

    pub fn model_load(err: impl std::fmt::Display) -> Self {
        Self::ModelLoad(err.to_string())
    }

    pub fn inference(err: impl std::fmt::Display) -> Self {
        Self::Inference(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
