//! Single-label image classification gate.
//!
//! An image is normalized into a model input tensor, run through a fixed
//! pretrained ONNX classifier, and the top label is checked for a target
//! keyword: "is this a hotdog?"

pub mod classifier;
pub mod config;
pub mod decision;
pub mod error;
pub mod labels;
pub mod normalizer;
pub mod pipeline;
pub mod shared;
pub mod utils;

pub use classifier::{Classification, ClassificationResult, Classifier, OnnxClassifier};
pub use config::GateConfig;
pub use decision::{decide, Decision, Target};
pub use error::{GateError, Result};
pub use normalizer::{ImageSource, NormalizedImage, Normalizer};
pub use pipeline::{Outcome, Pipeline, Verdict};
pub use shared::SharedPipeline;
