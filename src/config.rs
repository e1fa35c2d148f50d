use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};

/// Memory layout of the model input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
    /// `[1, 3, height, width]`
    #[default]
    Nchw,
    /// `[1, height, width, 3]`
    Nhwc,
}

/// How raw model scores are turned into confidences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScoreActivation {
    /// Softmax only when the scores are not already a distribution.
    #[default]
    Auto,
    Softmax,
    /// Scores are used as produced, clamped to `[0, 1]` for reporting.
    Raw,
}

/// Preprocessing parameters for the model input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub width: u32,
    pub height: u32,
    pub layout: TensorLayout,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for InputConfig {
    fn default() -> Self {
        // Inception v3, ImageNet statistics
        Self {
            width: 299,
            height: 299,
            layout: TensorLayout::Nchw,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

impl InputConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GateError::Config(format!(
                "input size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.std.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(GateError::Config(format!(
                "std must be finite and non-zero, got {:?}",
                self.std
            )));
        }
        Ok(())
    }
}

/// Everything needed to build a gate: model assets, preprocessing and the
/// target keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub target: String,
    /// Defaults to the model's first input.
    pub input_name: Option<String>,
    /// Defaults to the model's first output.
    pub output_name: Option<String>,
    pub activation: ScoreActivation,
    pub input: InputConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/inception_v3.onnx"),
            labels_path: PathBuf::from("models/imagenet_labels.txt"),
            target: "hotdog".to_string(),
            input_name: None,
            output_name: None,
            activation: ScoreActivation::Auto,
            input: InputConfig::default(),
        }
    }
}

impl GateConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GateError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| GateError::Config(e.to_string()))?;
        config.input.validate()?;
        Ok(config)
    }
}
