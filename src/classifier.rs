use std::path::Path;

use ort::{inputs, GraphOptimizationLevel, Session};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{GateConfig, ScoreActivation};
use crate::error::{GateError, Result};
use crate::labels::Labels;
use crate::normalizer::NormalizedImage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    /// In `[0, 1]`.
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Every label the model knows, highest confidence first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub classifications: Vec<Classification>,
}

impl ClassificationResult {
    pub fn new(classifications: Vec<Classification>) -> Self {
        Self { classifications }
    }

    pub fn top(&self) -> Option<&Classification> {
        self.classifications.first()
    }

    pub fn len(&self) -> usize {
        self.classifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifications.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Classification> {
        self.classifications.iter()
    }

    /// The `k` best entries, or all of them if there are fewer.
    pub fn top_k(&self, k: usize) -> &[Classification] {
        &self.classifications[..k.min(self.classifications.len())]
    }
}

/// A pretrained image classifier, treated as a black box.
pub trait Classifier {
    fn classify(&self, image: &NormalizedImage) -> Result<ClassificationResult>;
}

/// Image classifier backed by an ONNX Runtime session.
#[derive(Debug)]
pub struct OnnxClassifier {
    model: Session,
    labels: Labels,
    input_name: String,
    output_name: String,
    activation: ScoreActivation,
}

impl OnnxClassifier {
    pub fn load(config: &GateConfig) -> Result<Self> {
        let labels = Labels::load(&config.labels_path)?;
        let model = Self::load_session(&config.model_path)?;

        let input_name = match &config.input_name {
            Some(name) => name.clone(),
            None => model
                .inputs
                .first()
                .map(|input| input.name.clone())
                .ok_or_else(|| GateError::model_load("model declares no inputs"))?,
        };
        let output_name = match &config.output_name {
            Some(name) => name.clone(),
            None => model
                .outputs
                .first()
                .map(|output| output.name.clone())
                .ok_or_else(|| GateError::model_load("model declares no outputs"))?,
        };

        info!(
            model = %config.model_path.display(),
            labels = labels.len(),
            input = %input_name,
            output = %output_name,
            "classifier loaded"
        );

        Ok(Self {
            model,
            labels,
            input_name,
            output_name,
            activation: config.activation,
        })
    }

    fn load_session(path: &Path) -> Result<Session> {
        if !path.is_file() {
            return Err(GateError::ModelLoad(format!(
                "{}: no such model file",
                path.display()
            )));
        }
        // without a configured intra-op pool ort uses every core
        Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| GateError::ModelLoad(format!("{}: {e}", path.display())))
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, image: &NormalizedImage) -> Result<ClassificationResult> {
        let inputs = inputs![self.input_name.as_str() => image.tensor.view()]
            .map_err(GateError::inference)?;
        let outputs = self.model.run(inputs).map_err(GateError::inference)?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            GateError::Inference(format!("model has no output named {}", self.output_name))
        })?;
        let output = output
            .try_extract_tensor::<f32>()
            .map_err(GateError::inference)?;

        let row = scores(output.shape(), output.iter().copied())?;
        let result = rank(&row, &self.labels, self.activation)?;
        if let Some(top) = result.top() {
            debug!(label = %top.label, confidence = top.confidence, "top classification");
        }
        Ok(result)
    }
}

/// Always answers with the same ranking. Handy for wiring the pipeline
/// without a model.
#[derive(Debug, Clone, Default)]
pub struct StaticClassifier {
    result: ClassificationResult,
}

impl StaticClassifier {
    pub fn new(result: ClassificationResult) -> Self {
        Self { result }
    }
}

impl Classifier for StaticClassifier {
    fn classify(&self, _image: &NormalizedImage) -> Result<ClassificationResult> {
        Ok(self.result.clone())
    }
}

/// Turns one row of raw model scores into a ranked result.
///
/// A row with one more score than there are labels carries a leading
/// background class, which is dropped after activation.
pub fn rank(
    scores: &[f32],
    labels: &Labels,
    activation: ScoreActivation,
) -> Result<ClassificationResult> {
    if scores.is_empty() {
        return Err(GateError::inference("model produced no scores"));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(GateError::inference("model produced non-finite scores"));
    }

    let offset = if scores.len() == labels.len() {
        0
    } else if scores.len() == labels.len() + 1 {
        1
    } else {
        return Err(GateError::Inference(format!(
            "model produced {} scores for {} labels",
            scores.len(),
            labels.len()
        )));
    };

    let activated = match activation {
        ScoreActivation::Softmax => softmax(scores),
        ScoreActivation::Auto if !is_distribution(scores) => softmax(scores),
        ScoreActivation::Auto | ScoreActivation::Raw => scores.to_vec(),
    };

    let mut ranked: Vec<(f32, &str)> = activated
        .into_iter()
        .skip(offset)
        .zip(labels.iter())
        .collect();
    // order by the unclamped score; stable, so ties keep class index order
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let classifications = ranked
        .into_iter()
        .map(|(score, label)| Classification::new(label, score.clamp(0.0, 1.0)))
        .collect();

    Ok(ClassificationResult::new(classifications))
}

/// Flattens one output row. Only `[N]` and `[1, N]` are accepted.
pub fn scores(shape: &[usize], values: impl Iterator<Item = f32>) -> Result<Vec<f32>> {
    match shape {
        [_] | [1, _] => Ok(values.collect()),
        shape => Err(GateError::Inference(format!(
            "unexpected output shape {shape:?}"
        ))),
    }
}

fn is_distribution(scores: &[f32]) -> bool {
    let sum: f32 = scores.iter().sum();
    scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() <= 1e-3
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
