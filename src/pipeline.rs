use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::{ClassificationResult, Classifier, OnnxClassifier};
use crate::config::GateConfig;
use crate::decision::{decide, Decision, Target};
use crate::error::Result;
use crate::normalizer::{ImageSource, Normalizer};

/// What a caller of the gate gets back for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: String,
    pub confidence: f32,
    pub is_match: bool,
}

/// The decision plus the full ranking it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub decision: Decision,
    pub ranking: ClassificationResult,
}

impl Outcome {
    pub fn verdict(&self) -> Verdict {
        Verdict {
            label: self.decision.label.clone(),
            confidence: self.decision.confidence,
            is_match: self.decision.is_match,
        }
    }
}

/// Normalize, classify, decide. One image at a time.
#[derive(Debug)]
pub struct Pipeline<C> {
    normalizer: Normalizer,
    classifier: C,
    target: Target,
}

impl Pipeline<OnnxClassifier> {
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        let target = Target::new(config.target.clone())?;
        let normalizer = Normalizer::new(config.input)?;
        let classifier = OnnxClassifier::load(config)?;
        Ok(Self::new(normalizer, classifier, target))
    }
}

impl<C: Classifier> Pipeline<C> {
    pub fn new(normalizer: Normalizer, classifier: C, target: Target) -> Self {
        Self {
            normalizer,
            classifier,
            target,
        }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn run(&mut self, source: ImageSource) -> Result<Outcome> {
        let image = self.normalizer.normalize_source(source)?;
        let ranking = self.classifier.classify(&image)?;
        let decision = decide(&ranking, &self.target)?;

        info!(
            label = %decision.label,
            confidence = decision.confidence,
            is_match = decision.is_match,
            "{}",
            decision.title()
        );

        Ok(Outcome { decision, ranking })
    }

    /// A cancelled acquisition (`None`) skips classification without error.
    pub fn run_optional(&mut self, source: Option<ImageSource>) -> Result<Option<Outcome>> {
        match source {
            Some(source) => self.run(source).map(Some),
            None => {
                debug!("no image acquired, skipping classification");
                Ok(None)
            }
        }
    }

    pub fn classify_image(&mut self, source: impl Into<ImageSource>) -> Result<Verdict> {
        self.run(source.into()).map(|outcome| outcome.verdict())
    }
}
