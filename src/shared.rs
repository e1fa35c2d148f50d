use std::sync::Arc;

use tokio::sync::Mutex;

use crate::classifier::Classifier;
use crate::error::{GateError, Result};
use crate::normalizer::ImageSource;
use crate::pipeline::{Outcome, Pipeline, Verdict};

/// Async front for a [`Pipeline`].
///
/// Requests queue on a fair mutex and each one runs to completion on the
/// blocking pool before the next starts, so request N is decided before
/// request N + 1 begins. There is no cancellation or timeout.
pub struct SharedPipeline<C> {
    inner: Arc<Mutex<Pipeline<C>>>,
}

impl<C> Clone for SharedPipeline<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Classifier + Send + 'static> SharedPipeline<C> {
    pub fn new(pipeline: Pipeline<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    pub async fn run(&self, source: ImageSource) -> Result<Outcome> {
        let mut pipeline = Arc::clone(&self.inner).lock_owned().await;
        tokio::task::spawn_blocking(move || pipeline.run(source))
            .await
            .map_err(|e| GateError::Inference(format!("classification task failed: {e}")))?
    }

    pub async fn run_optional(&self, source: Option<ImageSource>) -> Result<Option<Outcome>> {
        match source {
            Some(source) => self.run(source).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn classify_image(&self, source: impl Into<ImageSource>) -> Result<Verdict> {
        self.run(source.into()).await.map(|outcome| outcome.verdict())
    }
}
