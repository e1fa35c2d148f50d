use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use seefood::config::{GateConfig, ScoreActivation, TensorLayout};
use seefood::utils::{ort_init, tracing_subscriber_init};
use seefood::{Classification, ImageSource, Outcome, Pipeline, SharedPipeline, Verdict};

/// Is this a hotdog? Classifies each image and answers for the top label.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// JSON config file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// ONNX image classification model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Label file, one class name per line in output order.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Keyword looked for in the top label (case-sensitive).
    #[arg(short, long)]
    target: Option<String>,

    /// Square model input size in pixels.
    #[arg(long)]
    input_size: Option<u32>,

    #[arg(long, value_enum)]
    layout: Option<TensorLayout>,

    #[arg(long, value_enum)]
    activation: Option<ScoreActivation>,

    /// Ranked labels to print under each answer (or as `ranking` in JSON),
    /// 0 prints none.
    #[arg(long, default_value_t = 0)]
    top: usize,

    /// Print one JSON verdict per line instead of the answer text.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn gate_config(&self) -> anyhow::Result<GateConfig> {
        let mut config = match &self.config {
            Some(path) => GateConfig::load(path)?,
            None => GateConfig::default(),
        };

        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(labels) = &self.labels {
            config.labels_path = labels.clone();
        }
        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(size) = self.input_size {
            config.input.width = size;
            config.input.height = size;
        }
        if let Some(layout) = self.layout {
            config.input.layout = layout;
        }
        if let Some(activation) = self.activation {
            config.activation = activation;
        }
        config.input.validate()?;

        Ok(config)
    }
}

#[derive(Serialize)]
struct Report<'a> {
    path: &'a Path,
    #[serde(flatten)]
    verdict: Verdict,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    ranking: &'a [Classification],
}

fn print_outcome(args: &Args, path: &Path, outcome: &Outcome) -> anyhow::Result<()> {
    if args.json {
        let report = Report {
            path,
            verdict: outcome.verdict(),
            ranking: outcome.ranking.top_k(args.top),
        };
        println!("{}", serde_json::to_string(&report)?);
        return Ok(());
    }

    println!("{}: {}", path.display(), outcome.decision);
    for (rank, classification) in outcome.ranking.top_k(args.top).iter().enumerate() {
        println!(
            "  {:>2}. {:<40} {:>6.2}%",
            rank + 1,
            classification.label,
            classification.confidence * 100.
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber_init();
    let args = Args::parse();

    ort_init()?;
    let config = args.gate_config()?;
    info!(target_keyword = %config.target, "loading classifier");
    let pipeline = SharedPipeline::new(Pipeline::from_config(&config)?);

    let mut failed = 0;
    for path in &args.images {
        match pipeline.run(ImageSource::Path(path.clone())).await {
            Ok(outcome) => print_outcome(&args, path, &outcome)?,
            Err(err) => {
                // keep going, the next image may be fine
                error!(path = %path.display(), "{err}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} images could not be classified", args.images.len());
    }
    Ok(())
}
