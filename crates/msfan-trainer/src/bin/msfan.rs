//! MSFAN training and evaluation CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use msfan_core::Task;
use msfan_trainer::{ExperimentConfig, Initializer, ModelConfig, run_test, run_train};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Train,
    Test,
}

#[derive(Parser)]
#[command(name = "msfan")]
#[command(about = "Train and evaluate the MSFAN aspect sentiment triplet extractor")]
#[command(version)]
struct Cli {
    /// Dataset and embedding root
    #[arg(long, default_value = "../../data/")]
    prefix: PathBuf,

    /// Checkpoint directory
    #[arg(long, default_value = "savemodel/")]
    model_dir: PathBuf,

    /// pair or triplet
    #[arg(long, default_value = "triplet")]
    task: Task,

    #[arg(long, value_enum, default_value_t = Mode::Train)]
    mode: Mode,

    /// Model name, used in the checkpoint file name
    #[arg(long, default_value = "MSFAN")]
    model: String,

    #[arg(long, default_value = "res14")]
    dataset: String,

    #[arg(long, default_value_t = 100)]
    max_sequence_len: usize,

    /// cuda (falls back to cpu) or cpu
    #[arg(long, default_value = "cuda")]
    device: String,

    #[arg(long, default_value_t = 50)]
    lstm_dim: usize,

    #[arg(long, default_value_t = 128)]
    hidden_dim: usize,

    #[arg(long, default_value_t = 256)]
    cnn_dim: usize,

    #[arg(long, default_value_t = 2e-5)]
    weight_decay: f64,

    #[arg(long, default_value_t = 5e-4)]
    lr: f64,

    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    #[arg(long, default_value_t = 600)]
    epochs: usize,

    /// Label classes: 4 for pair, 6 for triplet
    #[arg(long, default_value_t = 6)]
    class_num: usize,

    /// Widest intra-term cell marked in the tag matrix
    #[arg(long, default_value_t = 2)]
    span: usize,

    #[arg(long, value_enum, default_value_t = Initializer::XavierUniform)]
    initializer: Initializer,

    /// Seed for shuffling and parameter init
    #[arg(long, env = "MSFAN_SEED")]
    seed: Option<u64>,
}

impl Cli {
    fn experiment(&self) -> ExperimentConfig {
        ExperimentConfig {
            prefix: self.prefix.clone(),
            model_dir: self.model_dir.clone(),
            task: self.task,
            dataset: self.dataset.clone(),
            max_sequence_len: self.max_sequence_len,
            device: self.device.clone(),
            model: ModelConfig {
                name: self.model.clone(),
                lstm_dim: self.lstm_dim,
                hidden_dim: self.hidden_dim,
                cnn_dim: self.cnn_dim,
                class_num: self.class_num,
            },
            weight_decay: self.weight_decay,
            lr: self.lr,
            batch_size: self.batch_size,
            epochs: self.epochs,
            span: self.span,
            initializer: self.initializer,
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.experiment();
    info!(config = %serde_json::to_string(&config)?, "parsed arguments");

    match cli.mode {
        Mode::Train => {
            let (summary, report) = run_train(&config).context("training failed")?;
            if let (Some(epoch), Some(report)) = (summary.best_epoch, report) {
                info!(best_epoch = epoch, test_f1 = report.joint.f1, "done");
            }
        }
        Mode::Test => {
            run_test(&config).with_context(|| {
                format!(
                    "testing {} failed",
                    config.checkpoint_path().display()
                )
            })?;
        }
    }

    Ok(())
}
