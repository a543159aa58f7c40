//! # MSFAN Trainer
//!
//! Model, optimization and drivers for grid-tagging triplet extraction. The
//! `msfan` binary wraps [`runner::run_train`] and [`runner::run_test`].
//!
//! Data handling and scoring live in `msfan-core`; this crate owns every
//! trainable parameter.

pub mod checkpoint;
pub mod config;
pub mod evaluator;
pub mod init;
pub mod loss;
pub mod model;
pub mod optim;
pub mod runner;
pub mod trainer;

pub use config::{ExperimentConfig, Initializer, ModelConfig};
pub use evaluator::{EvalReport, evaluate};
pub use model::{Msfan, TagModel};
pub use runner::{run_test, run_train};
pub use trainer::{EpochStats, TrainSummary, Trainer};
