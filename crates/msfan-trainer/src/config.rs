//! Experiment configuration threaded through the drivers.

use std::path::{Path, PathBuf};

use candle_core::Device;
use clap::ValueEnum;
use msfan_core::{DataLayout, InstanceConfig, MsfanError, Result, Task};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Initializer applied to parameters with more than one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum Initializer {
    #[value(name = "xavier_uniform_")]
    XavierUniform,
    #[value(name = "xavier_normal_")]
    XavierNormal,
    #[value(name = "orthogonal_")]
    Orthogonal,
}

/// Architecture hyper-parameters, persisted beside every checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub lstm_dim: usize,
    pub hidden_dim: usize,
    pub cnn_dim: usize,
    pub class_num: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "MSFAN".to_string(),
            lstm_dim: 50,
            hidden_dim: 128,
            cnn_dim: 256,
            class_num: 6,
        }
    }
}

/// Everything one train or test run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub prefix: PathBuf,
    pub model_dir: PathBuf,
    pub task: Task,
    pub dataset: String,
    pub max_sequence_len: usize,
    /// `cuda` (falls back to CPU when unavailable) or `cpu`.
    pub device: String,
    pub model: ModelConfig,
    pub weight_decay: f64,
    pub lr: f64,
    pub batch_size: usize,
    pub epochs: usize,
    pub span: usize,
    pub initializer: Initializer,
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from("../../data/"),
            model_dir: PathBuf::from("savemodel/"),
            task: Task::Triplet,
            dataset: "res14".to_string(),
            max_sequence_len: 100,
            device: "cuda".to_string(),
            model: ModelConfig::default(),
            weight_decay: 2e-5,
            lr: 5e-4,
            batch_size: 32,
            epochs: 600,
            span: 2,
            initializer: Initializer::XavierUniform,
            seed: None,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        self.instance_config().validate()?;
        if self.batch_size == 0 {
            return Err(MsfanError::InvalidConfig("batch_size must be positive".into()));
        }
        if self.model.class_num < self.task.min_classes() {
            return Err(MsfanError::InvalidConfig(format!(
                "class_num {} is too small for the {} task (needs {})",
                self.model.class_num,
                self.task,
                self.task.min_classes()
            )));
        }
        if self.model.lstm_dim == 0 || self.model.hidden_dim == 0 || self.model.cnn_dim == 0 {
            return Err(MsfanError::InvalidConfig("layer sizes must be positive".into()));
        }
        Ok(())
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.prefix, &self.dataset)
    }

    pub fn instance_config(&self) -> InstanceConfig {
        InstanceConfig {
            max_sequence_len: self.max_sequence_len,
            span: self.span,
            task: self.task,
        }
    }

    /// `<model_dir>/<model><task>.safetensors`
    pub fn checkpoint_path(&self) -> PathBuf {
        crate::checkpoint::checkpoint_path(&self.model_dir, &self.model.name, self.task)
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn device(&self) -> Result<Device> {
        match self.device.as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::cuda_if_available(0)?),
            other => Err(MsfanError::InvalidConfig(format!(
                "unknown device {other:?}, expected cuda or cpu"
            ))),
        }
    }

    /// Seeded RNG when a seed is configured, entropy otherwise.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.checkpoint_path(),
            PathBuf::from("savemodel/MSFANtriplet.safetensors")
        );
    }

    #[test]
    fn test_class_num_checked_against_task() {
        let mut config = ExperimentConfig::default();
        config.model.class_num = 4;
        assert!(config.validate().is_err());

        config.task = Task::Pair;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_device_choice() {
        let mut config = ExperimentConfig::default();
        config.device = "cpu".into();
        assert!(config.device().unwrap().is_cpu());

        config.device = "tpu".into();
        assert!(config.device().is_err());
    }

    #[test]
    fn test_initializer_names() {
        let parsed = Initializer::from_str("orthogonal_", false).unwrap();
        assert_eq!(parsed, Initializer::Orthogonal);
        assert!(Initializer::from_str("kaiming_", false).is_err());
    }

    #[test]
    fn test_seeded_rng_repeats() {
        use rand::Rng;

        let config = ExperimentConfig {
            seed: Some(7),
            ..ExperimentConfig::default()
        };
        let a: u64 = config.rng().gen_range(0..u64::MAX);
        let b: u64 = config.rng().gen_range(0..u64::MAX);
        assert_eq!(a, b);
    }
}
