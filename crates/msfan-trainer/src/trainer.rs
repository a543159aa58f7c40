//! Epoch loop with best-on-dev checkpointing.

use std::path::PathBuf;

use candle_nn::{Optimizer, VarMap};
use msfan_core::{DataIterator, GridTag, Result, Scorer, Task};
use tracing::{debug, info};

use crate::checkpoint::{self, CheckpointMetadata};
use crate::config::{ExperimentConfig, ModelConfig};
use crate::evaluator::{EvalReport, evaluate};
use crate::loss::masked_cross_entropy;
use crate::model::{Msfan, TagModel};
use crate::optim::{Adam, ParamsAdam};

/// What one epoch produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub mean_loss: f64,
    pub dev: EvalReport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub epochs: Vec<EpochStats>,
    /// `None` when dev F1 never rose above zero (no checkpoint written).
    pub best_epoch: Option<usize>,
    pub best_f1: f64,
}

pub struct Trainer {
    model: Msfan,
    varmap: VarMap,
    optimizer: Adam,
    scorer: Scorer,
    task: Task,
    model_config: ModelConfig,
    checkpoint: PathBuf,
    epochs: usize,
    best_epoch: Option<usize>,
    best_f1: f64,
}

impl Trainer {
    /// Take ownership of a freshly initialized model and its variables.
    pub fn new(model: Msfan, varmap: VarMap, config: &ExperimentConfig) -> Result<Self> {
        let optimizer = Adam::new(
            varmap.all_vars(),
            ParamsAdam {
                lr: config.lr,
                weight_decay: config.weight_decay,
                ..ParamsAdam::default()
            },
        )?;
        Ok(Self {
            model,
            varmap,
            optimizer,
            scorer: Scorer::new(config.task, config.model.class_num),
            task: config.task,
            model_config: config.model.clone(),
            checkpoint: config.checkpoint_path(),
            epochs: config.epochs,
            best_epoch: None,
            best_f1: 0.0,
        })
    }

    /// One pass over `data` in batch order. Returns the mean batch loss.
    pub fn train_epoch(&mut self, data: &DataIterator) -> Result<f64> {
        let mut total = 0f64;
        let batches = data.batch_count();

        for index in 0..batches {
            let batch = data.get_batch(index)?;
            let logits = self
                .model
                .forward(&batch.tokens, &batch.lengths, &batch.masks)?;
            let (b, w, _, classes) = logits.dims4()?;
            let logits = logits.reshape((b * w * w, classes))?;
            let targets = batch.cropped_tags()?;

            let loss = masked_cross_entropy(&logits, &targets, GridTag::IGNORE_INDEX)?;
            self.optimizer.backward_step(&loss)?;

            let value = f64::from(loss.to_scalar::<f32>()?);
            debug!(batch = index, loss = value, "train step");
            total += value;
        }

        Ok(total / batches.max(1) as f64)
    }

    /// Train for the configured number of epochs, evaluating on `dev` after
    /// each one and checkpointing whenever joint F1 strictly improves.
    pub fn fit(&mut self, train: &DataIterator, dev: &DataIterator) -> Result<TrainSummary> {
        let mut history = Vec::with_capacity(self.epochs);

        for epoch in 0..self.epochs {
            info!("Epoch {epoch}");
            let mean_loss = self.train_epoch(train)?;
            let dev_report = evaluate(&self.model, dev, &self.scorer)?;
            info!(epoch, mean_loss, dev_f1 = dev_report.joint.f1, "epoch finished");

            self.record_dev(epoch, &dev_report)?;
            history.push(EpochStats {
                epoch,
                mean_loss,
                dev: dev_report,
            });
        }

        let best_f1 = self.best_f1;
        match self.best_epoch {
            Some(epoch) => info!("best epoch: {epoch}\tbest dev {} f1: {best_f1:.5}", self.task),
            None => info!("best epoch: none\tbest dev {} f1: {best_f1:.5}", self.task),
        }

        Ok(TrainSummary {
            epochs: history,
            best_epoch: self.best_epoch,
            best_f1,
        })
    }

    /// Write the checkpoint when `report` beats the best joint F1 so far.
    /// Ties keep the earlier checkpoint. Returns whether it was written.
    fn record_dev(&mut self, epoch: usize, report: &EvalReport) -> Result<bool> {
        if report.joint.f1 <= self.best_f1 {
            return Ok(false);
        }
        self.best_f1 = report.joint.f1;
        self.best_epoch = Some(epoch);
        let metadata = CheckpointMetadata {
            model: self.model_config.clone(),
            task: self.task,
            epoch,
            dev_f1: self.best_f1,
        };
        checkpoint::save(&self.varmap, &metadata, &self.checkpoint)?;
        Ok(true)
    }
}
