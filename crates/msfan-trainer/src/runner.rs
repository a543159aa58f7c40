//! Train and test drivers.

use std::fs;

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use msfan_core::{
    DataIterator, EmbeddingTables, Instance, Result, Scorer, Split, load_instances,
    load_sentence_packs,
};
use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::checkpoint;
use crate::config::ExperimentConfig;
use crate::evaluator::{EvalReport, evaluate};
use crate::init::reset_params;
use crate::model::Msfan;
use crate::trainer::{TrainSummary, Trainer};

/// Train on the train split, select on dev, then evaluate the best
/// checkpoint on test.
///
/// The returned report is `None` when no checkpoint was ever written.
pub fn run_train(config: &ExperimentConfig) -> Result<(TrainSummary, Option<EvalReport>)> {
    config.validate()?;
    let device = config.device()?;
    let mut rng = config.rng();
    info!(device = ?device, task = %config.task, dataset = %config.dataset, "training");

    let tables = EmbeddingTables::load(&config.layout(), &device)?;

    let mut packs = load_sentence_packs(&config.layout().split(Split::Train))?;
    packs.shuffle(&mut rng);
    let mut train = load_instances(&packs, tables.word_index(), &config.instance_config())?;
    train.shuffle(&mut rng);
    let dev = load_split(config, &tables, Split::Dev)?;

    let train = DataIterator::new(train, config.batch_size, &device)?;
    let dev = DataIterator::new(dev, config.batch_size, &device)?;

    fs::create_dir_all(config.model_dir())?;

    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = Msfan::new(&tables, &config.model, vb)?;
    reset_params(&varmap, config.initializer, &mut rng)?;

    let summary = Trainer::new(model, varmap, config)?.fit(&train, &dev)?;

    if summary.best_epoch.is_none() {
        warn!("dev F1 never improved; no checkpoint written, skipping test");
        return Ok((summary, None));
    }
    let report = run_test(config)?;
    Ok((summary, Some(report)))
}

/// Evaluate the saved checkpoint on the test split.
pub fn run_test(config: &ExperimentConfig) -> Result<EvalReport> {
    config.validate()?;
    let device = config.device()?;
    info!("testing");

    let tables = EmbeddingTables::load(&config.layout(), &device)?;
    let (model, _varmap, metadata) = checkpoint::load(&config.checkpoint_path(), &tables, &device)?;

    let test = load_split(config, &tables, Split::Test)?;
    let test = DataIterator::new(test, config.batch_size, &device)?;

    evaluate(
        &model,
        &test,
        &Scorer::new(metadata.task, metadata.model.class_num),
    )
}

fn load_split(
    config: &ExperimentConfig,
    tables: &EmbeddingTables,
    split: Split,
) -> Result<Vec<Instance>> {
    let packs = load_sentence_packs(&config.layout().split(split))?;
    load_instances(&packs, tables.word_index(), &config.instance_config())
}
