//! Evaluation over a whole split.

use candle_core::D;
use msfan_core::{DataIterator, Result, Scorer, Scores, TagGrid};
use serde::Serialize;
use tracing::info;

use crate::model::TagModel;

/// Scores of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EvalReport {
    pub aspect: Scores,
    pub opinion: Scores,
    /// Pair or triplet level, depending on the task.
    pub joint: Scores,
}

/// Predict every batch of `data` and score the predictions against gold.
///
/// Only forward passes are run; parameters are never touched.
pub fn evaluate<M: TagModel + ?Sized>(
    model: &M,
    data: &DataIterator,
    scorer: &Scorer,
) -> Result<EvalReport> {
    let max_len = data.max_sequence_len();
    let mut predictions = Vec::with_capacity(data.len());
    let mut labels = Vec::with_capacity(data.len());
    let mut lengths = Vec::with_capacity(data.len());

    for index in 0..data.batch_count() {
        let batch = data.get_batch(index)?;
        let logits = model.forward(&batch.tokens, &batch.lengths, &batch.masks)?;
        let predicted = logits.argmax(D::Minus1)?.to_vec3::<u32>()?;
        let gold = batch.tags.to_vec3::<i64>()?;

        for (window, rows) in predicted.iter().zip(gold) {
            predictions.push(TagGrid::padded(window, max_len));
            let cells: Vec<i64> = rows.into_iter().flatten().collect();
            labels.push(TagGrid::from_cells(max_len, cells).ok_or_else(|| {
                msfan_core::MsfanError::InvalidConfig(format!(
                    "gold tag matrix is not {max_len}x{max_len}"
                ))
            })?);
        }
        lengths.extend_from_slice(&batch.lengths);
    }

    let report = EvalReport {
        joint: scorer.score_uniontags(&predictions, &labels, &lengths),
        aspect: scorer.score_aspect(&predictions, &labels, &lengths),
        opinion: scorer.score_opinion(&predictions, &labels, &lengths),
    };
    info!("Aspect term\t{}", report.aspect);
    info!("Opinion term\t{}", report.opinion);
    info!("{} {}", scorer.task(), report.joint);
    Ok(report)
}
