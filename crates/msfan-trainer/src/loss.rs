//! Cross-entropy over the flattened tag matrix with an ignore index.

use candle_core::{D, Result, Tensor};
use candle_nn::ops::log_softmax;

/// Mean negative log-likelihood of `targets` under `logits` (`[n, classes]`),
/// skipping targets equal to `ignore_index`.
///
/// When every target is ignored the loss is zero (not NaN) and still
/// backpropagates, yielding zero gradients.
pub fn masked_cross_entropy(logits: &Tensor, targets: &[i64], ignore_index: i64) -> Result<Tensor> {
    let (n, classes) = logits.dims2()?;
    if targets.len() != n {
        candle_core::bail!(
            "masked_cross_entropy: {} targets for {} logit rows",
            targets.len(),
            n
        );
    }

    let mut safe = Vec::with_capacity(n);
    let mut keep = Vec::with_capacity(n);
    for &t in targets {
        if t == ignore_index {
            safe.push(0u32);
            keep.push(0f32);
        } else if (0..classes as i64).contains(&t) {
            safe.push(t as u32);
            keep.push(1f32);
        } else {
            candle_core::bail!("masked_cross_entropy: target {t} outside 0..{classes}");
        }
    }
    let valid = keep.iter().filter(|&&k| k > 0.0).count();

    let device = logits.device();
    let safe = Tensor::from_vec(safe, (n, 1), device)?;
    let keep = Tensor::from_vec(keep, n, device)?.to_dtype(logits.dtype())?;

    let picked = log_softmax(logits, D::Minus1)?.gather(&safe, 1)?.squeeze(1)?;
    let total = picked.mul(&keep)?.sum_all()?;
    total.affine(-1.0 / valid.max(1) as f64, 0.0)
}
