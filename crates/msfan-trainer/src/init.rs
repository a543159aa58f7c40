//! # Parameter Reset
//!
//! Re-initializes every trainable variable before training starts: matrices
//! and kernels with the configured initializer, bias vectors with
//! `U(-1/sqrt(n), 1/sqrt(n))`. Values are drawn on the host from the run's
//! seeded RNG so that two runs with one seed start from identical weights.

use candle_core::{Result, Tensor, Var};
use candle_nn::VarMap;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};

use crate::config::Initializer;

/// Reset all variables of `varmap` in sorted-name order.
pub fn reset_params<R: Rng>(varmap: &VarMap, initializer: Initializer, rng: &mut R) -> Result<()> {
    let mut vars: Vec<(String, Var)> = {
        let data = varmap
            .data()
            .lock()
            .map_err(|e| candle_core::Error::Msg(format!("varmap lock poisoned: {e}")))?;
        data.iter()
            .map(|(name, var)| (name.clone(), var.clone()))
            .collect()
    };
    vars.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, var) in vars {
        let dims = var.dims().to_vec();
        let values = match dims.len() {
            0 => continue,
            1 => bias_uniform(dims[0], rng),
            _ => match initializer {
                Initializer::XavierUniform => xavier_uniform(&dims, rng),
                Initializer::XavierNormal => xavier_normal(&dims, rng),
                Initializer::Orthogonal => orthogonal(&dims, rng),
            },
        };
        tracing::debug!(%name, ?dims, "reset parameter");
        let fresh = Tensor::from_vec(values, dims, var.device())?.to_dtype(var.dtype())?;
        var.set(&fresh)?;
    }

    Ok(())
}

/// Fan-in / fan-out with the receptive field folded in (dims `[out, in, k...]`).
pub fn fans(dims: &[usize]) -> (usize, usize) {
    let receptive: usize = dims[2..].iter().product();
    (dims[1] * receptive, dims[0] * receptive)
}

fn bias_uniform<R: Rng>(n: usize, rng: &mut R) -> Vec<f32> {
    let bound = 1.0 / (n as f32).sqrt();
    sample(Uniform::new_inclusive(-bound, bound), n, rng)
}

fn xavier_uniform<R: Rng>(dims: &[usize], rng: &mut R) -> Vec<f32> {
    let (fan_in, fan_out) = fans(dims);
    let bound = (6.0 / (fan_in + fan_out) as f32).sqrt();
    sample(Uniform::new_inclusive(-bound, bound), dims.iter().product(), rng)
}

fn xavier_normal<R: Rng>(dims: &[usize], rng: &mut R) -> Vec<f32> {
    let (fan_in, fan_out) = fans(dims);
    let std = (2.0 / (fan_in + fan_out) as f32).sqrt();
    standard_normal(dims.iter().product(), rng)
        .into_iter()
        .map(|v| v * std)
        .collect()
}

/// Orthogonal init: rows (or columns, whichever are fewer) of the flattened
/// `[dims[0], rest]` matrix are orthonormal.
fn orthogonal<R: Rng>(dims: &[usize], rng: &mut R) -> Vec<f32> {
    let rows = dims[0];
    let cols: usize = dims[1..].iter().product();
    let flat = standard_normal(rows * cols, rng);

    // Work on the tall orientation: n vectors of length m, n <= m.
    let transpose = rows < cols;
    let (n, m) = if transpose { (rows, cols) } else { (cols, rows) };
    let mut vectors: Vec<Vec<f64>> = (0..n)
        .map(|k| {
            (0..m)
                .map(|t| {
                    let (r, c) = if transpose { (k, t) } else { (t, k) };
                    f64::from(flat[r * cols + c])
                })
                .collect()
        })
        .collect();

    for k in 0..n {
        for prev in 0..k {
            let dot: f64 = vectors[k].iter().zip(&vectors[prev]).map(|(a, b)| a * b).sum();
            let (head, tail) = vectors.split_at_mut(k);
            for (v, p) in tail[0].iter_mut().zip(&head[prev]) {
                *v -= dot * p;
            }
        }
        let norm = vectors[k].iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > f64::EPSILON {
            vectors[k].iter_mut().for_each(|v| *v /= norm);
        }
    }

    let mut out = vec![0f32; rows * cols];
    for (k, vector) in vectors.iter().enumerate() {
        for (t, &v) in vector.iter().enumerate() {
            let (r, c) = if transpose { (k, t) } else { (t, k) };
            out[r * cols + c] = v as f32;
        }
    }
    out
}

fn standard_normal<R: Rng>(n: usize, rng: &mut R) -> Vec<f32> {
    sample(StandardNormal, n, rng)
}

fn sample<D: Distribution<f32>, R: Rng>(dist: D, n: usize, rng: &mut R) -> Vec<f32> {
    dist.sample_iter(rng).take(n).collect()
}
