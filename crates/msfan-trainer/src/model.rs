//! # MSFAN Tagging Model
//!
//! Multi-scale feature attention network over a double embedding. A
//! bidirectional LSTM captures sequential context, a bank of 1-D convolutions
//! with different kernel widths captures local n-gram features, and a sigmoid
//! gate fuses the two views per token. Every token pair `(i, j)` of the crop
//! window is then classified from `[h_i ; h_j]`.

use candle_core::{D, Result, Tensor};
use candle_nn::rnn::{LSTM, LSTMConfig, LSTMState, RNN};
use candle_nn::{Conv1d, Conv1dConfig, Embedding, Linear, Module, VarBuilder};
use msfan_core::EmbeddingTables;
use msfan_core::data::iterator::crop_window;

use crate::config::ModelConfig;

/// Kernel widths of the multi-scale convolution bank.
const SCALES: [usize; 3] = [1, 3, 5];

/// A model that scores every token pair of a batch.
pub trait TagModel {
    /// `tokens`: `[batch, max_len]` u32, `mask`: `[batch, max_len]` f32.
    ///
    /// Returns logits `[batch, w, w, class_num]` where `w` is the crop window
    /// of `lengths`.
    fn forward(&self, tokens: &Tensor, lengths: &[usize], mask: &Tensor) -> Result<Tensor>;
}

/// Double-embedding BiLSTM + multi-scale CNN grid tagger.
pub struct Msfan {
    general: Embedding,
    domain: Embedding,
    lstm_fwd: LSTM,
    lstm_bwd: LSTM,
    convs: Vec<Conv1d>,
    lstm_proj: Linear,
    cnn_proj: Linear,
    gate: Linear,
    classifier: Linear,
}

impl Msfan {
    /// Build the model. Embedding tables are used as frozen lookups; every
    /// other weight is created through `vb`.
    pub fn new(tables: &EmbeddingTables, config: &ModelConfig, vb: VarBuilder) -> Result<Self> {
        let general = Embedding::new(tables.general().clone(), tables.general_dim());
        let domain = Embedding::new(tables.domain().clone(), tables.domain_dim());
        let embed_dim = tables.general_dim() + tables.domain_dim();

        let lstm_fwd = candle_nn::rnn::lstm(
            embed_dim,
            config.lstm_dim,
            LSTMConfig::default(),
            vb.pp("lstm_fwd"),
        )?;
        let lstm_bwd = candle_nn::rnn::lstm(
            embed_dim,
            config.lstm_dim,
            LSTMConfig::default(),
            vb.pp("lstm_bwd"),
        )?;

        let convs = SCALES
            .iter()
            .map(|&k| {
                candle_nn::conv1d(
                    embed_dim,
                    config.cnn_dim,
                    k,
                    Conv1dConfig::default(),
                    vb.pp(format!("conv{k}")),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let lstm_proj = candle_nn::linear(2 * config.lstm_dim, config.hidden_dim, vb.pp("lstm_proj"))?;
        let cnn_proj = candle_nn::linear(config.cnn_dim, config.hidden_dim, vb.pp("cnn_proj"))?;
        let gate = candle_nn::linear(2 * config.hidden_dim, config.hidden_dim, vb.pp("gate"))?;
        let classifier =
            candle_nn::linear(2 * config.hidden_dim, config.class_num, vb.pp("classifier"))?;

        Ok(Self {
            general,
            domain,
            lstm_fwd,
            lstm_bwd,
            convs,
            lstm_proj,
            cnn_proj,
            gate,
            classifier,
        })
    }

    /// `[batch, w, embed]` -> `[batch, w, 2 * lstm_dim]`
    fn bilstm(&self, xs: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, _) = xs.dims3()?;
        let mut fwd: LSTMState = self.lstm_fwd.zero_state(batch)?;
        let mut bwd: LSTMState = self.lstm_bwd.zero_state(batch)?;
        let mut forward = Vec::with_capacity(seq_len);
        let mut backward = Vec::with_capacity(seq_len);

        for t in 0..seq_len {
            let step = xs.narrow(1, t, 1)?.squeeze(1)?.contiguous()?;
            fwd = self.lstm_fwd.step(&step, &fwd)?;
            forward.push(fwd.clone());

            let step = xs.narrow(1, seq_len - 1 - t, 1)?.squeeze(1)?.contiguous()?;
            bwd = self.lstm_bwd.step(&step, &bwd)?;
            backward.push(bwd.clone());
        }
        backward.reverse();

        let forward = self.lstm_fwd.states_to_tensor(&forward)?;
        let backward = self.lstm_bwd.states_to_tensor(&backward)?;
        Tensor::cat(&[forward, backward], D::Minus1)
    }

    /// `[batch, w, embed]` -> `[batch, w, cnn_dim]`, mean over scales.
    ///
    /// Padding is applied to the input, never through `Conv1dConfig`: the conv
    /// backward pass underflows once the padding outgrows a short window.
    fn multi_scale(&self, xs: &Tensor) -> Result<Tensor> {
        let channels_first = xs.transpose(1, 2)?.contiguous()?;
        let mut outputs = Vec::with_capacity(self.convs.len());
        for (conv, k) in self.convs.iter().zip(SCALES) {
            let padded = channels_first.pad_with_zeros(2, k / 2, k / 2)?;
            outputs.push(conv.forward(&padded)?.relu()?);
        }
        let stacked = Tensor::stack(&outputs, 0)?.mean(0)?;
        stacked.transpose(1, 2)?.contiguous()
    }
}

impl TagModel for Msfan {
    fn forward(&self, tokens: &Tensor, lengths: &[usize], mask: &Tensor) -> Result<Tensor> {
        let window = crop_window(lengths);
        let tokens = tokens.narrow(1, 0, window)?.contiguous()?;
        let mask = mask.narrow(1, 0, window)?.unsqueeze(2)?;

        let embedded = Tensor::cat(
            &[self.general.forward(&tokens)?, self.domain.forward(&tokens)?],
            D::Minus1,
        )?;

        let sequential = self.lstm_proj.forward(&self.bilstm(&embedded)?)?.tanh()?;
        let local = self.cnn_proj.forward(&self.multi_scale(&embedded)?)?.tanh()?;

        let gate = candle_nn::ops::sigmoid(
            &self
                .gate
                .forward(&Tensor::cat(&[&sequential, &local], D::Minus1)?)?,
        )?;
        let fused = sequential
            .mul(&gate)?
            .add(&local.mul(&gate.affine(-1.0, 1.0)?)?)?
            .broadcast_mul(&mask.to_dtype(sequential.dtype())?)?;

        let (batch, w, hidden) = fused.dims3()?;
        let rows = fused.unsqueeze(2)?.broadcast_as((batch, w, w, hidden))?.contiguous()?;
        let cols = fused.unsqueeze(1)?.broadcast_as((batch, w, w, hidden))?.contiguous()?;
        let pairs = Tensor::cat(&[rows, cols], D::Minus1)?;

        self.classifier.forward(&pairs)
    }
}
