//! # Double Embedding Loader
//!
//! Reads the word-to-index vocabulary and the two pretrained vector tables
//! (general-domain and domain-specific). Both tables share the vocabulary's
//! row indexing and are never mutated after load.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use tracing::info;

use crate::data::layout::DataLayout;
use crate::error::{MsfanError, Result};

/// Token used for out-of-vocabulary words.
pub const UNK_TOKEN: &str = "<unk>";

/// Vocabulary plus the general and domain embedding tables.
#[derive(Debug, Clone)]
pub struct EmbeddingTables {
    word_index: HashMap<String, u32>,
    general: Tensor,
    domain: Tensor,
}

impl EmbeddingTables {
    /// Load vocabulary and both tables from the `doubleembedding/` directory.
    pub fn load(layout: &DataLayout, device: &Device) -> Result<Self> {
        let word_index = load_word_index(&layout.word_index())?;
        let general = read_table(&layout.general_embedding(), device)?;
        let domain = read_table(&layout.domain_embedding(), device)?;

        let tables = Self::from_parts(word_index, general, domain)?;
        info!(
            vocab = tables.word_index.len(),
            general_dim = tables.general_dim(),
            domain_dim = tables.domain_dim(),
            "loaded double embedding"
        );
        Ok(tables)
    }

    /// Assemble tables from in-memory parts, checking that shapes agree.
    pub fn from_parts(
        word_index: HashMap<String, u32>,
        general: Tensor,
        domain: Tensor,
    ) -> Result<Self> {
        if general.rank() != 2 || domain.rank() != 2 {
            return Err(MsfanError::EmbeddingShape(format!(
                "tables must be 2-D, got general {:?} and domain {:?}",
                general.dims(),
                domain.dims()
            )));
        }

        let rows = general.dims()[0];
        if domain.dims()[0] != rows {
            return Err(MsfanError::EmbeddingShape(format!(
                "row count differs: general {} vs domain {}",
                rows,
                domain.dims()[0]
            )));
        }

        if let Some((word, &idx)) = word_index.iter().find(|(_, idx)| **idx as usize >= rows) {
            return Err(MsfanError::EmbeddingShape(format!(
                "word {word:?} maps to row {idx} but tables have {rows} rows"
            )));
        }

        Ok(Self {
            word_index,
            general: general.to_dtype(DType::F32)?,
            domain: domain.to_dtype(DType::F32)?,
        })
    }

    pub fn word_index(&self) -> &HashMap<String, u32> {
        &self.word_index
    }

    /// Row used for words missing from the vocabulary.
    pub fn unk_index(&self) -> u32 {
        unk_index(&self.word_index)
    }

    pub fn general(&self) -> &Tensor {
        &self.general
    }

    pub fn domain(&self) -> &Tensor {
        &self.domain
    }

    pub fn vocab_rows(&self) -> usize {
        self.general.dims()[0]
    }

    pub fn general_dim(&self) -> usize {
        self.general.dims()[1]
    }

    pub fn domain_dim(&self) -> usize {
        self.domain.dims()[1]
    }
}

/// Row for `<unk>`, or 0 when the vocabulary has no such entry.
pub fn unk_index(word_index: &HashMap<String, u32>) -> u32 {
    word_index.get(UNK_TOKEN).copied().unwrap_or(0)
}

/// Read `word_idx.json` (a flat `{word: index}` object).
pub fn load_word_index(path: &Path) -> Result<HashMap<String, u32>> {
    let file = File::open(path).map_err(|source| MsfanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let word_index: HashMap<String, u32> = serde_json::from_reader(BufReader::new(file))?;
    Ok(word_index)
}

fn read_table(path: &Path, device: &Device) -> Result<Tensor> {
    if !path.is_file() {
        return Err(MsfanError::Read {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });
    }
    let table = Tensor::read_npy(path)?
        .to_dtype(DType::F32)?
        .to_device(device)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(words: &[&str]) -> HashMap<String, u32> {
        words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.to_string(), i as u32))
            .collect()
    }

    #[test]
    fn test_load_from_layout() {
        let dir = tempfile::tempdir().unwrap();
        let emb_dir = dir.path().join("doubleembedding");
        std::fs::create_dir_all(&emb_dir).unwrap();

        let words = vocab(&["<pad>", "<unk>", "food", "great"]);
        std::fs::write(
            emb_dir.join("word_idx.json"),
            serde_json::to_string(&words).unwrap(),
        )
        .unwrap();

        let device = Device::Cpu;
        Tensor::ones((4, 3), DType::F64, &device)
            .unwrap()
            .write_npy(emb_dir.join("gen.vec.npy"))
            .unwrap();
        Tensor::zeros((4, 2), DType::F32, &device)
            .unwrap()
            .write_npy(emb_dir.join("res14_emb.vec.npy"))
            .unwrap();

        let layout = DataLayout::new(dir.path(), "res14");
        let tables = EmbeddingTables::load(&layout, &device).unwrap();

        assert_eq!(tables.vocab_rows(), 4);
        assert_eq!(tables.general_dim(), 3);
        assert_eq!(tables.domain_dim(), 2);
        assert_eq!(tables.general().dtype(), DType::F32);
        assert_eq!(tables.unk_index(), 1);
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path(), "lap14");
        let err = EmbeddingTables::load(&layout, &Device::Cpu).unwrap_err();
        assert!(matches!(err, MsfanError::Read { .. }));
        assert!(err.to_string().contains("word_idx.json"));
    }

    #[test]
    fn test_row_mismatch_rejected() {
        let device = Device::Cpu;
        let general = Tensor::zeros((4, 3), DType::F32, &device).unwrap();
        let domain = Tensor::zeros((5, 3), DType::F32, &device).unwrap();
        let err = EmbeddingTables::from_parts(vocab(&["a"]), general, domain).unwrap_err();
        assert!(matches!(err, MsfanError::EmbeddingShape(_)));
    }

    #[test]
    fn test_vocab_index_out_of_table() {
        let device = Device::Cpu;
        let general = Tensor::zeros((2, 3), DType::F32, &device).unwrap();
        let domain = Tensor::zeros((2, 3), DType::F32, &device).unwrap();
        let err =
            EmbeddingTables::from_parts(vocab(&["a", "b", "c"]), general, domain).unwrap_err();
        assert!(err.to_string().contains("rows"));
    }

    #[test]
    fn test_unk_fallback_without_entry() {
        assert_eq!(unk_index(&vocab(&["a", "b"])), 0);
    }
}
