//! On-disk layout of embeddings and dataset splits under a common prefix.

use std::fmt;
use std::path::PathBuf;

const EMBEDDING_DIR: &str = "doubleembedding";

/// Dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Dev => write!(f, "dev"),
            Split::Test => write!(f, "test"),
        }
    }
}

/// Resolves embedding and split paths for one dataset.
#[derive(Debug, Clone)]
pub struct DataLayout {
    prefix: PathBuf,
    dataset: String,
}

impl DataLayout {
    pub fn new(prefix: impl Into<PathBuf>, dataset: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            dataset: dataset.into(),
        }
    }

    /// `doubleembedding/word_idx.json`
    pub fn word_index(&self) -> PathBuf {
        self.prefix.join(EMBEDDING_DIR).join("word_idx.json")
    }

    /// `doubleembedding/gen.vec.npy`
    pub fn general_embedding(&self) -> PathBuf {
        self.prefix.join(EMBEDDING_DIR).join("gen.vec.npy")
    }

    /// `doubleembedding/<dataset>_emb.vec.npy`
    pub fn domain_embedding(&self) -> PathBuf {
        self.prefix
            .join(EMBEDDING_DIR)
            .join(format!("{}_emb.vec.npy", self.dataset))
    }

    /// `<dataset>/<split>.json`
    pub fn split(&self, split: Split) -> PathBuf {
        self.prefix
            .join(&self.dataset)
            .join(format!("{split}.json"))
    }
}
