//! # MSFAN Core
//!
//! Data pipeline and scoring for aspect sentiment triplet extraction with a
//! grid tagging scheme. Loads double embeddings and sentence packs, rasterizes
//! triplet annotations into square tag matrices, batches them into tensors and
//! scores predicted matrices at aspect, opinion and pair/triplet level.
//!
//! ## Quick Start
//!
//! ```rust
//! use msfan_core::{GridTag, Scorer, TagGrid, Task};
//!
//! let mut grid = TagGrid::filled(3, 0);
//! grid.set(0, 0, GridTag::Aspect.index());
//! grid.set(2, 2, GridTag::Opinion.index());
//! grid.set(0, 2, 5);
//!
//! let scorer = Scorer::new(Task::Triplet, 6);
//! let scores = scorer.score_uniontags(&[grid.clone()], &[grid], &[3]);
//! assert_eq!(scores.f1, 1.0);
//! ```
pub mod data;
pub mod error;
pub mod scoring;
pub mod tags;

// Re-export primary API
pub use data::{
    Batch, DataIterator, DataLayout, EmbeddingTables, Instance, InstanceConfig, SentencePack,
    Split, Triple, load_instances, load_sentence_packs,
};
pub use error::{MsfanError, Result};
pub use scoring::{Scorer, Scores, TagGrid};
pub use tags::{GridTag, Sentiment, Task};
