pub mod embedding;
pub mod instance;
pub mod iterator;
pub mod layout;
pub mod sentence;

pub use embedding::EmbeddingTables;
pub use instance::{Instance, InstanceConfig, load_instances};
pub use iterator::{Batch, DataIterator};
pub use layout::{DataLayout, Split};
pub use sentence::{SentencePack, Triple, load_sentence_packs};
