pub mod decode;
pub mod metric;

pub use decode::{Tuple, find_pairs, find_triplets, term_spans};
pub use metric::{Scorer, Scores, TagGrid};
