//! # Grid Tags for Triplet Extraction
//!
//! Defines the cell classes of the square tag matrix. The diagonal marks
//! aspect and opinion words, the upper triangle marks word pairs that belong
//! to the same term or that link an aspect to an opinion.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MsfanError;

/// Extraction task: aspect-opinion pairs or full sentiment triplets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Pair,
    Triplet,
}

impl Task {
    /// Smallest number of grid classes the task can be trained with.
    pub fn min_classes(&self) -> usize {
        match self {
            Task::Pair => 4,
            Task::Triplet => 6,
        }
    }

    /// Relation class written into cross cells for the given sentiment.
    pub fn relation_tag(&self, sentiment: Sentiment) -> GridTag {
        match self {
            Task::Pair => GridTag::Pair,
            Task::Triplet => GridTag::Sentiment(sentiment),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Pair => write!(f, "pair"),
            Task::Triplet => write!(f, "triplet"),
        }
    }
}

impl FromStr for Task {
    type Err = MsfanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pair" => Ok(Task::Pair),
            "triplet" => Ok(Task::Triplet),
            other => Err(MsfanError::InvalidConfig(format!(
                "unknown task {other:?}, expected pair or triplet"
            ))),
        }
    }
}

/// Sentiment polarity of a triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    /// Grid class id used by the triplet task.
    pub fn index(&self) -> i64 {
        match self {
            Sentiment::Negative => 3,
            Sentiment::Neutral => 4,
            Sentiment::Positive => 5,
        }
    }

    pub fn from_index(idx: i64) -> Option<Self> {
        match idx {
            3 => Some(Sentiment::Negative),
            4 => Some(Sentiment::Neutral),
            5 => Some(Sentiment::Positive),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Negative => write!(f, "negative"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Positive => write!(f, "positive"),
        }
    }
}

impl FromStr for Sentiment {
    type Err = MsfanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            "positive" => Ok(Sentiment::Positive),
            other => Err(MsfanError::UnknownSentiment(other.to_string())),
        }
    }
}

/// Class of one cell in the tag matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridTag {
    /// Valid cell with no relation.
    Null,
    /// Word (or word pair) inside an aspect term.
    Aspect,
    /// Word (or word pair) inside an opinion term.
    Opinion,
    /// Aspect-opinion link without polarity (pair task).
    Pair,
    /// Aspect-opinion link with polarity (triplet task).
    Sentiment(Sentiment),
}

impl GridTag {
    /// Label value for padding and lower-triangle cells.
    pub const IGNORE_INDEX: i64 = -1;

    /// Get the class index for tensor operations.
    pub fn index(&self) -> i64 {
        match self {
            GridTag::Null => 0,
            GridTag::Aspect => 1,
            GridTag::Opinion => 2,
            GridTag::Pair => 3,
            GridTag::Sentiment(s) => s.index(),
        }
    }

    /// Get tag from class index. Index 3 means `Pair` or `Negative`
    /// depending on the task.
    pub fn from_index(idx: i64, task: Task) -> Option<Self> {
        match (idx, task) {
            (0, _) => Some(GridTag::Null),
            (1, _) => Some(GridTag::Aspect),
            (2, _) => Some(GridTag::Opinion),
            (3, Task::Pair) => Some(GridTag::Pair),
            (idx, Task::Triplet) => Sentiment::from_index(idx).map(GridTag::Sentiment),
            _ => None,
        }
    }

    /// Check if this tag links an aspect to an opinion.
    pub fn is_relation(&self) -> bool {
        matches!(self, GridTag::Pair | GridTag::Sentiment(_))
    }
}

impl fmt::Display for GridTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridTag::Null => write!(f, "N"),
            GridTag::Aspect => write!(f, "A"),
            GridTag::Opinion => write!(f, "O"),
            GridTag::Pair => write!(f, "PAIR"),
            GridTag::Sentiment(s) => write!(f, "{}", s.to_string().to_uppercase()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_index_roundtrip() {
        let triplet_tags = [
            GridTag::Null,
            GridTag::Aspect,
            GridTag::Opinion,
            GridTag::Sentiment(Sentiment::Negative),
            GridTag::Sentiment(Sentiment::Neutral),
            GridTag::Sentiment(Sentiment::Positive),
        ];
        for tag in triplet_tags {
            assert_eq!(GridTag::from_index(tag.index(), Task::Triplet), Some(tag));
        }
        assert_eq!(GridTag::from_index(3, Task::Pair), Some(GridTag::Pair));
        assert_eq!(GridTag::from_index(5, Task::Pair), None);
        assert_eq!(GridTag::from_index(-1, Task::Triplet), None);
    }

    #[test]
    fn test_relation_tag_per_task() {
        assert_eq!(Task::Pair.relation_tag(Sentiment::Positive), GridTag::Pair);
        assert_eq!(
            Task::Triplet.relation_tag(Sentiment::Neutral).index(),
            4
        );
        assert!(GridTag::Pair.is_relation());
        assert!(!GridTag::Aspect.is_relation());
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("triplet".parse::<Task>().unwrap(), Task::Triplet);
        assert!("quad".parse::<Task>().is_err());
        assert_eq!("negative".parse::<Sentiment>().unwrap(), Sentiment::Negative);
        assert!(matches!(
            "conflict".parse::<Sentiment>(),
            Err(MsfanError::UnknownSentiment(_))
        ));
    }

    #[test]
    fn test_min_classes() {
        assert_eq!(Task::Pair.min_classes(), 4);
        assert_eq!(Task::Triplet.min_classes(), 6);
        assert_eq!(Task::Triplet.to_string(), "triplet");
    }
}
