//! Raw sentence packs as stored in `<dataset>/{train,dev,test}.json`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{MsfanError, Result};
use crate::tags::Sentiment;

/// One annotated sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentencePack {
    pub id: String,
    /// Whitespace-tokenized sentence text.
    pub sentence: String,
    #[serde(default)]
    pub triples: Vec<Triple>,
}

/// One aspect/opinion/sentiment annotation. Tag strings hold one
/// `word\TAG` item per token, where the tag ends in `B`, `I` or `O`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub target_tags: String,
    pub opinion_tags: String,
    pub sentiment: String,
}

impl Triple {
    /// Inclusive token spans of the aspect term(s).
    pub fn aspect_spans(&self) -> Vec<(usize, usize)> {
        bio_spans(&self.target_tags)
    }

    /// Inclusive token spans of the opinion term(s).
    pub fn opinion_spans(&self) -> Vec<(usize, usize)> {
        bio_spans(&self.opinion_tags)
    }

    pub fn polarity(&self) -> Result<Sentiment> {
        self.sentiment.parse()
    }
}

/// Read a split file holding a JSON array of sentence packs.
pub fn load_sentence_packs(path: &Path) -> Result<Vec<SentencePack>> {
    let file = File::open(path).map_err(|source| MsfanError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let packs: Vec<SentencePack> = serde_json::from_reader(BufReader::new(file))?;
    info!(path = %path.display(), sentences = packs.len(), "loaded sentence packs");
    Ok(packs)
}

/// Collect inclusive `(start, end)` spans from a BIO-tagged token string.
///
/// A `B` opens a new span (closing any open one), an `O` closes the open
/// span, and `I` extends it.
pub fn bio_spans(tags: &str) -> Vec<(usize, usize)> {
    let items: Vec<&str> = tags.split_whitespace().collect();
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (i, item) in items.iter().enumerate() {
        if item.ends_with('B') {
            if let Some(s) = start {
                spans.push((s, i - 1));
            }
            start = Some(i);
        } else if item.ends_with('O') {
            if let Some(s) = start.take() {
                spans.push((s, i - 1));
            }
        }
    }

    if let Some(s) = start {
        spans.push((s, items.len() - 1));
    }

    spans
}
