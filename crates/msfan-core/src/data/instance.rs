//! # Instance Builder
//!
//! Converts a sentence pack into fixed-shape numeric arrays: token ids,
//! mask, aspect/opinion sequence tags and the square tag matrix.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::embedding::unk_index;
use crate::data::sentence::SentencePack;
use crate::error::{MsfanError, Result};
use crate::tags::{GridTag, Task};

/// Sequence tag of the first word of a term.
const TERM_BEGIN: i64 = 1;
/// Sequence tag of the following words of a term.
const TERM_INSIDE: i64 = 2;

/// Shape and rasterization policy shared by all instances of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub max_sequence_len: usize,
    /// Maximum width (in words) of intra-term cells marked in the matrix.
    pub span: usize,
    pub task: Task,
}

impl InstanceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_sequence_len == 0 {
            return Err(MsfanError::InvalidConfig(
                "max_sequence_len must be positive".into(),
            ));
        }
        if self.span == 0 {
            return Err(MsfanError::InvalidConfig("span must be positive".into()));
        }
        Ok(())
    }
}

/// One sentence in numeric form. All sequences have `max_sequence_len`
/// entries; `tags` is row-major `max_sequence_len²`.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub id: String,
    pub tokens: Vec<u32>,
    /// Number of retained words (`<= max_sequence_len`).
    pub length: usize,
    pub mask: Vec<f32>,
    pub aspect_tags: Vec<i64>,
    pub opinion_tags: Vec<i64>,
    pub tags: Vec<i64>,
    max_len: usize,
}

impl Instance {
    pub fn new(
        pack: &SentencePack,
        word_index: &HashMap<String, u32>,
        config: &InstanceConfig,
    ) -> Result<Self> {
        config.validate()?;
        let max_len = config.max_sequence_len;
        let words: Vec<&str> = pack.sentence.split_whitespace().collect();
        let length = words.len().min(max_len);
        if words.len() > max_len {
            debug!(
                id = %pack.id,
                words = words.len(),
                max_len,
                "truncating sentence"
            );
        }

        let unk = unk_index(word_index);
        let mut tokens = vec![0u32; max_len];
        for (slot, word) in tokens.iter_mut().zip(&words) {
            *slot = word_index.get(*word).copied().unwrap_or(unk);
        }

        let mut mask = vec![0f32; max_len];
        mask[..length].fill(1.0);

        let mut aspect_tags = vec![GridTag::IGNORE_INDEX; max_len];
        let mut opinion_tags = vec![GridTag::IGNORE_INDEX; max_len];
        aspect_tags[..length].fill(GridTag::Null.index());
        opinion_tags[..length].fill(GridTag::Null.index());

        let mut instance = Self {
            id: pack.id.clone(),
            tokens,
            length,
            mask,
            aspect_tags,
            opinion_tags,
            tags: vec![GridTag::IGNORE_INDEX; max_len * max_len],
            max_len,
        };

        for i in 0..length {
            for j in i..length {
                instance.set_tag(i, j, GridTag::Null.index());
            }
        }

        for triple in &pack.triples {
            let relation = config.task.relation_tag(triple.polarity()?);
            let aspects = clip_spans(triple.aspect_spans(), length);
            let opinions = clip_spans(triple.opinion_spans(), length);

            for &(l, r) in &aspects {
                instance.mark_term(l, r, GridTag::Aspect, config.span);
            }
            for &(l, r) in &opinions {
                instance.mark_term(l, r, GridTag::Opinion, config.span);
            }

            for &(al, ar) in &aspects {
                for &(pl, pr) in &opinions {
                    for i in al..=ar {
                        for j in pl..=pr {
                            instance.set_tag(i.min(j), i.max(j), relation.index());
                        }
                    }
                }
            }
        }

        Ok(instance)
    }

    pub fn max_sequence_len(&self) -> usize {
        self.max_len
    }

    /// Class of cell `(row, col)`.
    pub fn tag(&self, row: usize, col: usize) -> i64 {
        self.tags[row * self.max_len + col]
    }

    fn set_tag(&mut self, row: usize, col: usize, value: i64) {
        self.tags[row * self.max_len + col] = value;
    }

    fn mark_term(&mut self, l: usize, r: usize, tag: GridTag, span: usize) {
        let sequence = match tag {
            GridTag::Aspect => &mut self.aspect_tags,
            _ => &mut self.opinion_tags,
        };
        for i in l..=r {
            sequence[i] = if i == l { TERM_BEGIN } else { TERM_INSIDE };
        }

        let value = tag.index();
        for i in l..=r {
            self.set_tag(i, i, value);
            if i > l {
                self.set_tag(i - 1, i, value);
            }
            for j in i..=r.min(i + span - 1) {
                self.set_tag(i, j, value);
            }
        }
    }
}

/// Drop spans starting past `length` and clip the rest to it.
fn clip_spans(spans: Vec<(usize, usize)>, length: usize) -> Vec<(usize, usize)> {
    spans
        .into_iter()
        .filter(|&(l, _)| l < length)
        .map(|(l, r)| (l, r.min(length - 1)))
        .collect()
}

/// Build instances for every pack, preserving order.
pub fn load_instances(
    packs: &[SentencePack],
    word_index: &HashMap<String, u32>,
    config: &InstanceConfig,
) -> Result<Vec<Instance>> {
    config.validate()?;
    let instances = packs
        .iter()
        .map(|pack| Instance::new(pack, word_index, config))
        .collect::<Result<Vec<_>>>()?;
    info!(instances = instances.len(), task = %config.task, "built instances");
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sentence::Triple;
    use crate::tags::Sentiment;

    fn word_index() -> HashMap<String, u32> {
        ["<pad>", "<unk>", "The", "fried", "rice", "is", "great"]
            .iter()
            .enumerate()
            .map(|(i, w)| (w.to_string(), i as u32))
            .collect()
    }

    fn pack() -> SentencePack {
        SentencePack {
            id: "s1".into(),
            sentence: "The fried rice is great".into(),
            triples: vec![Triple {
                uid: None,
                target_tags: r"The\O fried\B rice\I is\O great\O".into(),
                opinion_tags: r"The\O fried\O rice\O is\O great\B".into(),
                sentiment: "positive".into(),
            }],
        }
    }

    fn config(task: Task, max_sequence_len: usize) -> InstanceConfig {
        InstanceConfig {
            max_sequence_len,
            span: 2,
            task,
        }
    }

    #[test]
    fn test_tokens_mask_and_sequence_tags() {
        let instance = Instance::new(&pack(), &word_index(), &config(Task::Triplet, 8)).unwrap();

        assert_eq!(instance.length, 5);
        assert_eq!(instance.tokens, vec![2, 3, 4, 5, 6, 0, 0, 0]);
        assert_eq!(instance.mask, vec![1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        assert_eq!(instance.aspect_tags, vec![0, 1, 2, 0, 0, -1, -1, -1]);
        assert_eq!(instance.opinion_tags, vec![0, 0, 0, 0, 1, -1, -1, -1]);
    }

    #[test]
    fn test_tag_matrix_rasterization() {
        let instance = Instance::new(&pack(), &word_index(), &config(Task::Triplet, 8)).unwrap();
        let positive = Sentiment::Positive.index();

        assert_eq!(instance.tag(1, 1), 1);
        assert_eq!(instance.tag(1, 2), 1);
        assert_eq!(instance.tag(2, 2), 1);
        assert_eq!(instance.tag(4, 4), 2);
        assert_eq!(instance.tag(1, 4), positive);
        assert_eq!(instance.tag(2, 4), positive);
        assert_eq!(instance.tag(0, 3), 0);
        // lower triangle and padding stay ignored
        assert_eq!(instance.tag(4, 1), -1);
        assert_eq!(instance.tag(5, 5), -1);
        assert_eq!(instance.tag(0, 7), -1);
    }

    #[test]
    fn test_pair_task_uses_pair_relation() {
        let instance = Instance::new(&pack(), &word_index(), &config(Task::Pair, 8)).unwrap();
        assert_eq!(instance.tag(1, 4), GridTag::Pair.index());
    }

    #[test]
    fn test_span_caps_intra_term_width() {
        let pack = SentencePack {
            id: "s2".into(),
            sentence: "a b c d".into(),
            triples: vec![Triple {
                uid: None,
                target_tags: r"a\B b\I c\I d\O".into(),
                opinion_tags: r"a\O b\O c\O d\B".into(),
                sentiment: "neutral".into(),
            }],
        };
        let instance = Instance::new(&pack, &word_index(), &config(Task::Triplet, 6)).unwrap();

        assert_eq!(instance.tag(0, 1), 1);
        assert_eq!(instance.tag(1, 2), 1);
        // wider than span=2
        assert_eq!(instance.tag(0, 2), 0);
        assert_eq!(instance.tag(0, 3), Sentiment::Neutral.index());
    }

    #[test]
    fn test_unknown_words_use_unk() {
        let pack = SentencePack {
            id: "s3".into(),
            sentence: "The sushi".into(),
            triples: vec![],
        };
        let instance = Instance::new(&pack, &word_index(), &config(Task::Triplet, 4)).unwrap();
        assert_eq!(&instance.tokens[..2], &[2, 1]);
    }

    #[test]
    fn test_overlong_sentence_truncated() {
        let words: Vec<String> = (0..12).map(|i| format!("w{i}")).collect();
        let opinion: Vec<String> = (0..12)
            .map(|i| format!("w{i}\\{}", if i == 10 { "B" } else { "O" }))
            .collect();
        let aspect: Vec<String> = (0..12)
            .map(|i| format!("w{i}\\{}", if i == 2 { "B" } else { "O" }))
            .collect();
        let pack = SentencePack {
            id: "long".into(),
            sentence: words.join(" "),
            triples: vec![Triple {
                uid: None,
                target_tags: aspect.join(" "),
                opinion_tags: opinion.join(" "),
                sentiment: "negative".into(),
            }],
        };

        let instance = Instance::new(&pack, &word_index(), &config(Task::Triplet, 8)).unwrap();
        assert_eq!(instance.length, 8);
        assert_eq!(instance.tokens.len(), 8);
        assert_eq!(instance.tags.len(), 64);
        assert_eq!(instance.tag(2, 2), 1);
        // opinion fell past the window
        assert!(instance.opinion_tags.iter().all(|&t| t == 0));
    }

    #[test]
    fn test_unknown_sentiment_fails() {
        let mut bad = pack();
        bad.triples[0].sentiment = "mixed".into();
        let err = load_instances(&[bad], &word_index(), &config(Task::Triplet, 8)).unwrap_err();
        assert!(matches!(err, MsfanError::UnknownSentiment(_)));
    }

    #[test]
    fn test_zero_max_len_rejected() {
        let err = load_instances(&[pack()], &word_index(), &config(Task::Triplet, 0)).unwrap_err();
        assert!(matches!(err, MsfanError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_span_rejected_by_single_instance() {
        let zero_span = InstanceConfig {
            span: 0,
            ..config(Task::Triplet, 8)
        };
        let err = Instance::new(&pack(), &word_index(), &zero_span).unwrap_err();
        assert!(matches!(err, MsfanError::InvalidConfig(_)));
    }
}
