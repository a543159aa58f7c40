//! # Batch Iterator
//!
//! Groups instances into fixed-size contiguous batches and stacks them into
//! tensors on demand. Batch order follows instance order; shuffle the
//! instances before construction to randomize an epoch.

use candle_core::{Device, Tensor};

use crate::data::instance::Instance;
use crate::error::{MsfanError, Result};

/// Stacked tensors for one slice of instances.
#[derive(Debug, Clone)]
pub struct Batch {
    pub ids: Vec<String>,
    /// `[batch, max_len]` u32
    pub tokens: Tensor,
    pub lengths: Vec<usize>,
    /// `[batch, max_len]` f32
    pub masks: Tensor,
    /// `[batch, max_len]` i64
    pub aspect_tags: Tensor,
    /// `[batch, max_len]` i64
    pub opinion_tags: Tensor,
    /// `[batch, max_len, max_len]` i64
    pub tags: Tensor,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Side of the square region used for both model inputs and loss.
    ///
    /// This is the *first* instance's length, shared by the whole batch:
    /// later instances that are longer get cropped to it.
    pub fn crop_window(&self) -> usize {
        crop_window(&self.lengths)
    }

    /// Gold tags restricted to `[:, :w, :w]` and flattened row-major.
    pub fn cropped_tags(&self) -> Result<Vec<i64>> {
        let window = self.crop_window();
        let cropped = self
            .tags
            .narrow(1, 0, window)?
            .narrow(2, 0, window)?
            .contiguous()?
            .flatten_all()?
            .to_vec1::<i64>()?;
        Ok(cropped)
    }
}

/// Crop window for a batch with the given lengths (at least 1).
pub fn crop_window(lengths: &[usize]) -> usize {
    lengths.first().copied().unwrap_or(1).max(1)
}

/// Random access over contiguous batches of instances.
#[derive(Debug, Clone)]
pub struct DataIterator {
    instances: Vec<Instance>,
    batch_size: usize,
    max_len: usize,
    device: Device,
}

impl DataIterator {
    pub fn new(instances: Vec<Instance>, batch_size: usize, device: &Device) -> Result<Self> {
        if batch_size == 0 {
            return Err(MsfanError::InvalidConfig("batch_size must be positive".into()));
        }
        let max_len = instances
            .first()
            .map(Instance::max_sequence_len)
            .unwrap_or(0);
        if let Some(other) = instances.iter().find(|i| i.max_sequence_len() != max_len) {
            return Err(MsfanError::InvalidConfig(format!(
                "instance {} has max length {} but {} was expected",
                other.id,
                other.max_sequence_len(),
                max_len
            )));
        }

        Ok(Self {
            instances,
            batch_size,
            max_len,
            device: device.clone(),
        })
    }

    /// `ceil(N / batch_size)`
    pub fn batch_count(&self) -> usize {
        self.instances.len().div_ceil(self.batch_size)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn max_sequence_len(&self) -> usize {
        self.max_len
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Stack instances `[index * B, min((index + 1) * B, N))`.
    pub fn get_batch(&self, index: usize) -> Result<Batch> {
        let count = self.batch_count();
        if index >= count {
            return Err(MsfanError::BatchOutOfRange { index, count });
        }

        let start = index * self.batch_size;
        let end = (start + self.batch_size).min(self.instances.len());
        let slice = &self.instances[start..end];
        let (b, l) = (slice.len(), self.max_len);

        let mut ids = Vec::with_capacity(b);
        let mut lengths = Vec::with_capacity(b);
        let mut tokens = Vec::with_capacity(b * l);
        let mut masks = Vec::with_capacity(b * l);
        let mut aspect_tags = Vec::with_capacity(b * l);
        let mut opinion_tags = Vec::with_capacity(b * l);
        let mut tags = Vec::with_capacity(b * l * l);

        for instance in slice {
            ids.push(instance.id.clone());
            lengths.push(instance.length);
            tokens.extend_from_slice(&instance.tokens);
            masks.extend_from_slice(&instance.mask);
            aspect_tags.extend_from_slice(&instance.aspect_tags);
            opinion_tags.extend_from_slice(&instance.opinion_tags);
            tags.extend_from_slice(&instance.tags);
        }

        Ok(Batch {
            ids,
            tokens: Tensor::from_vec(tokens, (b, l), &self.device)?,
            lengths,
            masks: Tensor::from_vec(masks, (b, l), &self.device)?,
            aspect_tags: Tensor::from_vec(aspect_tags, (b, l), &self.device)?,
            opinion_tags: Tensor::from_vec(opinion_tags, (b, l), &self.device)?,
            tags: Tensor::from_vec(tags, (b, l, l), &self.device)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::instance::InstanceConfig;
    use crate::data::sentence::SentencePack;
    use crate::tags::Task;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn instances(n: usize, max_len: usize) -> Vec<Instance> {
        let config = InstanceConfig {
            max_sequence_len: max_len,
            span: 2,
            task: Task::Triplet,
        };
        (0..n)
            .map(|i| {
                let sentence = vec!["w"; i % max_len + 1].join(" ");
                let pack = SentencePack {
                    id: format!("s{i}"),
                    sentence,
                    triples: vec![],
                };
                Instance::new(&pack, &HashMap::new(), &config).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_three_instances_batch_two() {
        let iter = DataIterator::new(instances(3, 4), 2, &Device::Cpu).unwrap();
        assert_eq!(iter.batch_count(), 2);

        let first = iter.get_batch(0).unwrap();
        let second = iter.get_batch(1).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert_eq!(first.tokens.dims(), &[2, 4]);
        assert_eq!(first.tags.dims(), &[2, 4, 4]);
        assert_eq!(second.ids, vec!["s2".to_string()]);
    }

    #[test]
    fn test_out_of_range_batch() {
        let iter = DataIterator::new(instances(3, 4), 2, &Device::Cpu).unwrap();
        let err = iter.get_batch(2).unwrap_err();
        assert!(matches!(err, MsfanError::BatchOutOfRange { index: 2, count: 2 }));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(DataIterator::new(instances(1, 4), 0, &Device::Cpu).is_err());
    }

    #[test]
    fn test_crop_window_uses_first_length() {
        let iter = DataIterator::new(instances(3, 4), 3, &Device::Cpu).unwrap();
        let batch = iter.get_batch(0).unwrap();
        assert_eq!(batch.lengths, vec![1, 2, 3]);
        assert_eq!(batch.crop_window(), 1);

        let cropped = batch.cropped_tags().unwrap();
        assert_eq!(cropped.len(), 3);
        assert_eq!(cropped, vec![0, 0, 0]);
        assert_eq!(crop_window(&[]), 1);
        assert_eq!(crop_window(&[0, 3]), 1);
    }

    #[test]
    fn test_masks_match_lengths() {
        let iter = DataIterator::new(instances(2, 3), 2, &Device::Cpu).unwrap();
        let batch = iter.get_batch(0).unwrap();
        let masks = batch.masks.to_vec2::<f32>().unwrap();
        assert_eq!(masks, vec![vec![1.0, 0.0, 0.0], vec![1.0, 1.0, 0.0]]);
    }

    proptest! {
        #[test]
        fn prop_batches_partition_instances(n in 0usize..40, b in 1usize..9) {
            let iter = DataIterator::new(instances(n, 3), b, &Device::Cpu).unwrap();
            prop_assert_eq!(iter.batch_count(), n.div_ceil(b));

            let mut seen = Vec::new();
            for index in 0..iter.batch_count() {
                let batch = iter.get_batch(index).unwrap();
                prop_assert!(!batch.is_empty() && batch.len() <= b);
                seen.extend(batch.ids);
            }
            let expected: Vec<String> = (0..n).map(|i| format!("s{i}")).collect();
            prop_assert_eq!(seen, expected);
        }
    }
}
