//! # Precision / Recall / F1 over decoded grids
//!
//! Every decoded item is keyed by its sentence position, so identical spans
//! in different sentences never collide.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scoring::decode::{Tuple, find_pairs, find_triplets, term_spans};
use crate::tags::{GridTag, Task};

/// Square matrix of grid classes, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGrid {
    size: usize,
    cells: Vec<i64>,
}

impl TagGrid {
    pub fn filled(size: usize, value: i64) -> Self {
        Self {
            size,
            cells: vec![value; size * size],
        }
    }

    /// Wrap row-major cells. Returns `None` when `cells` is not `size²` long.
    pub fn from_cells(size: usize, cells: Vec<i64>) -> Option<Self> {
        (cells.len() == size * size).then_some(Self { size, cells })
    }

    /// Place a smaller `window × window` prediction into a zero grid of
    /// `size × size`.
    pub fn padded(window: &[Vec<u32>], size: usize) -> Self {
        let mut grid = Self::filled(size, 0);
        for (i, row) in window.iter().take(size).enumerate() {
            for (j, &value) in row.iter().take(size).enumerate() {
                grid.set(i, j, i64::from(value));
            }
        }
        grid
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.cells[row * self.size + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: i64) {
        self.cells[row * self.size + col] = value;
    }
}

/// Precision, recall and F1 of one extraction level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Scores {
    /// Scores from set sizes; each ratio is 0 when its denominator is 0.
    pub fn from_counts(correct: usize, predicted: usize, golden: usize) -> Self {
        let precision = if predicted > 0 {
            correct as f64 / predicted as f64
        } else {
            0.0
        };
        let recall = if golden > 0 {
            correct as f64 / golden as f64
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
        }
    }
}

impl fmt::Display for Scores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P:{:.5}\tR:{:.5}\tF1:{:.5}",
            self.precision, self.recall, self.f1
        )
    }
}

/// Scores predicted grids against gold grids.
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    task: Task,
    class_num: usize,
    ignore_index: i64,
}

impl Scorer {
    pub fn new(task: Task, class_num: usize) -> Self {
        Self {
            task,
            class_num,
            ignore_index: GridTag::IGNORE_INDEX,
        }
    }

    pub fn task(&self) -> Task {
        self.task
    }

    /// Pair or triplet level, depending on the task.
    pub fn score_uniontags(
        &self,
        predictions: &[TagGrid],
        labels: &[TagGrid],
        lengths: &[usize],
    ) -> Scores {
        self.score_with(predictions, labels, lengths, |grid, length| {
            self.tuples(grid, length)
        })
    }

    /// Aspect term level.
    pub fn score_aspect(
        &self,
        predictions: &[TagGrid],
        labels: &[TagGrid],
        lengths: &[usize],
    ) -> Scores {
        self.score_with(predictions, labels, lengths, |grid, length| {
            term_spans(grid, length, GridTag::Aspect, self.ignore_index)
        })
    }

    /// Opinion term level.
    pub fn score_opinion(
        &self,
        predictions: &[TagGrid],
        labels: &[TagGrid],
        lengths: &[usize],
    ) -> Scores {
        self.score_with(predictions, labels, lengths, |grid, length| {
            term_spans(grid, length, GridTag::Opinion, self.ignore_index)
        })
    }

    fn tuples(&self, grid: &TagGrid, length: usize) -> Vec<Tuple> {
        let aspects = term_spans(grid, length, GridTag::Aspect, self.ignore_index);
        let opinions = term_spans(grid, length, GridTag::Opinion, self.ignore_index);
        match self.task {
            Task::Pair => find_pairs(grid, &aspects, &opinions, self.class_num),
            Task::Triplet => find_triplets(grid, &aspects, &opinions, self.class_num),
        }
    }

    fn score_with<T, F>(
        &self,
        predictions: &[TagGrid],
        labels: &[TagGrid],
        lengths: &[usize],
        extract: F,
    ) -> Scores
    where
        T: Eq + std::hash::Hash,
        F: Fn(&TagGrid, usize) -> Vec<T>,
    {
        let mut golden = HashSet::new();
        let mut predicted = HashSet::new();

        for (sentence, ((prediction, label), &length)) in
            predictions.iter().zip(labels).zip(lengths).enumerate()
        {
            golden.extend(extract(label, length).into_iter().map(|t| (sentence, t)));
            predicted.extend(extract(prediction, length).into_iter().map(|t| (sentence, t)));
        }

        let correct = golden.intersection(&predicted).count();
        Scores::from_counts(correct, predicted.len(), golden.len())
    }
}
