//! # Grid Decoding
//!
//! Reads term spans off the matrix diagonal and links aspect spans to
//! opinion spans through the cross cells between them.

use crate::scoring::metric::TagGrid;
use crate::tags::{GridTag, Sentiment};

/// A decoded aspect-opinion link: inclusive aspect span, inclusive opinion
/// span and (triplet task only) the polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tuple {
    pub aspect: (usize, usize),
    pub opinion: (usize, usize),
    pub sentiment: Option<Sentiment>,
}

/// Maximal runs of diagonal cells equal to `term` within `length`.
/// Ignored diagonal cells are skipped without closing the run.
pub fn term_spans(grid: &TagGrid, length: usize, term: GridTag, ignore_index: i64) -> Vec<(usize, usize)> {
    let target = term.index();
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for i in 0..length.min(grid.size()) {
        let cell = grid.get(i, i);
        if cell == ignore_index {
            continue;
        }
        if cell == target {
            start.get_or_insert(i);
        } else if let Some(s) = start.take() {
            spans.push((s, i - 1));
        }
    }

    if let Some(s) = start {
        spans.push((s, length.min(grid.size()) - 1));
    }

    spans
}

/// Count cross-cell classes between an aspect and an opinion span, reading
/// cells in upper-triangle orientation. Out-of-range classes are skipped.
fn cross_counts(
    grid: &TagGrid,
    aspect: (usize, usize),
    opinion: (usize, usize),
    class_num: usize,
) -> Vec<usize> {
    let mut counts = vec![0usize; class_num];
    let (al, ar) = aspect;
    let (pl, pr) = opinion;

    for i in al..=ar {
        for j in pl..=pr {
            let cell = if al < pl { grid.get(i, j) } else { grid.get(j, i) };
            if let Some(slot) = usize::try_from(cell).ok().and_then(|c| counts.get_mut(c)) {
                *slot += 1;
            }
        }
    }

    counts
}

/// Aspect-opinion pairs linked by at least one pair-relation cell.
pub fn find_pairs(
    grid: &TagGrid,
    aspects: &[(usize, usize)],
    opinions: &[(usize, usize)],
    class_num: usize,
) -> Vec<Tuple> {
    let relation = GridTag::Pair.index() as usize;
    let mut pairs = Vec::new();

    for &aspect in aspects {
        for &opinion in opinions {
            let counts = cross_counts(grid, aspect, opinion, class_num.max(relation + 1));
            if counts[relation] == 0 {
                continue;
            }
            pairs.push(Tuple {
                aspect,
                opinion,
                sentiment: None,
            });
        }
    }

    pairs
}

/// Aspect-opinion triplets, polarity decided by majority over cross cells
/// (ties favour positive, then neutral).
pub fn find_triplets(
    grid: &TagGrid,
    aspects: &[(usize, usize)],
    opinions: &[(usize, usize)],
    class_num: usize,
) -> Vec<Tuple> {
    let negative = Sentiment::Negative.index() as usize;
    let neutral = Sentiment::Neutral.index() as usize;
    let positive = Sentiment::Positive.index() as usize;
    let mut triplets = Vec::new();

    for &aspect in aspects {
        for &opinion in opinions {
            let counts = cross_counts(grid, aspect, opinion, class_num.max(positive + 1));
            if counts[negative..].iter().sum::<usize>() == 0 {
                continue;
            }

            let (n3, n4, n5) = (counts[negative], counts[neutral], counts[positive]);
            let sentiment = if n5 >= n4 && n5 >= n3 {
                Sentiment::Positive
            } else if n4 >= n3 && n4 >= n5 {
                Sentiment::Neutral
            } else {
                Sentiment::Negative
            };

            triplets.push(Tuple {
                aspect,
                opinion,
                sentiment: Some(sentiment),
            });
        }
    }

    triplets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with(size: usize, cells: &[(usize, usize, i64)]) -> TagGrid {
        let mut grid = TagGrid::filled(size, 0);
        for &(i, j, v) in cells {
            grid.set(i, j, v);
        }
        grid
    }

    #[test]
    fn test_term_spans() {
        let grid = grid_with(5, &[(0, 0, 1), (1, 1, 1), (3, 3, 1), (4, 4, 2)]);
        assert_eq!(term_spans(&grid, 5, GridTag::Aspect, -1), vec![(0, 1), (3, 3)]);
        assert_eq!(term_spans(&grid, 5, GridTag::Opinion, -1), vec![(4, 4)]);
        // length bounds the scan
        assert_eq!(term_spans(&grid, 3, GridTag::Aspect, -1), vec![(0, 1)]);
    }

    #[test]
    fn test_term_spans_skip_ignored_diagonal() {
        let grid = grid_with(4, &[(0, 0, 1), (1, 1, -1), (2, 2, 1)]);
        assert_eq!(term_spans(&grid, 4, GridTag::Aspect, -1), vec![(0, 2)]);
    }

    #[test]
    fn test_find_pairs() {
        let grid = grid_with(4, &[(0, 0, 1), (3, 3, 2), (0, 3, 3)]);
        let pairs = find_pairs(&grid, &[(0, 0)], &[(3, 3)], 4);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].sentiment, None);

        let unlinked = grid_with(4, &[(0, 0, 1), (3, 3, 2)]);
        assert!(find_pairs(&unlinked, &[(0, 0)], &[(3, 3)], 4).is_empty());
    }

    #[test]
    fn test_find_triplets_majority_vote() {
        let grid = grid_with(4, &[(0, 3, 3), (1, 3, 5)]);
        let triplets = find_triplets(&grid, &[(0, 1)], &[(3, 3)], 6);
        assert_eq!(triplets[0].sentiment, Some(Sentiment::Positive));

        let grid = grid_with(4, &[(0, 3, 3), (1, 3, 3), (2, 3, 4)]);
        let triplets = find_triplets(&grid, &[(0, 2)], &[(3, 3)], 6);
        assert_eq!(triplets[0].sentiment, Some(Sentiment::Negative));
    }

    #[test]
    fn test_find_triplets_opinion_before_aspect() {
        // opinion at 0, aspect at 2: cross cell lives at (0, 2)
        let grid = grid_with(3, &[(0, 2, 4)]);
        let triplets = find_triplets(&grid, &[(2, 2)], &[(0, 0)], 6);
        assert_eq!(triplets.len(), 1);
        assert_eq!(triplets[0].sentiment, Some(Sentiment::Neutral));
    }

    #[test]
    fn test_out_of_range_classes_not_counted() {
        let grid = grid_with(3, &[(0, 2, -1)]);
        assert!(find_triplets(&grid, &[(0, 0)], &[(2, 2)], 6).is_empty());
    }
}
