use criterion::{Criterion, black_box, criterion_group, criterion_main};
use msfan_core::{Scorer, TagGrid, Task};

fn synthetic_grid(size: usize, offset: usize) -> TagGrid {
    let mut grid = TagGrid::filled(size, 0);
    for start in (offset..size.saturating_sub(4)).step_by(7) {
        grid.set(start, start, 1);
        grid.set(start + 1, start + 1, 1);
        grid.set(start + 3, start + 3, 2);
        grid.set(start, start + 3, 5);
        grid.set(start + 1, start + 3, 5);
    }
    grid
}

fn bench_scoring(c: &mut Criterion) {
    let scorer = Scorer::new(Task::Triplet, 6);
    let labels: Vec<TagGrid> = (0..256).map(|i| synthetic_grid(100, i % 5)).collect();
    let predictions: Vec<TagGrid> = (0..256).map(|i| synthetic_grid(100, i % 3)).collect();
    let lengths = vec![100usize; 256];

    c.bench_function("score_uniontags_256", |b| {
        b.iter(|| scorer.score_uniontags(black_box(&predictions), black_box(&labels), &lengths));
    });

    c.bench_function("score_aspect_256", |b| {
        b.iter(|| scorer.score_aspect(black_box(&predictions), black_box(&labels), &lengths));
    });
}

criterion_group!(benches, bench_scoring);
criterion_main!(benches);
