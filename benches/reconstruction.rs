//! Benchmarks for L4 book reconstruction performance.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use l4_book_reconstructor::analytics::BookMetrics;
use l4_book_reconstructor::{
    BookConfig, BookDiff, BookReconstructor, Diff, OrderEntry, Side, Snapshot,
};

fn create_test_snapshot(count: u64) -> Snapshot {
    let mut bids = Vec::with_capacity(count as usize / 2);
    let mut asks = Vec::with_capacity(count as usize / 2);

    for oid in 1..=count {
        let offset = oid % 50;
        if oid % 2 == 0 {
            bids.push(OrderEntry::new(oid, format!("99.{:02}", 99 - offset), "1.5", "mm"));
        } else {
            asks.push(OrderEntry::new(oid, format!("100.{:02}", offset + 1), "2", "mm"));
        }
    }

    Snapshot::new("BENCH", 1, bids, asks)
}

/// Diffs that cycle adds, resizes and removals over a rolling window of ids.
fn create_test_diffs(count: u64, first_oid: u64) -> Vec<Diff> {
    (0..count)
        .map(|i| {
            let oid = first_oid + i;
            let side = if i % 2 == 0 { Side::Bid } else { Side::Ask };
            let price = match side {
                Side::Bid => format!("99.{:02}", 50 + i % 40),
                Side::Ask => format!("100.{:02}", 10 + i % 40),
            };

            let mut diff = Diff::new(2 + i)
                .with_status(oid, side)
                .with_diff(BookDiff::new_order(oid, price, "taker", "1"));
            if i >= 10 {
                diff = diff.with_diff(BookDiff::update(oid - 5, "0.5"));
                diff = diff.with_diff(BookDiff::remove(oid - 10));
            }
            diff
        })
        .collect()
}

fn quiet_book() -> BookReconstructor {
    BookReconstructor::with_config(BookConfig::new(10).with_logging(false))
}

fn bench_reconstruction(c: &mut Criterion) {
    let snapshot = create_test_snapshot(10_000);
    let diffs = create_test_diffs(10_000, 1_000_000);

    let mut group = c.benchmark_group("reconstruction");

    group.throughput(Throughput::Elements(10_000));
    group.bench_function("apply_snapshot", |b| {
        b.iter(|| {
            let mut book = quiet_book();
            black_box(book.apply_snapshot(&snapshot));
        })
    });

    group.throughput(Throughput::Elements(diffs.len() as u64));
    group.bench_function("apply_diffs", |b| {
        b.iter(|| {
            let mut book = quiet_book();
            book.apply_snapshot(&snapshot);
            for diff in &diffs {
                let _ = black_box(book.apply_diff(diff));
            }
        })
    });

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut book = quiet_book();
    book.apply_snapshot(&create_test_snapshot(10_000));
    for diff in &create_test_diffs(1_000, 1_000_000) {
        let _ = book.apply_diff(diff);
    }

    let mut group = c.benchmark_group("queries");

    group.bench_function("top_n_10", |b| {
        b.iter(|| black_box(book.top_n(Side::Bid, 10)))
    });

    group.bench_function("book_metrics", |b| {
        b.iter(|| black_box(BookMetrics::from_book(&book, 10)))
    });

    group.bench_function("queue_position", |b| {
        b.iter(|| black_box(book.queue_position(1_000_998)))
    });

    group.bench_function("verify_integrity", |b| {
        b.iter(|| black_box(book.verify_integrity()))
    });

    group.finish();
}

criterion_group!(benches, bench_reconstruction, bench_queries);
criterion_main!(benches);
