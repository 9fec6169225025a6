//! Replay a recorded L4 feed through the ingestion thread.
//!
//! Each line of the recording is one JSON `FeedEvent`. Without a path a
//! small synthetic feed is replayed instead.
//!
//! Usage:
//! ```bash
//! RUST_LOG=debug cargo run --release --example replay [path/to/BTC_2025-02-03.l4.jsonl] [levels]
//! ```

use std::env;
use std::time::Instant;

use l4_book_reconstructor::analytics::BookMetrics;
use l4_book_reconstructor::publisher::{spawn_ingest, BookView, PublisherConfig};
use l4_book_reconstructor::source::{JsonLinesSource, VecSource};
use l4_book_reconstructor::{
    BookDiff, BookReconstructor, Diff, FeedEvent, OrderEntry, Side, Snapshot,
};

fn synthetic_feed() -> Vec<FeedEvent> {
    let mut events = vec![FeedEvent::Snapshot(Snapshot::new(
        "BTC",
        1_000,
        vec![
            OrderEntry::new(1, "64000.0", "0.5", "0xaa"),
            OrderEntry::new(2, "63999.5", "1.2", "0xbb"),
        ],
        vec![
            OrderEntry::new(3, "64001.0", "0.8", "0xcc"),
            OrderEntry::new(4, "64002.5", "2.0", "0xaa"),
        ],
    ))];

    for i in 0..20u64 {
        let oid = 100 + i;
        let (side, price) = if i % 2 == 0 {
            (Side::Bid, format!("{}.5", 63990 + i))
        } else {
            (Side::Ask, format!("{}.0", 64003 + i))
        };
        let mut diff = Diff::new(1_001 + i)
            .with_status(oid, side)
            .with_diff(BookDiff::new_order(oid, price, "0xdd", "0.25"));
        if i % 5 == 4 {
            diff = diff.with_diff(BookDiff::remove(oid - 3));
        }
        events.push(FeedEvent::Updates(diff));
    }
    events
}

fn print_view(view: &BookView) {
    println!(
        "#{:<5} height={:?} orders: bids={} asks={} spread={}",
        view.sequence,
        view.height,
        view.bid_orders,
        view.ask_orders,
        view.spread.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let levels: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
    let config = PublisherConfig::default().with_depth(levels);
    let book = BookReconstructor::new(levels);

    let start = Instant::now();
    let (views, handle) = match args.get(1) {
        Some(path) => {
            println!("📂 Replaying {path}");
            spawn_ingest(book, JsonLinesSource::open(path)?, config)?
        }
        None => {
            println!("📂 No recording given, replaying synthetic feed");
            spawn_ingest(book, VecSource::new(synthetic_feed()), config)?
        }
    };

    let mut last = None;
    for view in views {
        if view.sequence % 1_000 == 1 || !view.changes.removed.is_empty() {
            print_view(&view);
        }
        last = Some(view);
    }
    let (book, report) = handle.join()?;
    let elapsed = start.elapsed();

    if let Some(view) = &last {
        print_view(view);
    }

    println!("\n=== {} @ {:?} ===", book.symbol().unwrap_or("?"), book.height());
    println!("{:>14} {:>12} {:>6}", "price", "size", "orders");
    let (bids, asks) = book.top_of_book();
    for level in asks.iter().rev() {
        println!("ASK {:>10} {:>12} {:>6}", level.price, level.aggregated_size, level.order_count);
    }
    println!("{}", "-".repeat(34));
    for level in &bids {
        println!("BID {:>10} {:>12} {:>6}", level.price, level.aggregated_size, level.order_count);
    }

    let metrics = BookMetrics::from_levels(&bids, &asks);
    if let (Some(spread), Some(pct)) = (metrics.spread, metrics.spread_pct) {
        println!("\nSpread: {spread} ({:.4}%)", pct);
    }
    println!(
        "Total Orders (Bids: {}, Asks: {})",
        book.side_order_count(Side::Bid),
        book.side_order_count(Side::Ask)
    );

    println!("\n📊 {} events in {:.2?}", report.events, elapsed);
    println!(
        "   snapshots={} diffs={} rejected={} resets={}",
        report.snapshots, report.diffs_applied, report.events_rejected, report.resets
    );
    println!(
        "   views published={} dropped={}",
        report.views_published, report.views_dropped
    );
    println!("   diagnostics={}", book.warnings().total_count());

    book.verify_integrity()?;
    println!("✅ Book integrity verified");

    Ok(())
}
