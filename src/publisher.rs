//! Producer/consumer publication of book views.
//!
//! An ingestion thread owns the `BookReconstructor`, applies every feed
//! event and publishes an immutable `BookView` after each applied event over
//! a bounded crossbeam channel. Readers never touch the live book.
//!
//! # Back-pressure
//!
//! | Mode | Channel full | Consumer gone |
//! |------|--------------|---------------|
//! | `Block` | ingestion waits | publication stops, ingestion continues |
//! | `DropOldest` | oldest queued view evicted | not observable, views keep rotating |
//!
//! Only views are ever dropped. Every event is applied to the book.
//!
//! # Example
//!
//! ```
//! use l4_book_reconstructor::publisher::{spawn_ingest, PublisherConfig};
//! use l4_book_reconstructor::source::VecSource;
//! use l4_book_reconstructor::{BookReconstructor, Diff, FeedEvent, Snapshot};
//!
//! let source = VecSource::new(vec![
//!     FeedEvent::Snapshot(Snapshot::new("BTC", 1, vec![], vec![])),
//!     FeedEvent::Updates(Diff::new(2)),
//! ]);
//!
//! let (views, handle) =
//!     spawn_ingest(BookReconstructor::new(10), source, PublisherConfig::default()).unwrap();
//! let heights: Vec<_> = views.iter().map(|v| v.height).collect();
//! let (book, report) = handle.join().unwrap();
//!
//! assert_eq!(heights, vec![Some(1), Some(2)]);
//! assert_eq!(book.height(), Some(2));
//! assert_eq!(report.events, 2);
//! ```

use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{L4Error, Result};
use crate::lob::{BookReconstructor, ChangeSet, ReconstructorState};
use crate::source::FeedSource;
use crate::types::{FeedEvent, LevelView, Side};

/// What the publisher does when the view channel is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackPressure {
    /// Wait for the consumer (default)
    #[default]
    Block,

    /// Evict the oldest queued view to make room
    DropOldest,
}

/// Configuration for view publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Channel capacity in views (at least 1)
    pub capacity: usize,

    /// Levels per side captured in each view
    pub depth: usize,

    pub back_pressure: BackPressure,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            depth: 10,
            back_pressure: BackPressure::Block,
        }
    }
}

impl PublisherConfig {
    /// Set the channel capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the number of levels captured per side.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set the back-pressure mode.
    pub fn with_back_pressure(mut self, back_pressure: BackPressure) -> Self {
        self.back_pressure = back_pressure;
        self
    }
}

// ============================================================================
// Book View
// ============================================================================

/// Immutable copy of the book taken right after one event was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookView {
    /// 1-based index of the event that produced this view
    pub sequence: u64,
    pub symbol: Option<String>,
    pub height: Option<u64>,
    pub state: ReconstructorState,
    pub bids: Vec<LevelView>,
    pub asks: Vec<LevelView>,
    pub changes: ChangeSet,
    pub bid_orders: usize,
    pub ask_orders: usize,
    pub spread: Option<Decimal>,
}

impl BookView {
    /// Materialize a view of the best `depth` levels per side.
    pub fn capture(book: &BookReconstructor, depth: usize, sequence: u64) -> Self {
        Self {
            sequence,
            symbol: book.symbol().map(str::to_string),
            height: book.height(),
            state: book.state(),
            bids: book.top_n(Side::Bid, depth),
            asks: book.top_n(Side::Ask, depth),
            changes: book.change_set().clone(),
            bid_orders: book.side_order_count(Side::Bid),
            ask_orders: book.side_order_count(Side::Ask),
            spread: book.spread(),
        }
    }

    /// Total resting orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.bid_orders + self.ask_orders
    }
}

// ============================================================================
// Publisher
// ============================================================================

/// Sending half of the view channel with back-pressure handling.
pub struct ViewPublisher {
    tx: Sender<BookView>,
    /// Held only in `DropOldest` mode to evict from the front
    drain: Option<Receiver<BookView>>,
    back_pressure: BackPressure,
    published: u64,
    dropped: u64,
    consumer_gone: bool,
}

impl ViewPublisher {
    /// Create a publisher and the consumer's receiver.
    pub fn new(config: &PublisherConfig) -> (Self, Receiver<BookView>) {
        let (tx, rx) = channel::bounded(config.capacity.max(1));
        let drain = match config.back_pressure {
            BackPressure::Block => None,
            BackPressure::DropOldest => Some(rx.clone()),
        };
        let publisher = Self {
            tx,
            drain,
            back_pressure: config.back_pressure,
            published: 0,
            dropped: 0,
            consumer_gone: false,
        };
        (publisher, rx)
    }

    /// Hand a view to the consumer. Returns whether it was queued.
    pub fn publish(&mut self, view: BookView) -> bool {
        if self.consumer_gone {
            return false;
        }

        match self.back_pressure {
            BackPressure::Block => {
                if self.tx.send(view).is_err() {
                    self.consumer_gone = true;
                    log::warn!(
                        "View consumer disconnected after {} views; publication stopped",
                        self.published
                    );
                    return false;
                }
            }
            BackPressure::DropOldest => {
                let mut view = view;
                loop {
                    match self.tx.try_send(view) {
                        Ok(()) => break,
                        Err(TrySendError::Full(rejected)) => {
                            view = rejected;
                            if let Some(drain) = &self.drain {
                                if drain.try_recv().is_ok() {
                                    self.dropped += 1;
                                }
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            self.consumer_gone = true;
                            return false;
                        }
                    }
                }
            }
        }

        self.published += 1;
        true
    }

    /// Views queued so far.
    #[inline]
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Views evicted under `DropOldest`.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

// ============================================================================
// Ingestion
// ============================================================================

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Events read from the source
    pub events: u64,
    pub snapshots: u64,
    pub diffs_applied: u64,
    /// Events the reconstructor refused (diff before snapshot, rejected height)
    pub events_rejected: u64,
    pub resets: u64,
    pub views_published: u64,
    pub views_dropped: u64,
    /// Ingestion stopped on a `Disconnected` event
    pub disconnected: bool,
    pub final_height: Option<u64>,
}

/// Apply every event of `source` to `book`, publishing a view after each
/// applied event when a publisher is given.
///
/// Stops at the end of the source or at the first `Disconnected` event.
/// Fails only if the source cannot be opened.
pub fn run_ingest<S: FeedSource>(
    book: &mut BookReconstructor,
    source: S,
    mut publisher: Option<&mut ViewPublisher>,
    depth: usize,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();

    log::info!(
        "Starting ingestion from {} source (symbol {:?})",
        source.metadata().provider.as_deref().unwrap_or("unknown"),
        source.metadata().symbol
    );

    for event in source.events()? {
        report.events += 1;

        match book.handle_event(&event) {
            Ok(()) => match &event {
                FeedEvent::Snapshot(_) => report.snapshots += 1,
                FeedEvent::Updates(_) => report.diffs_applied += 1,
                FeedEvent::Resubscribed => report.resets += 1,
                FeedEvent::Disconnected => {}
            },
            Err(L4Error::FeedDisconnected) => {
                report.disconnected = true;
                log::warn!(
                    "Feed disconnected after {} events at height {:?}",
                    report.events,
                    book.height()
                );
                break;
            }
            Err(e) => {
                report.events_rejected += 1;
                log::warn!("Rejected {} event #{}: {}", event.kind(), report.events, e);
                continue;
            }
        }

        if let Some(publisher) = publisher.as_deref_mut() {
            publisher.publish(BookView::capture(book, depth, report.events));
        }
    }

    if let Some(publisher) = publisher.as_deref() {
        report.views_published = publisher.published();
        report.views_dropped = publisher.dropped();
    }
    report.final_height = book.height();

    log::info!(
        "Ingestion finished: {} events, {} snapshots, {} diffs, {} rejected",
        report.events,
        report.snapshots,
        report.diffs_applied,
        report.events_rejected
    );

    Ok(report)
}

/// Handle to a running ingestion thread.
pub struct IngestHandle {
    handle: JoinHandle<Result<(BookReconstructor, IngestReport)>>,
}

impl IngestHandle {
    /// Wait for ingestion to finish and take the book back.
    pub fn join(self) -> Result<(BookReconstructor, IngestReport)> {
        self.handle
            .join()
            .map_err(|_| L4Error::generic("ingestion thread panicked"))?
    }

    /// Check if the thread has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Move `book` into a new ingestion thread fed by `source`.
///
/// Returns the view receiver and a handle yielding the book and report.
/// The channel closes when ingestion ends.
pub fn spawn_ingest<S>(
    mut book: BookReconstructor,
    source: S,
    config: PublisherConfig,
) -> Result<(Receiver<BookView>, IngestHandle)>
where
    S: FeedSource + Send + 'static,
{
    let (mut publisher, rx) = ViewPublisher::new(&config);
    let depth = config.depth;

    let handle = thread::Builder::new()
        .name("l4-ingest".to_string())
        .spawn(move || -> Result<(BookReconstructor, IngestReport)> {
            let report = run_ingest(&mut book, source, Some(&mut publisher), depth)?;
            Ok((book, report))
        })?;

    Ok((rx, IngestHandle { handle }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSource;
    use crate::types::{BookDiff, Diff, OrderEntry, Snapshot};

    fn feed() -> Vec<FeedEvent> {
        vec![
            FeedEvent::Snapshot(Snapshot::new(
                "BTC",
                1,
                vec![OrderEntry::new(1, "100", "1", "a")],
                vec![OrderEntry::new(2, "101", "1", "b")],
            )),
            FeedEvent::Updates(Diff::new(2).with_diff(BookDiff::remove(2))),
            FeedEvent::Updates(
                Diff::new(3)
                    .with_status(3, Side::Ask)
                    .with_diff(BookDiff::new_order(3, "102", "c", "2")),
            ),
        ]
    }

    fn quiet_book() -> BookReconstructor {
        BookReconstructor::with_config(crate::lob::BookConfig::new(10).with_logging(false))
    }

    #[test]
    fn test_run_ingest_without_publisher() {
        let mut book = quiet_book();
        let report = run_ingest(&mut book, VecSource::new(feed()), None, 10).unwrap();

        assert_eq!(report.events, 3);
        assert_eq!(report.snapshots, 1);
        assert_eq!(report.diffs_applied, 2);
        assert_eq!(report.views_published, 0);
        assert_eq!(report.final_height, Some(3));
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_run_ingest_counts_rejections() {
        let mut book = quiet_book();
        let events = vec![FeedEvent::Updates(Diff::new(5)), FeedEvent::Resubscribed];
        let report = run_ingest(&mut book, VecSource::new(events), None, 10).unwrap();

        assert_eq!(report.events_rejected, 1);
        assert_eq!(report.resets, 1);
        assert!(!report.disconnected);
    }

    #[test]
    fn test_run_ingest_stops_on_disconnect() {
        let mut book = quiet_book();
        let mut events = feed();
        events.insert(1, FeedEvent::Disconnected);

        let report = run_ingest(&mut book, VecSource::new(events), None, 10).unwrap();
        assert!(report.disconnected);
        assert_eq!(report.events, 2);
        assert_eq!(book.height(), Some(1));
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn test_view_capture() {
        let mut book = quiet_book();
        run_ingest(&mut book, VecSource::new(feed()), None, 10).unwrap();

        let view = BookView::capture(&book, 1, 7);
        assert_eq!(view.sequence, 7);
        assert_eq!(view.symbol.as_deref(), Some("BTC"));
        assert_eq!(view.bids.len(), 1);
        assert_eq!(view.asks[0].order_ids, vec![3]);
        assert_eq!(view.changes.added_ids(), vec![3]);
        assert_eq!(view.order_count(), 2);
    }

    #[test]
    fn test_drop_oldest_keeps_newest() {
        let config = PublisherConfig::default()
            .with_capacity(2)
            .with_back_pressure(BackPressure::DropOldest);
        let (mut publisher, rx) = ViewPublisher::new(&config);
        let book = quiet_book();

        for seq in 1..=5 {
            assert!(publisher.publish(BookView::capture(&book, 1, seq)));
        }

        assert_eq!(publisher.published(), 5);
        assert_eq!(publisher.dropped(), 3);
        let seqs: Vec<_> = rx.try_iter().map(|v| v.sequence).collect();
        assert_eq!(seqs, vec![4, 5]);
    }

    #[test]
    fn test_block_mode_consumer_gone() {
        let (mut publisher, rx) = ViewPublisher::new(&PublisherConfig::default());
        drop(rx);

        let book = quiet_book();
        assert!(!publisher.publish(BookView::capture(&book, 1, 1)));
        assert!(!publisher.publish(BookView::capture(&book, 1, 2)));
        assert_eq!(publisher.published(), 0);
    }

    #[test]
    fn test_spawn_ingest_publishes_every_applied_event() {
        let (views, handle) =
            spawn_ingest(quiet_book(), VecSource::new(feed()), PublisherConfig::default())
                .unwrap();

        let views: Vec<BookView> = views.iter().collect();
        let (book, report) = handle.join().unwrap();

        assert_eq!(views.len(), 3);
        assert_eq!(views[1].changes.removed_ids(), vec![2]);
        assert_eq!(views[2].height, Some(3));
        assert_eq!(report.views_published, 3);
        assert_eq!(book.order_count(), 2);
    }
}
