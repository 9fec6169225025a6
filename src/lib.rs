//! # L4 Book Reconstructor
//!
//! Order-level (L4) limit order book reconstruction for a single symbol.
//!
//! The feed delivers one full snapshot followed by incremental diffs. Each
//! diff can add a resting order, change one, or remove one. The book tracks
//! every order by id, keeps FIFO queues per price level and exposes the
//! top of book, the per-diff change set and order lookups.
//!
//! ## Features
//!
//! - **Order identity**: every resting order tracked by `oid`, with owner
//! - **Exact prices**: decimal text kept verbatim, ordered numerically
//! - **Queue order**: FIFO per level, in-place size updates keep position
//! - **Diagnostics**: bad entries dropped one at a time, counted and logged
//! - **Publication**: ingestion thread with bounded, back-pressured views
//!
//! ## Quick Start
//!
//! ```rust
//! use l4_book_reconstructor::{BookDiff, BookReconstructor, Diff, OrderEntry, Side, Snapshot};
//!
//! let mut book = BookReconstructor::new(10);
//!
//! book.apply_snapshot(&Snapshot::new(
//!     "BTC",
//!     100,
//!     vec![OrderEntry::new(1, "100.00", "2", "alice")],
//!     vec![OrderEntry::new(2, "101.00", "1", "bob")],
//! ));
//!
//! let diff = Diff::new(101)
//!     .with_status(3, Side::Bid)
//!     .with_diff(BookDiff::new_order(3, "100.50", "carol", "5"))
//!     .with_diff(BookDiff::remove(2));
//! book.apply_diff(&diff).unwrap();
//!
//! let bids = book.top_n(Side::Bid, 5);
//! assert_eq!(bids[0].order_ids, vec![3]);
//! assert_eq!(book.change_set().removed_ids(), vec![2]);
//! assert!(book.verify_integrity().is_ok());
//! ```
//!
//! ### Replay With A Consumer Thread
//!
//! ```ignore
//! use l4_book_reconstructor::publisher::{spawn_ingest, PublisherConfig};
//! use l4_book_reconstructor::source::JsonLinesSource;
//! use l4_book_reconstructor::BookReconstructor;
//!
//! let source = JsonLinesSource::open("data/BTC_2025-02-03.l4.jsonl")?;
//! let (views, handle) = spawn_ingest(BookReconstructor::new(10), source, PublisherConfig::default())?;
//!
//! for view in views {
//!     println!("{:?} spread={:?}", view.height, view.spread);
//! }
//! let (book, report) = handle.join()?;
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Orders, decimal text, wire messages, feed events |
//! | [`lob`] | Reconstruction: `BookReconstructor`, `PriceLevelIndex`, `ChangeSet` |
//! | [`analytics`] | `DepthStats`, `MarketImpact`, `BookMetrics` |
//! | [`source`] | Feed sources: `VecSource`, `JsonLinesSource` |
//! | [`publisher`] | Ingestion thread and `BookView` publication |
//! | [`warnings`] | Diagnostics: `WarningTracker`, `Warning`, `WarningCategory` |

pub mod analytics;
pub mod error;
pub mod lob;
pub mod publisher;
pub mod source;
pub mod types;
pub mod warnings;

// Re-exports - Core types
pub use error::{L4Error, Result};
pub use types::{
    BookDiff, DecimalStr, Diff, DiffOp, Direction, FeedEvent, LevelView, Order, OrderEntry,
    OrderId, OrderStatus, Side, Snapshot,
};

// Re-exports - Reconstruction
pub use lob::{
    BookConfig, BookReconstructor, BookStats, ChangeSet, DiffSummary, HeightPolicy, PriceLevel,
    PriceLevelIndex, QueuePosition, ReconstructorState, SnapshotSummary,
};

// Re-exports - Analytics
pub use analytics::{BookMetrics, DepthStats, MarketImpact};

// Re-exports - Warnings
pub use warnings::{
    Warning, WarningCategory, WarningSummary, WarningTracker, WarningTrackerConfig,
};

// Re-exports - Sources and publication
pub use publisher::{BackPressure, BookView, IngestReport, PublisherConfig};
pub use source::{FeedSource, JsonLinesSource, SourceMetadata, VecSource};
