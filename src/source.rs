//! Feed source abstraction for book ingestion.
//!
//! A source yields `FeedEvent`s in arrival order. The transport that talks to
//! the exchange lives elsewhere; these sources cover in-memory feeds for
//! tests and replay of recorded JSON lines.
//!
//! # Example
//!
//! ```
//! use l4_book_reconstructor::source::{FeedSource, JsonLinesSource};
//!
//! let recorded = r#"{"Snapshot":{"coin":"BTC","height":1,"bids":[],"asks":[]}}
//! "Resubscribed"
//! "#;
//!
//! let source = JsonLinesSource::from_reader(recorded.as_bytes());
//! let events: Vec<_> = source.events().unwrap().collect();
//! assert_eq!(events.len(), 2);
//! ```
//!
//! # Implementing Custom Sources
//!
//! ```ignore
//! use l4_book_reconstructor::source::{FeedSource, SourceMetadata};
//! use l4_book_reconstructor::{FeedEvent, Result};
//!
//! struct MySource {
//!     events: Vec<FeedEvent>,
//!     metadata: SourceMetadata,
//! }
//!
//! impl FeedSource for MySource {
//!     type EventIter = std::vec::IntoIter<FeedEvent>;
//!
//!     fn events(self) -> Result<Self::EventIter> {
//!         Ok(self.events.into_iter())
//!     }
//!
//!     fn metadata(&self) -> &SourceMetadata {
//!         &self.metadata
//!     }
//! }
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::FeedEvent;

// ============================================================================
// Source Metadata
// ============================================================================

/// Metadata about a feed source.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    /// Symbol (e.g., "BTC", "ETH")
    pub symbol: Option<String>,

    /// Recording date in YYYY-MM-DD format
    pub date: Option<String>,

    /// Original file path (if replayed from file)
    pub file_path: Option<PathBuf>,

    /// Provider name (e.g., "memory", "replay")
    pub provider: Option<String>,

    /// Estimated event count (for progress tracking)
    pub estimated_events: Option<u64>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,
}

impl SourceMetadata {
    /// Create new empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Set the date.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set the file path.
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the estimated event count.
    pub fn with_estimated_events(mut self, count: u64) -> Self {
        self.estimated_events = Some(count);
        self
    }

    /// Extract metadata from a recording path.
    ///
    /// Recognised filename patterns:
    /// - `BTC_2025-02-03.l4.jsonl` → symbol="BTC", date="2025-02-03"
    /// - `BTC.jsonl` → symbol="BTC"
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut metadata = Self::new().with_file_path(path);

        if let Ok(meta) = std::fs::metadata(path) {
            metadata.file_size = Some(meta.len());
        }

        if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
            let base = filename
                .trim_end_matches(".jsonl")
                .trim_end_matches(".json")
                .trim_end_matches(".l4");

            match base.split_once('_') {
                Some((symbol, rest)) => {
                    metadata.symbol = Some(symbol.to_string());
                    if let Some(date) = rest.get(..10).filter(|d| d.as_bytes()[4] == b'-') {
                        metadata.date = Some(date.to_string());
                    }
                }
                None => metadata.symbol = Some(base.to_string()),
            }
        }

        metadata
    }
}

// ============================================================================
// Feed Source Trait
// ============================================================================

/// Anything that can yield feed events in arrival order.
///
/// - `events()` consumes `self` for single-pass iteration
/// - Metadata should be populated before calling `events()`
pub trait FeedSource {
    /// The iterator type for events.
    type EventIter: Iterator<Item = FeedEvent>;

    /// Consume the source and return an iterator over events.
    fn events(self) -> Result<Self::EventIter>;

    /// Get metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// Vector Source
// ============================================================================

/// A simple in-memory source.
///
/// # Example
///
/// ```
/// use l4_book_reconstructor::source::{FeedSource, SourceMetadata, VecSource};
/// use l4_book_reconstructor::{Diff, FeedEvent};
///
/// let source = VecSource::new(vec![
///     FeedEvent::Updates(Diff::new(2)),
///     FeedEvent::Updates(Diff::new(3)),
/// ])
/// .with_metadata(SourceMetadata::new().with_symbol("TEST"));
///
/// assert_eq!(source.events().unwrap().count(), 2);
/// ```
pub struct VecSource {
    events: Vec<FeedEvent>,
    metadata: SourceMetadata,
}

impl VecSource {
    /// Create a new vector source.
    pub fn new(events: Vec<FeedEvent>) -> Self {
        Self {
            metadata: SourceMetadata::new()
                .with_provider("memory")
                .with_estimated_events(events.len() as u64),
            events,
        }
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl FeedSource for VecSource {
    type EventIter = std::vec::IntoIter<FeedEvent>;

    fn events(self) -> Result<Self::EventIter> {
        Ok(self.events.into_iter())
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

// ============================================================================
// JSON Lines Replay Source
// ============================================================================

/// Replays a recording with one JSON-encoded `FeedEvent` per line.
///
/// Blank lines are ignored. A line that fails to decode means a message was
/// lost, so it is replayed as `FeedEvent::Resubscribed`: the book resets and
/// waits for the next snapshot instead of running on with a silent gap. The
/// count is available from the iterator.
pub struct JsonLinesSource<R: BufRead> {
    reader: R,
    metadata: SourceMetadata,
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a recording on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut metadata = SourceMetadata::from_path(path);
        metadata.provider = Some("replay".to_string());

        log::info!("Opened feed recording {}", path.display());

        Ok(Self {
            reader: BufReader::new(file),
            metadata,
        })
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    /// Replay from any buffered reader.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            metadata: SourceMetadata::new().with_provider("replay"),
        }
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl<R: BufRead> FeedSource for JsonLinesSource<R> {
    type EventIter = JsonLinesIter<R>;

    fn events(self) -> Result<Self::EventIter> {
        Ok(JsonLinesIter {
            lines: self.reader.lines(),
            line_no: 0,
            gaps: 0,
        })
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

/// Iterator over decoded events of a JSON lines recording.
pub struct JsonLinesIter<R: BufRead> {
    lines: Lines<R>,
    line_no: u64,
    gaps: u64,
}

impl<R: BufRead> JsonLinesIter<R> {
    /// Number of undecodable lines replayed as a resync so far.
    pub fn gaps(&self) -> u64 {
        self.gaps
    }
}

impl<R: BufRead> Iterator for JsonLinesIter<R> {
    type Item = FeedEvent;

    fn next(&mut self) -> Option<FeedEvent> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    log::error!("Stopping replay at line {}: {}", self.line_no + 1, e);
                    return None;
                }
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return match serde_json::from_str::<FeedEvent>(trimmed) {
                Ok(event) => Some(event),
                Err(e) => {
                    self.gaps += 1;
                    log::error!(
                        "Undecodable line {}, forcing resync: {}",
                        self.line_no,
                        e
                    );
                    Some(FeedEvent::Resubscribed)
                }
            };
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Diff, Snapshot};

    #[test]
    fn test_source_metadata_builder() {
        let meta = SourceMetadata::new()
            .with_symbol("BTC")
            .with_date("2025-02-03")
            .with_provider("replay")
            .with_estimated_events(1000);

        assert_eq!(meta.symbol, Some("BTC".to_string()));
        assert_eq!(meta.date, Some("2025-02-03".to_string()));
        assert_eq!(meta.provider, Some("replay".to_string()));
        assert_eq!(meta.estimated_events, Some(1000));
    }

    #[test]
    fn test_source_metadata_from_path() {
        let meta = SourceMetadata::from_path("/data/BTC_2025-02-03.l4.jsonl");
        assert_eq!(meta.symbol, Some("BTC".to_string()));
        assert_eq!(meta.date, Some("2025-02-03".to_string()));

        let meta = SourceMetadata::from_path("/data/ETH.jsonl");
        assert_eq!(meta.symbol, Some("ETH".to_string()));
        assert!(meta.date.is_none());
    }

    #[test]
    fn test_vec_source_basic() {
        let source = VecSource::new(vec![
            FeedEvent::Snapshot(Snapshot::new("BTC", 1, vec![], vec![])),
            FeedEvent::Updates(Diff::new(2)),
        ]);

        assert_eq!(source.metadata().estimated_events, Some(2));
        assert_eq!(source.metadata().provider, Some("memory".to_string()));

        let kinds: Vec<_> = source.events().unwrap().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["snapshot", "diff"]);
    }

    #[test]
    fn test_json_lines_bad_line_forces_resync() {
        let recorded = concat!(
            r#"{"Snapshot":{"coin":"BTC","height":1,"bids":[],"asks":[]}}"#,
            "\n\nnot json\n",
            r#"{"Updates":{"height":2,"order_statuses":[],"book_diffs":[]}}"#,
            "\n\"Disconnected\"\n",
        );

        let mut iter = JsonLinesSource::from_reader(recorded.as_bytes())
            .events()
            .unwrap();
        let events: Vec<_> = iter.by_ref().collect();

        assert_eq!(events.len(), 4);
        assert_eq!(events[1], FeedEvent::Resubscribed);
        assert_eq!(events[2].kind(), "diff");
        assert_eq!(events[3], FeedEvent::Disconnected);
        assert_eq!(iter.gaps(), 1);
    }

    #[test]
    fn test_json_lines_open_missing_file() {
        assert!(JsonLinesSource::open("/nonexistent/feed.jsonl").is_err());
    }
}
