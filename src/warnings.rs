//! Diagnostic tracking for L4 book reconstruction.
//!
//! Every recoverable anomaly met while applying feed messages (a malformed
//! entry, an unresolved side, a height going backwards, a diff before the
//! snapshot) becomes a categorised `Warning`. Warnings are logged through
//! the `log` facade, counted per category and kept in memory up to a cap so
//! they can be exported for later analysis.
//!
//! Recording a warning never interrupts processing.
//!
//! # Example
//!
//! ```
//! use l4_book_reconstructor::warnings::{WarningCategory, WarningTracker};
//!
//! let mut tracker = WarningTracker::new();
//! tracker.record_order_warning(
//!     WarningCategory::SideUnresolved,
//!     "no order status for oid 12345",
//!     12345,
//!     Some("64000.5"),
//!     Some(1042),
//! );
//!
//! let summary = tracker.summary();
//! assert_eq!(summary.total, 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::OrderId;

/// Category of warning for classification and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    /// Entry with a missing or unparseable required field
    MalformedEntry,

    /// New-order entry whose side is not in the message's order statuses
    SideUnresolved,

    /// Height not strictly greater than the current one
    OutOfOrderHeight,

    /// Diff received while no snapshot is loaded
    ProtocolSequence,

    /// Update for an order the book does not hold
    UnknownOrder,

    /// Same order id filed twice in one snapshot
    DuplicateOrder,

    /// Referential integrity check failed
    IntegrityViolation,

    /// Transport reported a disconnect
    FeedDisconnected,

    /// Book was cleared/reset
    BookReset,

    /// Other/uncategorized warning
    Other,
}

impl WarningCategory {
    /// Get a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::MalformedEntry => "MALFORMED_ENTRY",
            WarningCategory::SideUnresolved => "SIDE_UNRESOLVED",
            WarningCategory::OutOfOrderHeight => "OUT_OF_ORDER_HEIGHT",
            WarningCategory::ProtocolSequence => "PROTOCOL_SEQUENCE",
            WarningCategory::UnknownOrder => "UNKNOWN_ORDER",
            WarningCategory::DuplicateOrder => "DUPLICATE_ORDER",
            WarningCategory::IntegrityViolation => "INTEGRITY_VIOLATION",
            WarningCategory::FeedDisconnected => "FEED_DISCONNECTED",
            WarningCategory::BookReset => "BOOK_RESET",
            WarningCategory::Other => "OTHER",
        }
    }

    /// Get severity level (1=low, 2=medium, 3=high).
    pub fn severity(&self) -> u8 {
        match self {
            WarningCategory::MalformedEntry => 2,
            WarningCategory::SideUnresolved => 2,
            WarningCategory::OutOfOrderHeight => 2,
            WarningCategory::ProtocolSequence => 2,
            WarningCategory::UnknownOrder => 1,
            WarningCategory::DuplicateOrder => 2,
            WarningCategory::IntegrityViolation => 3,
            WarningCategory::FeedDisconnected => 1,
            WarningCategory::BookReset => 1,
            WarningCategory::Other => 1,
        }
    }
}

/// A single warning record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// Unique warning ID (auto-incremented)
    pub id: u64,

    pub category: WarningCategory,

    /// Human-readable message
    pub message: String,

    /// Feed height of the message that triggered the warning
    pub height: Option<u64>,

    /// Wall clock time when warning was recorded (nanoseconds since epoch)
    pub recorded_at: u64,

    /// Related order ID (if applicable)
    pub order_id: Option<OrderId>,

    /// Price text of the offending entry, verbatim (if applicable)
    pub price: Option<String>,
}

impl Warning {
    /// Create a new warning with minimal information.
    pub fn new(id: u64, category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            id,
            category,
            message: message.into(),
            height: None,
            recorded_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0),
            order_id: None,
            price: None,
        }
    }

    /// Set the feed height.
    pub fn with_height(mut self, height: u64) -> Self {
        self.height = Some(height);
        self
    }

    /// Set the order ID.
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    /// Set the price text.
    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }
}

/// Summary statistics for warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total number of warnings
    pub total: u64,

    /// Count by category name
    pub by_category: HashMap<String, u64>,

    /// Count by severity
    pub by_severity: HashMap<u8, u64>,

    /// Height of the first stored warning
    pub first_height: Option<u64>,

    /// Height of the last stored warning
    pub last_height: Option<u64>,

    /// Number of unique order IDs involved (tracked up to `max_warnings`)
    pub unique_orders: u64,
}

/// Configuration for warning tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningTrackerConfig {
    /// Maximum number of warnings (and distinct order IDs) to keep in memory
    pub max_warnings: usize,

    /// Whether to emit warnings through the `log` facade
    pub log_diagnostics: bool,

    /// Minimum severity to log (1=all, 2=medium+, 3=high only)
    pub min_log_severity: u8,

    /// Whether to deduplicate identical messages
    pub deduplicate: bool,

    /// Time window for deduplication (nanoseconds)
    pub dedupe_window_ns: u64,
}

impl Default for WarningTrackerConfig {
    fn default() -> Self {
        Self {
            max_warnings: 100_000,
            log_diagnostics: true,
            min_log_severity: 1,
            deduplicate: false,
            dedupe_window_ns: 1_000_000_000, // 1 second
        }
    }
}

#[derive(Serialize)]
struct WarningReport<'a> {
    summary: WarningSummary,
    warnings: &'a [Warning],
}

/// Categorised store of diagnostics.
#[derive(Debug, Clone)]
pub struct WarningTracker {
    config: WarningTrackerConfig,

    /// Stored warnings
    warnings: Vec<Warning>,

    /// Counter for unique IDs
    next_id: u64,

    /// Count by category (for fast summary)
    category_counts: HashMap<WarningCategory, u64>,

    /// Recent warnings for deduplication (category -> (message_hash, timestamp))
    recent: HashMap<WarningCategory, Vec<(u64, u64)>>,

    /// Unique order IDs seen in warnings
    unique_orders: HashSet<OrderId>,
}

impl WarningTracker {
    /// Create a new warning tracker with default configuration.
    pub fn new() -> Self {
        Self::with_config(WarningTrackerConfig::default())
    }

    /// Create a new warning tracker with custom configuration.
    pub fn with_config(config: WarningTrackerConfig) -> Self {
        Self {
            config,
            warnings: Vec::new(),
            next_id: 1,
            category_counts: HashMap::new(),
            recent: HashMap::new(),
            unique_orders: HashSet::new(),
        }
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &WarningTrackerConfig {
        &self.config
    }

    /// Record a warning.
    ///
    /// Returns the warning ID if recorded, or None if deduplicated.
    pub fn record(&mut self, warning: Warning) -> Option<u64> {
        if self.config.deduplicate {
            let msg_hash = Self::hash_message(&warning.message);
            let now = warning.recorded_at;
            let window = self.config.dedupe_window_ns;

            let recent_list = self.recent.entry(warning.category).or_default();
            recent_list.retain(|(_, ts)| now.saturating_sub(*ts) < window);
            if recent_list.iter().any(|(h, _)| *h == msg_hash) {
                return None;
            }
            recent_list.push((msg_hash, now));
        }

        let severity = warning.category.severity();
        if self.config.log_diagnostics && severity >= self.config.min_log_severity {
            if severity >= 2 {
                log::warn!("[{}] {}", warning.category.name(), warning.message);
            } else {
                log::debug!("[{}] {}", warning.category.name(), warning.message);
            }
        }

        if let Some(order_id) = warning.order_id {
            if self.unique_orders.len() < self.config.max_warnings {
                self.unique_orders.insert(order_id);
            }
        }

        *self.category_counts.entry(warning.category).or_insert(0) += 1;

        let id = warning.id;

        // Store warning (with capacity limit)
        if self.warnings.len() < self.config.max_warnings {
            self.warnings.push(warning);
        }

        Some(id)
    }

    /// Record a simple warning with just category and message.
    pub fn record_simple(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
    ) -> Option<u64> {
        let warning = Warning::new(self.next_id(), category, message);
        self.record(warning)
    }

    /// Record a warning tied to one order entry.
    pub fn record_order_warning(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        order_id: OrderId,
        price: Option<&str>,
        height: Option<u64>,
    ) -> Option<u64> {
        let mut warning = Warning::new(self.next_id(), category, message).with_order_id(order_id);
        if let Some(p) = price {
            warning = warning.with_price(p);
        }
        if let Some(h) = height {
            warning = warning.with_height(h);
        }
        self.record(warning)
    }

    /// Record a warning tied to a whole message.
    pub fn record_height_warning(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        height: u64,
    ) -> Option<u64> {
        let warning = Warning::new(self.next_id(), category, message).with_height(height);
        self.record(warning)
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Get the number of warnings stored.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Check if no warnings have been stored.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Get total count, including warnings beyond the storage cap.
    pub fn total_count(&self) -> u64 {
        self.category_counts.values().sum()
    }

    /// Get count for a specific category.
    pub fn count_by_category(&self, category: WarningCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    /// Get all stored warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Get warnings by category.
    pub fn warnings_by_category(&self, category: WarningCategory) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }

    /// Get summary statistics.
    pub fn summary(&self) -> WarningSummary {
        let mut by_category = HashMap::new();
        let mut by_severity = HashMap::new();

        for (cat, count) in &self.category_counts {
            by_category.insert(cat.name().to_string(), *count);
            *by_severity.entry(cat.severity()).or_insert(0) += *count;
        }

        WarningSummary {
            total: self.total_count(),
            by_category,
            by_severity,
            first_height: self.warnings.first().and_then(|w| w.height),
            last_height: self.warnings.last().and_then(|w| w.height),
            unique_orders: self.unique_orders.len() as u64,
        }
    }

    /// Export summary and warnings to a JSON file.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let report = WarningReport {
            summary: self.summary(),
            warnings: &self.warnings,
        };
        serde_json::to_writer_pretty(&mut writer, &report)?;
        writer.flush()?;
        Ok(())
    }

    /// Export warnings to a CSV file (for spreadsheet analysis).
    pub fn export_to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(
            writer,
            "id,category,severity,message,height,recorded_at,order_id,price"
        )?;

        for warning in &self.warnings {
            writeln!(
                writer,
                "{},{},{},{},{},{},{},{}",
                warning.id,
                warning.category.name(),
                warning.category.severity(),
                CsvField(&warning.message),
                warning.height.map(|h| h.to_string()).unwrap_or_default(),
                warning.recorded_at,
                warning.order_id.map(|o| o.to_string()).unwrap_or_default(),
                CsvField(warning.price.as_deref().unwrap_or_default()),
            )?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Clear all warnings.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.category_counts.clear();
        self.recent.clear();
        self.unique_orders.clear();
    }

    fn hash_message(message: &str) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        message.hash(&mut hasher);
        hasher.finish()
    }
}

/// Quoted CSV field; embedded quotes are doubled.
struct CsvField<'a>(&'a str);

impl fmt::Display for CsvField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new()
    }
}
