//! Single-symbol L4 book reconstructor.
//!
//! Maintains every resting order individually from a feed made of one full
//! snapshot followed by incremental diffs:
//! - ahash map `oid → Order` as the single owner of order records
//! - one `PriceLevelIndex` per side holding ids only
//! - a `ChangeSet` describing what the last diff did
//!
//! The reconstructor is a two-state machine. It starts `Uninitialized`,
//! becomes `Ready` on a snapshot and returns to `Uninitialized` on
//! `reset()`. Diffs are only applied while `Ready`.

use ahash::AHashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::change_set::ChangeSet;
use super::price_level::{PriceLevelIndex, QueuePosition};
use crate::error::{L4Error, Result};
use crate::types::{
    BookDiff, DecimalStr, Diff, DiffOp, FeedEvent, LevelView, Order, OrderEntry, OrderId, Side,
    Snapshot,
};
use crate::warnings::{WarningCategory, WarningTracker, WarningTrackerConfig};

/// What to do with a diff whose height is not above the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeightPolicy {
    /// Log the violation and apply the diff anyway (default)
    #[default]
    ApplyAndLog,

    /// Log the violation and drop the whole diff
    RejectAndLog,
}

/// Lifecycle state of the reconstructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReconstructorState {
    /// No snapshot loaded; diffs are rejected
    #[default]
    Uninitialized,

    /// Snapshot loaded; diffs are applied
    Ready,
}

/// Configuration for reconstructor behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookConfig {
    /// Default number of price levels for top-of-book queries
    pub levels: usize,

    /// How to handle non-increasing diff heights
    pub height_policy: HeightPolicy,

    /// Whether to log diagnostics
    pub log_warnings: bool,

    /// Diagnostic storage settings
    pub warnings: WarningTrackerConfig,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            levels: 10,
            height_policy: HeightPolicy::ApplyAndLog,
            log_warnings: true,
            warnings: WarningTrackerConfig::default(),
        }
    }
}

impl BookConfig {
    /// Create a new config with specified number of levels.
    pub fn new(levels: usize) -> Self {
        Self {
            levels,
            ..Default::default()
        }
    }

    /// Set the height monotonicity policy.
    pub fn with_height_policy(mut self, policy: HeightPolicy) -> Self {
        self.height_policy = policy;
        self
    }

    /// Enable/disable diagnostic logs.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_warnings = log;
        self
    }

    /// Set diagnostic storage settings.
    pub fn with_warning_config(mut self, warnings: WarningTrackerConfig) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Counters for monitoring book health.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookStats {
    pub snapshots_applied: u64,
    pub diffs_applied: u64,
    /// Diffs dropped whole (before snapshot, or rejected height)
    pub diffs_rejected: u64,
    pub entries_applied: u64,
    /// Entries dropped for any reason
    pub entries_dropped: u64,
    pub malformed_entries: u64,
    pub unresolved_sides: u64,
    pub unknown_updates: u64,
    /// Removals of orders the book never had (not an error)
    pub removals_ignored: u64,
    pub height_violations: u64,
    pub resets: u64,
    pub active_orders: usize,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub last_height: Option<u64>,
}

/// Result of one snapshot application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub height: u64,
    pub bids_filed: usize,
    pub asks_filed: usize,
    /// Entries skipped as malformed or duplicate
    pub skipped: usize,
}

/// Result of one diff application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub height: u64,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    /// Removals of absent orders
    pub ignored: usize,
    pub dropped: usize,
    /// The diff's height was not above the previous height
    pub out_of_order: bool,
}

enum EntryOutcome {
    Added,
    Modified,
    Removed,
    Ignored,
}

// ============================================================================
// Book state
// ============================================================================

/// Orders plus both indices. Every mutation keeps them in step.
#[derive(Debug, Clone)]
struct BookState {
    orders: AHashMap<OrderId, Order>,
    bids: PriceLevelIndex,
    asks: PriceLevelIndex,
}

impl BookState {
    fn new() -> Self {
        Self {
            orders: AHashMap::new(),
            bids: PriceLevelIndex::new(Side::Bid),
            asks: PriceLevelIndex::new(Side::Ask),
        }
    }

    #[inline]
    fn index(&self, side: Side) -> &PriceLevelIndex {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    #[inline]
    fn index_mut(&mut self, side: Side) -> &mut PriceLevelIndex {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// File an order, replacing any previous version with the same id.
    ///
    /// Same side and price: size refreshed in place, queue position kept.
    /// Anything else: the order joins the back of its new level, then the old
    /// index entry goes. A level total overflow fails before anything moves.
    fn insert(&mut self, order: Order) -> Result<Option<Order>> {
        let oid = order.oid;
        let price = order.price_key();
        let side = order.side;

        self.index_mut(side).upsert(price, oid, order.size.value())?;

        if let Some(prev) = self.orders.get(&oid) {
            if prev.side != side || prev.price_key() != price {
                let (prev_side, prev_price) = (prev.side, prev.price_key());
                self.index_mut(prev_side).remove(prev_price, oid);
            }
        }

        Ok(self.orders.insert(oid, order))
    }

    /// Remove an order and its index entry, pruning an emptied level.
    fn remove(&mut self, oid: OrderId) -> Option<Order> {
        let order = self.orders.remove(&oid)?;
        self.index_mut(order.side).remove(order.price_key(), oid);
        Some(order)
    }

    /// Change an order's size without moving it in the queue.
    fn resize(&mut self, oid: OrderId, size: DecimalStr) -> Result<Order> {
        let (side, price) = match self.orders.get(&oid) {
            Some(order) => (order.side, order.price_key()),
            None => return Err(L4Error::OrderNotFound(oid)),
        };
        self.index_mut(side).upsert(price, oid, size.value())?;

        let order = self
            .orders
            .get_mut(&oid)
            .ok_or(L4Error::OrderNotFound(oid))?;
        order.size = size;
        Ok(order.clone())
    }

    /// Check referential integrity between the order map and both indices.
    fn verify(&self) -> Result<()> {
        let mut filed = 0usize;

        for index in [&self.bids, &self.asks] {
            let side = index.side();
            for (price, level) in index.iter() {
                if level.is_empty() {
                    return Err(L4Error::InconsistentState(format!(
                        "empty {side} level at {price}"
                    )));
                }

                let mut sum = Decimal::ZERO;
                for (oid, size) in level.iter() {
                    let order = self.orders.get(&oid).ok_or_else(|| {
                        L4Error::InconsistentState(format!(
                            "order {oid} filed at {side} {price} but not in order map"
                        ))
                    })?;
                    if order.side != side || order.price_key() != price {
                        return Err(L4Error::InconsistentState(format!(
                            "order {oid} is {} {} but filed at {side} {price}",
                            order.side, order.price
                        )));
                    }
                    if order.size.value() != size {
                        return Err(L4Error::InconsistentState(format!(
                            "order {oid} size {} but level holds {size}",
                            order.size
                        )));
                    }
                    sum += size;
                    filed += 1;
                }

                if sum != level.total_size() {
                    return Err(L4Error::InconsistentState(format!(
                        "{side} level {price} caches {} but orders sum to {sum}",
                        level.total_size()
                    )));
                }
            }
        }

        if filed != self.orders.len() {
            return Err(L4Error::InconsistentState(format!(
                "{} orders tracked but {filed} filed in indices",
                self.orders.len()
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Reconstructor
// ============================================================================

/// Single-symbol L4 order book reconstructor.
///
/// Single writer: one owner applies messages and answers queries. Each
/// `apply_*` call is the atomicity boundary; every entry inside a diff is
/// validated completely before it touches the book.
#[derive(Debug, Clone)]
pub struct BookReconstructor {
    config: BookConfig,
    state: ReconstructorState,
    symbol: Option<String>,
    height: Option<u64>,
    book: BookState,
    changes: ChangeSet,
    stats: BookStats,
    warnings: WarningTracker,
}

impl Default for BookReconstructor {
    fn default() -> Self {
        Self::with_config(BookConfig::default())
    }
}

impl BookReconstructor {
    /// Create a reconstructor whose top-of-book queries default to `levels`.
    ///
    /// # Example
    /// ```
    /// use l4_book_reconstructor::{BookReconstructor, ReconstructorState};
    ///
    /// let book = BookReconstructor::new(10);
    /// assert_eq!(book.state(), ReconstructorState::Uninitialized);
    /// ```
    pub fn new(levels: usize) -> Self {
        Self::with_config(BookConfig::new(levels))
    }

    /// Create a reconstructor with custom configuration.
    ///
    /// # Example
    /// ```
    /// use l4_book_reconstructor::{BookConfig, BookReconstructor, HeightPolicy};
    ///
    /// let config = BookConfig::new(5).with_height_policy(HeightPolicy::RejectAndLog);
    /// let book = BookReconstructor::with_config(config);
    /// assert_eq!(book.levels(), 5);
    /// ```
    pub fn with_config(config: BookConfig) -> Self {
        let warnings = WarningTracker::with_config(WarningTrackerConfig {
            log_diagnostics: config.log_warnings,
            ..config.warnings.clone()
        });
        Self {
            config,
            state: ReconstructorState::Uninitialized,
            symbol: None,
            height: None,
            book: BookState::new(),
            changes: ChangeSet::new(),
            stats: BookStats::default(),
            warnings,
        }
    }

    /// Get the default number of levels for top-of-book queries.
    #[inline]
    pub fn levels(&self) -> usize {
        self.config.levels
    }

    /// Get a reference to the current configuration.
    #[inline]
    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Message application
    // ------------------------------------------------------------------------

    /// Dispatch one transport event.
    ///
    /// `Disconnected` is propagated as `L4Error::FeedDisconnected`; the book
    /// is kept until a `Resubscribed` event, `reset()` or a new snapshot.
    pub fn handle_event(&mut self, event: &FeedEvent) -> Result<()> {
        match event {
            FeedEvent::Snapshot(snapshot) => {
                self.apply_snapshot(snapshot);
                Ok(())
            }
            FeedEvent::Updates(diff) => self.apply_diff(diff).map(|_| ()),
            FeedEvent::Resubscribed => {
                self.reset();
                Ok(())
            }
            FeedEvent::Disconnected => {
                self.warnings.record_simple(
                    WarningCategory::FeedDisconnected,
                    format!(
                        "feed disconnected at height {:?}; book retained until resubscribe",
                        self.height
                    ),
                );
                Err(L4Error::FeedDisconnected)
            }
        }
    }

    /// Replace the whole book with a snapshot.
    ///
    /// Never fails: malformed entries are skipped with a diagnostic. The new
    /// state is built aside and swapped in, so the previous book is never
    /// observed half-replaced.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> SnapshotSummary {
        if let (ReconstructorState::Ready, Some(current)) = (self.state, self.height) {
            if snapshot.height < current {
                self.stats.height_violations += 1;
                self.warnings.record_height_warning(
                    WarningCategory::OutOfOrderHeight,
                    format!(
                        "snapshot height {} below current height {current}",
                        snapshot.height
                    ),
                    snapshot.height,
                );
            }
        }
        if let Some(previous) = self.symbol.as_deref() {
            if previous != snapshot.symbol {
                log::info!("Book symbol changed from {previous} to {}", snapshot.symbol);
            }
        }

        let mut book = BookState::new();
        let mut skipped = 0usize;

        for (side, entries) in [(Side::Bid, &snapshot.bids), (Side::Ask, &snapshot.asks)] {
            for entry in entries {
                let replaced = match order_from_entry(side, entry).and_then(|o| book.insert(o)) {
                    Ok(replaced) => replaced,
                    Err(err) => {
                        skipped += 1;
                        self.stats.malformed_entries += 1;
                        self.warnings.record_order_warning(
                            WarningCategory::MalformedEntry,
                            format!("snapshot {side} entry skipped: {err}"),
                            entry.oid,
                            entry.price.as_deref(),
                            Some(snapshot.height),
                        );
                        continue;
                    }
                };

                if let Some(prev) = replaced {
                    skipped += 1;
                    self.warnings.record_order_warning(
                        WarningCategory::DuplicateOrder,
                        format!(
                            "order {} listed twice in snapshot; {} {} replaced",
                            prev.oid, prev.side, prev.price
                        ),
                        prev.oid,
                        Some(prev.price.as_str()),
                        Some(snapshot.height),
                    );
                }
            }
        }

        let summary = SnapshotSummary {
            height: snapshot.height,
            bids_filed: book.bids.order_count(),
            asks_filed: book.asks.order_count(),
            skipped,
        };

        self.book = book;
        self.changes.clear();
        self.symbol = Some(snapshot.symbol.clone());
        self.height = Some(snapshot.height);
        self.state = ReconstructorState::Ready;
        self.stats.snapshots_applied += 1;
        self.refresh_stats();

        log::info!(
            "Snapshot applied for {} at height {}: {} bids, {} asks, {} skipped",
            snapshot.symbol,
            snapshot.height,
            summary.bids_filed,
            summary.asks_filed,
            summary.skipped
        );

        summary
    }

    /// Apply one incremental diff.
    ///
    /// # Errors
    /// - `ProtocolSequence` if no snapshot is loaded (nothing is mutated)
    /// - `OutOfOrderHeight` if the height did not advance and the policy is
    ///   `RejectAndLog` (nothing is mutated)
    ///
    /// Problems with individual entries never fail the call; the entry is
    /// dropped, a diagnostic is recorded and the rest of the diff applies.
    pub fn apply_diff(&mut self, diff: &Diff) -> Result<DiffSummary> {
        self.changes.clear();

        if self.state != ReconstructorState::Ready {
            self.stats.diffs_rejected += 1;
            self.warnings.record_height_warning(
                WarningCategory::ProtocolSequence,
                format!("diff at height {} received before snapshot", diff.height),
                diff.height,
            );
            return Err(L4Error::ProtocolSequence(diff.height));
        }

        let current = self.height.unwrap_or_default();
        let mut summary = DiffSummary {
            height: diff.height,
            ..Default::default()
        };

        if diff.height <= current {
            summary.out_of_order = true;
            self.stats.height_violations += 1;
            self.warnings.record_height_warning(
                WarningCategory::OutOfOrderHeight,
                format!(
                    "diff height {} not above current height {current} ({:?})",
                    diff.height, self.config.height_policy
                ),
                diff.height,
            );
            if self.config.height_policy == HeightPolicy::RejectAndLog {
                self.stats.diffs_rejected += 1;
                return Err(L4Error::OutOfOrderHeight {
                    current,
                    received: diff.height,
                });
            }
        }

        let sides: AHashMap<OrderId, Option<Side>> = diff
            .order_statuses
            .iter()
            .map(|status| (status.oid, status.side))
            .collect();

        for entry in &diff.book_diffs {
            match self.apply_entry(entry, &sides) {
                Ok(EntryOutcome::Added) => summary.added += 1,
                Ok(EntryOutcome::Modified) => summary.modified += 1,
                Ok(EntryOutcome::Removed) => summary.removed += 1,
                Ok(EntryOutcome::Ignored) => summary.ignored += 1,
                Err(err) => {
                    summary.dropped += 1;
                    self.drop_entry(entry, err, diff.height);
                }
            }
        }

        #[cfg(debug_assertions)]
        if let Err(err) = self.book.verify() {
            self.warnings.record_height_warning(
                WarningCategory::IntegrityViolation,
                err.to_string(),
                diff.height,
            );
        }

        self.height = Some(current.max(diff.height));
        self.stats.diffs_applied += 1;
        self.stats.entries_applied += (summary.added + summary.modified + summary.removed) as u64;
        self.stats.removals_ignored += summary.ignored as u64;
        self.refresh_stats();

        Ok(summary)
    }

    /// Apply a single diff entry. Validation happens before any mutation.
    fn apply_entry(
        &mut self,
        entry: &BookDiff,
        sides: &AHashMap<OrderId, Option<Side>>,
    ) -> Result<EntryOutcome> {
        match &entry.op {
            DiffOp::Remove => match self.book.remove(entry.oid) {
                Some(order) => {
                    self.changes.record_removed(order);
                    Ok(EntryOutcome::Removed)
                }
                None => Ok(EntryOutcome::Ignored),
            },
            DiffOp::New { size } => {
                let side = match sides.get(&entry.oid) {
                    Some(Some(side)) => *side,
                    Some(None) => {
                        return Err(L4Error::malformed(entry.oid, "unrecognized side in status"));
                    }
                    None => return Err(L4Error::SideUnresolved(entry.oid)),
                };
                let order = build_order(
                    entry.oid,
                    side,
                    entry.price.as_deref(),
                    size.as_deref(),
                    entry.owner.as_deref(),
                )?;

                match self.book.insert(order.clone())? {
                    Some(_) => {
                        self.changes.record_modified(order);
                        Ok(EntryOutcome::Modified)
                    }
                    None => {
                        self.changes.record_added(order);
                        Ok(EntryOutcome::Added)
                    }
                }
            }
            DiffOp::Update { new_size, .. } => {
                let size = parse_positive(entry.oid, "size", new_size.as_deref())?;
                let order = self.book.resize(entry.oid, size)?;
                self.changes.record_modified(order);
                Ok(EntryOutcome::Modified)
            }
            DiffOp::Unrecognized => Err(L4Error::malformed(entry.oid, "unrecognized operation")),
        }
    }

    /// Count and record a dropped diff entry.
    fn drop_entry(&mut self, entry: &BookDiff, err: L4Error, height: u64) {
        self.stats.entries_dropped += 1;
        let category = match &err {
            L4Error::MalformedMessage { .. } => {
                self.stats.malformed_entries += 1;
                WarningCategory::MalformedEntry
            }
            L4Error::SideUnresolved(_) => {
                self.stats.unresolved_sides += 1;
                WarningCategory::SideUnresolved
            }
            L4Error::OrderNotFound(_) => {
                self.stats.unknown_updates += 1;
                WarningCategory::UnknownOrder
            }
            _ => WarningCategory::Other,
        };
        self.warnings.record_order_warning(
            category,
            format!("diff entry dropped at height {height}: {err}"),
            entry.oid,
            entry.price.as_deref(),
            Some(height),
        );
    }

    /// Drop all state and wait for the next snapshot.
    pub fn reset(&mut self) {
        if self.state == ReconstructorState::Ready {
            self.warnings.record_simple(
                WarningCategory::BookReset,
                format!(
                    "book for {:?} reset at height {:?} with {} orders",
                    self.symbol,
                    self.height,
                    self.book.orders.len()
                ),
            );
        }
        self.state = ReconstructorState::Uninitialized;
        self.symbol = None;
        self.height = None;
        self.book = BookState::new();
        self.changes.clear();
        self.stats.resets += 1;
        self.refresh_stats();
    }

    fn refresh_stats(&mut self) {
        self.stats.active_orders = self.book.orders.len();
        self.stats.bid_levels = self.book.bids.len();
        self.stats.ask_levels = self.book.asks.len();
        self.stats.last_height = self.height;
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> ReconstructorState {
        self.state
    }

    /// Check if a snapshot is loaded.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == ReconstructorState::Ready
    }

    /// Symbol of the loaded snapshot.
    #[inline]
    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    /// Height of the last applied message.
    #[inline]
    pub fn height(&self) -> Option<u64> {
        self.height
    }

    /// Best `n` levels of one side, best first.
    #[inline]
    pub fn top_n(&self, side: Side, n: usize) -> Vec<LevelView> {
        self.book.index(side).top(n)
    }

    /// Best configured number of levels on both sides: (bids, asks).
    pub fn top_of_book(&self) -> (Vec<LevelView>, Vec<LevelView>) {
        let n = self.config.levels;
        (self.top_n(Side::Bid, n), self.top_n(Side::Ask, n))
    }

    /// Mutations made by the most recent diff.
    #[inline]
    pub fn change_set(&self) -> &ChangeSet {
        &self.changes
    }

    /// Number of resting orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.book.orders.len()
    }

    /// Number of resting orders on one side.
    #[inline]
    pub fn side_order_count(&self, side: Side) -> usize {
        self.book.index(side).order_count()
    }

    /// Number of price levels on one side.
    #[inline]
    pub fn level_count(&self, side: Side) -> usize {
        self.book.index(side).len()
    }

    /// Order at the front of the queue at the best price.
    pub fn best(&self, side: Side) -> Option<&Order> {
        let (_, level) = self.book.index(side).best()?;
        self.book.orders.get(&level.front()?)
    }

    /// Best price of one side.
    #[inline]
    pub fn best_price(&self, side: Side) -> Option<Decimal> {
        self.book.index(side).best().map(|(price, _)| price)
    }

    /// Best ask minus best bid.
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_price(Side::Ask)? - self.best_price(Side::Bid)?)
    }

    /// Midpoint between best bid and best ask.
    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.best_price(Side::Bid)?;
        let ask = self.best_price(Side::Ask)?;
        Some(bid + (ask - bid) / Decimal::TWO)
    }

    /// Check if the book is crossed (bid >= ask).
    ///
    /// The reconstructor does not match orders; this only reports the feed.
    pub fn is_crossed(&self) -> bool {
        match (self.best_price(Side::Bid), self.best_price(Side::Ask)) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    /// Look up one order.
    #[inline]
    pub fn order(&self, oid: OrderId) -> Option<&Order> {
        self.book.orders.get(&oid)
    }

    /// Iterate all resting orders (unordered).
    #[inline]
    pub fn orders(&self) -> impl Iterator<Item = &Order> + '_ {
        self.book.orders.values()
    }

    /// Resting orders of one account, sorted by order id.
    pub fn orders_for_owner(&self, owner: &str) -> Vec<&Order> {
        let mut orders: Vec<&Order> = self
            .book
            .orders
            .values()
            .filter(|order| order.owner == owner)
            .collect();
        orders.sort_unstable_by_key(|order| order.oid);
        orders
    }

    /// Queue position of an order within its price level.
    pub fn queue_position(&self, oid: OrderId) -> Option<QueuePosition> {
        let order = self.book.orders.get(&oid)?;
        self.book
            .index(order.side)
            .queue_position(order.price_key(), oid)
    }

    /// Check referential integrity of orders and both indices.
    pub fn verify_integrity(&self) -> Result<()> {
        self.book.verify()
    }

    /// Get current statistics.
    #[inline]
    pub fn stats(&self) -> &BookStats {
        &self.stats
    }

    /// Diagnostics recorded so far.
    #[inline]
    pub fn warnings(&self) -> &WarningTracker {
        &self.warnings
    }
}

// ============================================================================
// Entry validation
// ============================================================================

fn order_from_entry(side: Side, entry: &OrderEntry) -> Result<Order> {
    build_order(
        entry.oid,
        side,
        entry.price.as_deref(),
        entry.size.as_deref(),
        entry.owner.as_deref(),
    )
}

fn build_order(
    oid: OrderId,
    side: Side,
    price: Option<&str>,
    size: Option<&str>,
    owner: Option<&str>,
) -> Result<Order> {
    let price = parse_positive(oid, "price", price)?;
    let size = parse_positive(oid, "size", size)?;
    let owner = owner
        .filter(|owner| !owner.is_empty())
        .ok_or_else(|| L4Error::malformed(oid, "missing owner"))?;
    Ok(Order::new(oid, side, price, size, owner))
}

fn parse_positive(oid: OrderId, field: &str, text: Option<&str>) -> Result<DecimalStr> {
    let text = text.ok_or_else(|| L4Error::malformed(oid, format!("missing {field}")))?;
    let value = DecimalStr::parse(text)
        .map_err(|_| L4Error::malformed(oid, format!("unparseable {field} {text:?}")))?;
    if !value.is_positive() {
        return Err(L4Error::malformed(
            oid,
            format!("non-positive {field} {text:?}"),
        ));
    }
    Ok(value)
}
