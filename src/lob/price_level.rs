//! Price levels and the per-side price level index.
//!
//! A `PriceLevel` is the FIFO queue of order ids resting at one exact price,
//! each with its current size, plus a cached aggregate size. The index maps
//! numeric prices to levels and is the only place price ordering happens.
//!
//! # Invariants
//!
//! - `total_size` MUST always equal the sum of the queued sizes.
//! - The index never holds an empty level: `remove` prunes it immediately.
//!
//! Both are checked in debug builds via `verify_invariant()`.
//!
//! # Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `upsert` | O(log L) + O(1) amortized |
//! | `remove` | O(log L) + O(n) in level (queue order is kept) |
//! | `top_n` | O(n · level size) |
//! | `best` | O(log L) |

use std::collections::BTreeMap;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{L4Error, Result};
use crate::types::{Direction, LevelView, OrderId, Side};

/// A single price level with FIFO-ordered queue and cached aggregate size.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Orders in queue order: order_id → size
    orders: IndexMap<OrderId, Decimal>,
    /// Cached total size (invariant: == orders.values().sum())
    total_size: Decimal,
}

impl PriceLevel {
    /// Create a new empty price level.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order at the back of the queue, or refresh its size in place.
    ///
    /// Returns the previous size if the order was already queued. Fails
    /// without touching the level if the cached total would overflow.
    #[inline]
    pub fn upsert(&mut self, oid: OrderId, size: Decimal) -> Result<Option<Decimal>> {
        let old = self.orders.get(&oid).copied();
        let total = self
            .total_size
            .checked_sub(old.unwrap_or_default())
            .and_then(|rest| rest.checked_add(size))
            .ok_or_else(|| L4Error::malformed(oid, format!("size {size} overflows level total")))?;

        match self.orders.get_mut(&oid) {
            Some(current) => *current = size,
            None => {
                self.orders.insert(oid, size);
            }
        }
        self.total_size = total;

        #[cfg(debug_assertions)]
        self.verify_invariant();

        Ok(old)
    }

    /// Remove an order, keeping the queue order of the rest.
    #[inline]
    pub fn remove(&mut self, oid: OrderId) -> Option<Decimal> {
        let size = self.orders.shift_remove(&oid)?;
        self.total_size -= size;

        #[cfg(debug_assertions)]
        self.verify_invariant();

        Some(size)
    }

    /// Get the cached total size (O(1)).
    #[inline]
    pub fn total_size(&self) -> Decimal {
        self.total_size
    }

    /// Check if the price level has no orders.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the number of orders at this price level.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Get an order's queued size.
    #[inline]
    pub fn get(&self, oid: OrderId) -> Option<Decimal> {
        self.orders.get(&oid).copied()
    }

    /// Check if an order is queued at this level.
    #[inline]
    pub fn contains(&self, oid: OrderId) -> bool {
        self.orders.contains_key(&oid)
    }

    /// Order id at the front of the queue.
    #[inline]
    pub fn front(&self) -> Option<OrderId> {
        self.orders.keys().next().copied()
    }

    /// Order ids in queue order.
    #[inline]
    pub fn order_ids(&self) -> impl Iterator<Item = OrderId> + '_ {
        self.orders.keys().copied()
    }

    /// Iterate over (order_id, size) in queue order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (OrderId, Decimal)> + '_ {
        self.orders.iter().map(|(&oid, &size)| (oid, size))
    }

    /// Compute the actual total by summing all orders (O(n)).
    #[inline]
    pub fn compute_actual_total(&self) -> Decimal {
        self.orders.values().copied().sum()
    }

    /// Position of an order in the queue, with the size queued ahead of it.
    pub fn queue_position(&self, oid: OrderId) -> Option<QueuePosition> {
        let position = self.orders.get_index_of(&oid)?;
        let size_ahead: Decimal = self.orders.values().take(position).copied().sum();
        Some(QueuePosition {
            position,
            size_ahead,
            order_size: self.orders[position],
            level_size: self.total_size,
            queue_length: self.orders.len(),
        })
    }

    /// Verify the size invariant holds.
    #[cfg(debug_assertions)]
    #[inline]
    pub fn verify_invariant(&self) {
        let actual = self.compute_actual_total();
        debug_assert_eq!(
            actual, self.total_size,
            "PriceLevel invariant violated: actual={}, cached={}",
            actual, self.total_size
        );
    }

    #[cfg(not(debug_assertions))]
    #[inline]
    pub fn verify_invariant(&self) {}
}

/// Where an order sits inside its price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePosition {
    /// 0 = front of the queue
    pub position: usize,
    /// Total size queued ahead of the order
    pub size_ahead: Decimal,
    /// The order's own size
    pub order_size: Decimal,
    /// Aggregate size of the whole level
    pub level_size: Decimal,
    /// Number of orders at the level
    pub queue_length: usize,
}

// ============================================================================
// Price Level Index
// ============================================================================

/// Per-side mapping from numeric price to the orders resting there.
///
/// Keys are `Decimal`, so ordering is numeric regardless of how the feed
/// formatted the price text.
#[derive(Debug, Clone)]
pub struct PriceLevelIndex {
    side: Side,
    levels: BTreeMap<Decimal, PriceLevel>,
}

impl PriceLevelIndex {
    /// Create an empty index for one side of the book.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Side this index belongs to.
    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    /// File `oid` under `price`. Returns `true` if it was newly inserted.
    ///
    /// An order already queued at `price` keeps its position; only its size
    /// is refreshed (a no-op when unchanged). On overflow the index is left
    /// exactly as it was.
    #[inline]
    pub fn upsert(&mut self, price: Decimal, oid: OrderId, size: Decimal) -> Result<bool> {
        let level = self.levels.entry(price).or_default();
        match level.upsert(oid, size) {
            Ok(previous) => Ok(previous.is_none()),
            Err(err) => {
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                Err(err)
            }
        }
    }

    /// Remove `oid` from `price`, pruning the level if it becomes empty.
    ///
    /// Returns the removed size, or `None` if the order was not there.
    #[inline]
    pub fn remove(&mut self, price: Decimal, oid: OrderId) -> Option<Decimal> {
        let level = self.levels.get_mut(&price)?;
        let removed = level.remove(oid);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        removed
    }

    /// Best `n` levels in the requested numeric direction.
    pub fn top_n(&self, n: usize, direction: Direction) -> Vec<LevelView> {
        let to_view = |(price, level): (&Decimal, &PriceLevel)| LevelView {
            price: *price,
            aggregated_size: level.total_size(),
            order_count: level.order_count(),
            order_ids: level.order_ids().collect(),
        };

        match direction {
            Direction::Descending => self.levels.iter().rev().take(n).map(to_view).collect(),
            Direction::Ascending => self.levels.iter().take(n).map(to_view).collect(),
        }
    }

    /// Best `n` levels in this side's natural order (bids high→low, asks low→high).
    #[inline]
    pub fn top(&self, n: usize) -> Vec<LevelView> {
        self.top_n(n, self.side.direction())
    }

    /// Best price and its level.
    #[inline]
    pub fn best(&self) -> Option<(Decimal, &PriceLevel)> {
        let entry = match self.side {
            Side::Bid => self.levels.iter().next_back(),
            Side::Ask => self.levels.iter().next(),
        };
        entry.map(|(price, level)| (*price, level))
    }

    /// Level at an exact price.
    #[inline]
    pub fn level(&self, price: Decimal) -> Option<&PriceLevel> {
        self.levels.get(&price)
    }

    /// Queue position of `oid` at `price`.
    #[inline]
    pub fn queue_position(&self, price: Decimal, oid: OrderId) -> Option<QueuePosition> {
        self.levels.get(&price)?.queue_position(oid)
    }

    /// Number of price levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if the side has no levels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Total number of orders across all levels.
    pub fn order_count(&self) -> usize {
        self.levels.values().map(PriceLevel::order_count).sum()
    }

    /// Iterate levels in ascending price order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (Decimal, &PriceLevel)> + '_ {
        self.levels.iter().map(|(price, level)| (*price, level))
    }

    /// Drop every level.
    #[inline]
    pub fn clear(&mut self) {
        self.levels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_price_level_is_empty() {
        let level = PriceLevel::new();
        assert!(level.is_empty());
        assert_eq!(level.total_size(), Decimal::ZERO);
        assert_eq!(level.front(), None);
    }

    #[test]
    fn test_level_keeps_queue_order() {
        let mut level = PriceLevel::new();
        level.upsert(3, dec!(1)).unwrap();
        level.upsert(1, dec!(2)).unwrap();
        level.upsert(2, dec!(3)).unwrap();
        assert_eq!(level.order_ids().collect::<Vec<_>>(), vec![3, 1, 2]);

        level.remove(1);
        assert_eq!(level.order_ids().collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(level.total_size(), dec!(4));
    }

    #[test]
    fn test_level_upsert_refreshes_size_in_place() {
        let mut level = PriceLevel::new();
        level.upsert(1, dec!(1.5)).unwrap();
        level.upsert(2, dec!(2)).unwrap();
        let old = level.upsert(1, dec!(0.25)).unwrap();
        assert_eq!(old, Some(dec!(1.5)));
        assert_eq!(level.front(), Some(1));
        assert_eq!(level.total_size(), dec!(2.25));
        assert_eq!(level.compute_actual_total(), level.total_size());
    }

    #[test]
    fn test_level_remove_nonexistent() {
        let mut level = PriceLevel::new();
        level.upsert(1, dec!(1)).unwrap();
        assert_eq!(level.remove(999), None);
        assert_eq!(level.total_size(), dec!(1));
    }

    #[test]
    fn test_queue_position() {
        let mut level = PriceLevel::new();
        level.upsert(10, dec!(1)).unwrap();
        level.upsert(11, dec!(2)).unwrap();
        level.upsert(12, dec!(4)).unwrap();

        let pos = level.queue_position(12).unwrap();
        assert_eq!(pos.position, 2);
        assert_eq!(pos.size_ahead, dec!(3));
        assert_eq!(pos.order_size, dec!(4));
        assert_eq!(pos.level_size, dec!(7));
        assert_eq!(pos.queue_length, 3);
        assert!(level.queue_position(99).is_none());
    }

    #[test]
    fn test_index_upsert_is_idempotent() {
        let mut index = PriceLevelIndex::new(Side::Bid);
        assert!(index.upsert(dec!(100), 1, dec!(2)).unwrap());
        assert!(!index.upsert(dec!(100), 1, dec!(2)).unwrap());
        assert_eq!(index.len(), 1);
        assert_eq!(index.order_count(), 1);
        assert_eq!(index.level(dec!(100)).unwrap().total_size(), dec!(2));
    }

    #[test]
    fn test_index_remove_prunes_empty_level() {
        let mut index = PriceLevelIndex::new(Side::Ask);
        index.upsert(dec!(101), 1, dec!(1)).unwrap();
        index.upsert(dec!(101), 2, dec!(1)).unwrap();

        assert_eq!(index.remove(dec!(101), 1), Some(dec!(1)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.remove(dec!(101), 2), Some(dec!(1)));
        assert!(index.is_empty());
        assert!(index.level(dec!(101)).is_none());
    }

    #[test]
    fn test_index_remove_missing_does_not_create_level() {
        let mut index = PriceLevelIndex::new(Side::Bid);
        assert_eq!(index.remove(dec!(5), 1), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_top_n_numeric_ordering() {
        let mut asks = PriceLevelIndex::new(Side::Ask);
        asks.upsert(dec!(10.2), 1, dec!(1)).unwrap();
        asks.upsert(dec!(9.5), 2, dec!(1)).unwrap();
        asks.upsert(dec!(100), 3, dec!(1)).unwrap();

        let prices: Vec<_> = asks.top(3).into_iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![dec!(9.5), dec!(10.2), dec!(100)]);

        let prices: Vec<_> = asks
            .top_n(2, Direction::Descending)
            .into_iter()
            .map(|l| l.price)
            .collect();
        assert_eq!(prices, vec![dec!(100), dec!(10.2)]);
    }

    #[test]
    fn test_top_n_aggregates_level() {
        let mut bids = PriceLevelIndex::new(Side::Bid);
        bids.upsert(dec!(100), 1, dec!(2)).unwrap();
        bids.upsert(dec!(100), 4, dec!(0.5)).unwrap();
        bids.upsert(dec!(99), 2, dec!(1)).unwrap();

        let top = bids.top(1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].price, dec!(100));
        assert_eq!(top[0].aggregated_size, dec!(2.5));
        assert_eq!(top[0].order_count, 2);
        assert_eq!(top[0].order_ids, vec![1, 4]);
    }

    #[test]
    fn test_best_per_side() {
        let mut bids = PriceLevelIndex::new(Side::Bid);
        let mut asks = PriceLevelIndex::new(Side::Ask);
        for (i, px) in [dec!(1), dec!(3), dec!(2)].into_iter().enumerate() {
            bids.upsert(px, i as OrderId, dec!(1)).unwrap();
            asks.upsert(px, i as OrderId, dec!(1)).unwrap();
        }
        assert_eq!(bids.best().map(|(p, _)| p), Some(dec!(3)));
        assert_eq!(asks.best().map(|(p, _)| p), Some(dec!(1)));
    }

    #[test]
    fn test_level_overflow_leaves_level_untouched() {
        let mut level = PriceLevel::new();
        level.upsert(1, Decimal::MAX).unwrap();
        level.upsert(2, dec!(1)).unwrap_err();
        level.upsert(1, Decimal::MAX).unwrap();

        assert_eq!(level.order_count(), 1);
        assert!(!level.contains(2));
        assert_eq!(level.total_size(), Decimal::MAX);
    }

    #[test]
    fn test_index_overflow_keeps_existing_levels() {
        let mut bids = PriceLevelIndex::new(Side::Bid);
        bids.upsert(dec!(100), 1, Decimal::MAX).unwrap();
        let err = bids.upsert(dec!(100), 2, dec!(1)).unwrap_err();

        assert!(matches!(err, L4Error::MalformedMessage { oid: 2, .. }));
        assert_eq!(bids.order_count(), 1);
        assert_eq!(bids.level(dec!(100)).unwrap().total_size(), Decimal::MAX);
    }
}
