//! Per-cycle record of book mutations.
//!
//! The change set reflects only the most recent `apply_diff` call. It is
//! cleared at the start of every call and is not double-buffered: read it
//! (or clone it) before applying the next diff.

use serde::{Deserialize, Serialize};

use crate::types::{Order, OrderId};

/// Orders added, removed and modified by the last diff.
///
/// Each entry is the full order as it was at the moment of the change:
/// the new state for `added`/`modified`, the last known state for `removed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub added: Vec<Order>,
    pub removed: Vec<Order>,
    pub modified: Vec<Order>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything recorded so far.
    #[inline]
    pub fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
        self.modified.clear();
    }

    #[inline]
    pub fn record_added(&mut self, order: Order) {
        self.added.push(order);
    }

    #[inline]
    pub fn record_removed(&mut self, order: Order) {
        self.removed.push(order);
    }

    #[inline]
    pub fn record_modified(&mut self, order: Order) {
        self.modified.push(order);
    }

    /// Check if nothing changed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of recorded changes.
    #[inline]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// Ids of added orders, in application order.
    pub fn added_ids(&self) -> Vec<OrderId> {
        self.added.iter().map(|o| o.oid).collect()
    }

    /// Ids of removed orders, in application order.
    pub fn removed_ids(&self) -> Vec<OrderId> {
        self.removed.iter().map(|o| o.oid).collect()
    }

    /// Ids of modified orders, in application order.
    pub fn modified_ids(&self) -> Vec<OrderId> {
        self.modified.iter().map(|o| o.oid).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DecimalStr, Side};

    fn order(oid: OrderId) -> Order {
        Order::new(
            oid,
            Side::Bid,
            DecimalStr::parse("1.0").unwrap(),
            DecimalStr::parse("2").unwrap(),
            "u",
        )
    }

    #[test]
    fn test_record_and_clear() {
        let mut changes = ChangeSet::new();
        assert!(changes.is_empty());

        changes.record_added(order(1));
        changes.record_removed(order(2));
        changes.record_modified(order(3));
        assert_eq!(changes.len(), 3);
        assert_eq!(changes.added_ids(), vec![1]);
        assert_eq!(changes.removed_ids(), vec![2]);
        assert_eq!(changes.modified_ids(), vec![3]);

        changes.clear();
        assert!(changes.is_empty());
        assert_eq!(changes, ChangeSet::default());
    }
}
