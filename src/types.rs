//! Core data types for L4 orders, feed messages and query results.
//!
//! Wire types mirror the decoded shapes delivered by the transport layer.
//! Field aliases accept the Hyperliquid `l4Book` naming (`coin`, `limitPx`,
//! `sz`, `user`, `raw_book_diff`) next to the canonical names.
//!
//! Entry fields that can legitimately be malformed on an otherwise valid
//! message are kept as `Option<String>` so that a single bad entry is
//! dropped by the reconstructor instead of failing the whole decode.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{L4Error, Result};

/// Unique identifier of a single resting order.
pub type OrderId = u64;

/// Order side (bid or ask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy order (bid)
    #[serde(rename = "B")]
    Bid = b'B',
    /// Sell order (ask)
    #[serde(rename = "A")]
    Ask = b'A',
}

impl Side {
    /// Parse side from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Side::Bid),
            b'A' => Some(Side::Ask),
            _ => None,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Check if this is a bid.
    #[inline(always)]
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }

    /// Check if this is an ask.
    #[inline(always)]
    pub fn is_ask(self) -> bool {
        matches!(self, Side::Ask)
    }

    /// Best-first ordering for this side.
    #[inline]
    pub fn direction(self) -> Direction {
        match self {
            Side::Bid => Direction::Descending,
            Side::Ask => Direction::Ascending,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("B"),
            Side::Ask => f.write_str("A"),
        }
    }
}

/// Numeric ordering of price levels in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Highest price first (bids)
    Descending,
    /// Lowest price first (asks)
    Ascending,
}

// ============================================================================
// Decimal text
// ============================================================================

/// An exact decimal that remembers the feed's textual representation.
///
/// Equality, ordering and hashing use the numeric value only, so `"100.0"`
/// and `"100.00"` are the same price and `"9.5"` sorts below `"10.2"`.
#[derive(Debug, Clone)]
pub struct DecimalStr {
    text: String,
    value: Decimal,
}

impl DecimalStr {
    /// Parse decimal text, accepting plain and scientific notation.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| L4Error::InvalidDecimal(text.to_string()))?;
        Ok(Self {
            text: trimmed.to_string(),
            value,
        })
    }

    /// The text exactly as received (trimmed).
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The numeric value.
    #[inline]
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Check if the value is strictly positive.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }
}

impl From<Decimal> for DecimalStr {
    fn from(value: Decimal) -> Self {
        Self {
            text: value.to_string(),
            value,
        }
    }
}

impl FromStr for DecimalStr {
    type Err = L4Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for DecimalStr {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for DecimalStr {}

impl PartialOrd for DecimalStr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DecimalStr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl Hash for DecimalStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for DecimalStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for DecimalStr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for DecimalStr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        DecimalStr::parse(&text).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Order
// ============================================================================

/// One resting order, owned by the reconstructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub oid: OrderId,
    pub side: Side,
    pub price: DecimalStr,
    pub size: DecimalStr,
    /// Opaque account identifier
    pub owner: String,
}

impl Order {
    /// Create a new order.
    pub fn new(
        oid: OrderId,
        side: Side,
        price: DecimalStr,
        size: DecimalStr,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            oid,
            side,
            price,
            size,
            owner: owner.into(),
        }
    }

    /// Numeric price, the key the order is filed under.
    #[inline]
    pub fn price_key(&self) -> Decimal {
        self.price.value()
    }
}

// ============================================================================
// Wire messages
// ============================================================================

/// One resting order inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub oid: OrderId,
    #[serde(default, alias = "limitPx", alias = "px")]
    pub price: Option<String>,
    #[serde(default, alias = "sz")]
    pub size: Option<String>,
    #[serde(default, alias = "user")]
    pub owner: Option<String>,
}

impl OrderEntry {
    /// Create a fully-populated entry.
    pub fn new(
        oid: OrderId,
        price: impl Into<String>,
        size: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            oid,
            price: Some(price.into()),
            size: Some(size.into()),
            owner: Some(owner.into()),
        }
    }
}

/// Full-state message that replaces everything previously known.
///
/// Decodes from either explicit `bids`/`asks` lists or the exchange's
/// `levels: [[bids], [asks]]` pair. Always encodes with `bids`/`asks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSnapshot")]
pub struct Snapshot {
    pub symbol: String,
    pub height: u64,
    pub bids: Vec<OrderEntry>,
    pub asks: Vec<OrderEntry>,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(alias = "coin")]
    symbol: String,
    height: u64,
    #[serde(default)]
    bids: Vec<OrderEntry>,
    #[serde(default)]
    asks: Vec<OrderEntry>,
    #[serde(default)]
    levels: Vec<Vec<OrderEntry>>,
}

impl From<RawSnapshot> for Snapshot {
    fn from(raw: RawSnapshot) -> Self {
        let mut bids = raw.bids;
        let mut asks = raw.asks;
        let mut levels = raw.levels.into_iter();
        bids.extend(levels.next().unwrap_or_default());
        asks.extend(levels.next().unwrap_or_default());

        Self {
            symbol: raw.symbol,
            height: raw.height,
            bids,
            asks,
        }
    }
}

impl Snapshot {
    /// Create a snapshot message.
    pub fn new(
        symbol: impl Into<String>,
        height: u64,
        bids: Vec<OrderEntry>,
        asks: Vec<OrderEntry>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            height,
            bids,
            asks,
        }
    }
}

/// Correlates an order id with its side for one diff message.
///
/// A side the decoder does not recognize is kept as `None`; only entries
/// that need it are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub oid: OrderId,
    #[serde(default, deserialize_with = "lenient_side")]
    pub side: Option<Side>,
}

fn lenient_side<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Side>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LenientSide {
        Known(Side),
        Other(IgnoredAny),
    }

    Ok(match LenientSide::deserialize(deserializer)? {
        LenientSide::Known(side) => Some(side),
        LenientSide::Other(_) => None,
    })
}

/// Operation carried by a single book diff entry.
///
/// Payload fields are optional and an unknown tag decodes as
/// `Unrecognized`, so a bad entry never fails the enclosing message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    /// Order left the book (cancelled or filled)
    Remove,
    /// Order added, or re-filed at a new price/size
    New { size: Option<String> },
    /// In-place size change of an existing order
    Update {
        orig_size: Option<String>,
        new_size: Option<String>,
    },
    /// Missing operation, unknown tag or undecodable payload
    #[default]
    Unrecognized,
}

impl<'de> Deserialize<'de> for DiffOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "lowercase")]
        enum KnownOp {
            Remove,
            New {
                #[serde(default, alias = "sz")]
                size: Option<String>,
            },
            Update {
                #[serde(default, alias = "origSz")]
                orig_size: Option<String>,
                #[serde(default, alias = "newSz")]
                new_size: Option<String>,
            },
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum LenientOp {
            Known(KnownOp),
            Other(IgnoredAny),
        }

        Ok(match LenientOp::deserialize(deserializer)? {
            LenientOp::Known(KnownOp::Remove) => DiffOp::Remove,
            LenientOp::Known(KnownOp::New { size }) => DiffOp::New { size },
            LenientOp::Known(KnownOp::Update {
                orig_size,
                new_size,
            }) => DiffOp::Update {
                orig_size,
                new_size,
            },
            LenientOp::Other(_) => DiffOp::Unrecognized,
        })
    }
}

/// One entry of a diff message's `book_diffs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDiff {
    pub oid: OrderId,
    #[serde(default, alias = "px", alias = "limitPx")]
    pub price: Option<String>,
    #[serde(default, alias = "user")]
    pub owner: Option<String>,
    #[serde(default, alias = "raw_book_diff")]
    pub op: DiffOp,
}

impl BookDiff {
    /// Removal entry; price and owner are not required.
    pub fn remove(oid: OrderId) -> Self {
        Self {
            oid,
            price: None,
            owner: None,
            op: DiffOp::Remove,
        }
    }

    /// New-order entry.
    pub fn new_order(
        oid: OrderId,
        price: impl Into<String>,
        owner: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            oid,
            price: Some(price.into()),
            owner: Some(owner.into()),
            op: DiffOp::New {
                size: Some(size.into()),
            },
        }
    }

    /// In-place size update entry.
    pub fn update(oid: OrderId, new_size: impl Into<String>) -> Self {
        Self {
            oid,
            price: None,
            owner: None,
            op: DiffOp::Update {
                orig_size: None,
                new_size: Some(new_size.into()),
            },
        }
    }
}

/// Incremental message applied on top of the last snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub height: u64,
    #[serde(default)]
    pub order_statuses: Vec<OrderStatus>,
    #[serde(default)]
    pub book_diffs: Vec<BookDiff>,
}

impl Diff {
    /// Create an empty diff at `height`.
    pub fn new(height: u64) -> Self {
        Self {
            height,
            ..Default::default()
        }
    }

    /// Add an order status (side resolution).
    pub fn with_status(mut self, oid: OrderId, side: Side) -> Self {
        self.order_statuses.push(OrderStatus {
            oid,
            side: Some(side),
        });
        self
    }

    /// Add a book diff entry.
    pub fn with_diff(mut self, diff: BookDiff) -> Self {
        self.book_diffs.push(diff);
        self
    }
}

/// Everything the transport layer can hand to the reconstructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedEvent {
    /// Full snapshot
    Snapshot(Snapshot),
    /// Incremental diff
    Updates(Diff),
    /// Transport lost the connection
    Disconnected,
    /// Transport reconnected or started a new subscription cycle
    Resubscribed,
}

impl FeedEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedEvent::Snapshot(_) => "snapshot",
            FeedEvent::Updates(_) => "diff",
            FeedEvent::Disconnected => "disconnected",
            FeedEvent::Resubscribed => "resubscribed",
        }
    }
}

// ============================================================================
// Query results
// ============================================================================

/// One aggregated price level as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelView {
    pub price: Decimal,
    pub aggregated_size: Decimal,
    pub order_count: usize,
    /// Order ids in queue order (front first)
    pub order_ids: Vec<OrderId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_bytes() {
        assert_eq!(Side::from_byte(b'B'), Some(Side::Bid));
        assert_eq!(Side::from_byte(b'A'), Some(Side::Ask));
        assert_eq!(Side::from_byte(b'N'), None);
        assert_eq!(Side::Bid.to_byte(), b'B');
        assert_eq!(Side::Ask.direction(), Direction::Ascending);
    }

    #[test]
    fn test_decimal_str_numeric_ordering() {
        let low = DecimalStr::parse("9.5").unwrap();
        let high = DecimalStr::parse("10.2").unwrap();
        assert!(low < high);
        // Lexical comparison would say the opposite
        assert!(low.as_str() > high.as_str());
    }

    #[test]
    fn test_decimal_str_equality_ignores_scale() {
        let a = DecimalStr::parse("100.0").unwrap();
        let b = DecimalStr::parse("100.00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "100.0");
        assert_eq!(b.to_string(), "100.00");
    }

    #[test]
    fn test_decimal_str_rejects_garbage() {
        assert!(matches!(
            DecimalStr::parse("abc"),
            Err(L4Error::InvalidDecimal(_))
        ));
        assert!(DecimalStr::parse("").is_err());
        assert_eq!(DecimalStr::parse("1e2").unwrap().value(), dec!(100));
    }

    #[test]
    fn test_decode_snapshot_with_feed_aliases() {
        let json = r#"{
            "coin": "BTC",
            "height": 42,
            "bids": [{"oid": 1, "limitPx": "100.00", "sz": "2", "user": "0xabc"}],
            "asks": []
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.symbol, "BTC");
        assert_eq!(snapshot.bids[0], OrderEntry::new(1, "100.00", "2", "0xabc"));
    }

    #[test]
    fn test_decode_diff_ops() {
        let json = r#"{
            "height": 2,
            "order_statuses": [{"oid": 3, "side": "B"}],
            "book_diffs": [
                {"oid": 3, "price": "100.50", "owner": "u3", "op": {"new": {"size": "5"}}},
                {"oid": 1, "op": "remove"},
                {"oid": 4, "px": "1", "user": "u4", "raw_book_diff": {"update": {"origSz": "2", "newSz": "1"}}}
            ]
        }"#;
        let diff: Diff = serde_json::from_str(json).unwrap();
        assert_eq!(diff.order_statuses[0].side, Some(Side::Bid));
        assert_eq!(
            diff.book_diffs[0].op,
            DiffOp::New {
                size: Some("5".into())
            }
        );
        assert_eq!(diff.book_diffs[1], BookDiff::remove(1));
        assert_eq!(
            diff.book_diffs[2].op,
            DiffOp::Update {
                orig_size: Some("2".into()),
                new_size: Some("1".into())
            }
        );
    }

    #[test]
    fn test_decode_feed_event() {
        let event: FeedEvent = serde_json::from_str(r#"{"Updates": {"height": 9}}"#).unwrap();
        assert_eq!(event, FeedEvent::Updates(Diff::new(9)));
        let event: FeedEvent = serde_json::from_str(r#""Disconnected""#).unwrap();
        assert_eq!(event.kind(), "disconnected");
    }

    #[test]
    fn test_decode_tolerates_bad_entries() {
        let json = r#"{
            "height": 7,
            "order_statuses": [{"oid": 9, "side": "X"}, {"oid": 10}],
            "book_diffs": [
                {"oid": 1, "op": "remove"},
                {"oid": 9, "px": "100", "user": "u9", "op": {"new": {}}},
                {"oid": 10, "op": {"modify": {"sz": "1"}}},
                {"oid": 11, "op": {"update": {"newSz": 3}}},
                {"oid": 12}
            ]
        }"#;
        let diff: Diff = serde_json::from_str(json).unwrap();

        assert_eq!(diff.order_statuses[0].side, None);
        assert_eq!(diff.order_statuses[1].side, None);
        assert_eq!(diff.book_diffs[0], BookDiff::remove(1));
        assert_eq!(diff.book_diffs[1].op, DiffOp::New { size: None });
        assert_eq!(diff.book_diffs[2].op, DiffOp::Unrecognized);
        assert_eq!(diff.book_diffs[3].op, DiffOp::Unrecognized);
        assert_eq!(diff.book_diffs[4].op, DiffOp::Unrecognized);
    }

    #[test]
    fn test_decode_snapshot_levels_pair() {
        let json = r#"{
            "coin": "ETH",
            "height": 9,
            "levels": [
                [{"oid": 1, "limitPx": "3000.1", "sz": "2", "user": "0xa"}],
                [{"oid": 2, "limitPx": "3000.2", "sz": "1", "user": "0xb"},
                 {"oid": 3, "limitPx": "3000.3", "sz": "4", "user": "0xc"}]
            ]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.symbol, "ETH");
        assert_eq!(snapshot.bids, vec![OrderEntry::new(1, "3000.1", "2", "0xa")]);
        assert_eq!(snapshot.asks.len(), 2);
        assert_eq!(snapshot.asks[1].oid, 3);

        let encoded = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(serde_json::from_str::<Snapshot>(&encoded).unwrap(), snapshot);
    }
}
