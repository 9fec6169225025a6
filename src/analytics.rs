//! Analytics over the reconstructed book.
//!
//! Everything here works on aggregated `LevelView`s, so it can run against
//! the live reconstructor or against a published `BookView` copy.
//!
//! # Key Features
//!
//! - **DepthStats**: Per-side statistics (size, weighted price, concentration)
//! - **MarketImpact**: Walk one side to price a hypothetical aggressive order
//! - **BookMetrics**: Top-of-book summary (spread, mid, imbalance)
//!
//! All arithmetic is done in `Decimal`; prices never pass through floats.
//! Products and sums that can leave `Decimal` range are checked: a derived
//! value that overflows is reported as `None` and size totals saturate.
//!
//! # Usage
//!
//! ```
//! use l4_book_reconstructor::analytics::BookMetrics;
//! use l4_book_reconstructor::{BookReconstructor, OrderEntry, Snapshot};
//!
//! let mut book = BookReconstructor::new(10);
//! book.apply_snapshot(&Snapshot::new(
//!     "BTC",
//!     1,
//!     vec![OrderEntry::new(1, "100", "2", "a")],
//!     vec![OrderEntry::new(2, "101", "2", "b")],
//! ));
//!
//! let metrics = BookMetrics::from_book(&book, 5);
//! assert_eq!(metrics.spread.unwrap().to_string(), "1");
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::lob::BookReconstructor;
use crate::types::{LevelView, Side};

// ============================================================================
// Depth Statistics
// ============================================================================

/// Statistics for one side of the book over a set of levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthStats {
    /// Which side of the book
    pub side: Side,

    /// Total size across all analyzed levels
    pub total_size: Decimal,

    /// Total resting orders across all analyzed levels
    pub order_count: usize,

    /// Number of analyzed levels
    pub levels_count: usize,

    /// Average size per level
    pub avg_level_size: Decimal,

    /// Size-weighted average price
    pub weighted_avg_price: Option<Decimal>,

    /// Smallest level size found
    pub min_level_size: Decimal,

    /// Largest level size found
    pub max_level_size: Decimal,

    /// Best price on this side
    pub best_price: Option<Decimal>,

    /// Worst analyzed price (furthest from the touch)
    pub worst_price: Option<Decimal>,

    /// Size at best level / total size
    pub concentration_ratio: Decimal,
}

impl DepthStats {
    /// Create empty depth statistics.
    pub fn empty(side: Side) -> Self {
        Self {
            side,
            total_size: Decimal::ZERO,
            order_count: 0,
            levels_count: 0,
            avg_level_size: Decimal::ZERO,
            weighted_avg_price: None,
            min_level_size: Decimal::ZERO,
            max_level_size: Decimal::ZERO,
            best_price: None,
            worst_price: None,
            concentration_ratio: Decimal::ZERO,
        }
    }

    /// Compute statistics from levels ordered best first.
    pub fn from_levels(side: Side, levels: &[LevelView]) -> Self {
        if levels.is_empty() {
            return Self::empty(side);
        }

        let levels_count = levels.len();
        let total_size = levels
            .iter()
            .fold(Decimal::ZERO, |acc, l| acc.saturating_add(l.aggregated_size));
        let order_count = levels.iter().map(|l| l.order_count).sum();
        let notional = levels.iter().try_fold(Decimal::ZERO, |acc, l| {
            acc.checked_add(l.price.checked_mul(l.aggregated_size)?)
        });

        let min_level_size = levels
            .iter()
            .map(|l| l.aggregated_size)
            .min()
            .unwrap_or_default();
        let max_level_size = levels
            .iter()
            .map(|l| l.aggregated_size)
            .max()
            .unwrap_or_default();

        let (weighted_avg_price, concentration_ratio) = if total_size.is_zero() {
            (None, Decimal::ZERO)
        } else {
            (
                notional.and_then(|n| n.checked_div(total_size)),
                levels[0].aggregated_size / total_size,
            )
        };

        Self {
            side,
            total_size,
            order_count,
            levels_count,
            avg_level_size: total_size / Decimal::from(levels_count),
            weighted_avg_price,
            min_level_size,
            max_level_size,
            best_price: levels.first().map(|l| l.price),
            worst_price: levels.last().map(|l| l.price),
            concentration_ratio,
        }
    }

    /// Check if statistics represent an empty side.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels_count == 0 || self.total_size.is_zero()
    }

    /// Distance between best and worst analyzed price.
    pub fn price_range(&self) -> Decimal {
        match (self.best_price, self.worst_price) {
            (Some(best), Some(worst)) => (worst - best).abs(),
            _ => Decimal::ZERO,
        }
    }
}

// ============================================================================
// Market Impact Analysis
// ============================================================================

/// Cost of sweeping one side of the book with a hypothetical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketImpact {
    /// Side being consumed (a buy takes from `Ask`, a sell from `Bid`)
    pub side: Side,

    pub requested_size: Decimal,
    pub filled_size: Decimal,
    pub unfilled_size: Decimal,

    /// Size-weighted average fill price
    pub avg_price: Option<Decimal>,
    pub best_price: Option<Decimal>,
    pub worst_price: Option<Decimal>,

    /// Number of levels touched
    pub levels_consumed: usize,

    /// Individual fills as (price, size)
    pub fills: Vec<(Decimal, Decimal)>,
}

impl MarketImpact {
    /// Buy `size` against the asks.
    pub fn simulate_buy(asks: &[LevelView], size: Decimal) -> Self {
        Self::simulate(Side::Ask, asks, size)
    }

    /// Sell `size` against the bids.
    pub fn simulate_sell(bids: &[LevelView], size: Decimal) -> Self {
        Self::simulate(Side::Bid, bids, size)
    }

    fn simulate(side: Side, levels: &[LevelView], size: Decimal) -> Self {
        let mut remaining = size;
        let mut fills = Vec::new();
        let mut cost = Some(Decimal::ZERO);

        for level in levels {
            if remaining <= Decimal::ZERO {
                break;
            }
            let fill = remaining.min(level.aggregated_size);
            fills.push((level.price, fill));
            cost = cost
                .zip(level.price.checked_mul(fill))
                .and_then(|(acc, notional)| acc.checked_add(notional));
            remaining -= fill;
        }

        let filled_size = size - remaining;
        let avg_price = if filled_size.is_zero() {
            None
        } else {
            cost.and_then(|c| c.checked_div(filled_size))
        };

        Self {
            side,
            requested_size: size,
            filled_size,
            unfilled_size: remaining.max(Decimal::ZERO),
            avg_price,
            best_price: fills.first().map(|(p, _)| *p),
            worst_price: fills.last().map(|(p, _)| *p),
            levels_consumed: fills.len(),
            fills,
        }
    }

    /// Check if the order can be fully filled.
    #[inline]
    pub fn can_fill(&self) -> bool {
        self.unfilled_size.is_zero()
    }

    /// Absolute distance between first and last fill price.
    pub fn slippage(&self) -> Decimal {
        match (self.best_price, self.worst_price) {
            (Some(best), Some(worst)) => (worst - best).abs(),
            _ => Decimal::ZERO,
        }
    }
}

// ============================================================================
// Book Metrics
// ============================================================================

/// Top-of-book summary as shown by book monitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetrics {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,

    /// Best ask minus best bid
    pub spread: Option<Decimal>,

    /// Spread as a percentage of the best bid
    pub spread_pct: Option<Decimal>,

    pub mid_price: Option<Decimal>,

    /// (bid size - ask size) / (bid size + ask size) over the analyzed depth
    pub imbalance: Option<Decimal>,

    pub bid_depth: DepthStats,
    pub ask_depth: DepthStats,
}

impl BookMetrics {
    /// Compute metrics from the best `depth` levels of each side.
    pub fn from_levels(bids: &[LevelView], asks: &[LevelView]) -> Self {
        let bid_depth = DepthStats::from_levels(Side::Bid, bids);
        let ask_depth = DepthStats::from_levels(Side::Ask, asks);

        let best_bid = bid_depth.best_price;
        let best_ask = ask_depth.best_price;

        let (spread, spread_pct, mid_price) = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => {
                let spread = ask - bid;
                let pct = spread
                    .checked_div(bid)
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED));
                (Some(spread), pct, Some(bid + spread / Decimal::TWO))
            }
            _ => (None, None, None),
        };

        let imbalance = bid_depth
            .total_size
            .checked_add(ask_depth.total_size)
            .filter(|total| !total.is_zero())
            .map(|total| (bid_depth.total_size - ask_depth.total_size) / total);

        Self {
            best_bid,
            best_ask,
            spread,
            spread_pct,
            mid_price,
            imbalance,
            bid_depth,
            ask_depth,
        }
    }

    /// Compute metrics straight from a reconstructor.
    pub fn from_book(book: &BookReconstructor, depth: usize) -> Self {
        Self::from_levels(&book.top_n(Side::Bid, depth), &book.top_n(Side::Ask, depth))
    }

    /// Check if both sides have quotes.
    #[inline]
    pub fn is_two_sided(&self) -> bool {
        !self.bid_depth.is_empty() && !self.ask_depth.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, size: Decimal, count: usize) -> LevelView {
        LevelView {
            price,
            aggregated_size: size,
            order_count: count,
            order_ids: (0..count as u64).collect(),
        }
    }

    fn bids() -> Vec<LevelView> {
        vec![
            level(dec!(100.00), dec!(1), 1),
            level(dec!(99.99), dec!(2), 2),
            level(dec!(99.98), dec!(1.5), 1),
        ]
    }

    fn asks() -> Vec<LevelView> {
        vec![
            level(dec!(100.01), dec!(1.5), 2),
            level(dec!(100.02), dec!(1), 1),
            level(dec!(100.03), dec!(2), 1),
        ]
    }

    #[test]
    fn test_depth_stats_from_levels() {
        let stats = DepthStats::from_levels(Side::Bid, &bids());
        assert_eq!(stats.total_size, dec!(4.5));
        assert_eq!(stats.levels_count, 3);
        assert_eq!(stats.order_count, 4);
        assert_eq!(stats.best_price, Some(dec!(100.00)));
        assert_eq!(stats.worst_price, Some(dec!(99.98)));
        assert_eq!(stats.price_range(), dec!(0.02));
        assert_eq!(stats.min_level_size, dec!(1));
        assert_eq!(stats.max_level_size, dec!(2));
    }

    #[test]
    fn test_depth_stats_empty() {
        let stats = DepthStats::from_levels(Side::Ask, &[]);
        assert!(stats.is_empty());
        assert_eq!(stats.weighted_avg_price, None);
    }

    #[test]
    fn test_market_impact_simulate_buy() {
        let impact = MarketImpact::simulate_buy(&asks(), dec!(2));
        assert!(impact.can_fill());
        assert_eq!(impact.levels_consumed, 2);
        assert_eq!(impact.fills[1], (dec!(100.02), dec!(0.5)));
        assert_eq!(impact.slippage(), dec!(0.01));
    }

    #[test]
    fn test_market_impact_insufficient_liquidity() {
        let impact = MarketImpact::simulate_sell(&bids(), dec!(10));
        assert!(!impact.can_fill());
        assert_eq!(impact.filled_size, dec!(4.5));
        assert_eq!(impact.unfilled_size, dec!(5.5));
    }

    #[test]
    fn test_book_metrics() {
        let metrics = BookMetrics::from_levels(&bids(), &asks());
        assert!(metrics.is_two_sided());
        assert_eq!(metrics.spread, Some(dec!(0.01)));
        assert_eq!(metrics.mid_price, Some(dec!(100.005)));
        assert_eq!(metrics.spread_pct, Some(dec!(0.01)));
        assert_eq!(metrics.imbalance, Some(Decimal::ZERO));
    }

    #[test]
    fn test_book_metrics_one_sided() {
        let metrics = BookMetrics::from_levels(&bids(), &[]);
        assert!(!metrics.is_two_sided());
        assert_eq!(metrics.spread, None);
        assert_eq!(metrics.imbalance, Some(Decimal::ONE));
    }

    #[test]
    fn test_extreme_magnitudes_do_not_overflow() {
        let huge = vec![
            level(dec!(1000), Decimal::MAX, 1),
            level(dec!(999), Decimal::MAX, 1),
        ];
        let stats = DepthStats::from_levels(Side::Bid, &huge);
        assert_eq!(stats.total_size, Decimal::MAX);
        assert_eq!(stats.weighted_avg_price, None);

        let impact = MarketImpact::simulate_sell(&huge, Decimal::MAX);
        assert!(impact.can_fill());
        assert_eq!(impact.avg_price, None);

        let tiny_bid = vec![level(dec!(0.0000000000000000000000000001), dec!(1), 1)];
        let huge_ask = vec![level(Decimal::MAX, dec!(1), 1)];
        let metrics = BookMetrics::from_levels(&tiny_bid, &huge_ask);
        assert_eq!(metrics.spread_pct, None);
        assert!(metrics.mid_price.is_some());
        assert_eq!(metrics.imbalance, Some(Decimal::ZERO));
    }
}
