//! L4 order book reconstruction.
//!
//! - [`price_level`]: FIFO price levels and the per-side price index
//! - [`change_set`]: record of what the last diff did
//! - [`reconstructor`]: snapshot/diff state machine owning the orders

pub mod change_set;
pub mod price_level;
pub mod reconstructor;

pub use change_set::ChangeSet;
pub use price_level::{PriceLevel, PriceLevelIndex, QueuePosition};
pub use reconstructor::{
    BookConfig, BookReconstructor, BookStats, DiffSummary, HeightPolicy, ReconstructorState,
    SnapshotSummary,
};
