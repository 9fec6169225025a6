//! Error types for L4 book reconstruction.
//!
//! Clean error handling using `thiserror` for ergonomic error definitions.
//! Most of these never escape an apply call: per-entry problems are turned
//! into diagnostics and the rest of the message keeps being processed.

use thiserror::Error;

use crate::types::OrderId;

/// Result type alias for reconstruction operations.
pub type Result<T> = std::result::Result<T, L4Error>;

/// Main error type for L4 book operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum L4Error {
    /// A required field is missing or unparseable on a single entry
    #[error("Malformed entry for order {oid}: {reason}")]
    MalformedMessage { oid: OrderId, reason: String },

    /// A new-order diff entry has no side in the message's order statuses
    #[error("Side unresolved for order {0}")]
    SideUnresolved(OrderId),

    /// Incoming height is not strictly greater than the current height
    #[error("Out-of-order height: current={current}, received={received}")]
    OutOfOrderHeight { current: u64, received: u64 },

    /// Order not found in book state
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// Diff received before any snapshot (or after a reset)
    #[error("Diff at height {0} received before snapshot")]
    ProtocolSequence(u64),

    /// Transport signalled that the feed went away
    #[error("Feed disconnected")]
    FeedDisconnected,

    /// Decimal text could not be parsed
    #[error("Invalid decimal: {0:?}")]
    InvalidDecimal(String),

    /// Book state inconsistency detected
    #[error("Book inconsistency: {0}")]
    InconsistentState(String),

    /// A feed record could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// IO failure while reading a feed source
    #[error("IO error: {0}")]
    Io(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl L4Error {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        L4Error::Generic(msg.into())
    }

    /// Create a malformed-entry error.
    pub fn malformed(oid: OrderId, reason: impl Into<String>) -> Self {
        L4Error::MalformedMessage {
            oid,
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for L4Error {
    fn from(err: std::io::Error) -> Self {
        L4Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for L4Error {
    fn from(err: serde_json::Error) -> Self {
        L4Error::Decode(err.to_string())
    }
}

impl From<String> for L4Error {
    fn from(err: String) -> Self {
        L4Error::Generic(err)
    }
}

impl From<&str> for L4Error {
    fn from(err: &str) -> Self {
        L4Error::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = L4Error::OutOfOrderHeight {
            current: 10,
            received: 9,
        };
        assert_eq!(
            err.to_string(),
            "Out-of-order height: current=10, received=9"
        );
        assert_eq!(
            L4Error::malformed(7, "missing price").to_string(),
            "Malformed entry for order 7: missing price"
        );
    }

    #[test]
    fn test_from_serde_json() {
        let err: L4Error = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(matches!(err, L4Error::Decode(_)));
    }

    #[test]
    fn test_result_type() {
        let result: Result<i32> = Err(L4Error::ProtocolSequence(3));
        assert!(result.is_err());
    }
}
