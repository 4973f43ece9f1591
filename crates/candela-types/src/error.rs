//! Error types for candela.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for candela operations.
pub type Result<T> = std::result::Result<T, ChartError>;

/// Errors that can occur while bucketing trades or operating a chart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    /// A session window does not end after it starts.
    #[error("Invalid session window: end {end} is not after start {start}")]
    InvalidWindow {
        /// The window start.
        start: DateTime<Utc>,
        /// The window end.
        end: DateTime<Utc>,
    },

    /// No configured trading session follows the given instant.
    #[error("No trading session after {after}")]
    NoNextBucket {
        /// The instant the search started from.
        after: DateTime<Utc>,
    },

    /// The computed bucket precedes the chart's current candle.
    #[error("Bucket {bucket} is before the current candle at {current}")]
    OutOfOrder {
        /// The bucket the update mapped to.
        bucket: DateTime<Utc>,
        /// The bucket start of the current candle.
        current: DateTime<Utc>,
    },

    /// Accumulating an update would overflow a candle's volume or turnover.
    #[error("Overflow accumulating candle at {bucket}")]
    Overflow {
        /// The bucket of the candle that rejected the update.
        bucket: DateTime<Utc>,
    },

    /// The chart has been stopped.
    #[error("Chart has been stopped")]
    Stopped,

    /// The chart was created outside of a tokio runtime.
    #[error("No tokio runtime available to run the rollover scheduler")]
    NoRuntime,
}

impl ChartError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidWindow { .. } | Self::NoRuntime)
    }
}
