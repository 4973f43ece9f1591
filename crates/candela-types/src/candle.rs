//! OHLCV candle data structure.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ChartError, Result, TradeUpdate};

/// OHLCV candle for one bucket.
///
/// Price fields stay unset until the candle is seeded with a continuity
/// price or receives its first priced trade. The bucket start is fixed at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    bucket_start: DateTime<Utc>,
    open: Option<Decimal>,
    high: Option<Decimal>,
    low: Option<Decimal>,
    close: Option<Decimal>,
    volume: u64,
    turnover: Option<Decimal>,
    trade_count: u32,
}

impl Candle {
    /// Creates a candle from its first trade.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::Overflow`] if `price * volume` does not fit in a
    /// [`Decimal`].
    pub fn new(bucket_start: DateTime<Utc>, price: Decimal, volume: u64) -> Result<Self> {
        let mut candle = Self::seeded(bucket_start, None);
        candle.apply(TradeUpdate::trade(price, volume))?;
        Ok(candle)
    }

    /// Creates an empty candle whose prices carry forward `seed`.
    ///
    /// With a seed, open/high/low/close all start at that price (typically
    /// the previous candle's close). Without one they stay unset.
    #[must_use]
    pub const fn seeded(bucket_start: DateTime<Utc>, seed: Option<Decimal>) -> Self {
        Self {
            bucket_start,
            open: seed,
            high: seed,
            low: seed,
            close: seed,
            volume: 0,
            turnover: None,
            trade_count: 0,
        }
    }

    /// Applies an update to the candle.
    ///
    /// Volume-only updates add volume and leave the prices untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::Overflow`] if the volume or turnover total would
    /// overflow. The candle is left unchanged.
    pub fn apply(&mut self, update: TradeUpdate) -> Result<()> {
        let overflow = ChartError::Overflow {
            bucket: self.bucket_start,
        };
        let volume = self
            .volume
            .checked_add(update.volume())
            .ok_or_else(|| overflow.clone())?;

        let Some(price) = update.price() else {
            self.volume = volume;
            self.trade_count = self.trade_count.saturating_add(1);
            return Ok(());
        };
        let turnover = update
            .notional()
            .and_then(|notional| self.turnover.unwrap_or_default().checked_add(notional))
            .ok_or(overflow)?;

        self.volume = volume;
        self.trade_count = self.trade_count.saturating_add(1);
        self.turnover = Some(turnover);
        if self.open.is_none() {
            self.open = Some(price);
        }
        self.high = Some(self.high.map_or(price, |high| high.max(price)));
        self.low = Some(self.low.map_or(price, |low| low.min(price)));
        self.close = Some(price);
        Ok(())
    }

    /// Returns the bucket start instant.
    #[must_use]
    pub const fn bucket_start(&self) -> DateTime<Utc> {
        self.bucket_start
    }

    /// Returns the opening price.
    #[must_use]
    pub const fn open(&self) -> Option<Decimal> {
        self.open
    }

    /// Returns the highest price.
    #[must_use]
    pub const fn high(&self) -> Option<Decimal> {
        self.high
    }

    /// Returns the lowest price.
    #[must_use]
    pub const fn low(&self) -> Option<Decimal> {
        self.low
    }

    /// Returns the closing (most recent) price.
    #[must_use]
    pub const fn close(&self) -> Option<Decimal> {
        self.close
    }

    /// Returns the accumulated volume, the exact sum of every applied update.
    #[must_use]
    pub const fn volume(&self) -> u64 {
        self.volume
    }

    /// Returns the accumulated turnover (sum of `price * volume`).
    #[must_use]
    pub const fn turnover(&self) -> Option<Decimal> {
        self.turnover
    }

    /// Returns the number of updates applied, saturating at `u32::MAX`.
    #[must_use]
    pub const fn trade_count(&self) -> u32 {
        self.trade_count
    }

    /// Returns true if no update has been applied yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.trade_count == 0
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> Option<Decimal> {
        self.high?.checked_sub(self.low?)
    }

    /// Returns the body size (|close - open|).
    #[must_use]
    pub fn body(&self) -> Option<Decimal> {
        self.close?.checked_sub(self.open?).map(|body| body.abs())
    }

    /// Returns true if this is a bullish (green) candle.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        matches!((self.open, self.close), (Some(open), Some(close)) if close > open)
    }

    /// Returns true if this is a bearish (red) candle.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        matches!((self.open, self.close), (Some(open), Some(close)) if close < open)
    }
}
