//! Trade updates applied to candles.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single update applied to a candle.
///
/// Volume-only updates (e.g. partial fills reported without a price) are a
/// separate variant, so a genuine zero-price trade stays representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TradeUpdate {
    /// A trade carrying a price.
    Trade {
        /// Execution price.
        price: Decimal,
        /// Traded volume.
        volume: u64,
    },
    /// A volume report that must not disturb open/high/low/close.
    VolumeOnly {
        /// Traded volume.
        volume: u64,
    },
}

impl TradeUpdate {
    /// Creates a price-bearing trade update.
    #[must_use]
    pub const fn trade(price: Decimal, volume: u64) -> Self {
        Self::Trade { price, volume }
    }

    /// Creates a volume-only update.
    #[must_use]
    pub const fn volume_only(volume: u64) -> Self {
        Self::VolumeOnly { volume }
    }

    /// Returns the price, if this update carries one.
    #[must_use]
    pub const fn price(&self) -> Option<Decimal> {
        match self {
            Self::Trade { price, .. } => Some(*price),
            Self::VolumeOnly { .. } => None,
        }
    }

    /// Returns the volume of this update.
    #[must_use]
    pub const fn volume(&self) -> u64 {
        match self {
            Self::Trade { volume, .. } | Self::VolumeOnly { volume } => *volume,
        }
    }

    /// Returns the notional value (`price * volume`) of a priced trade.
    ///
    /// Returns `None` for volume-only updates and when the product does not
    /// fit in a [`Decimal`].
    #[must_use]
    pub fn notional(&self) -> Option<Decimal> {
        self.price()?.checked_mul(Decimal::from(self.volume()))
    }
}
