//! Candle aggregation periods.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Candle aggregation period.
///
/// A period is an identity, not a numeric scale: calendar periods (day and
/// longer) follow the local calendar of the active timezone rather than a
/// fixed number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Period {
    /// 1-minute candles.
    #[default]
    #[serde(rename = "m1")]
    Minute,
    /// 5-minute candles.
    #[serde(rename = "m5")]
    FiveMinutes,
    /// 15-minute candles.
    #[serde(rename = "m15")]
    FifteenMinutes,
    /// 30-minute candles.
    #[serde(rename = "m30")]
    ThirtyMinutes,
    /// 1-hour candles.
    #[serde(rename = "h1")]
    Hour,
    /// Daily candles.
    #[serde(rename = "d1")]
    Day,
    /// Weekly candles, starting Monday 00:00.
    #[serde(rename = "w1")]
    Week,
    /// Monthly candles, starting on the first of the month.
    #[serde(rename = "mn1")]
    Month,
    /// Yearly candles, starting on January 1.
    #[serde(rename = "y1")]
    Year,
}

impl Period {
    /// Returns the bucket length in minutes for intraday periods.
    ///
    /// Calendar periods (day, week, month, year) return `None`, since their
    /// length depends on the calendar and on DST transitions.
    #[must_use]
    pub const fn intraday_minutes(&self) -> Option<u32> {
        match self {
            Self::Minute => Some(1),
            Self::FiveMinutes => Some(5),
            Self::FifteenMinutes => Some(15),
            Self::ThirtyMinutes => Some(30),
            Self::Hour => Some(60),
            Self::Day | Self::Week | Self::Month | Self::Year => None,
        }
    }

    /// Returns true for periods shorter than a day.
    #[must_use]
    pub const fn is_intraday(&self) -> bool {
        self.intraday_minutes().is_some()
    }

    /// Returns the period as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "m1",
            Self::FiveMinutes => "m5",
            Self::FifteenMinutes => "m15",
            Self::ThirtyMinutes => "m30",
            Self::Hour => "h1",
            Self::Day => "d1",
            Self::Week => "w1",
            Self::Month => "mn1",
            Self::Year => "y1",
        }
    }

    /// Returns all available periods, shortest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Minute,
            Self::FiveMinutes,
            Self::FifteenMinutes,
            Self::ThirtyMinutes,
            Self::Hour,
            Self::Day,
            Self::Week,
            Self::Month,
            Self::Year,
        ]
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Period {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m1" | "1m" | "minute" => Ok(Self::Minute),
            "m5" | "5m" | "minute5" => Ok(Self::FiveMinutes),
            "m15" | "15m" | "minute15" | "quarter" => Ok(Self::FifteenMinutes),
            "m30" | "30m" | "minute30" | "half" => Ok(Self::ThirtyMinutes),
            "h1" | "1h" | "hour" => Ok(Self::Hour),
            "d1" | "1d" | "day" | "daily" => Ok(Self::Day),
            "w1" | "1w" | "week" | "weekly" => Ok(Self::Week),
            "mn1" | "1mo" | "month" | "monthly" => Ok(Self::Month),
            "y1" | "1y" | "year" | "yearly" => Ok(Self::Year),
            _ => Err(PeriodParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid period string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodParseError(String);

impl std::fmt::Display for PeriodParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid period '{}', expected one of: m1, m5, m15, m30, h1, d1, w1, mn1, y1",
            self.0
        )
    }
}

impl std::error::Error for PeriodParseError {}
