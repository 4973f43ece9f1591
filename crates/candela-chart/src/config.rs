//! Chart configuration.

use candela_types::Period;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a candle chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Candle aggregation period.
    pub period: Period,
    /// Timezone used for bucketing and session days.
    pub timezone: Tz,
    /// Delay before the rollover scheduler retries after a bucketing failure
    /// (in seconds).
    pub fallback_retry_secs: u64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            period: Period::Minute,
            timezone: Tz::UTC,
            fallback_retry_secs: 3600,
        }
    }
}

impl ChartConfig {
    /// Creates a configuration for `period` in `timezone`.
    #[must_use]
    pub fn new(period: Period, timezone: Tz) -> Self {
        Self {
            period,
            timezone,
            ..Default::default()
        }
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or names an unknown period
    /// or timezone.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns the scheduler's fallback retry delay.
    #[must_use]
    pub const fn fallback_retry(&self) -> Duration {
        Duration::from_secs(self.fallback_retry_secs)
    }
}
