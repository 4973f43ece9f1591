//! Rust library for aggregating trades into session-aware OHLCV candles.
//!
//! This is a facade crate that re-exports functionality from the candela
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use candela_lib::prelude::*;
//! use chrono::{NaiveDate, NaiveTime, Utc};
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//!     let calendar = SessionCalendar::daily(&chrono_tz::UTC, day, day, NaiveTime::MIN, NaiveTime::MIN)?;
//!     let chart = CandleChart::new(ChartConfig::default(), calendar)?;
//!
//!     chart.register_observer(|candle| println!("{candle:?}"));
//!     chart.record_trade(Utc::now(), Decimal::new(1234, 2), 10)?;
//!
//!     chart.shutdown().await;
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use candela_types::*;

// Re-export session calendars and bucketing
#[cfg(feature = "session")]
pub use candela_session::{SessionCalendar, SessionWindow, TimeSeries};

// Re-export the live chart
#[cfg(feature = "chart")]
pub use candela_chart::{
    CandleChart, ChartConfig, Clock, Notifier, Observer, ObserverId, RolloverScheduler,
    RolloverState, RolloverTarget, SystemClock, TokioClock,
};

/// Prelude module for convenient imports.
///
/// ```
/// use candela_lib::prelude::*;
/// ```
pub mod prelude {
    pub use candela_types::{Candle, ChartError, Period, Result, TradeUpdate};

    #[cfg(feature = "session")]
    pub use candela_session::{SessionCalendar, SessionWindow, TimeSeries};

    #[cfg(feature = "chart")]
    pub use candela_chart::{CandleChart, ChartConfig, ObserverId};
}
