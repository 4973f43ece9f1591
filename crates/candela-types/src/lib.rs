//! Core types for the candela candle aggregation engine.
//!
//! This crate provides the value types shared by every candela crate:
//!
//! - [`Candle`] - OHLCV aggregate for one bucket
//! - [`TradeUpdate`] - A priced trade or a volume-only report
//! - [`Period`] - Candle aggregation period
//! - [`ChartError`] - Error taxonomy for bucketing and chart operations

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod candle;
mod error;
mod period;
mod update;

pub use candle::Candle;
pub use error::{ChartError, Result};
pub use period::{Period, PeriodParseError};
pub use update::TradeUpdate;
