//! Live candle chart for the candela candle aggregation engine.
//!
//! This crate turns a stream of trades into a continuous OHLCV history:
//!
//! - [`CandleChart`] - Concurrency-safe candle store for one instrument
//! - [`ChartConfig`] - Period, timezone and retry settings
//! - [`RolloverScheduler`] - Cancelable task opening a candle at each boundary
//! - [`Notifier`] - Ordered list of candle observers
//! - [`Clock`] - Wall-clock source, with [`SystemClock`] and [`TokioClock`]

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod chart;
mod clock;
mod config;
mod notify;
mod scheduler;

pub use chart::CandleChart;
pub use clock::{Clock, SystemClock, TokioClock};
pub use config::ChartConfig;
pub use notify::{Notifier, Observer, ObserverId};
pub use scheduler::{RolloverScheduler, RolloverState, RolloverTarget};
