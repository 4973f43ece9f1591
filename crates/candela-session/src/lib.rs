//! Session calendars and period bucketing for candela.
//!
//! This crate maps wall-clock instants onto candle buckets:
//!
//! - [`SessionWindow`] - Trading interval within one calendar day
//! - [`SessionCalendar`] - Windows keyed by local calendar day
//! - [`TimeSeries`] - Period bucketing constrained to the calendar's sessions

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod calendar;
mod local;
mod series;

pub use calendar::{SessionCalendar, SessionWindow};
pub use series::TimeSeries;
