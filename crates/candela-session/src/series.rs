//! Period bucketing constrained to trading sessions.

use candela_types::{ChartError, Period, Result};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};
use chrono_tz::Tz;

use crate::local::{resolve, resolve_earliest};
use crate::SessionCalendar;

/// Maps instants to period-aligned bucket starts.
///
/// Bucketing is a pure function of the period, the session calendar and
/// the timezone. All flooring happens on the local wall clock of the
/// timezone:
///
/// - intraday periods truncate the local time of day to a multiple of the
///   period length, and advance by that many minutes of elapsed time
/// - `Day` floors to local midnight and advances to the next local midnight
/// - `Week` floors to Monday 00:00 and advances seven days
/// - `Month` floors to the first of the month and advances one month
/// - `Year` floors to January 1 and advances one year
///
/// A floored local time that falls into a DST gap resolves to the first
/// instant after the gap; an ambiguous one resolves to the latest instant
/// not after the input.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    period: Period,
    calendar: SessionCalendar,
    tz: Tz,
}

impl TimeSeries {
    /// Creates a new time series.
    #[must_use]
    pub const fn new(period: Period, calendar: SessionCalendar, tz: Tz) -> Self {
        Self {
            period,
            calendar,
            tz,
        }
    }

    /// Returns the aggregation period.
    #[must_use]
    pub const fn period(&self) -> Period {
        self.period
    }

    /// Returns the active timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Returns the session calendar.
    #[must_use]
    pub const fn calendar(&self) -> &SessionCalendar {
        &self.calendar
    }

    /// Registers a session window for the local day of `start`.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidWindow`] if `end <= start`.
    pub fn append_window(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<NaiveDate> {
        self.calendar.append_window(start, end, &self.tz)
    }

    /// Returns the local calendar day of `t`.
    #[must_use]
    pub fn local_day(&self, t: DateTime<Utc>) -> NaiveDate {
        t.with_timezone(&self.tz).date_naive()
    }

    /// Floors `t` to the start of its period bucket.
    #[must_use]
    pub fn floor_to_bucket(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let local = t.with_timezone(&self.tz).naive_local();
        let floored = match self.period.intraday_minutes() {
            Some(minutes) => truncate_to_minutes(local, minutes),
            None => self.floor_calendar_day(local.date()).and_time(NaiveTime::MIN),
        };
        resolve(&self.tz, floored, Some(t))
    }

    /// Returns the bucket start that follows `t`, skipping non-trading time.
    ///
    /// The candidate is the floor of `t` advanced by one period. For the
    /// candidate's local day window `(start, end)`:
    ///
    /// - a candidate at or before `start` snaps to `start`
    /// - a candidate in `(start, end]` is accepted; the candle labelled with
    ///   the session close is the session's final live candle
    /// - otherwise, or when the day has no window, the start of the first
    ///   configured window on a later day is returned
    ///
    /// Trades are attributed to this bucket, i.e. to the live candle in
    /// progress rather than the bucket that literally contains `t`.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::NoNextBucket`] if no session is configured after
    /// the candidate, or if the following period lies beyond the range of
    /// representable instants.
    pub fn next_bucket_start(&self, t: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let candidate = self
            .step(self.floor_to_bucket(t))
            .ok_or(ChartError::NoNextBucket { after: t })?;
        let day = self.local_day(candidate);

        if let Some(window) = self.calendar.lookup(day) {
            if candidate <= window.start() {
                return Ok(window.start());
            }
            if candidate <= window.end() {
                return Ok(candidate);
            }
        }

        self.calendar
            .after(day)
            .map(|(_, window)| window.start())
            .find(|start| *start > candidate)
            .ok_or(ChartError::NoNextBucket { after: t })
    }

    /// Returns true if `t`'s local day has a window and `start <= t <= end`.
    #[must_use]
    pub fn is_within_session(&self, t: DateTime<Utc>) -> bool {
        self.calendar
            .lookup(self.local_day(t))
            .is_some_and(|window| window.contains(t))
    }

    /// Floors `t` to its bucket start if `t` lies within a session.
    #[must_use]
    pub fn floor_in_session(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.is_within_session(t).then(|| self.floor_to_bucket(t))
    }

    /// Advances a bucket start by one period, or `None` past the end of time.
    fn step(&self, bucket: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(minutes) = self.period.intraday_minutes() {
            return bucket.checked_add_signed(TimeDelta::minutes(i64::from(minutes)));
        }

        let day = bucket.with_timezone(&self.tz).date_naive();
        let next = match self.period {
            Period::Week => day.checked_add_days(Days::new(7))?,
            Period::Month => day.checked_add_months(Months::new(1))?,
            Period::Year => day.checked_add_months(Months::new(12))?,
            _ => day.succ_opt()?,
        };
        Some(resolve_earliest(&self.tz, next.and_time(NaiveTime::MIN)))
    }

    /// Floors a local date to the first day of its calendar period.
    fn floor_calendar_day(&self, day: NaiveDate) -> NaiveDate {
        match self.period {
            Period::Week => day
                .checked_sub_days(Days::new(u64::from(day.weekday().num_days_from_monday())))
                .unwrap_or(day),
            Period::Month => day.with_day(1).unwrap_or(day),
            Period::Year => day.with_ordinal(1).unwrap_or(day),
            _ => day,
        }
    }
}

/// Truncates a local time to a multiple of `interval` minutes within its day.
fn truncate_to_minutes(local: NaiveDateTime, interval: u32) -> NaiveDateTime {
    let minute_of_day = local.hour() * 60 + local.minute();
    let floored = minute_of_day / interval * interval;
    let time = NaiveTime::from_hms_opt(floored / 60, floored % 60, 0).unwrap_or(NaiveTime::MIN);
    local.date().and_time(time)
}
