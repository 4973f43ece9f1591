//! Trading session windows keyed by local calendar day.

use std::collections::BTreeMap;

use candela_types::{ChartError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::local::resolve_earliest;

/// The permitted trading interval within one calendar day.
///
/// Both bounds are inclusive for [`contains`](Self::contains).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SessionWindow {
    /// Creates a new window, validating that end > start.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidWindow`] if `end <= start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if end <= start {
            return Err(ChartError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns the session open.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the session close.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns true if `t` lies within `[start, end]`.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}

impl std::fmt::Display for SessionWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Mapping from local calendar day to its trading window.
///
/// Days are midnight-normalized dates in the timezone the windows were
/// registered with. At most one window exists per day; registering another
/// window for the same day replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCalendar {
    windows: BTreeMap<NaiveDate, SessionWindow>,
}

impl SessionCalendar {
    /// Creates an empty calendar.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            windows: BTreeMap::new(),
        }
    }

    /// Creates a calendar with the same local session on every day of an
    /// inclusive date range.
    ///
    /// A `close` of `00:00` means midnight at the end of the day, so
    /// `daily(tz, from, to, 00:00, 00:00)` registers whole-day sessions.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidWindow`] if `close` is not after `open`.
    pub fn daily(
        tz: &Tz,
        from: NaiveDate,
        to: NaiveDate,
        open: NaiveTime,
        close: NaiveTime,
    ) -> Result<Self> {
        let mut calendar = Self::new();
        for day in from.iter_days().take_while(|day| *day <= to) {
            let start = resolve_earliest(tz, day.and_time(open));
            let end = if close == NaiveTime::MIN {
                match day.succ_opt() {
                    Some(next) => resolve_earliest(tz, next.and_time(NaiveTime::MIN)),
                    None => break,
                }
            } else {
                resolve_earliest(tz, day.and_time(close))
            };
            calendar.insert(day, SessionWindow::new(start, end)?);
        }
        Ok(calendar)
    }

    /// Registers a window for the local day of `start` in `tz`.
    ///
    /// Returns the day the window was registered under.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidWindow`] if `end <= start`.
    pub fn append_window(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<NaiveDate> {
        let window = SessionWindow::new(start, end)?;
        let day = start.with_timezone(tz).date_naive();
        self.insert(day, window);
        Ok(day)
    }

    /// Registers a window for `day`, returning the window it replaced.
    pub fn insert(&mut self, day: NaiveDate, window: SessionWindow) -> Option<SessionWindow> {
        self.windows.insert(day, window)
    }

    /// Removes the window registered for `day`.
    pub fn remove(&mut self, day: NaiveDate) -> Option<SessionWindow> {
        self.windows.remove(&day)
    }

    /// Returns the window registered for `day`.
    #[must_use]
    pub fn lookup(&self, day: NaiveDate) -> Option<&SessionWindow> {
        self.windows.get(&day)
    }

    /// Returns the windows registered for days strictly after `day`, in order.
    pub fn after(&self, day: NaiveDate) -> impl Iterator<Item = (NaiveDate, &SessionWindow)> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.windows
            .range((Excluded(day), Unbounded))
            .map(|(day, window)| (*day, window))
    }

    /// Returns all windows in day order.
    pub fn windows(&self) -> impl Iterator<Item = (NaiveDate, &SessionWindow)> {
        self.windows.iter().map(|(day, window)| (*day, window))
    }

    /// Returns the earliest configured day.
    #[must_use]
    pub fn first_day(&self) -> Option<NaiveDate> {
        self.windows.keys().next().copied()
    }

    /// Returns the latest configured day, which bounds forward session scans.
    #[must_use]
    pub fn last_day(&self) -> Option<NaiveDate> {
        self.windows.keys().next_back().copied()
    }

    /// Returns the number of configured days.
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns true if no day is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
