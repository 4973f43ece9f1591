//! Wall-clock to UTC resolution in the active timezone.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// Upper bound on the forward probe across a DST gap, in minutes.
const MAX_GAP_MINUTES: u32 = 24 * 60;

/// Resolves a local wall-clock time to a UTC instant.
///
/// An ambiguous local time resolves to the later of its two instants when
/// that one is not after `not_after`, otherwise to the earlier one. A local
/// time inside a DST gap resolves to the first existing instant after the gap.
pub(crate) fn resolve(tz: &Tz, naive: NaiveDateTime, not_after: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let mut probe = naive;
    for _ in 0..=MAX_GAP_MINUTES {
        match tz.from_local_datetime(&probe) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, latest) => {
                let latest = latest.with_timezone(&Utc);
                return match not_after {
                    Some(bound) if latest <= bound => latest,
                    _ => earliest.with_timezone(&Utc),
                };
            }
            LocalResult::None => match probe.checked_add_signed(TimeDelta::minutes(1)) {
                Some(next) => probe = next,
                None => break,
            },
        }
    }
    Utc.from_utc_datetime(&naive)
}

/// Resolves a local wall-clock time, preferring the earlier instant.
pub(crate) fn resolve_earliest(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    resolve(tz, naive, None)
}
