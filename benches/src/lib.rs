//! Benchmark fixtures for candela.

use candela_lib::SessionCalendar;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

/// A synthetic trade.
#[derive(Debug, Clone, Copy)]
pub struct Trade {
    /// Trade instant.
    pub timestamp: DateTime<Utc>,
    /// Trade price.
    pub price: Decimal,
    /// Traded volume.
    pub volume: u64,
}

/// Whole-day sessions for `days` consecutive local days starting at `from`.
pub fn whole_day_calendar(tz: &Tz, from: NaiveDate, days: u64) -> SessionCalendar {
    let to = from
        .checked_add_days(chrono::Days::new(days.saturating_sub(1)))
        .unwrap_or(from);
    SessionCalendar::daily(tz, from, to, NaiveTime::MIN, NaiveTime::MIN).unwrap_or_default()
}

/// `count` trades spaced `spacing` apart following a seeded random walk
/// around 100.00.
pub fn synthetic_trades(start: DateTime<Utc>, count: usize, spacing: TimeDelta) -> Vec<Trade> {
    let mut rng = StdRng::seed_from_u64(0x2545_f491_4f6c_dd1d);
    let mut cents: i64 = 10_000;
    let mut timestamp = start;
    let mut trades = Vec::with_capacity(count);

    for _ in 0..count {
        cents = (cents + rng.gen_range(-5..=5)).max(1);
        trades.push(Trade {
            timestamp,
            price: Decimal::new(cents, 2),
            volume: rng.gen_range(1..=100),
        });
        timestamp += spacing;
    }

    trades
}

/// Instants spread over `span` starting at `start`, `count` of them.
pub fn sample_instants(start: DateTime<Utc>, span: TimeDelta, count: i32) -> Vec<DateTime<Utc>> {
    let step = span / count.max(1);
    (0..count).map(|i| start + step * i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_synthetic_trades_are_reproducible() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let first = synthetic_trades(start, 500, TimeDelta::seconds(1));
        let second = synthetic_trades(start, 500, TimeDelta::seconds(1));

        assert_eq!(first.len(), 500);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!((a.timestamp, a.price, a.volume), (b.timestamp, b.price, b.volume));
            assert!((1..=100).contains(&a.volume));
            assert!(a.price > Decimal::ZERO);
        }
        assert_eq!(first[499].timestamp, start + TimeDelta::seconds(499));
    }
}
