//! Replay command implementation.
//!
//! Reads a recorded trade file and feeds it through a [`CandleChart`] under
//! paused tokio time. The chart clock is stepped from boundary to boundary,
//! so the rollover task opens continuation candles exactly as it would live.

use crate::display::{Format, TradeRow, parse_session, parse_trade_row, write_candles};
use anyhow::{Context, Result, anyhow, bail};
use candela_lib::prelude::*;
use candela_lib::{Clock, TokioClock};
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use csv_async::{AsyncReaderBuilder, Trim};
use futures::StreamExt;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Replay a CSV trade file and write the resulting candles.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn replay(
    input: &Path,
    period: Option<&str>,
    timezone: Option<&str>,
    config_path: Option<&Path>,
    sessions: &[String],
    format: Format,
    output: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let config = load_config(config_path, period, timezone)?;
    let rows = read_trades(input).await?;
    let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
        bail!("No trades in {}", input.display());
    };
    let calendar = build_calendar(sessions, &config.timezone, first.timestamp, last.timestamp)?;
    info!(
        trades = rows.len(),
        period = %config.period,
        timezone = %config.timezone,
        sessions = calendar.len(),
        "replaying"
    );

    let outcome = replay_rows(&rows, config, calendar).await?;
    let candles = match format {
        Format::Json => &outcome.history,
        Format::Ndjson => &outcome.updates,
    };
    write_candles(candles, output, format)?;

    if !quiet {
        eprintln!(
            "Replayed {} trades into {} candles ({} skipped)",
            rows.len(),
            outcome.history.len(),
            outcome.skipped
        );
    }

    Ok(())
}

/// Candles produced by a replay.
#[derive(Debug)]
pub(crate) struct ReplayOutcome {
    /// Final history in bucket order.
    pub(crate) history: Vec<Candle>,
    /// Every candle update in notification order.
    pub(crate) updates: Vec<Candle>,
    /// Rows rejected by the chart.
    pub(crate) skipped: usize,
}

/// Feed `rows` through a chart on simulated time.
///
/// Pauses the tokio clock, so this must run on a current-thread runtime
/// whose time is not already paused.
pub(crate) async fn replay_rows(
    rows: &[TradeRow],
    config: ChartConfig,
    calendar: SessionCalendar,
) -> Result<ReplayOutcome> {
    let Some(first) = rows.first() else {
        bail!("No trades to replay");
    };

    tokio::time::pause();
    let clock = TokioClock::starting_at(first.timestamp);
    let chart = CandleChart::with_clock(config, calendar, Arc::new(clock))
        .context("Failed to create chart")?;

    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);
    chart.register_observer(move |candle| sink.lock().push(candle.clone()));

    let mut skipped = 0usize;
    for row in rows {
        advance_to(&chart, &clock, row.timestamp).await;
        match chart.record(row.timestamp, row.update) {
            Ok(_) => {}
            Err(
                err @ (ChartError::OutOfOrder { .. }
                | ChartError::NoNextBucket { .. }
                | ChartError::Overflow { .. }),
            ) => {
                warn!(error = %err, timestamp = %row.timestamp, "trade skipped");
                skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
    chart.shutdown().await;

    let updates = std::mem::take(&mut *updates.lock());
    Ok(ReplayOutcome {
        history: chart.history(),
        updates,
        skipped,
    })
}

/// Load the chart configuration, letting flags override the file.
fn load_config(path: Option<&Path>, period: Option<&str>, timezone: Option<&str>) -> Result<ChartConfig> {
    let mut config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            ChartConfig::from_json(&json)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ChartConfig::default(),
    };

    if let Some(period) = period {
        config.period = period.parse::<Period>().map_err(|e| anyhow!("{e}"))?;
    }
    if let Some(timezone) = timezone {
        config.timezone = timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid timezone {timezone}: {e}"))?;
    }

    Ok(config)
}

/// Read every row of the trade file.
async fn read_trades(input: &Path) -> Result<Vec<TradeRow>> {
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let mut reader = AsyncReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .create_reader(file);

    let mut rows = Vec::new();
    let mut records = reader.records();
    while let Some(record) = records.next().await {
        let record = record.with_context(|| format!("Failed to read {}", input.display()))?;
        let line = record.position().map_or(0, |pos| pos.line());
        rows.push(parse_trade_row(&record).with_context(|| format!("Line {line}"))?);
    }
    Ok(rows)
}

/// Build the session calendar from `--session` flags, or whole local days
/// spanning the trades (plus the following day for the last bucket).
fn build_calendar(
    sessions: &[String],
    tz: &Tz,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
) -> Result<SessionCalendar> {
    if sessions.is_empty() {
        let from = first.with_timezone(tz).date_naive();
        let to = last.with_timezone(tz).date_naive();
        let to = to.succ_opt().unwrap_or(to);
        return Ok(SessionCalendar::daily(tz, from, to, NaiveTime::MIN, NaiveTime::MIN)?);
    }

    let mut calendar = SessionCalendar::new();
    for session in sessions {
        let (start, end) = parse_session(session)?;
        calendar
            .append_window(start, end, tz)
            .with_context(|| format!("Invalid session: {session}"))?;
    }
    Ok(calendar)
}

/// Step simulated time to `target`, stopping just past every bucket
/// boundary on the way so the rollover task fires before the next trade.
async fn advance_to(chart: &CandleChart, clock: &TokioClock, target: DateTime<Utc>) {
    loop {
        let now = clock.now();
        let Ok(boundary) = chart.bucket_for(now) else {
            break;
        };
        if boundary > target {
            break;
        }
        let step = (boundary - now + TimeDelta::milliseconds(1))
            .to_std()
            .unwrap_or_default();
        tokio::time::sleep(step).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 7, 27, h, m, s).unwrap()
    }

    fn row(timestamp: DateTime<Utc>, update: TradeUpdate) -> TradeRow {
        TradeRow { timestamp, update }
    }

    #[tokio::test]
    async fn test_replay_fills_quiet_minutes() {
        let rows = [
            row(at(10, 0, 5), TradeUpdate::trade(dec!(12), 1)),
            row(at(10, 0, 15), TradeUpdate::trade(dec!(23), 1)),
            row(at(10, 3, 10), TradeUpdate::trade(dec!(25), 2)),
        ];
        let calendar = build_calendar(&[], &Tz::UTC, at(10, 0, 5), at(10, 3, 10)).unwrap();

        let outcome = replay_rows(&rows, ChartConfig::default(), calendar).await.unwrap();

        let buckets: Vec<_> = outcome.history.iter().map(Candle::bucket_start).collect();
        assert_eq!(buckets, vec![at(10, 1, 0), at(10, 2, 0), at(10, 3, 0), at(10, 4, 0)]);
        assert_eq!(outcome.skipped, 0);

        let first = &outcome.history[0];
        assert_eq!((first.open(), first.close(), first.volume()), (Some(dec!(12)), Some(dec!(23)), 2));

        for quiet in &outcome.history[1..3] {
            assert!(quiet.is_empty());
            assert_eq!(quiet.close(), Some(dec!(23)));
        }

        let last = &outcome.history[3];
        assert_eq!(last.open(), Some(dec!(23)));
        assert_eq!(last.close(), Some(dec!(25)));
        assert_eq!(last.volume(), 2);

        // Two trades, three rollovers, then a trade into the last rolled candle.
        assert_eq!(outcome.updates.len(), 6);
    }

    #[tokio::test]
    async fn test_replay_skips_out_of_order_rows() {
        let rows = [
            row(at(10, 5, 0), TradeUpdate::trade(dec!(12), 1)),
            row(at(10, 1, 0), TradeUpdate::trade(dec!(99), 1)),
        ];
        let calendar = build_calendar(&[], &Tz::UTC, at(10, 1, 0), at(10, 5, 0)).unwrap();

        let outcome = replay_rows(&rows, ChartConfig::default(), calendar).await.unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.history[0].close(), Some(dec!(12)));
    }

    #[test]
    fn test_default_calendar_covers_following_day() {
        let calendar = build_calendar(&[], &Tz::UTC, at(10, 0, 0), at(23, 59, 30)).unwrap();
        assert_eq!(calendar.len(), 2);
        assert_eq!(calendar.first_day(), Some(at(0, 0, 0).date_naive()));
    }

    #[test]
    fn test_explicit_sessions_are_registered() {
        let sessions = vec!["2023-07-27T13:30:00Z/2023-07-27T20:00:00Z".to_string()];
        let calendar = build_calendar(&sessions, &Tz::UTC, at(14, 0, 0), at(15, 0, 0)).unwrap();
        let window = calendar.lookup(at(0, 0, 0).date_naive()).unwrap();
        assert_eq!((window.start(), window.end()), (at(13, 30, 0), at(20, 0, 0)));

        let inverted = vec!["2023-07-27T20:00:00Z/2023-07-27T13:30:00Z".to_string()];
        assert!(build_calendar(&inverted, &Tz::UTC, at(14, 0, 0), at(15, 0, 0)).is_err());
    }
}
