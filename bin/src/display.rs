//! Input parsing and output formatting for the candela CLI.

use anyhow::{Context, Result, bail};
use candela_lib::prelude::*;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use csv_async::StringRecord;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Output format for replayed candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Format {
    /// Pretty JSON array of the final history
    Json,
    /// One JSON object per candle update
    Ndjson,
}

impl Format {
    /// Returns the file extension for this format.
    pub(crate) const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Ndjson => "ndjson",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// A parsed `timestamp,price,volume` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TradeRow {
    pub(crate) timestamp: DateTime<Utc>,
    pub(crate) update: TradeUpdate,
}

/// Parse an RFC 3339 timestamp or integer epoch milliseconds.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(millis) = s.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis)
            .with_context(|| format!("Timestamp out of range: {s}"));
    }
    let parsed = DateTime::parse_from_rfc3339(s).with_context(|| format!("Invalid timestamp: {s}"))?;
    Ok(parsed.with_timezone(&Utc))
}

/// Parse one CSV record. An empty price makes the row volume-only.
pub(crate) fn parse_trade_row(record: &StringRecord) -> Result<TradeRow> {
    let timestamp = parse_timestamp(record.get(0).context("Missing timestamp column")?)?;

    let volume_str = record.get(2).context("Missing volume column")?;
    let volume = volume_str
        .parse::<u64>()
        .with_context(|| format!("Invalid volume: {volume_str}"))?;

    let update = match record.get(1).filter(|price| !price.is_empty()) {
        Some(price) => {
            let price = Decimal::from_str(price).with_context(|| format!("Invalid price: {price}"))?;
            TradeUpdate::trade(price, volume)
        }
        None => TradeUpdate::volume_only(volume),
    };

    Ok(TradeRow { timestamp, update })
}

/// Parse a `START/END` session window.
pub(crate) fn parse_session(s: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let Some((start, end)) = s.split_once('/') else {
        bail!("Invalid session: {s}. Expected START/END, e.g. 2024-01-02T14:30:00Z/2024-01-02T21:00:00Z");
    };
    Ok((parse_timestamp(start.trim())?, parse_timestamp(end.trim())?))
}

/// Write candles to `output` (stdout if `None`) in the given format.
pub(crate) fn write_candles(candles: &[Candle], output: Option<&Path>, format: Format) -> Result<()> {
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = BufWriter::new(sink);

    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut writer, candles)?;
            writeln!(writer)?;
        }
        Format::Ndjson => {
            for candle in candles {
                serde_json::to_writer(&mut writer, candle)?;
                writeln!(writer)?;
            }
        }
    }

    writer.flush()?;
    Ok(())
}
