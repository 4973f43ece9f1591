//! candela CLI - replays recorded trades through a session-aware candle chart.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use display::Format;

#[derive(Parser)]
#[command(name = "candela")]
#[command(about = "Session-aware OHLCV candle aggregation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress the summary line)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV trade file through a candle chart
    Replay {
        /// CSV file with `timestamp,price,volume` rows (empty price = volume only)
        input: PathBuf,

        /// Candle period (m1, m5, m15, m30, h1, d1, w1, mn1, y1)
        #[arg(short, long)]
        period: Option<String>,

        /// IANA timezone used for bucketing (e.g. UTC, America/New_York)
        #[arg(short, long)]
        timezone: Option<String>,

        /// JSON chart configuration; flags override its fields
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Session window as START/END in RFC 3339, repeatable.
        /// Defaults to whole local days covering the trades.
        #[arg(short, long = "session")]
        sessions: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "ndjson")]
        format: Format,

        /// Output file path. Defaults to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported candle periods
    Periods,
}

/// Installs the tracing subscriber. `RUST_LOG` takes precedence over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Replay {
            input,
            period,
            timezone,
            config,
            sessions,
            format,
            output,
        } => {
            commands::replay::replay(
                &input,
                period.as_deref(),
                timezone.as_deref(),
                config.as_deref(),
                &sessions,
                format,
                output.as_deref(),
                cli.quiet,
            )
            .await
        }
        Commands::Periods => {
            commands::periods::list_periods();
            Ok(())
        }
    }
}
