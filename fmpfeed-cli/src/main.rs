//! fmpfeed CLI: stream endpoint records as newline-delimited JSON.
//!
//! Commands:
//! - `exchanges`, `stocks`: reference lists
//! - `profile <SYMBOLS>`, `profile-bulk`: company profiles
//! - `dividends`, `earnings`, `splits`: calendars over `--from`/`--to`
//! - `eod-bulk --date`: end-of-day prices for every symbol
//! - `history <SYMBOL>`: daily prices, or intraday bars with `--interval`
//!
//! Records go to stdout, one JSON object per line. Logs go to stderr and are
//! filtered with `RUST_LOG`.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fmpfeed_core::payload::TimeInterval;
use fmpfeed_core::{ClientConfig, FailureLog, FailurePolicy, FmpClient, Payload, RecordStream};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fmpfeed", about = "fmpfeed: stream FMP records as NDJSON", version)]
struct Cli {
    /// TOML config file. The API key may also come from FMP_API_KEY.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip invalid records instead of stopping at the first one.
    #[arg(long, global = true, default_value_t = false)]
    lenient: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available exchanges.
    Exchanges,
    /// List all stock symbols.
    Stocks,
    /// Company profiles for one or more symbols.
    Profile {
        /// Comma-separated symbols (e.g., AAPL,MSFT).
        symbols: String,
    },
    /// Every company profile, downloaded part by part.
    ProfileBulk,
    /// Dividends calendar.
    Dividends {
        /// First day (YYYY-MM-DD), inclusive.
        #[arg(long)]
        from: NaiveDate,
        /// Last day (YYYY-MM-DD), inclusive.
        #[arg(long)]
        to: NaiveDate,
    },
    /// Earnings calendar.
    Earnings {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Splits calendar.
    Splits {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// End-of-day prices for every symbol on one date.
    EodBulk {
        #[arg(long)]
        date: NaiveDate,
    },
    /// Price history for one symbol.
    History {
        symbol: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// Intraday bar size: 1min, 5min, 15min, 30min, 1hour, 4hour.
        #[arg(long)]
        interval: Option<TimeInterval>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fmpfeed=info,fmpfeed_core=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    }
    .with_env_overrides();

    let failures = Arc::new(FailureLog::new());
    let mut client = FmpClient::from_config(&config).context("failed to set up client")?;
    if cli.lenient || !config.strict {
        client = client.with_failure_policy(FailurePolicy::Collect(failures.clone()));
    }

    let written = match cli.command {
        Commands::Exchanges => emit(client.available_exchanges()),
        Commands::Stocks => emit(client.stock_list()),
        Commands::Profile { symbols } => emit(client.company_profile(&symbols)),
        Commands::ProfileBulk => emit(client.company_profile_bulk()),
        Commands::Dividends { from, to } => emit(client.dividends_calendar(from, to)?),
        Commands::Earnings { from, to } => emit(client.earnings_calendar(from, to)?),
        Commands::Splits { from, to } => emit(client.splits_calendar(from, to)?),
        Commands::EodBulk { date } => emit(client.eod_bulk(date)),
        Commands::History {
            symbol,
            from,
            to,
            interval: Some(interval),
        } => emit(client.historical_chart(&symbol, interval, from, to)),
        Commands::History {
            symbol,
            from,
            to,
            interval: None,
        } => emit(client.historical_price_eod(&symbol, from, to)),
    }?;

    let skipped = failures.len();
    if skipped > 0 {
        tracing::warn!(written, skipped, "invalid records were skipped");
    } else {
        tracing::info!(written, "done");
    }
    Ok(())
}

/// Write each record as one JSON line; returns how many were written.
fn emit<P: Payload + Serialize>(stream: RecordStream<P>) -> Result<usize> {
    let endpoint = stream.path().to_string();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut written = 0;
    for record in stream {
        let record = record.with_context(|| format!("fetching {endpoint}"))?;
        serde_json::to_writer(&mut out, &record)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}
