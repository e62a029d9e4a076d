//! Command-line front end over the screener orchestrator.
//!
//! Results are printed to stdout as JSON; logs and the error protocol go
//! to stderr so stdout stays machine-parsable.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chart_analysis::PatternKind;
use market_data_cache::{
    RetryingFetcher, RosterStore, SeriesStore,
    providers::{roster_file::RosterFileProvider, yahoo_chart::YahooChartProvider},
    trading_today,
};
use stock_screener::{
    CompareRequest, Orchestrator, ScanRequest, ScreenerConfig, SimilarRequest, WorkPool,
    output::{emit, emit_error},
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the config file (screener.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache directory; overrides the config file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// JSON listing file the roster is loaded from
    #[arg(long)]
    roster_file: Option<PathBuf>,

    /// Cache freshness window in hours
    #[arg(long)]
    ttl_hours: Option<u64>,

    /// Number of concurrent fetch workers
    #[arg(long)]
    workers: Option<usize>,

    /// Cap on provider requests per second, shared across workers
    #[arg(long)]
    rate_limit: Option<u32>,

    /// Serve everything from the on-disk cache, never the network
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the whole roster for a chart pattern
    Scan {
        /// Pattern name: head_and_shoulders, inverse_head_and_shoulders,
        /// double_top, double_bottom, cup_and_handle
        #[arg(long)]
        pattern: PatternKind,

        /// First day of the analysis window (e.g. 2024-01-02)
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the analysis window; defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Number of hits to keep
        #[arg(long, default_value = "10")]
        top_n: usize,

        /// Shoulder/pair tolerance as a fraction (e.g. 0.15)
        #[arg(long)]
        tolerance: Option<f64>,
    },

    /// Rank the roster by similarity to a base symbol
    Similar {
        /// Symbol the rest of the universe is scored against
        #[arg(long)]
        base: String,

        /// First day of the analysis window
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the analysis window; defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Number of matches to keep
        #[arg(long, default_value = "5")]
        top_n: usize,

        /// Minimum overlapping days a candidate needs to be scored
        #[arg(long)]
        min_overlap: Option<usize>,
    },

    /// Align two symbols over a window and score the pair
    Compare {
        /// Base symbol
        #[arg(long)]
        base: String,

        /// Symbol compared against the base
        #[arg(long)]
        other: String,

        /// First day of the analysis window
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the analysis window; defaults to today
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Bring every roster symbol's full-history cache entry up to date
    UpdateCache {
        /// Symbol probed for today's close before the bulk run starts
        #[arg(long)]
        probe: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            emit_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = ScreenerConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        cfg.data_dir = dir;
    }
    if let Some(path) = cli.roster_file {
        cfg.roster_file = Some(path);
    }
    if let Some(hours) = cli.ttl_hours {
        cfg.ttl_hours = hours;
    }
    if let Some(workers) = cli.workers {
        cfg.concurrency = workers;
    }
    if let Some(rps) = cli.rate_limit {
        cfg.requests_per_second = Some(rps);
    }

    let series_store = SeriesStore::open(&cfg.data_dir, cfg.ttl()).await?;
    let roster_store = RosterStore::open(&cfg.data_dir, cfg.ttl()).await?;
    let provider = YahooChartProvider::from_env()?;
    let fetcher = RetryingFetcher::new(provider, series_store, cfg.retry.policy());

    let mut pool = WorkPool::new(cfg.concurrency);
    if let Some(rps) = cfg.requests_per_second {
        match NonZeroU32::new(rps) {
            Some(rps) => pool = pool.with_rate_limit(rps),
            None => tracing::warn!("requests_per_second is 0, rate limiting disabled"),
        }
    }

    let orchestrator = Orchestrator::new(fetcher, roster_store, pool).offline(cli.offline);
    let listing = cfg.roster_file.as_ref().map(RosterFileProvider::new);

    match cli.command {
        Commands::Scan {
            pattern,
            start,
            end,
            top_n,
            tolerance,
        } => {
            let request = ScanRequest {
                pattern,
                start,
                end: end.unwrap_or_else(trading_today),
                top_n,
            };
            let mut params = cfg.patterns.clone();
            if let Some(t) = tolerance {
                params.shoulder_tolerance = t;
                params.head_prominence = t;
            }
            let hits = orchestrator
                .scan_patterns(listing.as_ref(), &request, &params)
                .await?;
            emit(&hits)?;
        }

        Commands::Similar {
            base,
            start,
            end,
            top_n,
            min_overlap,
        } => {
            let request = SimilarRequest {
                base_symbol: base,
                start,
                end: end.unwrap_or_else(trading_today),
                top_n,
            };
            let mut params = cfg.similarity.clone();
            if let Some(floor) = min_overlap {
                params.min_overlap_floor = floor;
            }
            let report = orchestrator
                .rank_similar(listing.as_ref(), &request, &params)
                .await?;
            emit(&report)?;
        }

        Commands::Compare {
            base,
            other,
            start,
            end,
        } => {
            let request = CompareRequest {
                base_symbol: base,
                compare_symbol: other,
                start,
                end: end.unwrap_or_else(trading_today),
            };
            let (report, _) = orchestrator.compare_pair(&request, None).await?;
            emit(&report)?;
        }

        Commands::UpdateCache { probe } => {
            let probe = probe.unwrap_or_else(|| cfg.probe_symbol.clone());
            let summary = orchestrator
                .refresh_universe(listing.as_ref(), &probe, trading_today())
                .await?;
            emit(&summary)?;
        }
    }

    Ok(())
}
