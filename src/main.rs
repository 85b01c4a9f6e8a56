use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use kredit_dashboard::apis::ScoringSheetClient;
use kredit_dashboard::app::ports::{ClockPort, SystemClock};
use kredit_dashboard::app::DatasetReconciler;
use kredit_dashboard::config::{required, Config};
use kredit_dashboard::infra::FtpTransport;
use kredit_dashboard::logging::init_logging;
use kredit_dashboard::observability;
use kredit_dashboard::pipeline::{CacheLookup, RemoteDatasetFetcher, SnapshotCache};
use kredit_dashboard::report::{DashboardReport, Period};
use kredit_dashboard::types::Source;

#[derive(Parser)]
#[command(name = "kredit_dashboard")]
#[command(about = "Kredit Market scoring and back-office reconciliation dashboard")]
#[command(version)]
struct Cli {
    /// Optional TOML config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch both sources and print the dashboard
    Report {
        /// Window for the detailed breakdowns
        #[arg(long, value_enum, default_value_t = DetailPeriod::Month)]
        period: DetailPeriod,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Print Prometheus metrics after the report
        #[arg(long)]
        print_metrics: bool,
    },
    /// Fetch the back-office export now and overwrite the snapshot
    RefreshCache,
    /// Show whether the snapshot would be used
    CacheStatus,
}

#[derive(Clone, Copy, ValueEnum)]
enum DetailPeriod {
    Week,
    Month,
}

impl From<DetailPeriod> for Period {
    fn from(p: DetailPeriod) -> Self {
        match p {
            DetailPeriod::Week => Period::Week,
            DetailPeriod::Month => Period::Month,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn snapshot_cache(config: &Config, clock: Arc<dyn ClockPort>) -> SnapshotCache {
    SnapshotCache::new(&config.cache.path, Source::BackOffice, clock)
}

fn back_office_fetcher(config: &Config) -> Result<RemoteDatasetFetcher> {
    let transport = FtpTransport::from_config(&config.transfer)?;
    let filename = required(&config.transfer.filename, "FTP_FILENAME")?;
    Ok(RemoteDatasetFetcher::new(Arc::new(transport), filename))
}

fn build_reconciler(config: &Config, clock: Arc<dyn ClockPort>) -> Result<DatasetReconciler> {
    let scoring = ScoringSheetClient::from_config(&config.scoring)
        .context("Failed to set up scoring source")?;
    let back_office = back_office_fetcher(config).context("Failed to set up back-office source")?;
    Ok(DatasetReconciler::new(
        Box::new(scoring),
        Box::new(back_office),
        snapshot_cache(config, clock.clone()),
        clock,
    ))
}

fn run(cli: Cli, config: Config) -> Result<()> {
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);

    match cli.command {
        Commands::Report {
            period,
            format,
            print_metrics,
        } => {
            let metrics = if print_metrics {
                Some(observability::init()?)
            } else {
                None
            };

            let reconciler = build_reconciler(&config, clock)?;
            let reconciliation = reconciler.reconcile().context("Error loading data")?;
            let report = DashboardReport::build(&reconciliation, period.into());

            match format {
                OutputFormat::Text => println!("{}", report),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }

            if let Some(handle) = metrics {
                println!("{}", handle.render());
            }
        }
        Commands::RefreshCache => {
            let cache = snapshot_cache(&config, clock);
            let dataset = back_office_fetcher(&config)?
                .fetch()
                .context("Failed to fetch back-office export")?;
            cache.save(&dataset).context("Failed to save snapshot")?;
            println!(
                "Snapshot refreshed: {} records written to {}",
                dataset.len(),
                cache.path().display()
            );
        }
        Commands::CacheStatus => {
            let cache = snapshot_cache(&config, clock);
            match cache.load() {
                CacheLookup::Hit(dataset) => println!(
                    "fresh: {} records in {}",
                    dataset.len(),
                    cache.path().display()
                ),
                CacheLookup::Miss(reason) => {
                    println!("miss: {} ({})", reason, cache.path().display())
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let _log_guard = init_logging(&config.logging);
    info!("Configuration loaded: {:?}", config);

    run(cli, config).map_err(|e| {
        error!("{:#}", e);
        e
    })
}
