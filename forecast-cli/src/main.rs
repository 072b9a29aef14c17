use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use forecast_cli::app::{self, ErrorBody};
use forecast_cli::config::Config;
use forecast_cli::{logging, report};
use forecast_core::{ForecastRequest, ServiceError, TierCountRequest};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Property tax revenue forecast for the county assessment roll.
///
/// Loads the fixed-width assessment roll and appeals file once, then
/// answers forecast requests read from JSON files. Results are written to
/// stdout as JSON; logs go to stderr.
#[derive(Debug, Parser)]
#[command(name = "property-forecast", version, about)]
struct Cli {
    /// Configuration file. Defaults to `property-forecast.toml` in the
    /// working directory when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding `fullasmt25.txt` and `Appeals.csv`. Overrides the
    /// config file.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Forecast revenue for one policy.
    Forecast {
        /// JSON file with `policy`, `appeals` and `applyExemptionAverage`.
        #[arg(long)]
        request: PathBuf,

        /// Indent the JSON output.
        #[arg(long)]
        pretty: bool,
    },

    /// Forecast several policies concurrently against the same roll.
    Batch {
        /// Request files; results are written as a JSON array in this order.
        #[arg(long = "request", required = true)]
        requests: Vec<PathBuf>,

        #[arg(long)]
        pretty: bool,
    },

    /// Count parcels per tier for a policy that keeps the published tier edges.
    TierCounts {
        #[arg(long)]
        request: PathBuf,

        #[arg(long)]
        pretty: bool,
    },

    /// Print the default (FY 2025) policy.
    DefaultPolicy {
        #[arg(long)]
        pretty: bool,
    },

    /// Print loaded appeal amounts and estimated exemptions per class.
    Exemptions {
        #[arg(long)]
        pretty: bool,
    },

    /// Print how parcels flagged with multiple land classes are billed, with
    /// the flag counts from the parcel and land-class files.
    MulticlassBehavior {
        #[arg(long)]
        pretty: bool,
    },

    /// Forecast one policy and print a human-readable table.
    Summary {
        #[arg(long)]
        request: PathBuf,
    },
}

// ─── helpers ─────────────────────────────────────────────────────────────────

/// Reports a service failure as a JSON error body on stdout and returns it
/// as the command's error.
fn report_failure(
    error: ServiceError,
    pretty: bool,
) -> Result<()> {
    app::write_json(io::stdout().lock(), &ErrorBody::from(&error), pretty)?;
    Err(error).context("request failed")
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    logging::init_logging(&config.log_level, config.log_dir.as_deref())?;
    debug!(?config, "configuration loaded");

    let service = app::build_service(&config)?;
    let out = || io::stdout().lock();

    match cli.command {
        Command::Forecast { request, pretty } => {
            let request: ForecastRequest = app::read_request(&request)?;
            match service.forecast(&request) {
                Ok(response) => app::write_json(out(), &response, pretty),
                Err(e) => report_failure(e, pretty),
            }
        }
        Command::Batch { requests, pretty } => {
            let requests = requests
                .iter()
                .map(|path| app::read_request::<ForecastRequest>(path))
                .collect::<Result<Vec<_>>>()?;
            let outcomes = app::run_batch(Arc::new(service), requests).await?;
            app::write_json(out(), &outcomes, pretty)
        }
        Command::TierCounts { request, pretty } => {
            let request: TierCountRequest = app::read_request(&request)?;
            match service.tier_counts(&request) {
                Ok(response) => app::write_json(out(), &response, pretty),
                Err(e) => report_failure(e, pretty),
            }
        }
        Command::DefaultPolicy { pretty } => {
            app::write_json(out(), &service.default_policy(), pretty)
        }
        Command::Exemptions { pretty } => match service.appeals_and_exemptions() {
            Ok(summary) => app::write_json(out(), &summary, pretty),
            Err(e) => report_failure(e, pretty),
        },
        Command::MulticlassBehavior { pretty } => {
            app::write_json(out(), &service.multiclass_behavior(), pretty)
        }
        Command::Summary { request } => {
            let request: ForecastRequest = app::read_request(&request)?;
            match service.forecast(&request) {
                Ok(response) => {
                    print!("{}", report::render_summary(&response));
                    Ok(())
                }
                Err(e) => report_failure(e, false),
            }
        }
    }
}
