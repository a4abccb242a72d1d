use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use sitewatch::config::MonitorConfig;
use sitewatch::event_log::EventLog;
use sitewatch::monitor::{RunSummary, WebsiteMonitor};
use sitewatch::probe::HttpProber;
use sitewatch::report;

#[derive(Parser, Debug)]
#[command(
    name = "sitewatch",
    version,
    about = "Website availability monitor and daily uptime report"
)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the event log path
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the configured sites and record availability changes
    Monitor {
        /// Seconds per full pass over all sites
        #[arg(long)]
        period: Option<f64>,
        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Build the availability report for one day from the event log
    Report {
        /// Day to report on (YYYY-MM-DD), today by default
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Print rows as JSON instead of writing the CSV file
        #[arg(long)]
        json: bool,
    },
    /// Monitor for the configured duration, then report on today
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = MonitorConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    if let Some(log_file) = cli.log_file {
        config.log_file = log_file;
    }

    match cli.command {
        Command::Monitor { period, duration } => {
            if let Some(period) = period {
                config.period_seconds = period;
            }
            if let Some(duration) = duration {
                config.run_duration_seconds = duration;
            }
            config.validate()?;
            monitor(&config).await?;
        }
        Command::Report { date, json } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            write_report(&config, date, json).await?;
        }
        Command::Run => {
            let summary = monitor(&config).await?;
            if summary.cancelled {
                info!("monitoring interrupted, writing report for data collected so far");
            }
            write_report(&config, Local::now().date_naive(), false).await?;
        }
    }
    Ok(())
}

async fn monitor(config: &MonitorConfig) -> Result<RunSummary> {
    let prober = HttpProber::new(config.probe_timeout()).context("Failed to build HTTP client")?;
    let mut monitor = WebsiteMonitor::new(prober, EventLog::new(&config.log_file));
    for site in &config.sites {
        monitor.add_website(site.clone());
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, stopping monitor...");
            on_signal.cancel();
        }
    });

    info!(log = %config.log_file.display(), "recording transitions");
    monitor
        .run(config.period(), config.run_duration(), &cancel)
        .await
        .inspect_err(|e| error!("Monitor stopped: {}", e))
        .context("Monitoring failed")
}

async fn write_report(config: &MonitorConfig, date: NaiveDate, json: bool) -> Result<()> {
    let rows = report::generate(&config.log_file, date, &config.sites)
        .await
        .context("Failed to read event log")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", report::render_table(&rows));
    let path = report::write_csv(&rows, &config.report_dir, date)?;
    info!(report = %path.display(), log = %config.log_file.display(), "report saved");
    Ok(())
}
