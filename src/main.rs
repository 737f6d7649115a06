//! # ReportFlow: Scheduled Report Service
//!
//! Polls for due report schedules, pulls store data from the Admin GraphQL
//! API, generates CSV artifacts, and emails them to recipients.
//!
//! Usage:
//!   reportflow serve                          # Start poller + gateway
//!   reportflow run --schedule <id> --shop <s> # Execute one schedule now
//!   reportflow verify-smtp                    # Test the SMTP configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use reportflow_core::ReportFlowConfig;
use reportflow_delivery::SmtpMailer;
use reportflow_gateway::AppState;
use reportflow_scheduler::{Executor, ReportScheduler};
use reportflow_shopify::StoreCredentials;
use reportflow_store::Store;

#[derive(Parser)]
#[command(
    name = "reportflow",
    version,
    about = "📊 ReportFlow - scheduled analytics reports for commerce stores"
)]
struct Cli {
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the due-schedule poller and the control-surface gateway.
    Serve {
        /// Override the gateway port from config
        #[arg(long)]
        port: Option<u16>,
    },
    /// Execute one schedule immediately and print the outcome.
    Run {
        /// Schedule identifier
        #[arg(long)]
        schedule: String,
        /// Owning shop domain
        #[arg(long)]
        shop: String,
    },
    /// Probe the configured SMTP server without sending mail.
    VerifySmtp,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "reportflow=debug,tower_http=debug"
    } else {
        "reportflow=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = ReportFlowConfig::load().context("loading configuration")?;

    match cli.command {
        Command::Serve { port } => serve(config, port).await,
        Command::Run { schedule, shop } => run_once(config, &schedule, &shop).await,
        Command::VerifySmtp => verify_smtp(config).await,
    }
}

async fn serve(config: ReportFlowConfig, port_override: Option<u16>) -> Result<()> {
    let store = Arc::new(Store::open(Path::new(&config.storage.db_path)).context("opening store")?);
    let executor = Arc::new(Executor::new(
        store.clone(),
        Arc::new(StoreCredentials::new(store.clone())),
        Arc::new(SmtpMailer::new(config.smtp.clone())),
        &config,
    ));
    let scheduler = ReportScheduler::new(
        store.clone(),
        executor.clone(),
        Duration::from_secs(config.scheduler.poll_interval_secs),
    );
    scheduler.start();

    let port = port_override.unwrap_or(config.gateway.port);
    let state = AppState {
        store,
        executor,
        scheduler,
    };
    reportflow_gateway::serve(state, &config.gateway.bind, port)
        .await
        .context("gateway server")?;
    Ok(())
}

async fn run_once(config: ReportFlowConfig, schedule_id: &str, shop: &str) -> Result<()> {
    let store = Arc::new(Store::open(Path::new(&config.storage.db_path)).context("opening store")?);
    let executor = Executor::new(
        store.clone(),
        Arc::new(StoreCredentials::new(store.clone())),
        Arc::new(SmtpMailer::new(config.smtp.clone())),
        &config,
    );

    let summary = executor.execute(schedule_id, shop).await?;
    if summary.success {
        tracing::info!(
            "✅ Execution {} succeeded: {} record(s), {} email(s) sent",
            summary.execution_id,
            summary.record_count,
            summary.emails_sent
        );
    } else {
        tracing::error!(
            "💥 Execution {} failed: {}",
            summary.execution_id,
            summary.error.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }
    Ok(())
}

async fn verify_smtp(config: ReportFlowConfig) -> Result<()> {
    let mailer = SmtpMailer::new(config.smtp.clone());
    mailer.verify().await.context("SMTP verification")?;
    tracing::info!("✅ SMTP connection to {}:{} OK", config.smtp.host, config.smtp.port);
    Ok(())
}
