//! Command-line entry point for the matchplay client
//!
//! Runs a single matchmaking attempt against the in-process matchmaker and prints
//! the result as JSON. Ctrl+C or the optional give-up timer cancel the attempt,
//! which withdraws the ticket before exiting.

use anyhow::{anyhow, Result};
use clap::Parser;
use matchplay_client::config::AppConfig;
use matchplay_client::metrics::MetricsCollector;
use matchplay_client::ticket::SimulatedTicketService;
use matchplay_client::utils::{current_timestamp, generate_player_id};
use matchplay_client::{MatchOrchestrator, MatchRequest, MatchResult};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, error, info, warn};

/// Matchplay Client - request a game server through a matchmaking ticket
#[derive(Parser)]
#[command(
    name = "matchplay-client",
    version,
    about = "Create a matchmaking ticket and wait for a game server assignment",
    long_about = "Matchplay Client submits a matchmaking ticket for one player, polls it until \
                 the matchmaker assigns a server or reports a failure, and prints the resulting \
                 connection endpoint. Press Ctrl+C to cancel and withdraw the ticket."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Player identifier
    #[arg(long, value_name = "ID", help = "Player id (random when omitted)")]
    player_id: Option<String>,

    /// Queue to matchmake in
    #[arg(short, long, value_name = "QUEUE", default_value = "casual-queue")]
    queue: String,

    /// Ticket attributes
    #[arg(
        long = "attr",
        value_name = "KEY=VALUE",
        help = "Ticket attribute, repeatable; values are parsed as JSON when possible"
    )]
    attributes: Vec<String>,

    /// Poll interval override
    #[arg(long, value_name = "MS", help = "Override delay between ticket polls")]
    poll_interval_ms: Option<u64>,

    /// Give-up timeout override
    #[arg(
        long,
        value_name = "SECS",
        help = "Cancel matchmaking after this many seconds"
    )]
    give_up_after: Option<u64>,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without matchmaking")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from file/environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(config_path) => AppConfig::from_file(config_path)?,
        None => AppConfig::from_env()?,
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if args.debug {
        config.service.log_level = "debug".to_string();
    }
    if let Some(interval) = args.poll_interval_ms {
        config.matchmaker.poll_interval_ms = interval;
    }
    if let Some(give_up) = args.give_up_after {
        config.matchmaker.give_up_after_seconds = Some(give_up);
    }

    matchplay_client::config::validate_config(&config)?;
    Ok(config)
}

/// Build the match request from CLI arguments
fn build_request(args: &Args) -> Result<MatchRequest> {
    let player_id = args.player_id.clone().unwrap_or_else(generate_player_id);
    let mut request = MatchRequest::new(player_id, args.queue.clone());

    for attribute in &args.attributes {
        let (key, raw) = attribute
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid attribute '{}', expected KEY=VALUE", attribute))?;
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        request = request.with_ticket_attribute(key.trim(), value);
    }

    request.validate()?;
    Ok(request)
}

/// Wait for Ctrl+C or the give-up timer, whichever fires first
async fn wait_for_cancellation(config: &AppConfig) {
    let give_up = async {
        match config.give_up_after() {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(give_up);

    tokio::select! {
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received Ctrl+C, cancelling matchmaking"),
                Err(e) => {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                    (&mut give_up).await;
                    info!("Gave up waiting for a match, cancelling matchmaking");
                }
            }
        },
        _ = &mut give_up => {
            info!("Gave up waiting for a match, cancelling matchmaking");
        },
    }
}

fn print_result(result: &MatchResult) -> Result<()> {
    let report = serde_json::json!({
        "result": result,
        "endpoint": result.endpoint(),
        "finished_at": current_timestamp(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let request = build_request(&args).unwrap_or_else(|e| {
        error!("Invalid match request: {}", e);
        std::process::exit(2);
    });

    info!(
        "{} v{} - player: '{}', queue: '{}', poll interval: {}ms",
        config.service.name,
        matchplay_client::VERSION,
        request.player_id,
        request.queue_name,
        config.matchmaker.poll_interval_ms
    );

    if args.dry_run {
        info!("Dry run completed - configuration and request are valid");
        return Ok(());
    }

    let ticket_service = Arc::new(SimulatedTicketService::new(config.simulation_config()?));
    let metrics = Arc::new(MetricsCollector::new()?);
    let orchestrator = Arc::new(
        MatchOrchestrator::new(ticket_service, config.orchestrator_config())
            .with_metrics(metrics.clone()),
    );

    let attempt = {
        let orchestrator = orchestrator.clone();
        let request = request.clone();
        tokio::spawn(async move { orchestrator.matchmake(&request).await })
    };
    tokio::pin!(attempt);

    let result = tokio::select! {
        joined = &mut attempt => joined?,
        _ = wait_for_cancellation(&config) => {
            orchestrator.cancel().await;
            attempt.await?
        }
    };

    debug!("Metrics:\n{}", metrics.render()?);
    print_result(&result)?;

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
