//! Ratchet CLI - Command-line interface for progressive claim assurance.

use clap::Parser;
use ratchet_assurance::{AssuranceEngine, AssuranceMetrics, LogNotifier, NotificationDispatcher};
use ratchet_cli::commands::{self, Session};
use ratchet_cli::{CliError, Cli, Command, Config, Formatter};
use ratchet_domain::ActorRef;
use ratchet_store::SqliteStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize tracing (log to stderr so stdout stays parseable)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("RATCHET_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run() -> ratchet_cli::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load config from the given path or ~/.ratchet/config.toml
    let config = match &cli.config {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load()?,
    };

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    let actor = cli
        .actor
        .clone()
        .or_else(|| config.default_actor.clone())
        .map(|a| ActorRef::new(a.as_str()).map_err(CliError::InvalidInput))
        .transpose()?;

    let database = cli.db.map(PathBuf::from).unwrap_or(config.database);
    if let Some(parent) = database.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    debug!(database = %database.display(), "Opening store");
    let store = Arc::new(SqliteStore::new(&database)?);

    let metrics = Arc::new(AssuranceMetrics::new());
    let (notifications, worker) = NotificationDispatcher::spawn(
        LogNotifier,
        config.assurance.notification_queue_capacity,
        Arc::clone(&metrics),
    );
    let engine = AssuranceEngine::new(store, config.assurance)
        .with_metrics(Arc::clone(&metrics))
        .with_notifications(notifications);
    let session = Session::new(engine, actor);

    let result = match cli.command {
        Command::Claim(cmd) => commands::execute_claim(cmd, &session, &formatter),
        Command::Evidence(cmd) => commands::execute_evidence(cmd, &session, &formatter),
        Command::Review(cmd) => commands::execute_review(cmd, &session, &formatter),
        Command::Ledger(cmd) => commands::execute_ledger(cmd, &session, &formatter),
        Command::Graph(args) => commands::execute_graph(args, &session, &formatter),
    };

    // Dropping the engine closes the queue; wait for pending notices
    drop(session);
    if let Err(e) = worker.await {
        debug!(error = %e, "Notification worker ended abnormally");
    }
    debug!(metrics = %metrics.snapshot().summary(), "Session finished");

    result
}
