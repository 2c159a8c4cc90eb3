use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use feedsync::feed::Snapshot;
use feedsync::{Config, Database, FeedService, HttpFeedParser, Scheduler, SqlFeedStore};

#[derive(Debug, Parser)]
#[command(name = "feedsync", version)]
#[command(about = "Keeps a local article store in sync with subscribed feeds")]
struct Cli {
    /// Configuration file (TOML); defaults are used if it does not exist
    #[arg(long, env = "FEEDSYNC_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Run one refetch cycle over all feeds and exit
    #[arg(long, conflicts_with = "import_snapshot")]
    once: bool,

    /// Import a JSON snapshot ({"articles": [...]}) and exit
    #[arg(long, value_name = "PATH")]
    import_snapshot: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    let warnings = config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = feedsync::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedsync::logging::init_console_only(&config.logging.level);
    }
    for warning in warnings {
        warn!("{}", warning);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config, cli: Cli) -> feedsync::Result<()> {
    info!("feedsync starting");

    let db = Arc::new(Database::open(&config.database.path).await?);
    let store = Arc::new(SqlFeedStore::new(db.clone()));
    let parser = Arc::new(HttpFeedParser::new(&config.fetcher)?);
    let service = FeedService::new(store, parser, config.refetch.fetch_timeout());

    if let Some(path) = cli.import_snapshot {
        let content = tokio::fs::read_to_string(&path).await?;
        let snapshot: Snapshot = serde_json::from_str(&content).map_err(|e| {
            feedsync::FeedSyncError::Validation(format!("invalid snapshot file: {e}"))
        })?;
        let result = service.import_snapshot(snapshot.articles).await?;
        info!(
            "Imported {}: {} inserted, {} skipped",
            path.display(),
            result.inserted,
            result.skipped
        );
    } else if cli.once {
        let summary = service.orchestrator().refetch_all().await?;
        info!(
            "Refetched {} feeds ({} failed): {} new articles",
            summary.feeds, summary.failed, summary.new_articles
        );
    } else {
        let orchestrator = Arc::new(service.orchestrator());
        let handle = Scheduler::from_config(orchestrator, &config.refetch)?.start()?;
        info!(
            "Refetch mechanism: {}. Press Ctrl-C to stop.",
            config.refetch.mechanism
        );

        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
        handle.shutdown().await;
    }

    db.close().await;
    Ok(())
}
