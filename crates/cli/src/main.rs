//! `board-automation` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`: start the API server and the event worker.
//! - `migrate`: run pending database migrations.
//! - `validate`: validate a rule definition JSON file.
//! - `templates`: print the built-in rule template catalog.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use api::{AppState, Backends, Stores};
use board::http::HttpBoardClient;
use board::mock::MemoryBoard;
use clap::{Args, Parser, Subcommand};
use db::SecretCipher;
use engine::{EngineConfig, ReqwestSender, RuleDraft, TemplateLibrary};
use queue::QueueConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "board-automation",
    about = "Automation rules and inbound webhooks for Kanban boards",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server and the background event worker.
    Serve(ServeArgs),
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate a rule definition JSON file.
    Validate {
        /// Path to the rule JSON file (same shape as the create-rule body).
        path: PathBuf,
    },
    /// Print the built-in template catalog as JSON.
    Templates,
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,
    /// Postgres URL.  Rules, logs and webhooks are kept in memory without it.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    database_max_connections: u32,
    /// 32-byte AES key (hex or base64) for webhook secrets at rest.
    #[arg(long, env = "WEBHOOK_SECRET_KEY", hide_env_values = true)]
    webhook_secret_key: Option<String>,
    /// Board application API.  An in-memory board is used without it.
    #[arg(long, env = "BOARD_API_URL")]
    board_api_url: Option<String>,
    #[arg(long, env = "BOARD_API_TOKEN", hide_env_values = true)]
    board_api_token: Option<String>,
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://localhost:8080")]
    public_base_url: String,
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = 1024)]
    queue_capacity: usize,
    #[arg(long, env = "MAX_IN_FLIGHT_EVENTS", default_value_t = 64)]
    max_in_flight_events: usize,
    #[arg(long, env = "OUTBOUND_TIMEOUT_SECS", default_value_t = 10)]
    outbound_timeout_secs: u64,
    /// Take the caller IP from `X-Forwarded-For`.  Only behind a trusted proxy.
    #[arg(long, env = "TRUST_FORWARDED_FOR")]
    trust_forwarded_for: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Serve(args) => serve(args).await,
        Command::Migrate { database_url } => {
            let pool = db::create_pool(&database_url, 2)
                .await
                .context("failed to connect to database")?;
            db::run_migrations(&pool).await.context("migration failed")?;
            info!("migrations applied");
            Ok(())
        }
        Command::Validate { path } => validate(&path),
        Command::Templates => {
            let catalog = TemplateLibrary::new().list();
            println!("{}", serde_json::to_string_pretty(&catalog)?);
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.outbound_timeout_secs);

    let stores = match &args.database_url {
        Some(url) => {
            let Some(key) = &args.webhook_secret_key else {
                bail!("WEBHOOK_SECRET_KEY is required when DATABASE_URL is set");
            };
            let cipher = SecretCipher::from_key_str(key).context("invalid WEBHOOK_SECRET_KEY")?;
            let pool = db::create_pool(url, args.database_max_connections)
                .await
                .context("failed to connect to database")?;
            db::run_migrations(&pool).await.context("migration failed")?;
            Stores::postgres(pool, cipher)
        }
        None => {
            warn!("DATABASE_URL not set; rules and webhooks are kept in memory");
            Stores::memory()
        }
    };

    let backends = match &args.board_api_url {
        Some(url) => {
            let client = Arc::new(HttpBoardClient::new(
                url.as_str(),
                args.board_api_token.clone(),
                timeout,
            )?);
            Backends {
                board: client.clone(),
                notifier: client,
                sender: Arc::new(ReqwestSender::new(timeout)?),
            }
        }
        None => {
            warn!("BOARD_API_URL not set; using an in-memory board");
            let board = Arc::new(MemoryBoard::new());
            Backends {
                board: board.clone(),
                notifier: board,
                sender: Arc::new(ReqwestSender::new(timeout)?),
            }
        }
    };

    let config = EngineConfig {
        public_base_url: args.public_base_url,
        outbound_timeout: timeout,
        ..EngineConfig::default()
    };
    let queue = QueueConfig {
        capacity: args.queue_capacity,
        max_in_flight: args.max_in_flight_events,
    };

    let (state, worker) = AppState::build(stores, backends, config, queue, args.trust_forwarded_for);
    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;

    api::serve(listener, state, shutdown_signal()).await?;

    info!("server stopped; draining queued events");
    worker.join().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn validate(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    let draft: RuleDraft = serde_json::from_str(&content).context("invalid rule JSON")?;

    let rule = draft.into_rule("local");
    match engine::validation::validate_rule(&rule) {
        Ok(()) => {
            println!(
                "rule '{}' is valid: {} trigger, {} condition(s), {} action(s)",
                rule.name,
                rule.trigger_type,
                rule.conditions.len(),
                rule.actions.len()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("validation failed: {e}");
            std::process::exit(1);
        }
    }
}
