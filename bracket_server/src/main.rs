//! Single-elimination bracket server.
//!
//! Serves the bracket engine over HTTP, backed by PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use bracket_engine::BracketManager;
use bracket_engine::auth::TokenVerifier;
use bracket_engine::db::{Database, PgBracketRepository};
use bracket_server::{api, config::ServerConfig, logging, metrics};
use pico_args::Arguments;
use std::time::Duration;
use tracing::info;

const HELP: &str = "\
Run the single-elimination bracket server

USAGE:
  bracket_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url        URL      Database connection string  [default: env DATABASE_URL or postgres://postgres@localhost/brackets_db]
  --metrics-bind  IP:PORT  Prometheus scrape address   [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               Secret of the token-issuing service (required, >= 32 chars)
  DB_MAX_CONNECTIONS       Pool size                   [default: 20]
  DB_OPERATION_TIMEOUT     Per-operation timeout, secs [default: 10]
  RUST_LOG                 Log filter                  [default: info,sqlx=warn,hyper=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let metrics_bind: Option<SocketAddr> = pargs.opt_value_from_str("--metrics-bind")?;

    let config = ServerConfig::from_env(bind, database_url, metrics_bind)?;

    logging::init();
    info!("Starting bracket server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exposed at http://{}/metrics", addr);
    }

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    info!("Database connected and migrated");

    let repository = PgBracketRepository::new(db.pool().clone()).with_operation_timeout(
        Duration::from_secs(config.database.operation_timeout_secs),
    );

    let api_state = api::AppState {
        bracket_manager: Arc::new(BracketManager::new(Arc::new(repository))),
        token_verifier: Arc::new(TokenVerifier::new(&config.security.jwt_secret)),
    };

    let app = api::create_router(api_state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
