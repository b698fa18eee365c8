//! MediPay GOP - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin gop-api
//!
//! API_PORT=8080 API_DATABASE_URL=postgres://... API_MAIL_ENDPOINT=https://relay/send cargo run --bin gop-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` / `API_PORT` - Bind address (default: 0.0.0.0:8080)
//! * `API_JWT_SECRET` - Token signing secret (required in production)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_PUBLIC_BASE_URL` - Base of the links placed in payer emails
//! * `API_MAIL_ENDPOINT` - Mail relay; emails are only logged when unset
//! * `API_LOG_LEVEL` - Fallback filter when `RUST_LOG` is unset
//! * `LOG_FORMAT=json` - Structured JSON log lines

use std::net::SocketAddr;

use anyhow::Context;
use infra_db::{create_pool, run_migrations, DatabaseConfig};
use interface_api::{config::ApiConfig, create_router, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading API configuration")?;
    init_tracing(&config.log_level);

    tracing::info!(host = %config.host, port = config.port, "starting GOP API server");

    let pool = create_pool(DatabaseConfig::new(config.database_url.clone()))
        .await
        .context("connecting to the database")?;
    run_migrations(&pool).await.context("running migrations")?;

    let addr: SocketAddr = config.server_addr().parse().context("parsing bind address")?;
    let state = AppState::from_pool(pool, config).context("building application state")?;
    let app = create_router(state);

    tracing::info!(%addr, "server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{log_level},sqlx=warn,tower_http=debug")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).init();
    }
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
