//! Sanction Workflow - API Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin sanction-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin sanction-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_WORKFLOW_FILE` - Workflow step definitions (default: config/workflow.toml)
//! * `API_ALLOCATOR_ROLE` - Role allowed to allocate requests (default: CUSTOMER_ADMIN)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_workflow::{RoleName, SanctionEngine};
use infra_db::{create_pool, run_migrations, sync_registry, DatabaseConfig, PostgresClaimAdapter, PostgresSanctionStore};
use interface_api::config::{load_workflow_registry, ApiConfig};
use interface_api::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading API configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        workflow_file = %config.workflow_file,
        "Starting sanction workflow API server"
    );

    let registry = Arc::new(
        load_workflow_registry(&config.workflow_file)
            .with_context(|| format!("loading workflow steps from {}", config.workflow_file))?,
    );
    tracing::info!(steps = registry.len(), "Workflow steps loaded");

    let pool = create_pool(DatabaseConfig::new(config.database_url.clone())).await?;
    run_migrations(&pool).await?;
    sync_registry(&pool, &registry).await?;

    let engine = SanctionEngine::new(
        registry,
        Arc::new(PostgresSanctionStore::new(pool.clone())),
        Arc::new(PostgresClaimAdapter::new(pool)),
        RoleName::new(config.allocator_role.as_str()),
    );

    let app = create_router(engine, config.clone());

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber; `RUST_LOG` overrides `log_level`
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for Ctrl+C or SIGTERM so in-flight requests can complete
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
