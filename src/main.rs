use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use folio_desk::app::{app, AppState};
use folio_desk::config::config;
use folio_desk::database::{DatabaseManager, Gateway, MemoryGateway, NotifyingGateway, PgGateway};
use folio_desk::is_production;
use folio_desk::realtime::ChangeNotifier;
use folio_desk::services::contact_email::sender_from_config;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Store {
    Postgres,
    Memory,
}

#[derive(Debug, Parser)]
#[command(name = "folio-desk", version, about = "Portfolio site and project dashboard API")]
struct Cli {
    /// Port to listen on (defaults to FOLIO_PORT / PORT / 3000)
    #[arg(long)]
    port: Option<u16>,

    /// Backing store; `memory` keeps everything in process
    #[arg(long, value_enum, default_value = "postgres")]
    store: Store,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let cli = Cli::parse();
    let config = config();
    tracing::info!("Starting folio-desk in {:?} mode", config.environment);
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    let notifier = ChangeNotifier::new(config.realtime.channel_capacity);
    let gateway: Arc<dyn Gateway> = match cli.store {
        Store::Postgres => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to PostgreSQL")?;
            Arc::new(NotifyingGateway::new(PgGateway::new(pool), notifier.clone()))
        }
        Store::Memory => {
            if is_production!() {
                tracing::warn!("running production config against the in-memory store");
            }
            Arc::new(NotifyingGateway::new(MemoryGateway::new(), notifier.clone()))
        }
    };

    let state = AppState::new(gateway, notifier.clone(), config, sender_from_config(&config.email));
    let mailer = state.mailer.clone().spawn(&notifier);
    let router = app(state, config);

    let port = cli.port.unwrap_or(config.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("folio-desk listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    mailer.abort();
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
