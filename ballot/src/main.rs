//! Ballot Schema Installer
//!
//! Connects to PostgreSQL, applies the embedded `ballot_votes` migrations and
//! verifies the schema. Host tables that cache summaries add their own
//! `cached_ballot_summary JSONB NOT NULL DEFAULT '{}'` column.

use ballot::{BallotConfig, BallotError, LogFormat};
use ballot_repository::{PostgresVoteStore, VoteStore};
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ballot=info,ballot_repository=info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true),
                )
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
                .init();
        }
    }

    info!(
        service_name = "ballot",
        service_version = env!("CARGO_PKG_VERSION"),
        log_format = ?format,
        "Tracing initialized"
    );
}

async fn install(config: &BallotConfig) -> Result<(), BallotError> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| BallotError::config("DATABASE_URL must be set"))?;

    let store = PostgresVoteStore::connect(database_url, config.max_connections).await?;
    info!(max_connections = config.max_connections, "Connected to PostgreSQL");

    store.migrate().await?;

    if !store.check_schema().await? {
        return Err(BallotError::config("ballot_votes table missing after migration"));
    }
    info!("Schema verified");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BallotError> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = BallotConfig::from_env();
    init_tracing(config.log_format);

    info!("Installing ballot schema");

    match install(&config).await {
        Ok(()) => {
            info!("Ballot schema installed successfully");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Ballot schema installation failed");
            Err(e)
        }
    }
}
