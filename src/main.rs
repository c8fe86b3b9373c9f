use clap::Parser;
use std::sync::Arc;

use medipill::audit::{AuditLog, PgAuditLog, TracingAuditLog};
use medipill::cache::{Cache, MemoryCache, RedisCache, TimedCache};
use medipill::config::AppConfig;
use medipill::db::{Database, init_schema};
use medipill::gateway::{self, state::AppState};
use medipill::store::{MemoryStore, PgStore};

#[derive(Parser, Debug)]
#[command(name = "medipill", version, about = "Medication schedule tracking API")]
struct Cli {
    /// Configuration environment, loads config/{env}.yaml
    #[arg(short, long, env = "APP_ENV", default_value = "dev")]
    env: String,

    /// Override the listen port from the config file
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.env)?;
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }
    let _log_guard = medipill::logging::init_logging(&config);

    tracing::info!(
        "Starting medipill {} ({}) in {} mode",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        cli.env
    );

    let cache: Arc<dyn Cache> = match config.redis_url.as_deref() {
        Some(url) => {
            let redis = RedisCache::connect(url, config.timeouts.cache()).await?;
            Arc::new(TimedCache::new(redis, config.timeouts.cache()))
        }
        None => {
            tracing::warn!("No redis_url configured, lockout and revocation state is process-local");
            Arc::new(MemoryCache::new())
        }
    };

    let state = match config.postgres_url.as_deref() {
        Some(url) => {
            let db = Database::connect(url, config.timeouts.store()).await?;
            init_schema(db.pool()).await?;
            let store = Arc::new(PgStore::new(db.pool().clone(), config.timeouts.store()));
            let audit: Arc<dyn AuditLog> = Arc::new(PgAuditLog::new(db.pool().clone()));
            AppState::new(store, cache, audit, &config.auth)
        }
        None => {
            tracing::warn!("No postgres_url configured, users and medications are kept in memory");
            let audit: Arc<dyn AuditLog> = Arc::new(TracingAuditLog);
            AppState::new(Arc::new(MemoryStore::new()), cache, audit, &config.auth)
        }
    };

    gateway::run_server(
        &config.gateway.host,
        config.gateway.port,
        &config.gateway.cors_origin,
        Arc::new(state),
    )
    .await
}
