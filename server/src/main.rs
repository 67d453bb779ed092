// ============================================================================
// whitelist-server: premint whitelist HTTP service
// ============================================================================
// Environment:
//   WHITELIST_ENV            development | test | production (default)
//   WHITELIST_BIND           listen address (default 127.0.0.1:3000)
//   WHITELIST_DB_PATH        redb file (default ~/.whitelist/whitelist.redb)
//   WHITELIST_SCHEDULE_PATH  tier schedule JSON (default: built-in schedule)
// ============================================================================

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use whitelist_core::{AppConfig, WhitelistDb, WhitelistService};
use whitelist_server::{start_server, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("whitelist_server=debug".parse()?)
                .add_directive("whitelist_core=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!("Environment: {}", config.environment);

    let schedule = config.load_schedule()?;
    info!("Public mint opens at {}", schedule.public.start);

    let db = WhitelistDb::open(config.db_path.as_deref())?;
    info!("Database: {}", db.path().display());

    let service = WhitelistService::new(Arc::new(db), Arc::new(schedule), config.environment);
    start_server(AppState::new(service), config.bind_addr).await?;

    Ok(())
}
