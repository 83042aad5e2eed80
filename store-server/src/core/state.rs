use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::DbService;

/// Server state - shared by every handler
///
/// Cloning is cheap: the pool is internally reference counted.
///
/// | Field | Description |
/// |-------|-------------|
/// | config | Immutable configuration |
/// | pool | SQLite connection pool |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
}

impl ServerState {
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        Self { config, pool }
    }

    /// Initialize server state: work dir, database, migrations
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        config.ensure_work_dir()?;

        let db_path = config.database_path();
        let db_service = DbService::new(&db_path.to_string_lossy())
            .await
            .map_err(|e| anyhow::anyhow!("database init failed: {e}"))?;

        Ok(Self::new(config.clone(), db_service.pool))
    }
}
