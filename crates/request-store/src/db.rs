use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::error::StoreResult;

/// Writers wait this long for the database lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS analyze_request (
    wallet_address TEXT PRIMARY KEY,
    count INTEGER,
    text TEXT NOT NULL,
    engagement TEXT NOT NULL,
    prompt TEXT NOT NULL
)";

/// Lazily connected SQLite pool with create-if-absent schema setup.
#[derive(Clone)]
pub struct StoreDb {
    pool: SqlitePool,
    schema_ready: Arc<OnceCell<()>>,
}

impl StoreDb {
    /// Build the pool without opening a connection. The first operation connects
    /// and creates the table.
    pub fn connect_lazy(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);

        // Every connection to `:memory:` is a separate database, so pin it to one
        // connection that never expires.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_lazy_with(options)
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_lazy_with(options.journal_mode(SqliteJournalMode::Wal))
        };

        Ok(Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        })
    }

    pub fn in_memory() -> StoreResult<Self> {
        Self::connect_lazy("sqlite::memory:")
    }

    /// Pool handle, after making sure the table exists.
    pub async fn pool(&self) -> StoreResult<&SqlitePool> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(SCHEMA).execute(&self.pool).await?;
                tracing::debug!("analyze_request table ready");
                Ok::<(), crate::StoreError>(())
            })
            .await?;
        Ok(&self.pool)
    }

    pub fn is_initialized(&self) -> bool {
        self.schema_ready.initialized()
    }
}
