use super::{BlockStore, StoreError};
use crate::{cache::BlockFact, config::StoreConfig};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::str::FromStr;
use tracing::{debug, info};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS stats (
    height INTEGER PRIMARY KEY NOT NULL,
    hash TEXT NOT NULL,
    epoch INTEGER NOT NULL,
    coins REAL NOT NULL DEFAULT 0,
    miningaddr TEXT NOT NULL DEFAULT ''
)";

const UPSERT: &str = "INSERT INTO stats (height, hash, epoch, coins, miningaddr)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT(height) DO UPDATE SET
        hash = excluded.hash,
        epoch = excluded.epoch,
        coins = excluded.coins,
        miningaddr = excluded.miningaddr";

/// `SQLite` implementation of [`BlockStore`] on the `stats` table.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Opens the database and ensures the `stats` table exists.
    ///
    /// In-memory databases are limited to a single connection that is never recycled,
    /// since every new connection would open a fresh empty database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the URL is invalid, the database cannot be
    /// opened or the schema cannot be created.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| StoreError::Unavailable(format!("invalid database url: {e}")))?
            .create_if_missing(config.create_if_missing);

        let in_memory = config.database_url.contains(":memory:");

        if !in_memory && config.create_if_missing {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StoreError::Unavailable(format!(
                            "cannot create directory {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let store = Self { pool };
        store.ensure_schema().await?;

        info!(in_memory, "block store connected");
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("schema creation failed: {e}")))?;
        Ok(())
    }

    /// Extracts a non-nullable field from a database row.
    fn get_required<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T, StoreError>
    where
        T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
    {
        row.try_get::<T, _>(column).map_err(|e| StoreError::Decode(format!("column '{column}': {e}")))
    }

    fn row_to_fact(row: &SqliteRow) -> Result<BlockFact, StoreError> {
        let height: i64 = Self::get_required(row, "height")?;
        let height = u64::try_from(height)
            .map_err(|_| StoreError::Decode(format!("negative height {height}")))?;

        Ok(BlockFact {
            height,
            hash: Self::get_required(row, "hash")?,
            epoch_time: Self::get_required(row, "epoch")?,
            coins: Self::get_required(row, "coins")?,
            miner_address: Self::get_required(row, "miningaddr")?,
        })
    }

    async fn height_aggregate(&self, query: &str) -> Result<Option<u64>, StoreError> {
        let value: Option<i64> = sqlx::query_scalar(query)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;

        value
            .map(|h| u64::try_from(h).map_err(|_| StoreError::Decode(format!("negative height {h}"))))
            .transpose()
    }
}

#[async_trait]
impl BlockStore for SqliteStore {
    async fn highest_height(&self) -> Result<Option<u64>, StoreError> {
        self.height_aggregate("SELECT MAX(height) FROM stats").await
    }

    async fn lowest_height(&self) -> Result<Option<u64>, StoreError> {
        self.height_aggregate("SELECT MIN(height) FROM stats").await
    }

    async fn load_all(&self) -> Result<Vec<BlockFact>, StoreError> {
        let mut rows = sqlx::query(
            "SELECT height, hash, epoch, coins, miningaddr FROM stats ORDER BY height ASC",
        )
        .fetch(&self.pool);

        let mut facts = Vec::new();
        while let Some(row) = rows.try_next().await.map_err(|e| StoreError::Read(e.to_string()))? {
            facts.push(Self::row_to_fact(&row)?);
        }

        debug!(count = facts.len(), "loaded stored block facts");
        Ok(facts)
    }

    async fn upsert(&self, fact: &BlockFact) -> Result<(), StoreError> {
        let height = i64::try_from(fact.height).map_err(|_| StoreError::Write {
            height: fact.height,
            reason: "height exceeds i64 range".to_string(),
        })?;

        sqlx::query(UPSERT)
            .bind(height)
            .bind(&fact.hash)
            .bind(fact.epoch_time)
            .bind(fact.coins)
            .bind(&fact.miner_address)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Write { height: fact.height, reason: e.to_string() })?;

        Ok(())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stats")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;

        u64::try_from(count).map_err(|e| StoreError::Decode(e.to_string()))
    }
}
