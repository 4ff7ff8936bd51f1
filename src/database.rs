use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{migrate::MigrateDatabase, SqlitePool};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::store::StoreError;

/// Connection pool plus schema management for the SQLite back-end
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Open (creating if needed) the database, optionally running migrations
    pub async fn new(database_url: &str, max_connections: u32, auto_migrate: bool) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:");

        if !in_memory && !sqlx::Sqlite::database_exists(database_url).await? {
            info!("Creating database at {}", database_url);
            sqlx::Sqlite::create_database(database_url).await?;
        }

        // Every pooled connection to `:memory:` would see its own empty database
        let max_connections = if in_memory { 1 } else { max_connections.max(1) };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        if auto_migrate {
            info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(sqlx::Error::from)?;
            info!("Database migrations completed");
        }

        Ok(Self { pool })
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, StoreError> {
        Self::new(&config.url, config.max_connections, config.auto_migrate).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close database connections gracefully
    pub async fn shutdown(&self) {
        info!("Shutting down database connections...");
        self.pool.close().await;
        info!("Database connections closed");
    }
}
