//! SQLite connection handling for the persisted result store.
//!
//! The store is a single file accessed through a small [`sqlx`] pool.
//! WAL journaling is always on; writers are serialized by SQLite's own
//! locking, and the bulk loader additionally relaxes `PRAGMA synchronous`
//! for the duration of a load (see the loader module). All queries use
//! runtime construction, not compile-time checking, so no live database
//! is needed at build time.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::error::DbError;
use crate::schema;

/// Default maximum number of connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Default connection acquire timeout in seconds.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Default busy timeout before a locked database read/write gives up.
const DEFAULT_BUSY_TIMEOUT_SECS: u64 = 30;

/// Configuration for the SQLite-backed result store.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path of the database file; `None` means a private in-memory store.
    pub path: Option<PathBuf>,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Pool acquire timeout.
    pub acquire_timeout: Duration,
    /// How long a connection waits on a locked database.
    pub busy_timeout: Duration,
}

impl SqliteConfig {
    /// Configuration for a file-backed store, created if missing.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
        }
    }

    /// Configuration for an in-memory store (tests, scratch work).
    ///
    /// In-memory SQLite databases are per-connection, so the pool is
    /// pinned to a single connection.
    pub fn memory() -> Self {
        Self {
            path: None,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            busy_timeout: Duration::from_secs(DEFAULT_BUSY_TIMEOUT_SECS),
        }
    }

    /// Set the maximum number of pooled connections.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the pool acquire timeout.
    #[must_use]
    pub const fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Handle to an open result store.
///
/// Wraps a [`SqlitePool`] and owns schema bootstrap and whole-store
/// reset. The loader, catalog, and query engine all borrow the pool from
/// here.
#[derive(Clone)]
pub struct ResultDb {
    pool: SqlitePool,
}

impl ResultDb {
    /// Open (creating if necessary) a result store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if the connection fails.
    pub async fn open(config: &SqliteConfig) -> Result<Self, DbError> {
        let options = match &config.path {
            Some(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true),
            None => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::Config(format!("invalid memory DSN: {e}")))?,
        }
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(config.busy_timeout)
        .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        schema::init(&pool).await?;
        tracing::info!(
            max_connections = config.max_connections,
            file = config.path.is_some(),
            "Opened result store"
        );
        Ok(Self { pool })
    }

    /// The underlying connection pool.
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wipe the whole store: every recipe's result tables plus all grids,
    /// sensors, and sources. This is the only destructive operation the
    /// store supports -- individual rows are never deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlite`] if any drop or delete fails.
    pub async fn reset(&self) -> Result<(), DbError> {
        schema::reset(&self.pool).await?;
        tracing::info!("Reset result store");
        Ok(())
    }

    /// Close the pool, flushing outstanding writes.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
