//! Pooled SQLite handle owning the note database file.
//!
//! Every file-backed connection handed out by the pool runs in WAL mode with a busy
//! timeout, so readers never block the single writer and short write
//! contention waits instead of failing immediately.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::time::Duration;

use super::error::NoteResult;
use super::schema::{self, SchemaOutcome};
use crate::config::PoolConfig;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Point-in-time view of the pool, for health reporting
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct PoolStatus {
    pub connections: u32,
    pub idle_connections: u32,
    pub max_size: u32,
}

pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open (or create) the database with the default pool settings.
    pub fn new(database_url: &str) -> NoteResult<Self> {
        Self::with_config(database_url, &PoolConfig::default())
    }

    /// Open (or create) the database and make sure the schema is in place.
    ///
    /// `":memory:"` opens a private in-memory database. It lives on a single
    /// pooled connection that is never retired, so callers queue for it
    /// instead of hitting table locks between connections.
    pub fn with_config(database_url: &str, config: &PoolConfig) -> NoteResult<Self> {
        let busy_timeout = config.busy_timeout;
        let in_memory = database_url == ":memory:";
        let manager = if in_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(database_url)
        }
        .with_init(move |conn| configure_connection(conn, busy_timeout));

        let builder = Pool::builder().connection_timeout(config.connection_timeout);
        let builder = if in_memory {
            builder.max_size(1).min_idle(Some(1)).max_lifetime(None).idle_timeout(None)
        } else {
            builder
                .max_size(config.max_size)
                .min_idle(Some(config.min_idle))
                .max_lifetime(Some(config.max_lifetime))
                .idle_timeout(Some(config.idle_timeout))
        };
        let pool = builder.build(manager)?;

        log::info!(
            "SQLite pool ready (max {} connections)",
            pool.max_size()
        );

        let db = Self { pool };
        db.ensure_schema()?;
        Ok(db)
    }

    /// Check out a connection, waiting up to the configured timeout.
    pub fn conn(&self) -> NoteResult<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Create any missing schema objects. Called on open; safe to repeat.
    pub fn ensure_schema(&self) -> NoteResult<SchemaOutcome> {
        let mut conn = self.conn()?;
        schema::ensure_schema(&mut conn)
    }

    pub fn pool_status(&self) -> PoolStatus {
        let state = self.pool.state();
        PoolStatus {
            connections: state.connections,
            idle_connections: state.idle_connections,
            max_size: self.pool.max_size(),
        }
    }
}

fn configure_connection(conn: &mut rusqlite::Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )
}
