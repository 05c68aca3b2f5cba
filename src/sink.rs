//! Destinations a committed entry is written to.
//!
//! [`LogStore`] is the durable store, [`TraceSink`] the best-effort local
//! trace written before it.

use std::path::PathBuf;

use anyhow::Result as AnyResult;

use crate::db::queries::{self, LogRecord, NewLogRow};
use crate::db::{self, DbPool};
use crate::errors::Result;

/// Durable persistence for committed entries.
pub trait LogStore: Send + Sync {
    /// Persist one row and return the number of affected rows.
    fn insert(&self, row: &NewLogRow<'_>) -> Result<usize>;

    fn get_all(&self) -> Result<Vec<LogRecord>>;
}

/// Fire-and-forget local trace of every committed entry.
pub trait TraceSink: Send + Sync {
    fn write(&self, text: &str) -> Result<()>;
}

/// [`LogStore`] backed by the `dblog` SQLite table.
#[derive(Clone)]
pub struct SqliteLogStore {
    pool: DbPool,
}

impl SqliteLogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (or create) `dblog.db` inside `workspace_dir`.
    pub fn open(workspace_dir: PathBuf) -> AnyResult<Self> {
        Ok(Self::new(db::init_db(workspace_dir)?))
    }

    pub fn open_in_memory() -> AnyResult<Self> {
        Ok(Self::new(db::init_memory_db()?))
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    /// The newest `limit` rows.
    pub fn recent(&self, limit: usize) -> Result<Vec<LogRecord>> {
        let conn = self.pool.get()?;
        Ok(queries::recent(&conn, limit)?)
    }
}

impl LogStore for SqliteLogStore {
    fn insert(&self, row: &NewLogRow<'_>) -> Result<usize> {
        let conn = self.pool.get()?;
        Ok(queries::insert(&conn, row)?)
    }

    fn get_all(&self) -> Result<Vec<LogRecord>> {
        let conn = self.pool.get()?;
        Ok(queries::get_all(&conn)?)
    }
}

/// [`TraceSink`] that forwards entries to the `log` facade under a fixed
/// target. Whatever logger the application installed decides where they go.
#[derive(Debug, Clone)]
pub struct LogTraceSink {
    target: String,
}

impl LogTraceSink {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Default for LogTraceSink {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"))
    }
}

impl TraceSink for LogTraceSink {
    fn write(&self, text: &str) -> Result<()> {
        log::info!(target: self.target.as_str(), "{text}");
        Ok(())
    }
}
