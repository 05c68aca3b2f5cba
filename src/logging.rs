//! The [`DbLog`] façade and its fail-safe commit pipeline.
//!
//! Committing writes the serialized entry to the local trace sink, then
//! inserts it into the durable store. Any failure, including a panic inside a
//! sink, is reduced to [`COMMIT_FAILED`]; `commit` never propagates an error.
//! Nothing is retried.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::Context;

use crate::builder::{self, Anonymous, IdentityProvider, Payload, TitleSource};
use crate::config::DbLogConfig;
use crate::db::queries::NewLogRow;
use crate::entry::{serialize, LogEntry};
use crate::errors::{DbLogError, Result};
use crate::sink::{LogStore, LogTraceSink, SqliteLogStore, TraceSink};

/// Returned by [`DbLog::commit`] when the entry could not be persisted.
pub const COMMIT_FAILED: i64 = -1;

/// Outcome of a successful [`DbLog::try_commit`].
#[derive(Debug)]
pub struct CommitReceipt {
    /// Rows reported by the durable store.
    pub rows: usize,
    /// Set when the local trace write failed but persistence went ahead.
    pub trace_error: Option<DbLogError>,
}

/// Entry point for building and committing log entries on behalf of one
/// application. Cheap to clone; clones share the same sinks.
#[derive(Clone)]
pub struct DbLog {
    store: Arc<dyn LogStore>,
    trace: Arc<dyn TraceSink>,
    identity: Arc<dyn IdentityProvider>,
    environment: String,
    application: String,
}

impl DbLog {
    pub fn new(store: impl LogStore + 'static, config: &DbLogConfig) -> Self {
        Self {
            store: Arc::new(store),
            trace: Arc::new(LogTraceSink::new(config.trace_target.clone())),
            identity: Arc::new(Anonymous),
            environment: config.environment.clone(),
            application: config.application.clone(),
        }
    }

    /// Open the SQLite store in the configured workspace.
    pub fn open(config: &DbLogConfig) -> anyhow::Result<Self> {
        let workspace = config.resolve_workspace();
        let store = SqliteLogStore::open(workspace.clone())
            .with_context(|| format!("failed to open log store in {}", workspace.display()))?;
        Ok(Self::new(store, config))
    }

    pub fn with_trace_sink(mut self, trace: impl TraceSink + 'static) -> Self {
        self.trace = Arc::new(trace);
        self
    }

    pub fn with_identity(mut self, identity: impl IdentityProvider + 'static) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    pub fn store(&self) -> &dyn LogStore {
        self.store.as_ref()
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    /// Build an entry carrying this log's identity.
    pub fn build<'a>(
        &self,
        category: impl Into<Option<&'a str>>,
        title: impl Into<TitleSource>,
        payload: impl Into<Payload>,
    ) -> LogEntry {
        builder::build_as(self.identity.as_ref(), category, title, payload)
    }

    pub fn info(&self, title: impl Into<TitleSource>, payload: impl Into<Payload>) -> LogEntry {
        self.build(builder::INFO, title, payload)
    }

    pub fn status(&self, title: impl Into<TitleSource>, payload: impl Into<Payload>) -> LogEntry {
        self.build(builder::STATUS, title, payload)
    }

    pub fn error(&self, title: impl Into<TitleSource>, payload: impl Into<Payload>) -> LogEntry {
        self.build(builder::ERROR, title, payload)
    }

    /// Commit `entry` under `section`, returning the affected row count or
    /// [`COMMIT_FAILED`].
    pub fn commit(&self, entry: LogEntry, section: &str) -> i64 {
        match self.try_commit(entry, section) {
            Ok(receipt) => i64::try_from(receipt.rows).unwrap_or(i64::MAX),
            Err(err) => {
                let detail = format!("dblog commit failed [{}]: {err}", err.code());
                log::error!("{detail}");
                let _ = guarded(|| self.trace.write(&detail));
                COMMIT_FAILED
            }
        }
    }

    /// Like [`DbLog::commit`] but reports what went wrong. A trace sink
    /// failure alone does not fail the commit; it is returned in the receipt.
    pub fn try_commit(&self, entry: LogEntry, section: &str) -> Result<CommitReceipt> {
        let trace_error = match serialize(&entry) {
            Ok(text) => guarded(|| self.trace.write(&text)).err(),
            Err(err) => Some(err),
        };
        if let Some(err) = &trace_error {
            log::warn!("trace sink rejected '{}': {err}", entry.title());
        }

        let context = entry.context_json()?;
        let row = NewLogRow {
            environment: &self.environment,
            category: entry.category(),
            application: &self.application,
            section,
            title: entry.title(),
            body: entry.body(),
            context: &context,
        };
        let rows = guarded(|| self.store.insert(&row))?;
        log::debug!(
            "committed {} entry '{}' from {section} ({rows} row(s))",
            entry.category(),
            entry.title()
        );
        Ok(CommitReceipt { rows, trace_error })
    }

    /// Run [`DbLog::commit`] on the blocking pool so async callers do not
    /// stall their executor on database I/O.
    pub async fn commit_async(&self, entry: LogEntry, section: impl Into<String>) -> i64 {
        let log = self.clone();
        let section = section.into();
        tokio::task::spawn_blocking(move || log.commit(entry, &section))
            .await
            .unwrap_or(COMMIT_FAILED)
    }
}

/// Commit an entry under the name of the calling crate.
#[macro_export]
macro_rules! commit {
    ($log:expr, $entry:expr) => {
        $log.commit(
            $entry,
            $crate::logging::calling_crate(::std::module_path!()),
        )
    };
}

#[doc(hidden)]
pub fn calling_crate(module_path: &str) -> &str {
    module_path.split("::").next().unwrap_or(module_path)
}

fn guarded<T>(op: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(op))
        .unwrap_or_else(|payload| Err(DbLogError::SinkPanicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
