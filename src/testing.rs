//! Stub sinks shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::DbLogConfig;
use crate::db::queries::{LogRecord, NewLogRow};
use crate::errors::{DbLogError, Result};
use crate::sink::{LogStore, TraceSink};

pub fn test_config() -> DbLogConfig {
    DbLogConfig {
        environment: "test".into(),
        application: "portal".into(),
        trace_target: "dblog.test".into(),
        workspace_dir: None,
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StoreMode {
    Rows(usize),
    Fail,
    Panic,
}

#[derive(Debug, Clone)]
pub struct OwnedRow {
    pub environment: String,
    pub category: String,
    pub application: String,
    pub section: String,
    pub title: String,
    pub body: String,
    pub context: String,
}

#[derive(Clone)]
pub struct RecordingStore {
    mode: StoreMode,
    attempts: Arc<AtomicUsize>,
    rows: Arc<Mutex<Vec<OwnedRow>>>,
}

impl RecordingStore {
    pub fn new(mode: StoreMode) -> Self {
        Self {
            mode,
            attempts: Arc::new(AtomicUsize::new(0)),
            rows: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn rows(&self) -> Vec<OwnedRow> {
        self.rows.lock().unwrap().clone()
    }
}

impl LogStore for RecordingStore {
    fn insert(&self, row: &NewLogRow<'_>) -> Result<usize> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            StoreMode::Rows(n) => {
                self.rows.lock().unwrap().push(OwnedRow {
                    environment: row.environment.into(),
                    category: row.category.into(),
                    application: row.application.into(),
                    section: row.section.into(),
                    title: row.title.into(),
                    body: row.body.into(),
                    context: row.context.into(),
                });
                Ok(n)
            }
            StoreMode::Fail => Err(DbLogError::Sql(rusqlite::Error::ExecuteReturnedResults)),
            StoreMode::Panic => panic!("store exploded"),
        }
    }

    fn get_all(&self) -> Result<Vec<LogRecord>> {
        Ok(Vec::new())
    }
}

#[derive(Clone, Default)]
pub struct RecordingTrace {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingTrace {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl TraceSink for RecordingTrace {
    fn write(&self, text: &str) -> Result<()> {
        self.lines.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub struct FailingTrace;

impl TraceSink for FailingTrace {
    fn write(&self, _text: &str) -> Result<()> {
        Err(DbLogError::TraceUnavailable("event log offline".into()))
    }
}
