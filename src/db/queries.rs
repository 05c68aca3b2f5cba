//! SQL for the `dblog` table.

use rusqlite::{params, Connection};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Column values for one insert.
#[derive(Debug, Clone, Copy)]
pub struct NewLogRow<'a> {
    pub environment: &'a str,
    pub category: &'a str,
    pub application: &'a str,
    pub section: &'a str,
    pub title: &'a str,
    pub body: &'a str,
    pub context: &'a str,
}

/// A stored log row as read back from the table.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LogRecord {
    pub id: String,
    pub ts: i64,
    pub environment: String,
    pub category: String,
    pub application: String,
    pub section: String,
    pub title: String,
    pub body: String,
    pub context: String,
}

const SELECT_COLUMNS: &str = "SELECT id, ts, env, category, app, section, title, body, aux FROM dblog";

pub fn insert(conn: &Connection, row: &NewLogRow<'_>) -> rusqlite::Result<usize> {
    let id = Uuid::new_v4().to_string();
    let ts = OffsetDateTime::now_utc().unix_timestamp();
    conn.execute(
        "INSERT INTO dblog (id, ts, env, category, app, section, title, body, aux) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            ts,
            row.environment,
            row.category,
            row.application,
            row.section,
            row.title,
            row.body,
            row.context,
        ],
    )
}

/// All rows, newest first.
pub fn get_all(conn: &Connection) -> rusqlite::Result<Vec<LogRecord>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY ts DESC, rowid DESC"))?;
    let rows = stmt.query_map([], read_record)?;
    let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

pub fn recent(conn: &Connection, limit: usize) -> rusqlite::Result<Vec<LogRecord>> {
    let mut stmt =
        conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY ts DESC, rowid DESC LIMIT ?1"))?;
    let rows = stmt.query_map([i64::try_from(limit).unwrap_or(i64::MAX)], read_record)?;
    let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogRecord> {
    Ok(LogRecord {
        id: row.get(0)?,
        ts: row.get(1)?,
        environment: row.get(2)?,
        category: row.get(3)?,
        application: row.get(4)?,
        section: row.get(5)?,
        title: row.get(6)?,
        body: row.get(7)?,
        context: row.get(8)?,
    })
}
