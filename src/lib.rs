//! Fail-safe structured diagnostic logging backed by SQLite.
//!
//! Callers build an entry, enrich it with context and commit it; no step is
//! allowed to fail outward, so logging can never take down the caller:
//! - [`builder`] constructs entries from a title or a call-site [`Locator`].
//! - [`entry`] holds the record and its `add`/`describe` enrichment.
//! - [`logging`] is the [`DbLog`] façade with the commit pipeline.
//! - [`accessor`] offers map lookups that report their own failures.
//! - [`sink`] defines the durable store and the local trace sink.
//! - [`db`] initialises the SQLite database and applies migrations.
//! - [`config`] and [`errors`] carry settings and the error catalogue.

pub mod accessor;
pub mod builder;
pub mod config;
pub mod db;
pub mod entry;
pub mod errors;
pub mod logging;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;

pub use accessor::Lookup;
pub use builder::{
    build, build_as, error, info, status, Anonymous, IdentityProvider, Locator, Payload,
    TitleSource,
};
pub use config::DbLogConfig;
pub use entry::LogEntry;
pub use errors::DbLogError;
pub use logging::{CommitReceipt, DbLog, COMMIT_FAILED};
pub use sink::{LogStore, LogTraceSink, SqliteLogStore, TraceSink};
