//! Free functions that construct [`LogEntry`] values.
//!
//! Titles come either from explicit text or from a [`Locator`] describing the
//! call site. Payloads are plain strings or serialized values; building never
//! fails, even when a value refuses to serialize.

use std::fmt::{self, Debug};
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use serde_json::Value;

use crate::entry::{serialize, LogEntry};

pub const INFO: &str = "info";
pub const STATUS: &str = "status";
pub const ERROR: &str = "error";

pub const BLANK_TITLE: &str = "blank";
pub const DEFAULT_UID: &str = "No PortalUser Instance Available";

/// Supplies the identity recorded under `uid` on every new entry.
pub trait IdentityProvider: Send + Sync {
    fn uid(&self) -> Option<String>;
}

/// Provider used when the embedding application has no identity to offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl IdentityProvider for Anonymous {
    fn uid(&self) -> Option<String> {
        None
    }
}

impl<F> IdentityProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn uid(&self) -> Option<String> {
        self()
    }
}

/// A call site: a function together with the module or type declaring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub function: String,
    pub declaring: String,
}

impl Locator {
    pub fn new(function: impl Into<String>, declaring: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            declaring: declaring.into(),
        }
    }

    /// Split a fully qualified path such as `app::worker::Worker::run` into
    /// its function name and declaring path. Closure segments are skipped.
    pub fn from_path(path: &str) -> Self {
        let mut path = path;
        while let Some(stripped) = path.strip_suffix("::{{closure}}") {
            path = stripped;
        }
        match path.rsplit_once("::") {
            Some((declaring, function)) => Self::new(function, declaring),
            None => Self::new(path, ""),
        }
    }

    pub fn title(&self) -> String {
        format!("{} in {}", self.function, self.declaring)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

/// Capture a [`Locator`] for the enclosing function.
#[macro_export]
macro_rules! locator {
    () => {{
        fn __dblog_here() {}
        fn __dblog_type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __dblog_type_name_of(__dblog_here);
        $crate::builder::Locator::from_path(name.strip_suffix("::__dblog_here").unwrap_or(name))
    }};
}

/// Where an entry's title comes from.
#[derive(Debug, Clone)]
pub enum TitleSource {
    Text(Option<String>),
    Locator(Locator),
}

impl TitleSource {
    fn resolve(self) -> String {
        match self {
            Self::Text(Some(text)) => text,
            Self::Text(None) => BLANK_TITLE.to_string(),
            Self::Locator(locator) => locator.title(),
        }
    }
}

impl From<&str> for TitleSource {
    fn from(value: &str) -> Self {
        Self::Text(Some(value.to_string()))
    }
}

impl From<String> for TitleSource {
    fn from(value: String) -> Self {
        Self::Text(Some(value))
    }
}

impl From<Option<&str>> for TitleSource {
    fn from(value: Option<&str>) -> Self {
        Self::Text(value.map(str::to_string))
    }
}

impl From<Option<String>> for TitleSource {
    fn from(value: Option<String>) -> Self {
        Self::Text(value)
    }
}

impl From<Locator> for TitleSource {
    fn from(value: Locator) -> Self {
        Self::Locator(value)
    }
}

impl From<&Locator> for TitleSource {
    fn from(value: &Locator) -> Self {
        Self::Locator(value.clone())
    }
}

/// The primary body of an entry, already rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload(String);

impl Payload {
    /// Serialize `value`, falling back to its `Debug` form if serialization
    /// fails. Error entries are often built inside failure paths, so this
    /// must never fail itself.
    pub fn from_value<T: Serialize + Debug + ?Sized>(value: &T) -> Self {
        match serialize(value) {
            Ok(text) => Self(text),
            Err(_) => Self(format!("{value:?}")),
        }
    }

    /// Render an error together with its chain of sources.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut text = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Option<&str>> for Payload {
    fn from(value: Option<&str>) -> Self {
        Self(value.unwrap_or_default().to_string())
    }
}

impl From<Option<String>> for Payload {
    fn from(value: Option<String>) -> Self {
        Self(value.unwrap_or_default())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self(text),
            Value::Null => Self::default(),
            other => Self(other.to_string()),
        }
    }
}

/// Build an entry seeded with the placeholder identity.
pub fn build<'a>(
    category: impl Into<Option<&'a str>>,
    title: impl Into<TitleSource>,
    payload: impl Into<Payload>,
) -> LogEntry {
    build_as(&Anonymous, category, title, payload)
}

/// Build an entry whose `uid` comes from `identity`.
pub fn build_as<'a>(
    identity: &dyn IdentityProvider,
    category: impl Into<Option<&'a str>>,
    title: impl Into<TitleSource>,
    payload: impl Into<Payload>,
) -> LogEntry {
    let mut entry = LogEntry::new(
        category.into().unwrap_or_default().to_string(),
        title.into().resolve(),
        payload.into().into_string(),
    );
    entry.seed_uid(resolve_uid(identity));
    entry
}

// The provider is application code; a panic inside it must not escape the
// builder, which runs inside failure paths.
fn resolve_uid(identity: &dyn IdentityProvider) -> String {
    match panic::catch_unwind(AssertUnwindSafe(|| identity.uid())) {
        Ok(Some(uid)) => uid,
        Ok(None) => DEFAULT_UID.to_string(),
        Err(_) => {
            log::warn!("identity provider panicked; using placeholder uid");
            DEFAULT_UID.to_string()
        }
    }
}

pub fn info(title: impl Into<TitleSource>, payload: impl Into<Payload>) -> LogEntry {
    build(INFO, title, payload)
}

pub fn status(title: impl Into<TitleSource>, payload: impl Into<Payload>) -> LogEntry {
    build(STATUS, title, payload)
}

pub fn error(title: impl Into<TitleSource>, payload: impl Into<Payload>) -> LogEntry {
    build(ERROR, title, payload)
}
