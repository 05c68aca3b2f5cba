//! Defensive map lookups that report their own failures.
//!
//! [`DbLog::get`] never fails outward. A missing key or a value of the wrong
//! shape is committed as an error entry and the caller receives `None`.
//! Reporting runs at most one level deep per thread: a lookup that fails while
//! another failure is being reported returns `None` without reporting.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::builder::Payload;
use crate::entry::serialize;
use crate::errors::{DbLogError, Result};
use crate::logging::DbLog;

/// A string-keyed map of JSON values.
pub trait Lookup: Serialize {
    fn lookup(&self, key: &str) -> Option<&Value>;
}

impl Lookup for Map<String, Value> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl<S: BuildHasher> Lookup for HashMap<String, Value, S> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl Lookup for BTreeMap<String, Value> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

thread_local! {
    static REPORTING: Cell<bool> = const { Cell::new(false) };
}

struct ReportingGuard;

impl ReportingGuard {
    fn enter() -> Option<Self> {
        REPORTING.with(|flag| (!flag.replace(true)).then(|| ReportingGuard))
    }
}

impl Drop for ReportingGuard {
    fn drop(&mut self) {
        REPORTING.with(|flag| flag.set(false));
    }
}

impl DbLog {
    /// Read `key` from `map` as a `T`, or report the failure and return `None`.
    pub fn get<T, M>(&self, map: &M, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
        M: Lookup + ?Sized,
    {
        match read(map, key) {
            Ok(value) => Some(value),
            Err(err) => {
                self.report_lookup_failure(map, key, &err);
                None
            }
        }
    }

    fn report_lookup_failure<M: Lookup + ?Sized>(&self, map: &M, key: &str, err: &DbLogError) {
        let Some(_guard) = ReportingGuard::enter() else {
            log::warn!("suppressed nested lookup report for '{key}': {err}");
            return;
        };
        let dictionary = serialize(map).unwrap_or_else(|e| e.to_string());
        let entry = self
            .error(format!("No dictionary value for {key}"), Payload::from_error(err))
            .add("dictionary", dictionary)
            .add("key", key);
        crate::commit!(self, entry);
    }
}

fn read<T, M>(map: &M, key: &str) -> Result<T>
where
    T: DeserializeOwned,
    M: Lookup + ?Sized,
{
    let value = map
        .lookup(key)
        .ok_or_else(|| DbLogError::MissingKey(key.to_string()))?;
    T::deserialize(value).map_err(|err| DbLogError::TypeMismatch {
        key: key.to_string(),
        expected: std::any::type_name::<T>(),
        detail: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ERROR;
    use crate::sink::TraceSink;
    use crate::testing::{test_config, RecordingStore, StoreMode};
    use serde_json::json;
    use std::sync::{Arc, OnceLock};

    fn sample() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".into(), json!("ada"));
        map.insert("age".into(), json!(36));
        map
    }

    #[test]
    fn present_key_returns_value_without_commit() {
        let store = RecordingStore::new(StoreMode::Rows(1));
        let log = DbLog::new(store.clone(), &test_config());
        assert_eq!(log.get::<String, _>(&sample(), "name").as_deref(), Some("ada"));
        assert_eq!(log.get::<u32, _>(&sample(), "age"), Some(36));
        assert_eq!(store.attempts(), 0);
    }

    #[test]
    fn missing_key_reports_exactly_once() {
        let store = RecordingStore::new(StoreMode::Rows(1));
        let log = DbLog::new(store.clone(), &test_config());
        assert_eq!(log.get::<String, _>(&sample(), "email"), None);
        assert_eq!(store.attempts(), 1);

        let rows = store.rows();
        let row = &rows[0];
        assert_eq!(row.category, ERROR);
        assert_eq!(row.title, "No dictionary value for email");
        assert_eq!(row.section, "dblog_core");
        assert!(row.body.contains("email"));
        let context: Value = serde_json::from_str(&row.context).unwrap();
        assert_eq!(context["key"], json!("email"));
        assert_eq!(context["dictionary"], json!(r#"{"name":"ada","age":36}"#));
    }

    #[test]
    fn wrong_type_reports_and_returns_none() {
        let store = RecordingStore::new(StoreMode::Rows(1));
        let log = DbLog::new(store.clone(), &test_config());
        assert_eq!(log.get::<String, _>(&sample(), "age"), None);
        assert_eq!(store.attempts(), 1);
        assert!(store.rows()[0].body.starts_with("Value for key 'age' is not a"));
    }

    #[test]
    fn works_over_hash_and_btree_maps() {
        let store = RecordingStore::new(StoreMode::Rows(1));
        let log = DbLog::new(store.clone(), &test_config());
        let hashed: HashMap<String, Value> = [("k".to_string(), json!(true))].into();
        let ordered: BTreeMap<String, Value> = [("k".to_string(), json!([1, 2]))].into();
        assert_eq!(log.get::<bool, _>(&hashed, "k"), Some(true));
        assert_eq!(log.get::<Vec<u8>, _>(&ordered, "k"), Some(vec![1, 2]));
        assert_eq!(store.attempts(), 0);
    }

    #[test]
    fn failing_store_still_returns_none() {
        let store = RecordingStore::new(StoreMode::Fail);
        let log = DbLog::new(store.clone(), &test_config());
        assert_eq!(log.get::<String, _>(&sample(), "email"), None);
        assert_eq!(store.attempts(), 1);
    }

    #[test]
    fn panicking_identity_does_not_escape_get() {
        let store = RecordingStore::new(StoreMode::Rows(1));
        let log = DbLog::new(store.clone(), &test_config())
            .with_identity(|| -> Option<String> { panic!("identity backend down") });
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            log.get::<String, _>(&Map::new(), "missing")
        }));
        assert!(matches!(outcome, Ok(None)));
        assert_eq!(store.attempts(), 1);
        let context: Value = serde_json::from_str(&store.rows()[0].context).unwrap();
        assert_eq!(context["uid"], json!(crate::builder::DEFAULT_UID));
    }

    // A trace sink that performs a failing lookup of its own while the
    // outer failure is being committed.
    struct ReentrantTrace(Arc<OnceLock<DbLog>>);

    impl TraceSink for ReentrantTrace {
        fn write(&self, _text: &str) -> crate::errors::Result<()> {
            if let Some(log) = self.0.get() {
                let _: Option<String> = log.get(&Map::new(), "nested");
            }
            Ok(())
        }
    }

    #[test]
    fn nested_failures_are_not_reported() {
        let cell = Arc::new(OnceLock::new());
        let store = RecordingStore::new(StoreMode::Rows(1));
        let log = DbLog::new(store.clone(), &test_config())
            .with_trace_sink(ReentrantTrace(cell.clone()));
        let _ = cell.set(log.clone());

        assert_eq!(log.get::<String, _>(&sample(), "email"), None);
        assert_eq!(store.attempts(), 1);
        assert_eq!(store.rows()[0].title, "No dictionary value for email");

        // The guard is released once reporting finishes.
        assert_eq!(log.get::<String, _>(&sample(), "phone"), None);
        assert_eq!(store.attempts(), 2);
    }
}
