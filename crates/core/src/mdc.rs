//! Mapped diagnostic context: per-task key/value pairs consulted by the log
//! formatter when rendering each event.
//!
//! Inside [`scope`] the map belongs to the current tokio task, so concurrent
//! requests never observe each other's entries. Outside any task scope the
//! calls fall back to a thread-local map.

use std::cell::RefCell;
use std::collections::HashMap;

type MdcMap = HashMap<String, Option<String>>;

tokio::task_local! {
    static TASK_MDC: RefCell<MdcMap>;
}

thread_local! {
    static THREAD_MDC: RefCell<MdcMap> = RefCell::new(HashMap::new());
}

fn with_map<R>(f: impl FnOnce(&mut MdcMap) -> R) -> R {
    if is_scoped() {
        TASK_MDC.with(|map| f(&mut map.borrow_mut()))
    } else {
        THREAD_MDC.with(|map| f(&mut map.borrow_mut()))
    }
}

/// Run `fut` with a fresh, empty task-scoped context.
pub async fn scope<F: Future>(fut: F) -> F::Output {
    TASK_MDC.scope(RefCell::new(HashMap::new()), fut).await
}

/// Whether a task-scoped context is active for the caller.
pub fn is_scoped() -> bool {
    TASK_MDC.try_with(|_| ()).is_ok()
}

/// Insert `key`. A `None` value records the key with no value.
pub fn put(key: impl Into<String>, value: Option<String>) {
    let key = key.into();
    with_map(|map| {
        map.insert(key, value);
    });
}

pub fn remove(key: &str) {
    with_map(|map| {
        map.remove(key);
    });
}

/// Value stored under `key`. Missing keys and no-value entries both yield `None`.
pub fn get(key: &str) -> Option<String> {
    with_map(|map| map.get(key).cloned().flatten())
}

pub fn contains_key(key: &str) -> bool {
    with_map(|map| map.contains_key(key))
}

pub fn clear() {
    with_map(|map| map.clear());
}

/// All entries, sorted by key.
pub fn snapshot() -> Vec<(String, Option<String>)> {
    let mut entries: Vec<_> = with_map(|map| {
        map.iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    });
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

/// Removes every key it inserted when dropped.
///
/// Dropping happens on normal return, on `?` early return, during panic
/// unwinding, and when an in-flight future holding the guard is cancelled.
#[must_use = "dropping the guard removes its entries immediately"]
#[derive(Debug, Default)]
pub struct MdcGuard {
    keys: Vec<String>,
}

impl MdcGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: Option<String>) {
        put(key, value);
        if !self.keys.iter().any(|k| k == key) {
            self.keys.push(key.to_string());
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl Drop for MdcGuard {
    fn drop(&mut self) {
        for key in self.keys.drain(..) {
            remove(&key);
        }
    }
}
