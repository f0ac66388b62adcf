//! Document store boundary.
//!
//! The core treats persistence as an external document-style collaborator
//! with `get`/`query`/`set`/`update` over named collections. A store is
//! either fully available or failed; no partial-write semantics are
//! assumed, and the core never retries on its own (retry is always a
//! user-initiated action upstream).
//!
//! [`MemoryStore`] is the in-process implementation used by tests and by
//! embedders that have no backend wired up yet.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde_json::Value;

/// Errors surfaced by a document store collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// The store was reached but the request timed out.
    #[error("store request timed out: {0}")]
    Timeout(String),
    /// The caller is not allowed to touch this document.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// The request itself was malformed (bad collection, bad predicate).
    #[error("malformed store request: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Whether a user-initiated retry of the same request could succeed.
    ///
    /// Network-ish failures are retryable; permission and shape problems
    /// must be fixed before resubmission.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// Type alias for Results that can fail with a [`StoreError`].
pub type StoreResult<T> = Result<T, StoreError>;

/// A query predicate, mirroring the two shapes the hosted store supports.
#[derive(Clone, Debug)]
pub enum Filter {
    /// `document[field] == value`
    Eq(String, Value),
    /// `document[field]` is an array containing any of the given strings.
    ArrayContainsAny(String, Vec<String>),
}

impl Filter {
    fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => document.get(field) == Some(expected),
            Filter::ArrayContainsAny(field, values) => document
                .get(field)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|item| values.iter().any(|v| v == item))
                })
                .unwrap_or(false),
        }
    }
}

/// The persistence collaborator the core is embedded against.
///
/// Implementations wrap whatever hosted database the product runs on; the
/// core only relies on these four operations.
pub trait DocumentStore: Send + Sync {
    /// Fetches one document by id, `None` if absent.
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Returns documents matching all filters. A `limit` of 0 means no
    /// limit.
    fn query(&self, collection: &str, filters: &[Filter], limit: usize) -> StoreResult<Vec<Value>>;

    /// Creates or fully replaces a document.
    fn set(&self, collection: &str, id: &str, document: Value) -> StoreResult<()>;

    /// Merges the fields of `partial` into an existing document.
    fn update(&self, collection: &str, id: &str, partial: Value) -> StoreResult<()>;
}

/// In-memory document store for tests and backend-less embedding.
///
/// Documents are held per collection in id order, which keeps query
/// results deterministic.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection.
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .expect("store mutex poisoned")
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Whether a collection holds no documents.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let collections = self.collections.lock().expect("store mutex poisoned");
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn query(&self, collection: &str, filters: &[Filter], limit: usize) -> StoreResult<Vec<Value>> {
        let collections = self.collections.lock().expect("store mutex poisoned");
        let mut results = Vec::new();
        if let Some(docs) = collections.get(collection) {
            for document in docs.values() {
                if filters.iter().all(|f| f.matches(document)) {
                    results.push(document.clone());
                    if limit > 0 && results.len() == limit {
                        break;
                    }
                }
            }
        }
        Ok(results)
    }

    fn set(&self, collection: &str, id: &str, document: Value) -> StoreResult<()> {
        if !document.is_object() {
            return Err(StoreError::Malformed(
                "documents must be JSON objects".into(),
            ));
        }
        let mut collections = self.collections.lock().expect("store mutex poisoned");
        collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), document);
        Ok(())
    }

    fn update(&self, collection: &str, id: &str, partial: Value) -> StoreResult<()> {
        let Value::Object(partial) = partial else {
            return Err(StoreError::Malformed(
                "partial updates must be JSON objects".into(),
            ));
        };
        let mut collections = self.collections.lock().expect("store mutex poisoned");
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| {
                StoreError::Malformed(format!("no document `{id}` in `{collection}`"))
            })?;
        let Value::Object(fields) = document else {
            return Err(StoreError::Malformed(format!(
                "document `{id}` in `{collection}` is not an object"
            )));
        };
        for (key, value) in partial {
            fields.insert(key, value);
        }
        Ok(())
    }
}
