//! # Store Module
//!
//! The abstract entity store the engine writes through, plus a complete
//! in-memory implementation used by tests and embedded callers.
//!
//! The store is modeled after a remote document database: records are
//! addressed by an opaque id, queryable by exact match on any field, with
//! single-document atomicity and no transactions across documents. The
//! engine never caches store contents across calls.

use hashbrown::HashMap;
use serde::Serialize;
use thiserror::Error;

use crate::model::{DocId, Record, Value};

/// Errors surfaced by an entity store.
///
/// The engine propagates these unchanged; retry and backoff, if desired,
/// belong to the caller or a wrapping layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or returned an unexpected error.
    #[error("store unavailable: {source}")]
    Unavailable {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store understood the request and refused it.
    #[error("store rejected request: {message}")]
    Rejected { message: String },
}

impl StoreError {
    /// Wrap an arbitrary transport error as an unavailability.
    pub fn unavailable(err: impl Into<anyhow::Error>) -> Self {
        Self::Unavailable {
            source: err.into().into(),
        }
    }

    /// Whether a retry of the same request could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Counters describing store activity, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreMetrics {
    pub collections: usize,
    pub records: usize,
    pub writes: u64,
    pub deletes: u64,
}

/// Abstract persistent collection of records, addressed by opaque id.
///
/// One collection per entity kind. Implementations guarantee only
/// single-document atomicity; the engine is designed around that limit.
pub trait EntityStore {
    /// Persist a new record, assigning and returning its id.
    fn insert(&mut self, collection: &str, record: Record) -> Result<DocId, StoreError>;

    /// Read a record by id.
    fn get(&self, collection: &str, id: &DocId) -> Result<Option<Record>, StoreError>;

    /// Replace the document stored under `id`.
    fn put(&mut self, collection: &str, id: &DocId, record: Record) -> Result<(), StoreError>;

    /// Delete a record by id. Deleting an absent id is not an error.
    fn delete(&mut self, collection: &str, id: &DocId) -> Result<(), StoreError>;

    /// All records whose `field` equals `value` exactly.
    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError>;

    /// Full collection read, in unspecified order.
    fn get_all(&self, collection: &str) -> Result<Vec<Record>, StoreError>;

    /// Number of records in the collection.
    fn count(&self, collection: &str) -> Result<usize, StoreError>;

    /// Activity counters, if the implementation tracks them.
    fn metrics(&self) -> Option<StoreMetrics> {
        None
    }
}

/// In-memory entity store.
///
/// Ids are monotone and opaque to callers; timestamps are left untouched
/// (they are owned by the engine, not the store).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<String, HashMap<DocId, Record>>,
    next_doc_id: u64,
    writes: u64,
    deletes: u64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, name: &str) -> Option<&HashMap<DocId, Record>> {
        self.collections.get(name)
    }
}

impl EntityStore for MemoryStore {
    fn insert(&mut self, collection: &str, mut record: Record) -> Result<DocId, StoreError> {
        self.next_doc_id += 1;
        let id = DocId::new(format!("doc-{}", self.next_doc_id));
        record.id = Some(id.clone());
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), record);
        self.writes += 1;
        Ok(id)
    }

    fn get(&self, collection: &str, id: &DocId) -> Result<Option<Record>, StoreError> {
        Ok(self
            .collection(collection)
            .and_then(|records| records.get(id))
            .cloned())
    }

    fn put(&mut self, collection: &str, id: &DocId, mut record: Record) -> Result<(), StoreError> {
        record.id = Some(id.clone());
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), record);
        self.writes += 1;
        Ok(())
    }

    fn delete(&mut self, collection: &str, id: &DocId) -> Result<(), StoreError> {
        if let Some(records) = self.collections.get_mut(collection) {
            if records.remove(id).is_some() {
                self.deletes += 1;
            }
        }
        Ok(())
    }

    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError> {
        let matches = self
            .collection(collection)
            .map(|records| {
                records
                    .values()
                    .filter(|record| record.fields.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }

    fn get_all(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .collection(collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.collection(collection).map_or(0, HashMap::len))
    }

    fn metrics(&self) -> Option<StoreMetrics> {
        Some(StoreMetrics {
            collections: self.collections.len(),
            records: self.collections.values().map(HashMap::len).sum(),
            writes: self.writes,
            deletes: self.deletes,
        })
    }
}
