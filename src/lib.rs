//! # Unikey
//!
//! A record reconciliation engine: natural-key identity resolution,
//! completeness scoring, duplicate detection and merge, and bulk-import
//! semantics, generalized over any entity kind with a required string
//! natural key plus an open set of named attributes.
//!
//! The authoritative state lives in an abstract entity store (a remote
//! document database with single-document atomicity and no transactions);
//! duplicates produced by racing writers are tolerated and repaired by the
//! reconciliation pass rather than prevented with distributed locking.

pub mod config;
pub mod error;
pub mod import;
pub mod merge;
pub mod model;
pub mod policy;
pub mod reconcile;
pub mod resolver;
pub mod score;
pub mod store;

// Re-export main types for convenience
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, EngineResult, ValidationError};
pub use import::ImportReport;
pub use model::{DocId, FieldMap, Record, Timestamp, Value};
pub use policy::{machine_policy, supply_policy, AddPolicy, EntityPolicy, PolicyRegistry};
pub use reconcile::ReconcileOutcome;
pub use store::{EntityStore, MemoryStore, StoreError, StoreMetrics};

use tracing::info;

/// Main API for record reconciliation.
///
/// Wraps an entity store and a policy registry; every operation is driven
/// synchronously to completion and re-reads the store rather than caching
/// across calls. The engine is authorization-agnostic and trusts its caller.
pub struct Unikey {
    store: Box<dyn EntityStore>,
    policies: PolicyRegistry,
    config: EngineConfig,
}

impl Unikey {
    /// Create an engine over an in-memory store.
    pub fn new(policies: PolicyRegistry) -> Self {
        Self::with_store(policies, MemoryStore::new())
    }

    /// Create an engine over a custom store implementation.
    pub fn with_store<S>(policies: PolicyRegistry, store: S) -> Self
    where
        S: EntityStore + 'static,
    {
        Self::with_store_and_config(policies, store, EngineConfig::default())
    }

    /// Create an engine over a custom store with explicit configuration.
    pub fn with_store_and_config<S>(
        policies: PolicyRegistry,
        store: S,
        config: EngineConfig,
    ) -> Self
    where
        S: EntityStore + 'static,
    {
        Self {
            store: Box::new(store),
            policies,
            config,
        }
    }

    /// Direct access to the underlying store.
    pub fn store_mut(&mut self) -> &mut dyn EntityStore {
        self.store.as_mut()
    }

    /// Store activity counters, if the implementation tracks them.
    pub fn store_metrics(&self) -> Option<StoreMetrics> {
        self.store.metrics()
    }

    fn policy(&self, kind: &str) -> EngineResult<&EntityPolicy> {
        self.policies.get(kind).ok_or_else(|| EngineError::UnknownKind {
            kind: kind.to_string(),
        })
    }

    fn policy_and_store(
        &mut self,
        kind: &str,
    ) -> EngineResult<(&EntityPolicy, &mut dyn EntityStore)> {
        let policy = self.policies.get(kind).ok_or_else(|| EngineError::UnknownKind {
            kind: kind.to_string(),
        })?;
        Ok((policy, self.store.as_mut()))
    }

    /// Full collection read, ordered by natural key.
    pub fn get_all(&self, kind: &str) -> EngineResult<Vec<Record>> {
        let policy = self.policy(kind)?;
        let mut records = self.store.get_all(&policy.kind)?;
        records.sort_by(|a, b| {
            a.natural_key(&policy.natural_key_field)
                .cmp(&b.natural_key(&policy.natural_key_field))
        });
        Ok(records)
    }

    /// Add a single record.
    ///
    /// The natural key must be non-empty after trimming. When the key
    /// already exists the behavior is the kind's [`AddPolicy`]: `Reject`
    /// fails with [`EngineError::DuplicateKey`], `Merge` folds the incoming
    /// record into the best existing one and returns its id. Caller-supplied
    /// ids and timestamps are ignored.
    pub fn add(&mut self, kind: &str, record: Record) -> EngineResult<DocId> {
        let (policy, store) = self.policy_and_store(kind)?;
        let key = resolver::validate_natural_key(policy, &record)?.to_string();
        let existing = resolver::find_by_natural_key(&*store, policy, &key)?;

        if existing.is_empty() {
            let mut fresh = record;
            fresh.id = None;
            let stamp = model::now();
            fresh.created_at = stamp;
            fresh.updated_at = stamp;
            return Ok(store.insert(&policy.kind, fresh)?);
        }

        match policy.add_policy {
            AddPolicy::Reject => Err(EngineError::DuplicateKey {
                kind: policy.kind.clone(),
                key,
            }),
            AddPolicy::Merge => {
                // More than one hit means a transient duplicate window; merge
                // into the record reconciliation would keep.
                let ranked = reconcile::rank_candidates(policy, existing);
                let target = &ranked[0];
                let merged = merge::merge(target, &record, model::now());
                let id = target.id.clone().expect("stored record has an id");
                store.put(&policy.kind, &id, merged)?;
                Ok(id)
            }
        }
    }

    /// Apply a partial update to a stored record through the merge policy:
    /// fields present in `partial` win, everything else is preserved.
    pub fn update(&mut self, kind: &str, id: &DocId, partial: FieldMap) -> EngineResult<()> {
        let (policy, store) = self.policy_and_store(kind)?;

        // A partial payload may omit the natural key, but must not blank it.
        if partial.contains_key(&policy.natural_key_field) {
            let probe = Record::with_fields(partial.clone());
            resolver::validate_natural_key(policy, &probe)?;
        }

        let stored = store
            .get(&policy.kind, id)?
            .ok_or_else(|| EngineError::RecordNotFound {
                kind: policy.kind.clone(),
                id: id.to_string(),
            })?;

        let merged = merge::merge(&stored, &Record::with_fields(partial), model::now());
        store.put(&policy.kind, id, merged)?;
        Ok(())
    }

    /// Delete a record by id. Deleting an absent id is not an error.
    pub fn delete(&mut self, kind: &str, id: &DocId) -> EngineResult<()> {
        let (policy, store) = self.policy_and_store(kind)?;
        store.delete(&policy.kind, id)?;
        Ok(())
    }

    /// Import a batch of records; see [`import::bulk_import`].
    pub fn bulk_import(&mut self, kind: &str, records: Vec<Record>) -> EngineResult<ImportReport> {
        let (policy, store) = self.policy_and_store(kind)?;
        import::bulk_import(store, policy, records)
    }

    /// Run a reconciliation pass over a collection; see
    /// [`reconcile::reconcile_with`].
    pub fn reconcile(&mut self, kind: &str) -> EngineResult<ReconcileOutcome> {
        let fold = self.config.reconcile.fold_loser_fields;
        let (policy, store) = self.policy_and_store(kind)?;
        reconcile::reconcile_with(store, policy, fold)
    }

    /// Run a reconciliation pass only if some natural key is duplicated;
    /// `None` means nothing to do.
    pub fn auto_reconcile_if_needed(
        &mut self,
        kind: &str,
    ) -> EngineResult<Option<ReconcileOutcome>> {
        let fold = self.config.reconcile.fold_loser_fields;
        let (policy, store) = self.policy_and_store(kind)?;
        reconcile::auto_reconcile_if_needed_with(store, policy, fold)
    }

    /// True when the collection is empty; callers use this to decide whether
    /// to load starter data.
    pub fn needs_seed_data(&self, kind: &str) -> EngineResult<bool> {
        let policy = self.policy(kind)?;
        Ok(self.store.count(&policy.kind)? == 0)
    }

    /// Run `auto_reconcile_if_needed` across every registered kind, honoring
    /// the startup configuration. Typically invoked once at process start.
    pub fn startup_sweep(&mut self) -> EngineResult<Vec<(String, Option<ReconcileOutcome>)>> {
        if !self.config.startup.auto_reconcile {
            return Ok(Vec::new());
        }

        let kinds: Vec<String> = self.policies.kinds().into_iter().map(str::to_string).collect();
        let mut outcomes = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let outcome = self.auto_reconcile_if_needed(&kind)?;
            if let Some(result) = &outcome {
                info!(kind = %kind, removed = result.removed, kept = result.kept, "startup sweep repaired duplicates");
            }
            outcomes.push((kind, outcome));
        }
        Ok(outcomes)
    }
}
