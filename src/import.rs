//! # Bulk Import Coordinator
//!
//! Applies a batch of new records against the entity store. Bulk import
//! only inserts brand-new natural keys: records whose key already exists
//! are dropped silently from the batch, and per-record failures never stop
//! the remaining records. The batch is explicitly non-atomic and
//! best-effort; nothing is rolled back.

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::EngineError;
use crate::model::{now, Record};
use crate::policy::EntityPolicy;
use crate::resolver::validate_natural_key;
use crate::store::EntityStore;

/// Outcome of a fully successful bulk import.
///
/// A batch where every key already exists is a documented no-op
/// (`inserted: 0`), not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Records inserted with brand-new natural keys.
    pub inserted: usize,
    /// Records dropped because their key already existed.
    pub skipped: usize,
}

/// Import a batch of records into a collection.
///
/// Existing natural keys are loaded once up front, not per record. Inserts
/// run sequentially so keys inserted earlier in the batch count as existing
/// for later entries; concurrent callers racing this view are repaired by a
/// later reconciliation pass. Success and failure are tracked independently
/// and, if anything failed, the whole call ends in
/// [`EngineError::BatchPartialFailure`] carrying both counts; records
/// inserted before a failure remain persisted.
#[instrument(skip_all, fields(kind = %policy.kind, batch = records.len()))]
pub fn bulk_import(
    store: &mut dyn EntityStore,
    policy: &EntityPolicy,
    records: Vec<Record>,
) -> Result<ImportReport, EngineError> {
    let mut existing: FxHashSet<String> = store
        .get_all(&policy.kind)?
        .iter()
        .filter_map(|record| record.natural_key(&policy.natural_key_field))
        .map(str::to_string)
        .collect();

    let mut inserted = 0;
    let mut skipped = 0;
    let mut failed = 0;

    for mut record in records {
        let key = match validate_natural_key(policy, &record) {
            Ok(key) => key.to_string(),
            Err(err) => {
                warn!(error = %err, "dropping invalid import record");
                failed += 1;
                continue;
            }
        };

        if existing.contains(&key) {
            debug!(key = %key, "skipping record with existing natural key");
            skipped += 1;
            continue;
        }

        record.id = None;
        let stamp = now();
        record.created_at = stamp;
        record.updated_at = stamp;

        match store.insert(&policy.kind, record) {
            Ok(_) => {
                existing.insert(key);
                inserted += 1;
            }
            Err(err) => {
                warn!(key = %key, error = %err, "import insert failed");
                failed += 1;
            }
        }
    }

    info!(inserted, skipped, failed, "bulk import finished");
    if failed > 0 {
        return Err(EngineError::BatchPartialFailure {
            succeeded: inserted,
            failed,
        });
    }
    Ok(ImportReport { inserted, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;
    use crate::policy::machine_policy;
    use crate::store::MemoryStore;

    fn machine(codigo: &str) -> Record {
        Record::new()
            .with_text("codigo", codigo)
            .with_text("estado", "STOCK")
    }

    #[test]
    fn test_fresh_batch_inserts_everything() {
        let policy = machine_policy();
        let mut store = MemoryStore::new();
        let report =
            bulk_import(&mut store, &policy, vec![machine("I1"), machine("I2")]).unwrap();
        assert_eq!(report, ImportReport { inserted: 2, skipped: 0 });
        assert_eq!(store.count("machines").unwrap(), 2);
    }

    #[test]
    fn test_in_batch_duplicate_keys_are_skipped() {
        let policy = machine_policy();
        let mut store = MemoryStore::new();
        let report = bulk_import(
            &mut store,
            &policy,
            vec![machine("I1"), machine("I1"), machine("I2")],
        )
        .unwrap();
        assert_eq!(report, ImportReport { inserted: 2, skipped: 1 });
    }

    #[test]
    fn test_all_existing_batch_is_a_noop() {
        let policy = machine_policy();
        let mut store = MemoryStore::new();
        bulk_import(&mut store, &policy, vec![machine("I1")]).unwrap();

        let report = bulk_import(&mut store, &policy, vec![machine("I1")]).unwrap();
        assert_eq!(report, ImportReport { inserted: 0, skipped: 1 });
        assert_eq!(store.count("machines").unwrap(), 1);
    }

    #[test]
    fn test_caller_supplied_ids_and_timestamps_are_ignored() {
        let policy = machine_policy();
        let mut store = MemoryStore::new();
        let mut record = machine("I1");
        record.id = Some(crate::model::DocId::from("forged"));
        record.created_at = -1;
        record.updated_at = -1;

        bulk_import(&mut store, &policy, vec![record]).unwrap();
        let stored = store
            .find_by_field("machines", "codigo", &Value::Text("I1".to_string()))
            .unwrap()
            .remove(0);
        assert_ne!(stored.id, Some(crate::model::DocId::from("forged")));
        assert!(stored.created_at > 0);
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[test]
    fn test_validation_failure_is_counted_not_fatal_mid_batch() {
        let policy = machine_policy();
        let mut store = MemoryStore::new();
        let err = bulk_import(
            &mut store,
            &policy,
            vec![machine("I1"), machine(""), machine("I3")],
        )
        .unwrap_err();

        match err {
            EngineError::BatchPartialFailure { succeeded, failed } => {
                assert_eq!(succeeded, 2);
                assert_eq!(failed, 1);
            }
            other => panic!("expected partial failure, got {other}"),
        }
        assert_eq!(store.count("machines").unwrap(), 2);
    }
}
