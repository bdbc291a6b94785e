//! # Identity Resolver
//!
//! Finds existing records sharing a natural key, and validates natural keys
//! on write paths. The lookup is an exact-match store query on the policy's
//! key field; the same grouping logic drives the reconciliation engine's
//! full-collection pass.

use crate::error::ValidationError;
use crate::model::{Record, Value};
use crate::policy::EntityPolicy;
use crate::store::{EntityStore, StoreError};

/// Validate the natural key of a record against a policy.
///
/// The key must be a text value, non-empty after trimming whitespace. The
/// stored value is not rewritten; keys compare by exact string equality.
pub fn validate_natural_key<'a>(
    policy: &EntityPolicy,
    record: &'a Record,
) -> Result<&'a str, ValidationError> {
    match record.field(&policy.natural_key_field) {
        None => Err(ValidationError::MissingNaturalKey {
            field: policy.natural_key_field.clone(),
        }),
        Some(Value::Text(key)) => {
            if key.trim().is_empty() {
                Err(ValidationError::EmptyNaturalKey {
                    field: policy.natural_key_field.clone(),
                })
            } else {
                Ok(key)
            }
        }
        Some(_) => Err(ValidationError::NaturalKeyNotText {
            field: policy.natural_key_field.clone(),
        }),
    }
}

/// All stored records whose natural key equals `key` exactly.
///
/// Store failures propagate unchanged; the resolver performs no retries.
pub fn find_by_natural_key(
    store: &dyn EntityStore,
    policy: &EntityPolicy,
    key: &str,
) -> Result<Vec<Record>, StoreError> {
    store.find_by_field(
        &policy.kind,
        &policy.natural_key_field,
        &Value::Text(key.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::machine_policy;
    use crate::store::MemoryStore;

    #[test]
    fn test_validate_accepts_trimmed_nonempty_key() {
        let policy = machine_policy();
        let record = Record::new().with_text("codigo", "M1");
        assert_eq!(validate_natural_key(&policy, &record).unwrap(), "M1");
    }

    #[test]
    fn test_validate_rejects_missing_empty_and_nontext_keys() {
        let policy = machine_policy();

        let missing = Record::new().with_text("descripcion", "Tractor X");
        assert!(matches!(
            validate_natural_key(&policy, &missing),
            Err(ValidationError::MissingNaturalKey { .. })
        ));

        let blank = Record::new().with_text("codigo", "   ");
        assert!(matches!(
            validate_natural_key(&policy, &blank),
            Err(ValidationError::EmptyNaturalKey { .. })
        ));

        let numeric = Record::new().with_number("codigo", 12.0);
        assert!(matches!(
            validate_natural_key(&policy, &numeric),
            Err(ValidationError::NaturalKeyNotText { .. })
        ));
    }

    #[test]
    fn test_find_by_natural_key_exact_match() {
        let policy = machine_policy();
        let mut store = MemoryStore::new();
        store
            .insert("machines", Record::new().with_text("codigo", "M1"))
            .unwrap();
        store
            .insert("machines", Record::new().with_text("codigo", "M1"))
            .unwrap();
        store
            .insert("machines", Record::new().with_text("codigo", "M1 "))
            .unwrap();

        let hits = find_by_natural_key(&store, &policy, "M1").unwrap();
        assert_eq!(hits.len(), 2, "trailing-space key is a distinct key");
        assert!(find_by_natural_key(&store, &policy, "M9").unwrap().is_empty());
    }
}
