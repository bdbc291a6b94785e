//! # Merge Policy
//!
//! Combines an existing record and an incoming record into one. Incoming
//! wins for every key explicitly present in the incoming payload; every key
//! present only in the existing record is carried over unchanged. The merge
//! is a shallow, key-wise override, not a recursive merge and not a
//! numeric or array combination.

use crate::model::{Record, Timestamp};

/// Merge `incoming` into `existing`.
///
/// `id` and `created_at` are always taken from `existing` (immutable once
/// assigned). `updated_at` is set to `now`, clamped so it never moves
/// backwards relative to the existing record.
pub fn merge(existing: &Record, incoming: &Record, now: Timestamp) -> Record {
    let mut fields = existing.fields.clone();
    for (key, value) in &incoming.fields {
        fields.insert(key.clone(), value.clone());
    }

    Record {
        id: existing.id.clone(),
        fields,
        created_at: existing.created_at,
        updated_at: now.max(existing.updated_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocId, Record, Value};

    fn stored() -> Record {
        let mut record = Record::new()
            .with_text("codigo", "I1")
            .with_text("estado", "PEDIDO")
            .with_text("cliente", "Acme")
            .with_number("cantidad", 4.0);
        record.id = Some(DocId::from("doc-1"));
        record.created_at = 1_000;
        record.updated_at = 2_000;
        record
    }

    #[test]
    fn test_incoming_wins_for_present_keys() {
        let incoming = Record::new().with_text("estado", "FACTURADO");
        let merged = merge(&stored(), &incoming, 3_000);
        assert_eq!(
            merged.field("estado"),
            Some(&Value::Text("FACTURADO".to_string()))
        );
    }

    #[test]
    fn test_absent_keys_are_preserved() {
        let incoming = Record::new().with_text("estado", "FACTURADO");
        let merged = merge(&stored(), &incoming, 3_000);
        assert_eq!(merged.field("cliente"), Some(&Value::Text("Acme".to_string())));
        assert_eq!(merged.field("cantidad"), Some(&Value::Number(4.0)));
        assert_eq!(merged.fields.len(), 4);
    }

    #[test]
    fn test_id_and_created_at_come_from_existing() {
        let mut incoming = Record::new().with_text("estado", "FACTURADO");
        incoming.id = Some(DocId::from("doc-99"));
        incoming.created_at = 9_999;

        let merged = merge(&stored(), &incoming, 3_000);
        assert_eq!(merged.id, Some(DocId::from("doc-1")));
        assert_eq!(merged.created_at, 1_000);
    }

    #[test]
    fn test_updated_at_is_monotone_under_clock_skew() {
        let incoming = Record::new().with_text("estado", "FACTURADO");
        let merged = merge(&stored(), &incoming, 1_500);
        assert_eq!(merged.updated_at, 2_000);

        let merged = merge(&stored(), &incoming, 5_000);
        assert_eq!(merged.updated_at, 5_000);
    }

    #[test]
    fn test_merge_is_shallow_key_wise() {
        let incoming = Record::new().with_number("cantidad", 9.0);
        let merged = merge(&stored(), &incoming, 3_000);
        // Override, never a numeric combination.
        assert_eq!(merged.field("cantidad"), Some(&Value::Number(9.0)));
    }

    #[test]
    fn test_empty_incoming_changes_only_updated_at() {
        let merged = merge(&stored(), &Record::new(), 3_000);
        assert_eq!(merged.fields, stored().fields);
        assert_eq!(merged.updated_at, 3_000);
    }
}
