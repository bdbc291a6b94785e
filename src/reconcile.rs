//! # Reconciliation Engine
//!
//! Full-collection duplicate repair: group records by natural key, score
//! each group, keep the best record per key and delete the rest. Runs on
//! demand or as a startup sweep, and re-reads the store on every invocation
//! rather than caching across calls.

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::EngineError;
use crate::model::{now, Record};
use crate::policy::EntityPolicy;
use crate::score::score;
use crate::store::EntityStore;

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    /// Records deleted as duplicate losers.
    pub removed: usize,
    /// Surviving natural keys.
    pub kept: usize,
}

/// Reconcile a collection with the default behavior (loser fields folded
/// into the winner before deletion).
pub fn reconcile(
    store: &mut dyn EntityStore,
    policy: &EntityPolicy,
) -> Result<ReconcileOutcome, EngineError> {
    reconcile_with(store, policy, true)
}

/// Reconcile a collection.
///
/// Duplicate groups are ordered by completeness score descending, then
/// `created_at` ascending (earliest creation wins ties), then id ascending
/// so the pass is fully deterministic. When `fold_loser_fields` is set,
/// fields present only on losers are folded into the winner through the
/// merge precedence (the winner's own values always take priority, and the
/// highest-ranked loser supplies any field the winner lacks) before the
/// losers are deleted; the winner document is only rewritten when the fold
/// actually adds a field, so an immediate re-run performs zero writes.
#[instrument(skip_all, fields(kind = %policy.kind))]
pub fn reconcile_with(
    store: &mut dyn EntityStore,
    policy: &EntityPolicy,
    fold_loser_fields: bool,
) -> Result<ReconcileOutcome, EngineError> {
    let records = store.get_all(&policy.kind)?;
    let groups = group_by_natural_key(policy, records);

    let mut removed = 0;
    let mut kept = 0;

    for (key, group) in groups {
        if group.len() == 1 {
            kept += 1;
            continue;
        }

        let ranked = rank_candidates(policy, group);
        let (winner, losers) = ranked.split_first().expect("duplicate group is non-empty");
        debug!(
            key = %key,
            losers = losers.len(),
            winner = winner.id.as_ref().map(|id| id.as_str()).unwrap_or(""),
            "resolving duplicate group"
        );

        if fold_loser_fields {
            let mut folded = winner.fields.clone();
            for loser in losers {
                for (field, value) in &loser.fields {
                    folded
                        .entry(field.clone())
                        .or_insert_with(|| value.clone());
                }
            }
            // The fold only ever adds keys, so a length change is the
            // precise signal that the winner needs rewriting.
            if folded.len() != winner.fields.len() {
                if let Some(id) = &winner.id {
                    let mut rewritten = winner.clone();
                    rewritten.fields = folded;
                    rewritten.updated_at = now().max(winner.updated_at);
                    store.put(&policy.kind, id, rewritten)?;
                }
            }
        }

        for loser in losers {
            match &loser.id {
                Some(id) => {
                    store.delete(&policy.kind, id)?;
                    removed += 1;
                }
                None => warn!(key = %key, "skipping unpersisted duplicate without an id"),
            }
        }
        kept += 1;
    }

    info!(removed, kept, "reconciliation pass complete");
    Ok(ReconcileOutcome { removed, kept })
}

/// Run a reconciliation pass only if some natural key has more than one
/// record.
///
/// Returns `None` when there is nothing to do, so callers can distinguish
/// "nothing to do" from "ran and removed nothing". The pre-check is a single
/// occurrence count over one collection read; the full pass re-reads the
/// store for freshness.
pub fn auto_reconcile_if_needed(
    store: &mut dyn EntityStore,
    policy: &EntityPolicy,
) -> Result<Option<ReconcileOutcome>, EngineError> {
    auto_reconcile_if_needed_with(store, policy, true)
}

/// Pre-checked reconciliation with an explicit fold setting.
pub fn auto_reconcile_if_needed_with(
    store: &mut dyn EntityStore,
    policy: &EntityPolicy,
    fold_loser_fields: bool,
) -> Result<Option<ReconcileOutcome>, EngineError> {
    let records = store.get_all(&policy.kind)?;
    let mut occurrences: FxHashMap<&str, usize> = FxHashMap::default();
    let mut has_duplicates = false;
    for record in &records {
        if let Some(key) = valid_natural_key(policy, record) {
            let count = occurrences.entry(key).or_insert(0);
            *count += 1;
            if *count > 1 {
                has_duplicates = true;
                break;
            }
        }
    }

    if !has_duplicates {
        debug!(kind = %policy.kind, "no duplicate natural keys, skipping reconciliation");
        return Ok(None);
    }
    reconcile_with(store, policy, fold_loser_fields).map(Some)
}

/// Group records by natural key, excluding records without a valid key.
///
/// Such records cannot be written through the engine; when a shared store
/// contains them anyway they are left alone and logged.
fn group_by_natural_key(
    policy: &EntityPolicy,
    records: Vec<Record>,
) -> FxHashMap<String, Vec<Record>> {
    let mut groups: FxHashMap<String, Vec<Record>> = FxHashMap::default();
    for record in records {
        match valid_natural_key(policy, &record) {
            Some(key) => groups.entry(key.to_string()).or_default().push(record),
            None => warn!(
                kind = %policy.kind,
                id = record.id.as_ref().map(|id| id.as_str()).unwrap_or(""),
                "record without a valid natural key excluded from reconciliation"
            ),
        }
    }
    groups
}

fn valid_natural_key<'a>(policy: &EntityPolicy, record: &'a Record) -> Option<&'a str> {
    record
        .natural_key(&policy.natural_key_field)
        .filter(|key| !key.trim().is_empty())
}

/// Order duplicate candidates: best first.
pub(crate) fn rank_candidates(policy: &EntityPolicy, mut group: Vec<Record>) -> Vec<Record> {
    group.sort_by(|a, b| {
        score(policy, b)
            .cmp(&score(policy, a))
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocId;
    use crate::policy::machine_policy;

    fn candidate(id: &str, created_at: i64, chassis: Option<&str>) -> Record {
        let mut record = Record::new()
            .with_text("codigo", "M1")
            .with_text("descripcion", "Tractor X")
            .with_text("estado", "STOCK");
        if let Some(chassis) = chassis {
            record.set_field("chasis", chassis);
        }
        record.id = Some(DocId::from(id));
        record.created_at = created_at;
        record.updated_at = created_at;
        record
    }

    #[test]
    fn test_rank_prefers_higher_score() {
        let policy = machine_policy();
        let ranked = rank_candidates(
            &policy,
            vec![
                candidate("doc-1", 100, None),
                candidate("doc-2", 200, Some("CH99")),
            ],
        );
        assert_eq!(ranked[0].id, Some(DocId::from("doc-2")));
    }

    #[test]
    fn test_rank_breaks_score_ties_by_earliest_creation() {
        let policy = machine_policy();
        let ranked = rank_candidates(
            &policy,
            vec![candidate("doc-2", 200, None), candidate("doc-1", 100, None)],
        );
        assert_eq!(ranked[0].id, Some(DocId::from("doc-1")));
    }

    #[test]
    fn test_rank_breaks_full_ties_by_id() {
        let policy = machine_policy();
        let ranked = rank_candidates(
            &policy,
            vec![candidate("doc-9", 100, None), candidate("doc-2", 100, None)],
        );
        assert_eq!(ranked[0].id, Some(DocId::from("doc-2")));
    }

    #[test]
    fn test_grouping_excludes_invalid_keys() {
        let policy = machine_policy();
        let keyless = Record::new().with_text("descripcion", "sin codigo");
        let blank = Record::new().with_text("codigo", "  ");
        let groups = group_by_natural_key(
            &policy,
            vec![candidate("doc-1", 100, None), keyless, blank],
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["M1"].len(), 1);
    }
}
