//! # Policy Module
//!
//! Per-entity-kind rules for the reconciliation engine: which field carries
//! the natural key, how completeness is weighted, and what a colliding
//! single-record add does. One generic engine is parameterized by these
//! policies instead of duplicating the pipeline per entity kind.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a single-record `add` does when the natural key already exists.
///
/// This is a named, per-kind strategy; the engine never hard-codes either
/// behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddPolicy {
    /// Reject the add with a duplicate-key error.
    Reject,
    /// Fold the incoming record into the existing one via the merge policy.
    Merge,
}

/// A completeness weight for one field.
///
/// The weight is earned when the field is populated; weights are fixed per
/// entity kind because they determine duplicate-resolution outcomes
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWeight {
    pub field: String,
    pub weight: u32,
}

impl FieldWeight {
    pub fn new(field: impl Into<String>, weight: u32) -> Self {
        Self {
            field: field.into(),
            weight,
        }
    }
}

/// The rules for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPolicy {
    /// Entity kind, doubling as the store collection name.
    pub kind: String,
    /// Field carrying the required natural key.
    pub natural_key_field: String,
    /// Completeness weight table.
    pub weights: Vec<FieldWeight>,
    /// Collision behavior for single-record adds.
    pub add_policy: AddPolicy,
}

impl EntityPolicy {
    /// Create a policy with an empty weight table.
    pub fn new(
        kind: impl Into<String>,
        natural_key_field: impl Into<String>,
        add_policy: AddPolicy,
    ) -> Self {
        Self {
            kind: kind.into(),
            natural_key_field: natural_key_field.into(),
            weights: Vec::new(),
            add_policy,
        }
    }

    /// Add a completeness weight for a field.
    pub fn add_weight(&mut self, field: impl Into<String>, weight: u32) {
        self.weights.push(FieldWeight::new(field, weight));
    }

    /// Chainable variant of [`add_weight`](Self::add_weight).
    pub fn with_weight(mut self, field: impl Into<String>, weight: u32) -> Self {
        self.add_weight(field, weight);
        self
    }

    /// The weight assigned to a field, if any.
    pub fn weight_for(&self, field: &str) -> Option<u32> {
        self.weights
            .iter()
            .find(|entry| entry.field == field)
            .map(|entry| entry.weight)
    }
}

/// Registry of entity policies, keyed by kind.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, EntityPolicy>,
}

impl PolicyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from a list of policies.
    pub fn with_policies(policies: impl IntoIterator<Item = EntityPolicy>) -> Self {
        let mut registry = Self::new();
        for policy in policies {
            registry.register(policy);
        }
        registry
    }

    /// Register a policy, replacing any previous one for the same kind.
    pub fn register(&mut self, policy: EntityPolicy) {
        self.policies.insert(policy.kind.clone(), policy);
    }

    /// Look up the policy for an entity kind.
    pub fn get(&self, kind: &str) -> Option<&EntityPolicy> {
        self.policies.get(kind)
    }

    /// Registered entity kinds, sorted for deterministic iteration.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

/// Built-in policy for the machine catalog.
///
/// Machines are individually tracked assets; a colliding add is treated as
/// operator error and rejected. The natural key and the essential
/// description/status fields dominate the score, secondary identifiers
/// (chassis, purchase-order references) rank next, the hyperlink last.
pub fn machine_policy() -> EntityPolicy {
    EntityPolicy::new("machines", "codigo", AddPolicy::Reject)
        .with_weight("codigo", 10)
        .with_weight("descripcion", 5)
        .with_weight("estado", 5)
        .with_weight("chasis", 3)
        .with_weight("pedido", 2)
        .with_weight("oc", 2)
        .with_weight("hyperlink", 1)
}

/// Built-in policy for the supply catalog.
///
/// Supplies are re-imported repeatedly from spreadsheets, so a colliding add
/// folds the incoming row into the stored record instead of failing the
/// operation.
pub fn supply_policy() -> EntityPolicy {
    EntityPolicy::new("supplies", "codigo", AddPolicy::Merge)
        .with_weight("codigo", 10)
        .with_weight("descripcion", 5)
        .with_weight("estado", 5)
        .with_weight("proveedor", 3)
        .with_weight("cantidad", 2)
}
