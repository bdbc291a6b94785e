use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use unikey_rs::model::{DocId, Record, Value};
use unikey_rs::policy::EntityPolicy;
use unikey_rs::store::{EntityStore, MemoryStore, StoreError, StoreMetrics};

/// A machine record with the essential fields populated.
#[allow(dead_code)]
pub fn machine(codigo: &str) -> Record {
    Record::new()
        .with_text("codigo", codigo)
        .with_text("descripcion", format!("Maquina {codigo}"))
        .with_text("estado", "STOCK")
}

/// A supply record with the essential fields populated.
#[allow(dead_code)]
pub fn supply(codigo: &str) -> Record {
    Record::new()
        .with_text("codigo", codigo)
        .with_text("descripcion", format!("Insumo {codigo}"))
        .with_text("estado", "PEDIDO")
}

/// Insert a record directly into the store with explicit timestamps,
/// bypassing the engine's write paths. Used to craft duplicate groups and
/// tie-break fixtures.
#[allow(dead_code)]
pub fn insert_at(
    store: &mut dyn EntityStore,
    collection: &str,
    mut record: Record,
    created_at: i64,
) -> DocId {
    record.created_at = created_at;
    record.updated_at = created_at;
    store
        .insert(collection, record)
        .expect("test store insert")
}

/// Generate a seeded catalog with duplicate natural keys and insert it
/// directly into the store. Returns the number of distinct keys generated.
#[allow(dead_code)]
pub fn generate_catalog(
    store: &mut dyn EntityStore,
    policy: &EntityPolicy,
    count: u32,
    duplicate_probability: f64,
    seed: u64,
) -> usize {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keys: Vec<String> = Vec::new();

    for i in 1..=count {
        let codigo = if !keys.is_empty() && rng.random_bool(duplicate_probability) {
            keys[rng.random_range(0..keys.len())].clone()
        } else {
            let fresh = format!("GEN-{i:05}");
            keys.push(fresh.clone());
            fresh
        };

        let mut record = Record::new()
            .with_text(&policy.natural_key_field, codigo)
            .with_text("descripcion", format!("Generado {i}"));
        if rng.random_bool(0.7) {
            record.set_field("estado", "STOCK");
        }
        if rng.random_bool(0.5) {
            record.set_field("chasis", format!("CH-{:04}", rng.random_range(1000..9999)));
        }
        if rng.random_bool(0.3) {
            record.set_field("precio", rng.random_range(100..10_000) as f64);
        }

        let created_at = 1_000 + rng.random_range(0..100_000);
        insert_at(store, &policy.kind, record, created_at);
    }

    keys.len()
}

/// Store wrapper with fault injection for partial-batch and propagation
/// tests: individual inserts can be failed by natural key, or the whole
/// store can be switched off.
#[allow(dead_code)]
pub struct FaultStore {
    inner: MemoryStore,
    pub fail_insert_keys: Vec<String>,
    pub unavailable: bool,
    key_field: String,
}

#[allow(dead_code)]
impl FaultStore {
    pub fn new(key_field: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_insert_keys: Vec::new(),
            unavailable: false,
            key_field: key_field.to_string(),
        }
    }

    pub fn fail_inserts_for(mut self, key: &str) -> Self {
        self.fail_insert_keys.push(key.to_string());
        self
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::unavailable(anyhow::anyhow!(
                "injected outage"
            )))
        } else {
            Ok(())
        }
    }
}

impl EntityStore for FaultStore {
    fn insert(&mut self, collection: &str, record: Record) -> Result<DocId, StoreError> {
        self.check_available()?;
        if let Some(key) = record.natural_key(&self.key_field) {
            if self.fail_insert_keys.iter().any(|k| k == key) {
                return Err(StoreError::unavailable(anyhow::anyhow!(
                    "injected insert fault for key {key}"
                )));
            }
        }
        self.inner.insert(collection, record)
    }

    fn get(&self, collection: &str, id: &DocId) -> Result<Option<Record>, StoreError> {
        self.check_available()?;
        self.inner.get(collection, id)
    }

    fn put(&mut self, collection: &str, id: &DocId, record: Record) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner.put(collection, id, record)
    }

    fn delete(&mut self, collection: &str, id: &DocId) -> Result<(), StoreError> {
        self.check_available()?;
        self.inner.delete(collection, id)
    }

    fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError> {
        self.check_available()?;
        self.inner.find_by_field(collection, field, value)
    }

    fn get_all(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        self.check_available()?;
        self.inner.get_all(collection)
    }

    fn count(&self, collection: &str) -> Result<usize, StoreError> {
        self.check_available()?;
        self.inner.count(collection)
    }

    fn metrics(&self) -> Option<StoreMetrics> {
        self.inner.metrics()
    }
}
