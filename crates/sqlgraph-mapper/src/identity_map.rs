//! Per-session identity map.
//!
//! Repeated joined rows that reference the same parent collapse onto one
//! instance: the map holds at most one `EntityRef` per (type, key), and an
//! entry is never replaced once created.

use sqlgraph_core::{Entity, EntityRef, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Ordered key-property values of one entity instance.
///
/// Integer widths are normalized (an `INTEGER` 1 and a `BIGINT` 1 are the
/// same key) and floats compare by bit pattern so keys stay `Eq`.
#[derive(Debug, Clone)]
pub struct EntityKey(Vec<Value>);

impl EntityKey {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// True when any component is NULL.
    pub fn has_null(&self) -> bool {
        self.0.iter().any(Value::is_null)
    }
}

fn hash_key_value(v: &Value, hasher: &mut impl Hasher) {
    match v {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Int(_) | Value::BigInt(_) => {
            2u8.hash(hasher);
            v.as_i64().hash(hasher);
        }
        Value::Double(f) => {
            3u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Text(s) => {
            4u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Bytes(b) => {
            5u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Json(j) => {
            6u8.hash(hasher);
            j.to_string().hash(hasher);
        }
    }
}

fn key_values_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::BigInt(_), Value::Int(_) | Value::BigInt(_)) => {
            a.as_i64() == b.as_i64()
        }
        (Value::Double(x), Value::Double(y)) => x.to_bits() == y.to_bits(),
        _ => a == b,
    }
}

impl PartialEq for EntityKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(a, b)| key_values_eq(a, b))
    }
}

impl Eq for EntityKey {}

impl Hash for EntityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for v in &self.0 {
            hash_key_value(v, state);
        }
    }
}

/// Identity map for one mapping session.
///
/// Entries store `EntityRef<T>` type-erased and are recovered by downcast.
#[derive(Default)]
pub struct IdentityMap {
    entries: HashMap<(TypeId, EntityKey), Box<dyn Any>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance registered for `key`, if any.
    pub fn get<T: Entity>(&self, key: &EntityKey) -> Option<EntityRef<T>> {
        self.entries
            .get(&(TypeId::of::<T>(), key.clone()))
            .and_then(|entry| entry.downcast_ref::<EntityRef<T>>())
            .cloned()
    }

    pub fn contains<T: Entity>(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(&(TypeId::of::<T>(), key.clone()))
    }

    /// Register `instance` under `key`.
    ///
    /// An existing entry wins: its handle is returned and `instance` is
    /// dropped.
    pub fn insert<T: Entity>(&mut self, key: EntityKey, instance: EntityRef<T>) -> EntityRef<T> {
        let entry = self
            .entries
            .entry((TypeId::of::<T>(), key))
            .or_insert_with(|| Box::new(instance.clone()));
        entry
            .downcast_ref::<EntityRef<T>>()
            .cloned()
            .unwrap_or(instance)
    }

    /// Number of instances of `T` in the map.
    pub fn count<T: Entity>(&self) -> usize {
        let type_id = TypeId::of::<T>();
        self.entries.keys().filter(|(t, _)| *t == type_id).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for IdentityMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityMap")
            .field("entries", &self.entries.len())
            .finish()
    }
}
