//! Metadata resolution over static entity descriptors.

use crate::config::KeyPolicy;
use sqlgraph_core::{Entity, MappingError, PropertyRef, RelationRef, Result};
use std::any::TypeId;
use std::collections::HashMap;
use std::rc::Rc;

/// Resolves table names, keys and properties for entity types.
///
/// Key lists are validated once per type and cached as indices into the
/// type's property table.
#[derive(Debug, Default)]
pub struct StaticResolver {
    key_policy: KeyPolicy,
    keys: HashMap<TypeId, Rc<[usize]>>,
}

impl StaticResolver {
    pub fn new(key_policy: KeyPolicy) -> Self {
        Self {
            key_policy,
            keys: HashMap::new(),
        }
    }

    pub fn key_policy(&self) -> KeyPolicy {
        self.key_policy
    }

    /// Whether the keys of `T` were already resolved (and cached) here.
    pub fn has_resolved_keys<T: Entity>(&self) -> bool {
        self.keys.contains_key(&TypeId::of::<T>())
    }

    /// Table name of `T`, as declared (possibly schema qualified).
    pub fn table_name<T: Entity>(&self) -> &'static str {
        T::TABLE_NAME
    }

    /// Key properties of `T`, in key order.
    ///
    /// Fails with a configuration error when `T` has no usable key under
    /// the current policy, or names a key property it does not have.
    pub fn keys<T: Entity>(&mut self) -> Result<Vec<&'static PropertyRef<T>>> {
        let indices = match self.keys.get(&TypeId::of::<T>()) {
            Some(indices) => Rc::clone(indices),
            None => {
                let indices: Rc<[usize]> = self.resolve_keys::<T>()?.into();
                self.keys.insert(TypeId::of::<T>(), Rc::clone(&indices));
                indices
            }
        };
        let properties = T::properties();
        Ok(indices.iter().map(|&i| &properties[i]).collect())
    }

    fn resolve_keys<T: Entity>(&self) -> Result<Vec<usize>> {
        let declared: &[&str] = if !T::KEYS.is_empty() {
            T::KEYS
        } else {
            match self.key_policy {
                KeyPolicy::Strict => {
                    return Err(MappingError::configuration(
                        T::ENTITY_NAME,
                        format!(
                            "no key is defined for type <{}>, mark key fields with #[sqlgraph(key)]",
                            T::ENTITY_NAME
                        ),
                    )
                    .into());
                }
                KeyPolicy::ImplicitId => {
                    tracing::warn!(
                        entity = T::ENTITY_NAME,
                        "no key declared; using implicit key property `id`"
                    );
                    &["id"]
                }
            }
        };

        let properties = T::properties();
        declared
            .iter()
            .map(|key| {
                properties.iter().position(|p| p.name == *key).ok_or_else(|| {
                    MappingError::configuration(
                        T::ENTITY_NAME,
                        format!("type <{}> has no key property <{}>", T::ENTITY_NAME, key),
                    )
                    .into()
                })
            })
            .collect()
    }

    /// Properties of `T`: those with a mutator when `mutators` is set,
    /// otherwise those with an accessor.
    pub fn properties<T: Entity>(
        &self,
        mutators: bool,
    ) -> impl Iterator<Item = &'static PropertyRef<T>> + use<T> {
        T::properties().iter().filter(move |p| {
            if mutators {
                p.is_writable()
            } else {
                p.is_readable()
            }
        })
    }

    /// Find a property of `T` by logical name.
    pub fn find_field<T: Entity>(&self, name: &str) -> Option<&'static PropertyRef<T>> {
        T::find_property(name)
    }

    /// Find a relation field of `T` by name.
    pub fn find_relation<T: Entity>(&self, name: &str) -> Option<&'static RelationRef<T>> {
        T::find_relation(name)
    }
}
