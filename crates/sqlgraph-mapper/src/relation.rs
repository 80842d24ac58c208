//! Attaching joined entities to their owners.

use sqlgraph_core::{
    Attached, Cardinality, Entity, EntityRef, MappingError, RelationRef, Result,
};
use std::any::TypeId;
use std::collections::HashMap;

/// Resolves relation fields by name and stores targets in them.
///
/// The field lookup (and with it the field's cardinality) is done once per
/// (owner type, property) and cached for the rest of the session.
#[derive(Debug, Default)]
pub struct RelationBinder {
    fields: HashMap<TypeId, HashMap<&'static str, usize>>,
}

impl RelationBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The relation field `property` of `O`.
    pub fn relation<O: Entity>(&mut self, property: &str) -> Result<&'static RelationRef<O>> {
        let relations = O::relations();
        let per_type = self.fields.entry(TypeId::of::<O>()).or_default();
        if let Some(&index) = per_type.get(property) {
            return Ok(&relations[index]);
        }

        let index = relations
            .iter()
            .position(|r| r.name == property)
            .ok_or_else(|| {
                MappingError::configuration(
                    O::ENTITY_NAME,
                    format!("{} has no relation property named <{}>", O::ENTITY_NAME, property),
                )
            })?;
        let relation = &relations[index];
        per_type.insert(relation.name, index);
        tracing::trace!(
            owner = O::ENTITY_NAME,
            property = relation.name,
            cardinality = relation.cardinality.as_str(),
            "resolved relation field"
        );
        Ok(relation)
    }

    /// Cardinality of the relation field `property` of `O`.
    pub fn cardinality<O: Entity>(&mut self, property: &str) -> Result<Cardinality> {
        self.relation::<O>(property).map(|r| r.cardinality)
    }

    /// Store `target` in `owner.property`.
    ///
    /// Single references are overwritten, lists append when the target is
    /// not already present, sets insert. When `expected` is given the field
    /// must have that cardinality.
    pub fn attach<O: Entity, T: Entity>(
        &mut self,
        owner: &EntityRef<O>,
        property: &str,
        target: &EntityRef<T>,
        expected: Option<Cardinality>,
    ) -> Result<Attached> {
        let relation = self.relation::<O>(property)?;

        if relation.target_type() != TypeId::of::<T>() {
            return Err(MappingError::configuration(
                O::ENTITY_NAME,
                format!(
                    "property <{}> of {} holds {}, not {}",
                    relation.name,
                    O::ENTITY_NAME,
                    relation.target_name(),
                    T::ENTITY_NAME
                ),
            )
            .into());
        }
        if let Some(expected) = expected {
            if expected != relation.cardinality {
                return Err(MappingError::configuration(
                    O::ENTITY_NAME,
                    format!(
                        "property <{}> of {} is a {} relation, not a {} relation",
                        relation.name,
                        O::ENTITY_NAME,
                        relation.cardinality.as_str(),
                        expected.as_str()
                    ),
                )
                .into());
            }
        }

        let mut owner = owner.borrow_mut();
        match relation.slot(&mut owner).attach(target) {
            Attached::WrongType => Err(MappingError::configuration(
                O::ENTITY_NAME,
                format!("property <{}> rejected a {}", relation.name, T::ENTITY_NAME),
            )
            .into()),
            outcome => Ok(outcome),
        }
    }
}
