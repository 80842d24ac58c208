//! Populating one entity from the current row.

use crate::column_index::ColumnIndex;
use crate::config::MapperConfig;
use crate::expand::AliasScope;
use sqlgraph_core::{Entity, Error, MappingError, PropertyRef, Result, Row, Value};

/// Reads property columns of a row through the session's lookup caches.
#[derive(Debug, Clone, Copy)]
pub struct BeanMapper<'a> {
    columns: &'a ColumnIndex,
    scope: &'a AliasScope,
    config: &'a MapperConfig,
}

impl<'a> BeanMapper<'a> {
    pub fn new(columns: &'a ColumnIndex, scope: &'a AliasScope, config: &'a MapperConfig) -> Self {
        Self {
            columns,
            scope,
            config,
        }
    }

    /// 0-based position of `property` under `alias`.
    pub fn position<E>(&self, alias: Option<&str>, property: &PropertyRef<E>) -> Option<usize> {
        self.columns
            .resolve(alias, property.column_name, self.scope, self.config)
    }

    /// Value of `property` under `alias`, or `None` if the column is absent.
    pub fn value<'r, E>(
        &self,
        row: &'r Row,
        alias: Option<&str>,
        property: &PropertyRef<E>,
    ) -> Option<&'r Value> {
        self.position(alias, property).and_then(|i| row.get(i))
    }

    /// Set every writable property of `instance` whose column is present.
    ///
    /// Properties without a matching column are left at their default.
    pub fn map<T: Entity>(&self, row: &Row, alias: Option<&str>, instance: &mut T) -> Result<()> {
        for property in T::properties().iter().filter(|p| p.is_writable()) {
            let Some(index) = self.position(alias, property) else {
                continue;
            };
            let Some(value) = row.get(index) else {
                continue;
            };
            property.set(instance, value).map_err(|err| match err {
                Error::Type(_) => Error::Mapping(MappingError::conversion(
                    T::ENTITY_NAME,
                    property.name,
                    index + 1,
                    property.rust_type,
                    err,
                )),
                other => other,
            })?;
        }
        Ok(())
    }
}
