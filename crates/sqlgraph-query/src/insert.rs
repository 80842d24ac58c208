//! INSERT statements for beans.

use crate::dialect::Dialect;
use crate::update::selected_properties;
use sqlgraph_core::{Connection, Entity, MappingError, Param, Result, Value};
use sqlgraph_mapper::{KeyPolicy, StaticResolver};
use std::cell::RefCell;

/// Inserts beans.
///
/// Key properties whose value is NULL are left out of the column list so
/// the database can generate them; with [`get_keys`](Self::get_keys) the
/// generated key is returned.
#[derive(Debug)]
pub struct InsertBuilder<'c, C: Connection> {
    conn: &'c C,
    entity: Option<String>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    resolver: RefCell<StaticResolver>,
    dialect: Dialect,
    get_keys: bool,
}

impl<'c, C: Connection> InsertBuilder<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self {
            conn,
            entity: None,
            include: None,
            exclude: None,
            resolver: RefCell::new(StaticResolver::new(KeyPolicy::default())),
            dialect: Dialect::default(),
            get_keys: false,
        }
    }

    /// Insert into this table instead of the bean's own.
    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn include_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.include = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.exclude = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// How to find the keys of beans that declare none.
    pub fn key_policy(mut self, policy: KeyPolicy) -> Self {
        self.resolver = RefCell::new(StaticResolver::new(policy));
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Return the generated key from [`insert_bean`](Self::insert_bean).
    pub fn get_keys(mut self, enabled: bool) -> Self {
        self.get_keys = enabled;
        self
    }

    /// Insert `bean`. Returns the generated key when `get_keys` is on and
    /// the driver reports one.
    pub fn insert_bean<T: Entity>(&self, bean: &T) -> Result<Option<i64>> {
        let keys: Vec<&str> = match self.resolver.borrow_mut().keys::<T>() {
            Ok(keys) => keys.iter().map(|k| k.name).collect(),
            // beans without keys insert every column
            Err(_) if T::KEYS.is_empty() => Vec::new(),
            Err(e) => return Err(e),
        };
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for property in selected_properties::<T>(self.include.as_deref(), self.exclude.as_deref()) {
            let value = property.get(bean).unwrap_or(Value::Null);
            if value.is_null() && keys.contains(&property.name) {
                continue;
            }
            columns.push(property.column_name);
            params.push(Param::typed(value, property.sql_type));
        }
        if columns.is_empty() {
            return Err(MappingError::configuration(
                T::ENTITY_NAME,
                format!("{} has no properties to insert", T::ENTITY_NAME),
            )
            .into());
        }

        let table = self.entity.as_deref().unwrap_or(T::TABLE_NAME);
        let placeholders: Vec<String> = (1..=params.len())
            .map(|i| self.dialect.placeholder(i))
            .collect();
        let sql = format!(
            "insert into {} ({}) values ({})",
            table,
            columns.join(","),
            placeholders.join(",")
        );

        tracing::info!(sql = %sql, entity = T::ENTITY_NAME, "insert bean");
        self.conn.execute(&sql, &params)?;
        Ok(if self.get_keys {
            self.conn.generated_key()
        } else {
            None
        })
    }
}
