//! UPDATE statements for beans, and raw data-changing statements.

use crate::dialect::Dialect;
use crate::select::incorrect_size;
use sqlgraph_core::{
    Connection, Entity, Error, MappingError, Param, PropertyRef, QueryErrorKind, Result, SqlType,
    Value,
};
use sqlgraph_mapper::{KeyPolicy, StaticResolver};

/// Readable properties of `T` after include/exclude filtering.
pub(crate) fn selected_properties<T: Entity>(
    include: Option<&[String]>,
    exclude: Option<&[String]>,
) -> Vec<&'static PropertyRef<T>> {
    let resolver = StaticResolver::new(KeyPolicy::default());
    resolver
        .properties::<T>(false)
        .filter(|p| exclude.is_none_or(|names| !names.iter().any(|n| n == p.name)))
        .filter(|p| include.is_none_or(|names| names.iter().any(|n| n == p.name)))
        .collect()
}

/// Builds and runs UPDATE statements.
///
/// ```ignore
/// let mut update = UpdateBuilder::new(&conn).exclude_fields(["created_at"]);
/// update.update_bean(&user)?;
/// update.statement_typed("update users set name = ?1 where id = ?2", &[Value::Null, 7.into()], &[SqlType::Text, SqlType::BigInt])?;
/// ```
#[derive(Debug)]
pub struct UpdateBuilder<'c, C: Connection> {
    conn: &'c C,
    entity: Option<String>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    resolver: StaticResolver,
    dialect: Dialect,
    get_keys: bool,
    generated_key: Option<i64>,
}

impl<'c, C: Connection> UpdateBuilder<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self {
            conn,
            entity: None,
            include: None,
            exclude: None,
            resolver: StaticResolver::new(KeyPolicy::default()),
            dialect: Dialect::default(),
            get_keys: false,
            generated_key: None,
        }
    }

    /// Update this table instead of the bean's own.
    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Only update these properties.
    pub fn include_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.include = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Never update these properties.
    pub fn exclude_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.exclude = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// How to find the keys of beans that declare none.
    pub fn key_policy(mut self, policy: KeyPolicy) -> Self {
        self.resolver = StaticResolver::new(policy);
        self
    }

    /// Key metadata resolved so far, kept across `update_bean` calls.
    pub fn resolver(&self) -> &StaticResolver {
        &self.resolver
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Record the generated key after each statement.
    pub fn get_keys(mut self, enabled: bool) -> Self {
        self.get_keys = enabled;
        self
    }

    /// Key generated by the last statement, when `get_keys` is on.
    pub fn generated_key(&self) -> Option<i64> {
        self.generated_key
    }

    /// Update the row of `bean`, matched on its key properties.
    pub fn update_bean<T: Entity>(&mut self, bean: &T) -> Result<()> {
        let keys: Vec<&str> = self.resolver.keys::<T>()?.iter().map(|k| k.name).collect();
        self.update_bean_with_keys(bean, &keys)
    }

    /// Update the row of `bean`, matched on the properties named in `keys`.
    ///
    /// Every other selected readable property is written. Exactly one row
    /// must change.
    pub fn update_bean_with_keys<T: Entity>(&mut self, bean: &T, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Err(MappingError::configuration(
                T::ENTITY_NAME,
                "cannot update bean without a list of keys",
            )
            .into());
        }
        let getters = selected_properties::<T>(self.include.as_deref(), self.exclude.as_deref());
        let (key_properties, value_properties): (
            Vec<&PropertyRef<T>>,
            Vec<&PropertyRef<T>>,
        ) =
            getters.into_iter().partition(|p| keys.contains(&p.name));

        if key_properties.len() != keys.len() {
            return Err(MappingError::configuration(
                T::ENTITY_NAME,
                format!(
                    "key properties {:?} of {} are not all readable and selected",
                    keys,
                    T::ENTITY_NAME
                ),
            )
            .into());
        }
        if value_properties.is_empty() {
            return Err(MappingError::configuration(
                T::ENTITY_NAME,
                format!("{} has no properties left to update", T::ENTITY_NAME),
            )
            .into());
        }

        let table = self.entity.clone().unwrap_or_else(|| T::TABLE_NAME.to_string());
        let mut index = 0;
        let mut placeholder = || {
            index += 1;
            self.dialect.placeholder(index)
        };
        let set = value_properties
            .iter()
            .map(|p| format!("{} = {}", p.column_name, placeholder()))
            .collect::<Vec<_>>()
            .join(",");
        let filter = key_properties
            .iter()
            .map(|p| format!("{} = {}", p.column_name, placeholder()))
            .collect::<Vec<_>>()
            .join(" and ");
        let sql = format!("update {table} set {set} where {filter}");

        let params: Vec<Param> = value_properties
            .iter()
            .chain(&key_properties)
            .map(|p| Param::typed(p.get(bean).unwrap_or(Value::Null), p.sql_type))
            .collect();

        tracing::info!(sql = %sql, entity = T::ENTITY_NAME, "update bean");
        let updated = self.conn.execute(&sql, &params)?;
        if updated != 1 {
            return Err(incorrect_size(1, updated, &sql, "updated row"));
        }
        Ok(())
    }

    /// Run a data-changing statement. Returns the number of affected rows.
    pub fn statement(&mut self, sql: &str, params: &[Param]) -> Result<u64> {
        tracing::info!(sql = %sql, params = params.len(), "update statement");
        let updated = self.conn.execute(sql, params)?;
        self.generated_key = if self.get_keys {
            self.conn.generated_key()
        } else {
            None
        };
        Ok(updated)
    }

    /// Run a statement whose parameters carry explicit SQL types, so NULLs
    /// can be bound. `types` pairs with `values` by position.
    pub fn statement_typed(
        &mut self,
        sql: &str,
        values: &[Value],
        types: &[SqlType],
    ) -> Result<u64> {
        if values.len() != types.len() {
            return Err(Error::query(
                QueryErrorKind::Bind,
                sql,
                format!("{} parameters but {} types", values.len(), types.len()),
            ));
        }
        let params: Vec<Param> = values
            .iter()
            .zip(types)
            .map(|(value, ty)| Param::typed(value.clone(), *ty))
            .collect();
        self.statement(sql, &params)
    }

    /// Run a statement that must change exactly `expected` rows.
    pub fn statement_expecting(&mut self, sql: &str, expected: u64, params: &[Param]) -> Result<u64> {
        let updated = self.statement(sql, params)?;
        if updated != expected {
            let shown: Vec<String> = params.iter().map(|p| format!("{:?}", p.value)).collect();
            return Err(incorrect_size(
                expected,
                updated,
                &format!("{} [{}]", sql, shown.join(",")),
                "updated rows",
            ));
        }
        Ok(updated)
    }
}
