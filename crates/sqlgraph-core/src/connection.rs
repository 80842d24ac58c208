//! Row-source and connection contracts.
//!
//! Mapping consumes rows through [`RowSource`], a forward-only cursor with
//! column metadata queried once. Statement builders run SQL through a
//! [`Connection`]. Both are synchronous: a row fetch is the only blocking
//! point and belongs to the driver.

use crate::Result;
use crate::row::{ColumnInfo, Row};
use crate::types::SqlType;
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::Arc;

/// A forward-only cursor over one result set.
pub trait RowSource {
    /// Column metadata, identical for every row of this result set.
    fn columns(&self) -> Arc<ColumnInfo>;

    /// Fetch the next row, or `None` once the result set is exhausted.
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// SQL that produced this result set, for diagnostics.
    fn sql(&self) -> Option<&str> {
        None
    }
}

impl<R: RowSource + ?Sized> RowSource for &mut R {
    fn columns(&self) -> Arc<ColumnInfo> {
        (**self).columns()
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        (**self).next_row()
    }

    fn sql(&self) -> Option<&str> {
        (**self).sql()
    }
}

/// An in-memory result set.
#[derive(Debug, Clone)]
pub struct VecRowSource {
    columns: Arc<ColumnInfo>,
    rows: VecDeque<Vec<Value>>,
    sql: Option<String>,
}

impl VecRowSource {
    pub fn new(columns: ColumnInfo, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: Arc::new(columns),
            rows: rows.into(),
            sql: None,
        }
    }

    /// Shorthand for columns without table metadata.
    pub fn from_labels(labels: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self::new(
            ColumnInfo::new(labels.iter().map(|l| (*l).to_string()).collect()),
            rows,
        )
    }

    /// Attach the SQL text reported in errors.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Rows not yet fetched.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowSource for VecRowSource {
    fn columns(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self
            .rows
            .pop_front()
            .map(|values| Row::with_columns(Arc::clone(&self.columns), values)))
    }

    fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }
}

/// A positional statement parameter with an optional type hint.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: Value,
    pub sql_type: Option<SqlType>,
}

impl Param {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            sql_type: None,
        }
    }

    /// A parameter bound as `sql_type`.
    pub fn typed(value: impl Into<Value>, sql_type: SqlType) -> Self {
        Self {
            value: value.into(),
            sql_type: Some(sql_type),
        }
    }

    /// A NULL of a known type.
    pub fn null(sql_type: SqlType) -> Self {
        Self::typed(Value::Null, sql_type)
    }

    /// The value to hand to the driver, coerced to the hint if one is set.
    pub fn bind_value(&self) -> Result<Value> {
        match self.sql_type {
            Some(ty) => ty.coerce(self.value.clone()),
            None => Ok(self.value.clone()),
        }
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Self {
            value,
            sql_type: None,
        }
    }
}

/// A synchronous database connection.
pub trait Connection {
    /// Cursor type returned by [`query`](Connection::query). It must release
    /// its statement when dropped.
    type Rows<'conn>: RowSource
    where
        Self: 'conn;

    /// Run a query and return a cursor over its rows.
    fn query<'conn>(&'conn self, sql: &str, params: &[Param]) -> Result<Self::Rows<'conn>>;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Param]) -> Result<u64>;

    /// Key generated by the most recent insert on this connection, if any.
    fn generated_key(&self) -> Option<i64>;
}
