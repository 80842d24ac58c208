//! Row handler contract and the stock handlers.

use crate::handler::JoiningRowHandler;
use sqlgraph_core::{Entity, EntityRef, Error, FromValue, MappingError, Result, Row};

/// Consumes the rows of one result set and produces an output.
pub trait RowHandler {
    type Output;

    /// Rewrite the statement before it is executed.
    fn expand(&mut self, sql: &str) -> Result<String> {
        Ok(sql.to_string())
    }

    /// Handle one row. `row_number` is 1-based. Returning `false` stops
    /// the traversal.
    fn handle(&mut self, row: &Row, row_number: usize) -> Result<bool>;

    fn finish(self) -> Result<Self::Output>;
}

/// Primary-only mapping: every row yields (or revisits) one `T`.
impl<T: Entity> RowHandler for JoiningRowHandler<T> {
    type Output = Vec<EntityRef<T>>;

    fn expand(&mut self, sql: &str) -> Result<String> {
        JoiningRowHandler::expand(self, sql)
    }

    fn handle(&mut self, row: &Row, _row_number: usize) -> Result<bool> {
        self.map_primary(row, None)?;
        Ok(true)
    }

    fn finish(self) -> Result<Self::Output> {
        Ok(self.into_result())
    }
}

/// A [`JoiningRowHandler`] driven by a per-row closure.
///
/// The closure maps the primary entity and any joins for one row.
pub struct JoiningSelect<T: Entity, F> {
    handler: JoiningRowHandler<T>,
    per_row: F,
}

impl<T, F> JoiningSelect<T, F>
where
    T: Entity,
    F: FnMut(&mut JoiningRowHandler<T>, &Row) -> Result<()>,
{
    pub fn new(handler: JoiningRowHandler<T>, per_row: F) -> Self {
        Self { handler, per_row }
    }

    pub fn handler(&self) -> &JoiningRowHandler<T> {
        &self.handler
    }
}

impl<T, F> RowHandler for JoiningSelect<T, F>
where
    T: Entity,
    F: FnMut(&mut JoiningRowHandler<T>, &Row) -> Result<()>,
{
    type Output = Vec<EntityRef<T>>;

    fn expand(&mut self, sql: &str) -> Result<String> {
        self.handler.expand(sql)
    }

    fn handle(&mut self, row: &Row, _row_number: usize) -> Result<bool> {
        (self.per_row)(&mut self.handler, row)?;
        Ok(true)
    }

    fn finish(self) -> Result<Self::Output> {
        Ok(self.handler.into_result())
    }
}

/// Collects the first column of every row as a `T`.
#[derive(Debug)]
pub struct SingleFieldListRowHandler<T> {
    values: Vec<T>,
}

impl<T: FromValue> Default for SingleFieldListRowHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromValue> SingleFieldListRowHandler<T> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T: FromValue> RowHandler for SingleFieldListRowHandler<T> {
    type Output = Vec<T>;

    fn handle(&mut self, row: &Row, _row_number: usize) -> Result<bool> {
        let value = row.get_as::<T>(0).map_err(|err| match err {
            Error::Type(_) => {
                let column = row
                    .column_info()
                    .name_at(0)
                    .unwrap_or_default()
                    .to_string();
                Error::Mapping(MappingError::conversion(
                    "field",
                    &column,
                    1,
                    std::any::type_name::<T>(),
                    err,
                ))
            }
            other => other,
        })?;
        self.values.push(value);
        Ok(true)
    }

    fn finish(self) -> Result<Self::Output> {
        Ok(self.values)
    }
}
