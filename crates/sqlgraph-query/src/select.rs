//! SELECT runner: expand, execute, hand rows to a row handler.

use sqlgraph_core::{
    Connection, Entity, EntityMeta, EntityRef, Error, FromValue, Param, Result, ResultSizeError,
    Row, RowSource, SqlType, Value,
};
use sqlgraph_mapper::{
    JoiningRowHandler, JoiningSelect, MapperConfig, RowHandler, SingleFieldListRowHandler,
};

/// A query bound to a connection, ready to be run through a row handler.
///
/// ```ignore
/// let users = Select::new(&conn, "select {User.*} from users where name like ?1")
///     .bind("a%")
///     .select_beans::<User>()?;
/// ```
#[derive(Debug)]
pub struct Select<'c, C: Connection> {
    conn: &'c C,
    sql: String,
    params: Vec<Param>,
    config: MapperConfig,
}

pub(crate) fn incorrect_size(expected: u64, actual: u64, sql: &str, what: &str) -> Error {
    Error::ResultSize(ResultSizeError {
        expected,
        actual,
        sql: sql.to_string(),
        message: format!("expected {expected} {what}, but got {actual} ({sql})"),
    })
}

impl<'c, C: Connection> Select<'c, C> {
    pub fn new(conn: &'c C, sql: impl Into<String>) -> Self {
        Self {
            conn,
            sql: sql.into(),
            params: Vec::new(),
            config: MapperConfig::default(),
        }
    }

    /// Bind the next positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(Param::new(value));
        self
    }

    /// Bind the next parameter with an explicit type, e.g. for NULLs.
    pub fn bind_typed(mut self, value: impl Into<Value>, sql_type: SqlType) -> Self {
        self.params.push(Param::typed(value, sql_type));
        self
    }

    /// Bind several parameters.
    pub fn bind_all(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    /// Mapper settings for the bean helpers.
    pub fn config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Run the query through `handler`.
    ///
    /// Rows are fed in order until they run out or the handler returns
    /// `false`. The cursor is released before the handler is finished.
    #[tracing::instrument(level = "debug", skip(self, handler), fields(sql = %self.sql))]
    pub fn run<H: RowHandler>(self, mut handler: H) -> Result<H::Output> {
        let sql = handler.expand(&self.sql)?;
        tracing::debug!(params = self.params.len(), expanded = %sql, "executing select");

        let mut rows = self.conn.query(&sql, &self.params)?;
        let mut row_number = 0usize;
        let mut stopped = false;
        while let Some(row) = rows.next_row()? {
            row_number += 1;
            if !handler.handle(&row, row_number)? {
                stopped = true;
                break;
            }
        }
        drop(rows);

        tracing::debug!(rows = row_number, stopped, "select finished");
        handler.finish()
    }

    fn bean_handler<T: Entity>(&self) -> JoiningRowHandler<T> {
        let mut handler = JoiningRowHandler::with_config(self.config.clone()).entity::<T>();
        handler.set_sql(self.sql.clone());
        handler
    }

    /// Map every row to a `T`, one instance per key, in first-seen order.
    pub fn select_beans<T: Entity>(self) -> Result<Vec<EntityRef<T>>> {
        let handler = self.bean_handler::<T>();
        self.run(handler)
    }

    /// Like [`select_beans`](Self::select_beans), for queries that match at
    /// most one bean.
    pub fn select_bean<T: Entity>(self) -> Result<Option<EntityRef<T>>> {
        let sql = self.sql.clone();
        let mut beans = self.select_beans::<T>()?;
        match beans.len() {
            0 | 1 => Ok(beans.pop()),
            n => Err(incorrect_size(1, n as u64, &sql, "bean")),
        }
    }

    /// First column of every row.
    pub fn select_all_field<T: FromValue>(self) -> Result<Vec<T>> {
        self.run(SingleFieldListRowHandler::<T>::new())
    }

    /// First column of the only row, if there is one.
    pub fn select_field<T: FromValue>(self) -> Result<Option<T>> {
        let sql = self.sql.clone();
        let values = self.select_all_field::<T>()?;
        if values.len() > 1 {
            return Err(incorrect_size(1, values.len() as u64, &sql, "row"));
        }
        Ok(values.into_iter().next())
    }

    /// Map a joined result set with `per_row`.
    ///
    /// `T` is registered for expansion along with `entities`.
    pub fn select_joined<T, F>(
        self,
        entities: impl IntoIterator<Item = EntityMeta>,
        per_row: F,
    ) -> Result<Vec<EntityRef<T>>>
    where
        T: Entity,
        F: FnMut(&mut JoiningRowHandler<T>, &Row) -> Result<()>,
    {
        let handler = self.bean_handler::<T>().entities(entities);
        self.run(JoiningSelect::new(handler, per_row))
    }
}
