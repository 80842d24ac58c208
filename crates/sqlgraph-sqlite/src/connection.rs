//! SQLite connection and row cursor.

use crate::ffi;
use crate::types;
use sqlgraph_core::{
    ColumnInfo, Connection, ConnectionError, ConnectionErrorKind, Error, Param, QueryError,
    QueryErrorKind, Result, Row, RowSource,
};
use std::cell::Cell;
use std::ffi::{CStr, CString, c_int};
use std::fmt;
use std::ptr;
use std::sync::Arc;

/// Flags passed to `sqlite3_open_v2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    pub read_only: bool,
    pub read_write: bool,
    pub create: bool,
    /// Interpret the path as a `file:` URI.
    pub uri: bool,
}

impl OpenFlags {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            read_write: false,
            create: false,
            uri: false,
        }
    }

    pub fn read_write() -> Self {
        Self {
            read_only: false,
            read_write: true,
            create: false,
            uri: false,
        }
    }

    /// Open for reading and writing, creating the file if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_only: false,
            read_write: true,
            create: true,
            uri: false,
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = 0;
        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }
        flags
    }
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self::create_read_write()
    }
}

/// Configuration for opening a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// File path, or `:memory:`.
    pub path: String,
    pub flags: OpenFlags,
    /// Milliseconds to wait on a locked database; 0 disables waiting.
    pub busy_timeout_ms: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::default(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn memory() -> Self {
        Self::default()
    }

    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

/// A prepared statement, finalized on drop.
struct Statement {
    raw: *mut ffi::sqlite3_stmt,
}

impl Drop for Statement {
    fn drop(&mut self) {
        // SAFETY: raw came from sqlite3_prepare_v2 and is finalized once
        unsafe {
            ffi::sqlite3_finalize(self.raw);
        }
    }
}

/// Single SQLite database handle driving sqlgraph queries and statements.
///
/// The handle is used from one thread at a time; cursors borrow the
/// connection, so it cannot be closed while one is open.
pub struct SqliteConnection {
    db: *mut ffi::sqlite3,
    path: String,
    generated_key: Cell<Option<i64>>,
}

// SAFETY: the bundled library is built in serialized mode and the handle is
// only ever moved, never shared, since SqliteConnection is not Sync.
unsafe impl Send for SqliteConnection {}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let c_path = CString::new(config.path.as_str())
            .map_err(|_| connect_error("Invalid path: contains null byte".to_string()))?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: valid pointers; the return value is checked
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &raw mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if db.is_null() {
                ffi::error_string(rc).to_string()
            } else {
                let msg = error_message(db);
                // SAFETY: db was allocated by sqlite3_open_v2 and is not used again
                unsafe {
                    ffi::sqlite3_close(db);
                }
                msg
            };
            return Err(connect_error(format!("Failed to open database: {}", msg)));
        }

        if config.busy_timeout_ms > 0 {
            let ms = c_int::try_from(config.busy_timeout_ms).unwrap_or(c_int::MAX);
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, ms);
            }
        }

        tracing::debug!(path = %config.path, flags, "opened sqlite database");
        Ok(Self {
            db,
            path: config.path.clone(),
            generated_key: Cell::new(None),
        })
    }

    /// Fresh private `:memory:` database.
    pub fn open_memory() -> Result<Self> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database, creating it if needed.
    pub fn open_file(path: impl Into<String>) -> Result<Self> {
        Self::open(&SqliteConfig::file(path))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run one or more `;`-separated statements without parameters, for DDL
    /// and fixtures.
    pub fn execute_raw(&self, sql: &str) -> Result<()> {
        let c_sql = CString::new(sql).map_err(|_| nul_in_sql(sql))?;
        let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: all pointers are valid for the duration of the call
        let rc = unsafe {
            ffi::sqlite3_exec(self.db, c_sql.as_ptr(), None, ptr::null_mut(), &raw mut errmsg)
        };

        if rc != ffi::SQLITE_OK {
            let msg = if errmsg.is_null() {
                ffi::error_string(rc).to_string()
            } else {
                // SAFETY: errmsg is a NUL-terminated string allocated by SQLite
                let msg = unsafe { CStr::from_ptr(errmsg) }
                    .to_string_lossy()
                    .into_owned();
                // SAFETY: errmsg was allocated by sqlite3_exec and is freed once
                unsafe { ffi::sqlite3_free(errmsg.cast()) };
                msg
            };
            return Err(query_error(rc, sql, msg));
        }
        Ok(())
    }

    /// Rowid of the most recent successful insert on this connection.
    pub fn last_insert_rowid(&self) -> i64 {
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(self.db) }
    }

    /// Rows changed by the most recent data-changing statement.
    pub fn changes(&self) -> u64 {
        // SAFETY: db is valid
        let changes = unsafe { ffi::sqlite3_changes(self.db) };
        u64::try_from(changes).unwrap_or(0)
    }

    fn prepare(&self, sql: &str, params: &[Param]) -> Result<Statement> {
        let c_sql = CString::new(sql).map_err(|_| nul_in_sql(sql))?;
        let len = c_int::try_from(c_sql.as_bytes().len()).map_err(|_| {
            Error::query(QueryErrorKind::Syntax, sql, "SQL text is too long")
        })?;
        let mut raw: *mut ffi::sqlite3_stmt = ptr::null_mut();

        // SAFETY: all pointers are valid for the duration of the call
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(self.db, c_sql.as_ptr(), len, &raw mut raw, ptr::null_mut())
        };
        if rc != ffi::SQLITE_OK {
            return Err(last_error(self.db, sql));
        }
        if raw.is_null() {
            return Err(Error::query(
                QueryErrorKind::Syntax,
                sql,
                "SQL contains no statement",
            ));
        }
        let stmt = Statement { raw };
        tracing::trace!(sql = %sql, params = params.len(), "prepared statement");

        // SAFETY: stmt is valid
        let expected = unsafe { ffi::sqlite3_bind_parameter_count(stmt.raw) };
        if usize::try_from(expected).ok() != Some(params.len()) {
            return Err(Error::query(
                QueryErrorKind::Bind,
                sql,
                format!(
                    "statement takes {} parameters but {} were given",
                    expected,
                    params.len()
                ),
            ));
        }
        for (i, param) in params.iter().enumerate() {
            let value = param.bind_value()?;
            let index = c_int::try_from(i + 1)
                .map_err(|_| Error::query(QueryErrorKind::Bind, sql, "too many parameters"))?;
            // SAFETY: stmt is valid and index is within the parameter count
            let rc = unsafe { types::bind_value(stmt.raw, index, &value) };
            if rc != ffi::SQLITE_OK {
                return Err(bind_error(self.db, sql, i + 1));
            }
        }
        Ok(stmt)
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        // SAFETY: db is valid; close_v2 defers if statements are still open
        unsafe {
            ffi::sqlite3_close_v2(self.db);
        }
    }
}

impl Connection for SqliteConnection {
    type Rows<'conn> = SqliteRows<'conn>;

    fn query<'conn>(&'conn self, sql: &str, params: &[Param]) -> Result<SqliteRows<'conn>> {
        let stmt = self.prepare(sql, params)?;

        // SAFETY: stmt is valid
        let count = unsafe { ffi::sqlite3_column_count(stmt.raw) };
        let mut names = Vec::new();
        let mut tables = Vec::new();
        for i in 0..count {
            // SAFETY: stmt is valid and i is a column index
            unsafe {
                names.push(types::column_name(stmt.raw, i));
                tables.push(types::column_table(stmt.raw, i));
            }
        }

        Ok(SqliteRows {
            conn: self,
            stmt,
            count,
            columns: Arc::new(ColumnInfo::with_tables(names, tables)),
            sql: sql.to_string(),
            done: false,
        })
    }

    fn execute(&self, sql: &str, params: &[Param]) -> Result<u64> {
        let stmt = self.prepare(sql, params)?;
        let rowid_before = self.last_insert_rowid();
        loop {
            // SAFETY: stmt is valid
            match unsafe { ffi::sqlite3_step(stmt.raw) } {
                ffi::SQLITE_ROW => {}
                ffi::SQLITE_DONE => break,
                _ => return Err(last_error(self.db, sql)),
            }
        }
        drop(stmt);

        let changes = self.changes();
        let rowid = self.last_insert_rowid();
        self.generated_key
            .set((changes > 0 && rowid != rowid_before).then_some(rowid));
        tracing::trace!(sql = %sql, changes, "executed statement");
        Ok(changes)
    }

    fn generated_key(&self) -> Option<i64> {
        self.generated_key.get()
    }
}

/// A forward-only cursor over a SQLite result set.
///
/// Rows are stepped lazily; the statement is finalized when the cursor is
/// dropped, whether or not it was exhausted.
pub struct SqliteRows<'conn> {
    conn: &'conn SqliteConnection,
    stmt: Statement,
    count: c_int,
    columns: Arc<ColumnInfo>,
    sql: String,
    done: bool,
}

impl fmt::Debug for SqliteRows<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteRows")
            .field("sql", &self.sql)
            .field("columns", &self.columns.names())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl RowSource for SqliteRows<'_> {
    fn columns(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        // SAFETY: stmt is valid until self is dropped
        match unsafe { ffi::sqlite3_step(self.stmt.raw) } {
            ffi::SQLITE_ROW => {
                let values = (0..self.count)
                    // SAFETY: the last step returned SQLITE_ROW and i < column count
                    .map(|i| unsafe { types::read_column(self.stmt.raw, i) })
                    .collect();
                Ok(Some(Row::with_columns(Arc::clone(&self.columns), values)))
            }
            ffi::SQLITE_DONE => {
                self.done = true;
                Ok(None)
            }
            _ => {
                self.done = true;
                Err(last_error(self.conn.db, &self.sql))
            }
        }
    }

    fn sql(&self) -> Option<&str> {
        Some(&self.sql)
    }
}

// Helper functions

fn connect_error(message: String) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Connect,
        message,
        source: None,
    })
}

fn nul_in_sql(sql: &str) -> Error {
    Error::query(QueryErrorKind::Syntax, sql, "SQL contains null byte")
}

fn error_message(db: *mut ffi::sqlite3) -> String {
    // SAFETY: db is valid; errmsg returns a NUL-terminated string owned by SQLite
    unsafe { CStr::from_ptr(ffi::sqlite3_errmsg(db)) }
        .to_string_lossy()
        .into_owned()
}

fn query_error(code: c_int, sql: &str, message: String) -> Error {
    Error::Query(QueryError {
        kind: error_code_to_kind(code, &message),
        sql: Some(sql.to_string()),
        message,
        source: None,
    })
}

fn last_error(db: *mut ffi::sqlite3, sql: &str) -> Error {
    // SAFETY: db is valid
    let code = unsafe { ffi::sqlite3_errcode(db) };
    query_error(code, sql, error_message(db))
}

fn bind_error(db: *mut ffi::sqlite3, sql: &str, param_index: usize) -> Error {
    Error::query(
        QueryErrorKind::Bind,
        sql,
        format!(
            "Failed to bind parameter {}: {}",
            param_index,
            error_message(db)
        ),
    )
}

fn error_code_to_kind(code: c_int, message: &str) -> QueryErrorKind {
    match code {
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => QueryErrorKind::Busy,
        ffi::SQLITE_NOTFOUND => QueryErrorKind::NotFound,
        ffi::SQLITE_RANGE | ffi::SQLITE_MISMATCH => QueryErrorKind::Bind,
        ffi::SQLITE_ERROR if message.contains("syntax error") => QueryErrorKind::Syntax,
        ffi::SQLITE_ERROR if message.starts_with("no such ") => QueryErrorKind::NotFound,
        _ => QueryErrorKind::Database,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlgraph_core::{SqlType, Value};

    fn memory() -> SqliteConnection {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw(
            "create table users (id integer primary key, name text not null, score real, avatar blob);
             create table files (id integer primary key, user_id integer, name text, meta json);",
        )
        .unwrap();
        conn
    }

    fn collect(mut rows: SqliteRows<'_>) -> Vec<Row> {
        let mut out = Vec::new();
        while let Some(row) = rows.next_row().unwrap() {
            out.push(row);
        }
        out
    }

    #[test]
    fn test_open_memory() {
        let conn = SqliteConnection::open_memory().unwrap();
        assert_eq!(conn.path(), ":memory:");
    }

    #[test]
    fn test_execute_and_query_with_params() {
        let conn = memory();
        let changed = conn
            .execute(
                "insert into users (name, score) values (?1, ?2), (?3, ?4)",
                &[
                    Param::new("ann"),
                    Param::new(1.5),
                    Param::new("bob"),
                    Param::null(SqlType::Double),
                ],
            )
            .unwrap();
        assert_eq!(changed, 2);

        let rows = collect(
            conn.query(
                "select id, name, score from users where name = ?",
                &[Param::new("bob")],
            )
            .unwrap(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), Some(&Value::Int(2)));
        assert_eq!(rows[0].get_named::<String>("name").unwrap(), "bob");
        assert_eq!(rows[0].get(2), Some(&Value::Null));
    }

    #[test]
    fn test_type_conversions() {
        let conn = memory();
        conn.execute(
            "insert into users (id, name, score, avatar) values (?, ?, ?, ?)",
            &[
                Param::new(5_000_000_000_i64),
                Param::new(true),
                Param::new(0.25),
                Param::new(vec![1_u8, 2, 3]),
            ],
        )
        .unwrap();
        let rows = collect(conn.query("select id, name, score, avatar from users", &[]).unwrap());
        let row = &rows[0];
        assert_eq!(row.get(0), Some(&Value::BigInt(5_000_000_000)));
        // booleans are stored as integers; the text column affinity keeps it as "1"
        assert_eq!(row.get(1), Some(&Value::Text("1".into())));
        assert_eq!(row.get(2), Some(&Value::Double(0.25)));
        assert_eq!(row.get(3), Some(&Value::Bytes(vec![1, 2, 3])));
    }

    #[test]
    fn test_json_columns() {
        let conn = memory();
        conn.execute(
            "insert into files (id, name, meta) values (1, ?, ?)",
            &[
                Param::new(Value::Json(serde_json::json!({"size": 3}))),
                Param::new(Value::Json(serde_json::json!({"size": 3}))),
            ],
        )
        .unwrap();
        let rows = collect(conn.query("select name, meta from files", &[]).unwrap());
        assert_eq!(rows[0].get(0), Some(&Value::Text("{\"size\":3}".into())));
        assert_eq!(
            rows[0].get(1),
            Some(&Value::Json(serde_json::json!({"size": 3})))
        );
    }

    #[test]
    fn test_column_tables() {
        let conn = memory();
        let rows = conn
            .query(
                "select u.id, f.id, f.name as f_name, 1 + 1 as two from users u join files f on f.user_id = u.id",
                &[],
            )
            .unwrap();
        let columns = rows.columns();
        assert_eq!(columns.names(), ["id", "id", "f_name", "two"]);
        assert_eq!(columns.table_at(0), Some("users"));
        assert_eq!(columns.table_at(1), Some("files"));
        assert_eq!(columns.table_at(2), Some("files"));
        assert_eq!(columns.table_at(3), None);
        assert!(rows.sql().unwrap().starts_with("select u.id"));
    }

    #[test]
    fn test_dropped_cursor_releases_statement() {
        let conn = memory();
        conn.execute_raw("insert into users (name) values ('a'), ('b'), ('c')")
            .unwrap();
        let mut rows = conn.query("select name from users order by id", &[]).unwrap();
        let first = rows.next_row().unwrap().unwrap();
        assert_eq!(first.get_as::<String>(0).unwrap(), "a");
        drop(rows);

        // an unfinalized reader would keep the table locked
        conn.execute_raw("drop table users").unwrap();
    }

    #[test]
    fn test_exhausted_cursor_stays_exhausted() {
        let conn = memory();
        let mut rows = conn.query("select id from users", &[]).unwrap();
        assert!(rows.next_row().unwrap().is_none());
        assert!(rows.next_row().unwrap().is_none());
    }

    #[test]
    fn test_generated_key() {
        let conn = memory();
        conn.execute("insert into users (name) values (?)", &[Param::new("ann")])
            .unwrap();
        assert_eq!(conn.generated_key(), Some(1));
        assert_eq!(conn.last_insert_rowid(), 1);

        conn.execute("update users set name = ? where id = 1", &[Param::new("bea")])
            .unwrap();
        assert_eq!(conn.generated_key(), None);
        assert_eq!(conn.changes(), 1);
    }

    #[test]
    fn test_error_kinds() {
        let conn = memory();
        let kind = |err: Error| match err {
            Error::Query(e) => e.kind,
            other => panic!("unexpected {other:?}"),
        };

        let err = conn.query("selec 1", &[]).unwrap_err();
        assert_eq!(err.sql(), Some("selec 1"));
        assert_eq!(kind(err), QueryErrorKind::Syntax);

        let err = conn.query("select * from missing", &[]).unwrap_err();
        assert_eq!(kind(err), QueryErrorKind::NotFound);

        conn.execute_raw("insert into users (id, name) values (1, 'a')")
            .unwrap();
        let err = conn
            .execute("insert into users (id, name) values (1, 'b')", &[])
            .unwrap_err();
        assert_eq!(kind(err), QueryErrorKind::Constraint);

        let err = conn
            .query("select * from users where id = ?", &[])
            .unwrap_err();
        assert_eq!(kind(err), QueryErrorKind::Bind);

        let err = conn.execute("   ", &[]).unwrap_err();
        assert_eq!(kind(err), QueryErrorKind::Syntax);
    }

    #[test]
    fn test_open_flags() {
        assert_eq!(
            OpenFlags::default().to_sqlite_flags(),
            ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE
        );
        assert_eq!(OpenFlags::read_only().to_sqlite_flags(), ffi::SQLITE_OPEN_READONLY);

        let missing = std::env::temp_dir().join(format!(
            "sqlgraph-missing-{}.db",
            std::process::id()
        ));
        let config = SqliteConfig::file(missing.display().to_string())
            .flags(OpenFlags::read_write())
            .busy_timeout(0);
        let err = SqliteConnection::open(&config).unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }
}
