//! SQLite driver for sqlgraph.
//!
//! Implements the [`Connection`](sqlgraph_core::Connection) contract on top
//! of the bundled SQLite library. Query results are streamed through a
//! lazy [`SqliteRows`] cursor that reports, besides each column label, the
//! table the column was read from, so unaliased joins still resolve.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlgraph_sqlite::SqliteConnection;
//! use sqlgraph_core::{Connection, Param, RowSource};
//!
//! let conn = SqliteConnection::open_memory()?;
//! conn.execute_raw("create table users (id integer primary key, name text)")?;
//! conn.execute("insert into users (name) values (?)", &[Param::new("Alice")])?;
//! let mut rows = conn.query("select id, name from users", &[])?;
//! while let Some(row) = rows.next_row()? {
//!     println!("{:?}", row.get_named::<String>("name")?);
//! }
//! ```
//!
//! # Type Mapping
//!
//! | sqlgraph `Value` | SQLite storage |
//! |------------------|----------------|
//! | `Null`           | NULL           |
//! | `Bool`           | INTEGER (0/1)  |
//! | `Int`, `BigInt`  | INTEGER        |
//! | `Double`         | REAL           |
//! | `Text`, `Json`   | TEXT           |
//! | `Bytes`          | BLOB           |

// FFI bindings require unsafe code
#![allow(unsafe_code)]

pub mod connection;
pub mod ffi;
pub mod types;

pub use connection::{OpenFlags, SqliteConfig, SqliteConnection, SqliteRows};

/// Version string of the linked SQLite library.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// Version number of the linked SQLite library.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}
