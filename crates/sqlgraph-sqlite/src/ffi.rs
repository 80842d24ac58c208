//! Low-level SQLite bindings.
//!
//! Most declarations come from `libsqlite3-sys`, which also builds and links
//! the bundled library. Only what the driver uses is re-exported here.

#![allow(non_camel_case_types)]

use std::ffi::{CStr, c_int};

pub use libsqlite3_sys::{
    SQLITE_BLOB, SQLITE_BUSY, SQLITE_CONSTRAINT, SQLITE_DONE, SQLITE_ERROR, SQLITE_FLOAT,
    SQLITE_INTEGER, SQLITE_LOCKED, SQLITE_MISMATCH, SQLITE_NOTFOUND, SQLITE_NULL, SQLITE_OK,
    SQLITE_OPEN_CREATE, SQLITE_OPEN_READONLY, SQLITE_OPEN_READWRITE, SQLITE_OPEN_URI,
    SQLITE_RANGE, SQLITE_ROW, SQLITE_TEXT, SQLITE_TOOBIG, SQLITE_TRANSIENT, sqlite3,
    sqlite3_bind_blob, sqlite3_bind_double, sqlite3_bind_int, sqlite3_bind_int64,
    sqlite3_bind_null, sqlite3_bind_parameter_count, sqlite3_bind_text, sqlite3_busy_timeout,
    sqlite3_changes, sqlite3_close, sqlite3_column_blob,
    sqlite3_column_bytes, sqlite3_column_count, sqlite3_column_decltype,
    sqlite3_column_double, sqlite3_column_int64, sqlite3_column_name,
    sqlite3_column_table_name, sqlite3_column_text, sqlite3_column_type, sqlite3_errcode,
    sqlite3_errmsg, sqlite3_errstr, sqlite3_exec, sqlite3_finalize, sqlite3_free,
    sqlite3_last_insert_rowid, sqlite3_libversion, sqlite3_libversion_number,
    sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt,
};

// Not part of the generated bindings; resolved against the bundled library
// that libsqlite3-sys links.
unsafe extern "C" {
    pub fn sqlite3_close_v2(db: *mut sqlite3) -> c_int;
}

/// Version string of the linked SQLite library.
pub fn version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a pointer to a static string
    unsafe {
        CStr::from_ptr(sqlite3_libversion())
            .to_str()
            .unwrap_or("unknown")
    }
}

/// Version number of the linked SQLite library, e.g. 3045000.
pub fn version_number() -> c_int {
    // SAFETY: no arguments, no side effects
    unsafe { sqlite3_libversion_number() }
}

/// English description of an SQLite result code.
pub fn error_string(code: c_int) -> &'static str {
    // SAFETY: sqlite3_errstr returns a static string
    unsafe {
        CStr::from_ptr(sqlite3_errstr(code))
            .to_str()
            .unwrap_or("unknown error")
    }
}
