//! Value encoding and decoding between sqlgraph and SQLite.
//!
//! SQLite has five storage classes (NULL, INTEGER, REAL, TEXT, BLOB).
//! Booleans are stored as 0/1 and JSON documents as text; a TEXT column
//! declared `JSON` reads back as [`Value::Json`] when it parses.

use crate::ffi;
use sqlgraph_core::Value;
use std::ffi::{CStr, c_int};

unsafe fn bind_text(stmt: *mut ffi::sqlite3_stmt, index: c_int, text: &str) -> c_int {
    let Ok(len) = c_int::try_from(text.len()) else {
        return ffi::SQLITE_TOOBIG;
    };
    // SAFETY: the caller guarantees stmt and index; SQLITE_TRANSIENT makes
    // SQLite copy the buffer before returning
    unsafe { ffi::sqlite3_bind_text(stmt, index, text.as_ptr().cast(), len, ffi::SQLITE_TRANSIENT()) }
}

/// Bind a value to a prepared statement parameter.
///
/// # Safety
/// - `stmt` must be a valid, non-null prepared statement handle
/// - `index` must be a valid 1-based parameter index
pub unsafe fn bind_value(stmt: *mut ffi::sqlite3_stmt, index: c_int, value: &Value) -> c_int {
    // SAFETY: forwarded from the caller
    unsafe {
        match value {
            Value::Null => ffi::sqlite3_bind_null(stmt, index),
            Value::Bool(b) => ffi::sqlite3_bind_int(stmt, index, c_int::from(*b)),
            Value::Int(v) => ffi::sqlite3_bind_int(stmt, index, *v),
            Value::BigInt(v) => ffi::sqlite3_bind_int64(stmt, index, *v),
            Value::Double(v) => ffi::sqlite3_bind_double(stmt, index, *v),
            Value::Text(s) => bind_text(stmt, index, s),
            Value::Json(json) => bind_text(stmt, index, &json.to_string()),
            Value::Bytes(b) => {
                let Ok(len) = c_int::try_from(b.len()) else {
                    return ffi::SQLITE_TOOBIG;
                };
                ffi::sqlite3_bind_blob(stmt, index, b.as_ptr().cast(), len, ffi::SQLITE_TRANSIENT())
            }
        }
    }
}

/// Read a column value from the current row.
///
/// Integers that fit in 32 bits come back as [`Value::Int`], wider ones as
/// [`Value::BigInt`].
///
/// # Safety
/// - `stmt` must be a valid prepared statement that has just returned SQLITE_ROW
/// - `index` must be a valid 0-based column index
pub unsafe fn read_column(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Value {
    // SAFETY: forwarded from the caller; text and blob pointers are read
    // before any other call on this column can invalidate them
    unsafe {
        match ffi::sqlite3_column_type(stmt, index) {
            ffi::SQLITE_INTEGER => {
                let v = ffi::sqlite3_column_int64(stmt, index);
                i32::try_from(v).map_or(Value::BigInt(v), Value::Int)
            }
            ffi::SQLITE_FLOAT => Value::Double(ffi::sqlite3_column_double(stmt, index)),
            ffi::SQLITE_TEXT => {
                let ptr = ffi::sqlite3_column_text(stmt, index);
                let len = usize::try_from(ffi::sqlite3_column_bytes(stmt, index)).unwrap_or(0);
                if ptr.is_null() {
                    return Value::Null;
                }
                let slice = std::slice::from_raw_parts(ptr.cast::<u8>(), len);
                let text = String::from_utf8_lossy(slice).into_owned();
                if is_json_column(stmt, index) {
                    if let Ok(json) = serde_json::from_str(&text) {
                        return Value::Json(json);
                    }
                }
                Value::Text(text)
            }
            ffi::SQLITE_BLOB => {
                let ptr = ffi::sqlite3_column_blob(stmt, index);
                let len = usize::try_from(ffi::sqlite3_column_bytes(stmt, index)).unwrap_or(0);
                if ptr.is_null() || len == 0 {
                    Value::Bytes(Vec::new())
                } else {
                    Value::Bytes(std::slice::from_raw_parts(ptr.cast::<u8>(), len).to_vec())
                }
            }
            _ => Value::Null,
        }
    }
}

unsafe fn is_json_column(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> bool {
    // SAFETY: forwarded from read_column
    let decl = unsafe { ffi::sqlite3_column_decltype(stmt, index) };
    if decl.is_null() {
        return false;
    }
    // SAFETY: non-null decltype strings live as long as the statement
    unsafe { CStr::from_ptr(decl) }
        .to_bytes()
        .eq_ignore_ascii_case(b"json")
}

/// Label of a result column.
///
/// # Safety
/// - `stmt` must be a valid prepared statement
/// - `index` must be a valid 0-based column index
pub unsafe fn column_name(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> String {
    // SAFETY: forwarded from the caller
    let ptr = unsafe { ffi::sqlite3_column_name(stmt, index) };
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: SQLite returns a NUL-terminated string owned by the statement
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Table a result column was read from, or `None` for expressions.
///
/// # Safety
/// - `stmt` must be a valid prepared statement
/// - `index` must be a valid 0-based column index
pub unsafe fn column_table(stmt: *mut ffi::sqlite3_stmt, index: c_int) -> Option<String> {
    // SAFETY: forwarded from the caller
    let ptr = unsafe { ffi::sqlite3_column_table_name(stmt, index) };
    if ptr.is_null() {
        return None;
    }
    // SAFETY: SQLite returns a NUL-terminated string owned by the statement
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}
