//! Core types and traits for sqlgraph.
//!
//! This crate provides the foundations the mapper and drivers share:
//!
//! - `Value` and `Row` for dynamically typed result data
//! - `Entity` descriptors (properties, keys, relation fields) in place of
//!   runtime reflection
//! - `RowSource` and `Connection` contracts for drivers
//! - the `Error` taxonomy

pub mod connection;
pub mod entity;
pub mod error;
pub mod row;
pub mod types;
pub mod value;

pub use connection::{Connection, Param, RowSource, VecRowSource};
pub use entity::{
    Attached, Cardinality, Entity, EntityMeta, EntityRef, PropertyRef, RelationRef,
    RelationShape, RelationSlot, WeakRef,
};
pub use error::{
    CacheError, ConnectionError, ConnectionErrorKind, Error, MappingError, MappingErrorKind,
    QueryError, QueryErrorKind, Result, ResultSizeError, TypeError,
};
pub use row::{ColumnInfo, FromValue, Row};
pub use types::SqlType;
pub use value::Value;
