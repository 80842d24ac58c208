//! sqlgraph - map joined SQL result sets onto graphs of typed entities.
//!
//! A query may select several related tables at once. sqlgraph reads the
//! rows and builds one instance per (type, key), attaching joined entities
//! to the list, set or single-valued fields of their owners:
//!
//! - `{Type.* as alias}` macros in SQL expand to explicit column lists
//! - a static, derive-generated descriptor per entity replaces reflection
//! - an identity map de-duplicates entities across rows
//! - bean UPDATE/INSERT statements reuse the same descriptors
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlgraph::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! #[sqlgraph(table = "users")]
//! struct User {
//!     #[sqlgraph(key)]
//!     id: i64,
//!     name: String,
//!     files: Vec<EntityRef<File>>,
//! }
//!
//! #[derive(Debug, Default, Entity)]
//! #[sqlgraph(table = "files")]
//! struct File {
//!     #[sqlgraph(key)]
//!     id: i64,
//!     name: String,
//! }
//!
//! let conn = SqliteConnection::open_memory()?;
//! let users = Select::new(
//!     &conn,
//!     "select {User.* as u}, {File.* as f} from users u left join files f on f.user_id = u.id",
//! )
//! .select_joined::<User, _>([EntityMeta::of::<File>()], |h, row| {
//!     let user = h.map_primary(row, Some("u"))?;
//!     h.join_list::<User, File>(row, Some(&user), "files", Some("f"))?;
//!     Ok(())
//! })?;
//! ```
//!
//! Mapping is synchronous and single-threaded. Library code logs through
//! `tracing` and never installs a subscriber.
//!
//! Code generated by `#[derive(Entity)]` names `::sqlgraph_core`, so crates
//! deriving entities also depend on `sqlgraph-core`.

pub use sqlgraph_core::{
    Cardinality, ColumnInfo, Connection, Entity, EntityMeta, EntityRef, Error, FromValue,
    MappingError, MappingErrorKind, Param, PropertyRef, QueryErrorKind, RelationRef,
    RelationSlot, Result, Row, RowSource, SqlType, Value, VecRowSource, WeakRef,
};
pub use sqlgraph_macros::Entity;
pub use sqlgraph_mapper::{
    AliasScope, IdentityMap, JoiningRowHandler, JoiningSelect, KeyPolicy, MapperConfig,
    RowHandler, SingleFieldListRowHandler,
};
pub use sqlgraph_query::{Dialect, FileCache, InsertBuilder, Select, UpdateBuilder};
pub use sqlgraph_sqlite::{OpenFlags, SqliteConfig, SqliteConnection};

/// Sub-crates, for items the top level does not re-export.
pub mod mapper {
    pub use sqlgraph_mapper::*;
}

pub mod query {
    pub use sqlgraph_query::*;
}

pub mod sqlite {
    pub use sqlgraph_sqlite::*;
}

/// Prelude for common imports.
///
/// ```ignore
/// use sqlgraph::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Connection, Entity, EntityMeta, EntityRef, Error, JoiningRowHandler, KeyPolicy,
        MapperConfig, MappingErrorKind, Param, Result, Row, RowHandler, RowSource, Select,
        SqlType, SqliteConnection, UpdateBuilder, Value, WeakRef,
    };
    pub use crate::{FileCache, InsertBuilder};
}
