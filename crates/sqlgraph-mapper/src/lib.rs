//! Result set to entity graph mapping for sqlgraph.
//!
//! `sqlgraph-mapper` is the **mapping layer**. It takes the rows of a
//! (possibly joined) result set and builds a graph of typed entities where
//! every (type, key) pair is materialized exactly once.
//!
//! # Role In The Architecture
//!
//! - **Expansion**: `{User.* as u}` in a SQL template becomes an explicit,
//!   collision-free column list.
//! - **Column index**: label to position lookup built once per result set.
//! - **Identity map**: one instance per (type, key) for the whole session.
//! - **Relation binding**: joined entities are attached to single, list or
//!   set fields of their owners, in first-seen order.
//!
//! Everything here is synchronous and single-threaded; a mapping session
//! lives for one query execution.
//!
//! # Example
//!
//! ```ignore
//! let mut handler = JoiningRowHandler::<User>::new()
//!     .entity::<User>()
//!     .entity::<File>();
//! let sql = handler.expand("select {User.* as u}, {File.* as f} from users u left join files f on f.user_id = u.id")?;
//! handler.handle_rows(conn.query(&sql, &[])?, |h, row| {
//!     let user = h.map_primary(row, Some("u"))?;
//!     h.join_list::<User, File>(row, Some(&user), "files", Some("f"))?;
//!     Ok(())
//! })?;
//! ```

pub mod bean;
pub mod column_index;
pub mod config;
pub mod expand;
pub mod handler;
pub mod identity_map;
pub mod relation;
pub mod resolver;
pub mod row_handler;

pub use bean::BeanMapper;
pub use column_index::ColumnIndex;
pub use config::{KeyPolicy, MapperConfig};
pub use expand::{AliasScope, Expander, unqualified_table};
pub use handler::JoiningRowHandler;
pub use identity_map::{EntityKey, IdentityMap};
pub use relation::RelationBinder;
pub use resolver::StaticResolver;
pub use row_handler::{JoiningSelect, RowHandler, SingleFieldListRowHandler};
