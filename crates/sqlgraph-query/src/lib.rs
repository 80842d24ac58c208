//! Statement glue for sqlgraph.
//!
//! `sqlgraph-query` is the **statement layer**. It runs SQL through a
//! `Connection` and hands the rows to the mapper, and it writes beans back.
//!
//! # Role In The Architecture
//!
//! - **Select runner**: expand `{Type.*}` macros, execute, feed a row
//!   handler, release the cursor.
//! - **Bean statements**: UPDATE by key and INSERT with generated keys,
//!   built from the same entity descriptors the mapper reads.
//! - **Raw statements**: positional parameters with optional SQL type
//!   hints, expected row count checks.
//! - **Result cache**: optional JSON file cache for mapped output.

pub mod cache;
pub mod dialect;
pub mod insert;
pub mod select;
pub mod update;

#[cfg(test)]
mod mock;

pub use cache::FileCache;
pub use dialect::Dialect;
pub use insert::InsertBuilder;
pub use select::Select;
pub use update::UpdateBuilder;
