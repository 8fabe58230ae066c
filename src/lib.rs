//! Embeddable, in-process tabular data engine.
//!
//! - [`layout`] — field metadata, the `DataType` taxonomy, and the
//!   immutable `Row` tuple.
//! - [`search`] — a predicate algebra (`Search`) plus result shaping
//!   (grouping, sorting, paging).
//! - [`table`] — an in-memory table with secondary indices, behind a
//!   bounded-wait readers-writer lock for concurrent access.
//! - [`txlog`] — a durable transaction log and a background writer that
//!   batches commits into a table.
//! - [`codec`] — a separator-delimited textual row codec and a
//!   self-describing binary "dat" codec.
//! - [`external`] — collaborator traits (`Storage`, `CompressionFactory`)
//!   the core consumes but does not implement.
//! - [`config`] — a `serde`-deserializable configuration aggregate for
//!   embedding applications that want file-based configuration.
//! - [`testutil`] — fluent builders for assembling layouts and populated
//!   tables in tests.

pub mod codec;
pub mod config;
mod error;
pub mod external;
pub mod layout;
pub mod search;
pub mod table;
pub mod testutil;
pub mod txlog;

pub use error::{Error, Result};
