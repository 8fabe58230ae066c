//! Transaction Log & Async Writer
//!
//! An ordered queue of row mutations ([`TransactionLog`]) and a background
//! worker ([`TableWriter`]) that batches commits into a backing table
//! subject to size/time thresholds and a requeue-on-failure policy.

mod error;
mod log;
mod transaction;
mod writer;

pub use error::WriterError;
pub use log::TransactionLog;
pub use transaction::{Transaction, TransactionKind};
pub use writer::{CommitTarget, TableWriter, WriterFlags, WriterOptions};
