//! Crate-wide error taxonomy
//!
//! Each subsystem defines its own error enum (`LayoutError`, `SearchError`,
//! `TableError`, `WriterError`, `CodecError`); this module aggregates them
//! into a single `Error` for callers that don't care which subsystem failed.

use thiserror::Error;

use crate::codec::CodecError;
use crate::layout::LayoutError;
use crate::search::SearchError;
use crate::table::TableError;
use crate::txlog::WriterError;

/// Top-level error for callers that want one type across subsystems.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Writer(#[from] WriterError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, Error>;
