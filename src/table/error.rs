use thiserror::Error;

use crate::layout::LayoutError;
use crate::search::SearchError;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("no row with id {0}")]
    NotFound(i64),

    #[error("id {0} already exists")]
    DuplicateId(i64),

    #[error("table is read-only")]
    ReadOnly,

    #[error("{0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Search(#[from] SearchError),
}
