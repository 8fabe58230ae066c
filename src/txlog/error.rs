use thiserror::Error;

use crate::table::TableError;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("writer thread terminated")]
    Terminated,
}
