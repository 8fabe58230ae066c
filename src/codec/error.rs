use thiserror::Error;

use crate::layout::LayoutError;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid codec properties: {0}")]
    InvalidProperties(String),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("malformed field {field:?}: {reason}")]
    MalformedField { field: String, reason: String },

    #[error("unsupported dat format version {0}")]
    UnsupportedVersion(u8),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
