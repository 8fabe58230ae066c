use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("cannot invert the empty (None) predicate")]
    InvertNone,

    #[error("search was already bound to a different layout")]
    LayoutMismatch,

    #[error("field {0:?} does not exist on the bound layout")]
    UnknownField(String),

    #[error("{0}")]
    InvalidResultOption(String),

    #[error("value for field {0:?} is not compatible with its declared type")]
    IncompatibleValue(String),
}
