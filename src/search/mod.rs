//! Search & Result Shaping
//!
//! A predicate tree ([`Search`]) that binds to a [`crate::layout::RowLayout`]
//! ([`BoundSearch`]), an in-memory evaluator over that bound tree, and a
//! post-evaluation shaping stage ([`ResultOption`]) for grouping, sorting,
//! and pagination.

mod error;
mod eval;
mod mode;
mod result;

pub use error::SearchError;
pub use mode::{like_match, normalize_like_pattern, BoundSearch, CompareMode, Mode, Search};
pub use result::{ResultOption, SortDirection};

pub(crate) use eval::{filter_rows, row_matches};
