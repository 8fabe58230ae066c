//! The `Search` predicate tree: construction, combinators, and `LIKE`
//! wildcard matching.

use std::sync::OnceLock;

use crate::layout::{RowLayout, Value};
use std::sync::Arc;

use super::error::SearchError;

/// The node kind a `Search` tree position carries. Exposed for
/// introspection; the tree itself is represented by [`SearchExpr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    None,
    And,
    Or,
    Equals,
    Like,
    Greater,
    Smaller,
    GreaterOrEqual,
    SmallerOrEqual,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    Equals,
    Greater,
    Smaller,
    GreaterOrEqual,
    SmallerOrEqual,
}

impl From<CompareMode> for Mode {
    fn from(c: CompareMode) -> Self {
        match c {
            CompareMode::Equals => Mode::Equals,
            CompareMode::Greater => Mode::Greater,
            CompareMode::Smaller => Mode::Smaller,
            CompareMode::GreaterOrEqual => Mode::GreaterOrEqual,
            CompareMode::SmallerOrEqual => Mode::SmallerOrEqual,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum SearchExpr {
    None,
    And(Box<SearchExpr>, Box<SearchExpr>),
    Or(Box<SearchExpr>, Box<SearchExpr>),
    Compare {
        field: String,
        op: CompareMode,
        value: Value,
        negated: bool,
    },
    Like {
        field: String,
        pattern: String,
        negated: bool,
    },
    In {
        field: String,
        values: Vec<Value>,
        negated: bool,
    },
}

/// An immutable predicate tree.
///
/// `None` is the identity element under both `&` (And) and `|` (Or); `!`
/// on `None` is an error. Field names are resolved to indices on first
/// [`Search::bind`]; binding the same `Search` to a structurally different
/// layout afterwards fails with `LayoutMismatch`.
#[derive(Debug, Clone)]
pub struct Search {
    pub(crate) expr: SearchExpr,
    bound: Arc<OnceLock<Arc<RowLayout>>>,
}

impl Search {
    fn wrap(expr: SearchExpr) -> Self {
        Self {
            expr,
            bound: Arc::new(OnceLock::new()),
        }
    }

    /// The identity predicate: matches nothing extra, composes as a no-op
    /// under `&`/`|`.
    pub fn none() -> Self {
        Self::wrap(SearchExpr::None)
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::wrap(SearchExpr::Compare {
            field: field.into(),
            op: CompareMode::Equals,
            value,
            negated: false,
        })
    }

    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Self::wrap(SearchExpr::Compare {
            field: field.into(),
            op: CompareMode::Greater,
            value,
            negated: false,
        })
    }

    pub fn lt(field: impl Into<String>, value: Value) -> Self {
        Self::wrap(SearchExpr::Compare {
            field: field.into(),
            op: CompareMode::Smaller,
            value,
            negated: false,
        })
    }

    pub fn ge(field: impl Into<String>, value: Value) -> Self {
        Self::wrap(SearchExpr::Compare {
            field: field.into(),
            op: CompareMode::GreaterOrEqual,
            value,
            negated: false,
        })
    }

    pub fn le(field: impl Into<String>, value: Value) -> Self {
        Self::wrap(SearchExpr::Compare {
            field: field.into(),
            op: CompareMode::SmallerOrEqual,
            value,
            negated: false,
        })
    }

    /// `%` matches zero-or-more characters, `_` matches exactly one.
    /// Consecutive `%` collapse and the pattern is anchored to the whole
    /// value.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::wrap(SearchExpr::Like {
            field: field.into(),
            pattern: normalize_like_pattern(&pattern.into()),
            negated: false,
        })
    }

    pub fn in_set(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::wrap(SearchExpr::In {
            field: field.into(),
            values,
            negated: false,
        })
    }

    pub fn mode(&self) -> Mode {
        match &self.expr {
            SearchExpr::None => Mode::None,
            SearchExpr::And(..) => Mode::And,
            SearchExpr::Or(..) => Mode::Or,
            SearchExpr::Compare { op, .. } => (*op).into(),
            SearchExpr::Like { .. } => Mode::Like,
            SearchExpr::In { .. } => Mode::In,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.expr, SearchExpr::None)
    }

    /// Resolve field names to indices against `layout`, converting
    /// comparands to the declared `ValueType` along the way. Idempotent
    /// when called again with a structurally-equal layout; fails with
    /// `LayoutMismatch` when called again with a different one.
    pub fn bind(&self, layout: &Arc<RowLayout>) -> Result<BoundSearch, SearchError> {
        match self.bound.get() {
            Some(prev) if **prev != **layout => return Err(SearchError::LayoutMismatch),
            Some(_) => {}
            None => {
                let _ = self.bound.set(layout.clone());
            }
        }
        let expr = bind_expr(&self.expr, layout)?;
        Ok(BoundSearch {
            layout: layout.clone(),
            expr,
        })
    }
}

impl std::ops::BitAnd for Search {
    type Output = Search;

    /// Short-circuits when either side is `None`.
    fn bitand(self, rhs: Search) -> Search {
        match (self.is_none(), rhs.is_none()) {
            (true, _) => rhs,
            (_, true) => self,
            _ => Search::wrap(SearchExpr::And(Box::new(self.expr), Box::new(rhs.expr))),
        }
    }
}

impl std::ops::BitOr for Search {
    type Output = Search;

    /// Short-circuits when either side is `None`.
    fn bitor(self, rhs: Search) -> Search {
        match (self.is_none(), rhs.is_none()) {
            (true, _) => rhs,
            (_, true) => self,
            _ => Search::wrap(SearchExpr::Or(Box::new(self.expr), Box::new(rhs.expr))),
        }
    }
}

impl std::ops::Not for Search {
    type Output = Result<Search, SearchError>;

    /// Inverting `None` is an error: there is nothing to negate.
    fn not(self) -> Result<Search, SearchError> {
        let expr = negate_expr(self.expr)?;
        Ok(Search::wrap(expr))
    }
}

fn negate_expr(expr: SearchExpr) -> Result<SearchExpr, SearchError> {
    match expr {
        SearchExpr::None => Err(SearchError::InvertNone),
        SearchExpr::And(a, b) => Ok(SearchExpr::Or(
            Box::new(negate_expr(*a)?),
            Box::new(negate_expr(*b)?),
        )),
        SearchExpr::Or(a, b) => Ok(SearchExpr::And(
            Box::new(negate_expr(*a)?),
            Box::new(negate_expr(*b)?),
        )),
        SearchExpr::Compare {
            field,
            op,
            value,
            negated,
        } => Ok(SearchExpr::Compare {
            field,
            op,
            value,
            negated: !negated,
        }),
        SearchExpr::Like {
            field,
            pattern,
            negated,
        } => Ok(SearchExpr::Like {
            field,
            pattern,
            negated: !negated,
        }),
        SearchExpr::In {
            field,
            values,
            negated,
        } => Ok(SearchExpr::In {
            field,
            values,
            negated: !negated,
        }),
    }
}

#[derive(Debug, Clone)]
pub(crate) enum BoundExpr {
    None,
    And(Box<BoundExpr>, Box<BoundExpr>),
    Or(Box<BoundExpr>, Box<BoundExpr>),
    Compare {
        field: usize,
        op: CompareMode,
        value: Value,
        negated: bool,
    },
    Like {
        field: usize,
        pattern: String,
        negated: bool,
    },
    In {
        field: usize,
        values: Vec<Value>,
        negated: bool,
    },
}

/// A `Search` resolved against one specific `RowLayout`: field names
/// became indices, comparands became the field's declared `ValueType`.
#[derive(Debug, Clone)]
pub struct BoundSearch {
    pub(crate) layout: Arc<RowLayout>,
    pub(crate) expr: BoundExpr,
}

fn bind_expr(expr: &SearchExpr, layout: &Arc<RowLayout>) -> Result<BoundExpr, SearchError> {
    Ok(match expr {
        SearchExpr::None => BoundExpr::None,
        SearchExpr::And(a, b) => {
            BoundExpr::And(Box::new(bind_expr(a, layout)?), Box::new(bind_expr(b, layout)?))
        }
        SearchExpr::Or(a, b) => {
            BoundExpr::Or(Box::new(bind_expr(a, layout)?), Box::new(bind_expr(b, layout)?))
        }
        SearchExpr::Compare {
            field,
            op,
            value,
            negated,
        } => BoundExpr::Compare {
            field: resolve_field(layout, field)?,
            op: *op,
            value: coerce_for_field(layout, field, value.clone())?,
            negated: *negated,
        },
        SearchExpr::Like {
            field,
            pattern,
            negated,
        } => BoundExpr::Like {
            field: resolve_field(layout, field)?,
            pattern: pattern.clone(),
            negated: *negated,
        },
        SearchExpr::In {
            field,
            values,
            negated,
        } => {
            let idx = resolve_field(layout, field)?;
            let values = values
                .iter()
                .map(|v| coerce_for_field(layout, field, v.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            BoundExpr::In {
                field: idx,
                values,
                negated: *negated,
            }
        }
    })
}

fn resolve_field(layout: &RowLayout, name: &str) -> Result<usize, SearchError> {
    layout
        .field_index(name)
        .ok_or_else(|| SearchError::UnknownField(name.to_string()))
}

fn coerce_for_field(layout: &RowLayout, name: &str, value: Value) -> Result<Value, SearchError> {
    let idx = resolve_field(layout, name)?;
    let field = layout.field(idx).expect("resolved index is valid");
    if value.data_type() == field.value_type.data_type {
        return Ok(value);
    }
    crate::layout::coerce_value(value, field.value_type.data_type)
        .ok_or_else(|| SearchError::IncompatibleValue(name.to_string()))
}

/// Wildcard glob match: `%` = zero-or-more characters, `_` = exactly one.
/// The match is anchored to the full text (no partial/substring match).
pub fn like_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    like_match_rec(&p, &t)
}

fn like_match_rec(p: &[char], t: &[char]) -> bool {
    match p.first() {
        None => t.is_empty(),
        Some('%') => like_match_rec(&p[1..], t) || (!t.is_empty() && like_match_rec(p, &t[1..])),
        Some('_') => !t.is_empty() && like_match_rec(&p[1..], &t[1..]),
        Some(c) => !t.is_empty() && t[0] == *c && like_match_rec(&p[1..], &t[1..]),
    }
}

/// Collapse consecutive `%` in a LIKE pattern.
pub fn normalize_like_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut prev_percent = false;
    for c in pattern.chars() {
        if c == '%' {
            if prev_percent {
                continue;
            }
            prev_percent = true;
        } else {
            prev_percent = false;
        }
        out.push(c);
    }
    out
}
