//! `ResultOption`: grouping, sorting, and pagination composed over a row
//! sequence produced by a [`super::mode::Search`] evaluation.

use std::collections::HashSet;

use crate::layout::Row;

use super::error::SearchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
enum ResultOp {
    Group(String),
    Sort(String, SortDirection),
    Limit(usize),
    Offset(usize),
}

/// An ordered composition of shaping operators. Grouping is applied before
/// sorting regardless of declaration order; sort clauses apply in
/// declaration order, so the *last* declared clause ends up as the primary
/// sort (each later stable sort dominates ties left by the earlier one).
/// At most one `Limit` and one `Offset` may be present.
#[derive(Debug, Clone, Default)]
pub struct ResultOption {
    ops: Vec<ResultOp>,
}

impl ResultOption {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn group(mut self, field: impl Into<String>) -> Self {
        self.ops.push(ResultOp::Group(field.into()));
        self
    }

    pub fn sort_asc(mut self, field: impl Into<String>) -> Self {
        self.ops.push(ResultOp::Sort(field.into(), SortDirection::Asc));
        self
    }

    pub fn sort_desc(mut self, field: impl Into<String>) -> Self {
        self.ops.push(ResultOp::Sort(field.into(), SortDirection::Desc));
        self
    }

    pub fn limit(mut self, n: usize) -> Result<Self, SearchError> {
        if self.ops.iter().any(|o| matches!(o, ResultOp::Limit(_))) {
            return Err(SearchError::InvalidResultOption(
                "duplicate Limit in ResultOption".into(),
            ));
        }
        self.ops.push(ResultOp::Limit(n));
        Ok(self)
    }

    pub fn offset(mut self, n: usize) -> Result<Self, SearchError> {
        if self.ops.iter().any(|o| matches!(o, ResultOp::Offset(_))) {
            return Err(SearchError::InvalidResultOption(
                "duplicate Offset in ResultOption".into(),
            ));
        }
        self.ops.push(ResultOp::Offset(n));
        Ok(self)
    }

    /// Apply grouping, then sorting, then offset, then limit, to `rows`.
    pub fn apply(&self, rows: Vec<Row>) -> Result<Vec<Row>, SearchError> {
        let mut rows = rows;

        for op in &self.ops {
            if let ResultOp::Group(field) = op {
                rows = group_keep_first(rows, field)?;
            }
        }
        for op in &self.ops {
            if let ResultOp::Sort(field, dir) = op {
                sort_stable_by_field(&mut rows, field, *dir)?;
            }
        }

        let offset = self.ops.iter().find_map(|o| match o {
            ResultOp::Offset(n) => Some(*n),
            _ => None,
        });
        if let Some(n) = offset {
            rows = rows.into_iter().skip(n).collect();
        }

        let limit = self.ops.iter().find_map(|o| match o {
            ResultOp::Limit(n) => Some(*n),
            _ => None,
        });
        if let Some(n) = limit {
            rows.truncate(n);
        }

        Ok(rows)
    }
}

fn group_keep_first(rows: Vec<Row>, field: &str) -> Result<Vec<Row>, SearchError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let key = row
            .get_by_name(field)
            .ok_or_else(|| SearchError::UnknownField(field.to_string()))?
            .to_string();
        if seen.insert(key) {
            out.push(row);
        }
    }
    Ok(out)
}

fn sort_stable_by_field(
    rows: &mut [Row],
    field: &str,
    dir: SortDirection,
) -> Result<(), SearchError> {
    // Resolve once to fail fast on an unknown field even if `rows` is empty.
    if let Some(first) = rows.first() {
        if first.get_by_name(field).is_none() && first.layout().field_index(field).is_none() {
            return Err(SearchError::UnknownField(field.to_string()));
        }
    }
    rows.sort_by(|a, b| {
        let av = a.get_by_name(field);
        let bv = b.get_by_name(field);
        let ord = av.partial_cmp(&bv).unwrap_or(std::cmp::Ordering::Equal);
        match dir {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DataType, FieldFlags, FieldProperties, RowLayout, Value};
    use std::sync::Arc;

    fn layout() -> Arc<RowLayout> {
        Arc::new(
            RowLayout::untyped(
                "t",
                vec![
                    FieldProperties::new("id", DataType::Int64).with_flags(FieldFlags::ID),
                    FieldProperties::new("k", DataType::String),
                    FieldProperties::new("v", DataType::Int64),
                ],
            )
            .unwrap(),
        )
    }

    fn row(l: &Arc<RowLayout>, id: i64, k: &str, v: i64) -> Row {
        Row::new(
            l.clone(),
            vec![
                Some(Value::Int64(id)),
                Some(Value::String(k.into())),
                Some(Value::Int64(v)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn group_then_sort_then_limit_scenario() {
        let l = layout();
        let rows = vec![
            row(&l, 1, "b", 5),
            row(&l, 2, "a", 7),
            row(&l, 3, "b", 3),
            row(&l, 4, "a", 7),
        ];
        let opt = ResultOption::new()
            .group("k")
            .sort_asc("v")
            .limit(1)
            .unwrap();
        let result = opt.apply(rows).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id().unwrap(), 1);
    }

    #[test]
    fn duplicate_limit_rejected() {
        let opt = ResultOption::new().limit(1).unwrap();
        assert!(opt.limit(2).is_err());
    }

    #[test]
    fn last_sort_clause_is_primary() {
        let l = layout();
        let rows = vec![row(&l, 1, "b", 1), row(&l, 2, "a", 1), row(&l, 3, "a", 0)];
        // Declared: sort by v asc, then by k asc — k should be primary.
        let opt = ResultOption::new().sort_asc("v").sort_asc("k");
        let result = opt.apply(rows).unwrap();
        let ks: Vec<_> = result.iter().map(|r| r.get_by_name("k").unwrap().to_string()).collect();
        assert_eq!(ks, vec!["a", "a", "b"]);
    }
}
