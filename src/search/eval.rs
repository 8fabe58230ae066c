//! In-memory evaluation of a [`BoundSearch`] against a row sequence.
//!
//! Nulls use two-valued logic throughout: a `Compare`/`Like`/`In` node never
//! matches a null slot, and negation is applied to that boolean result (so a
//! null slot *does* match the negated form). This sidesteps SQL's
//! three-valued NULL semantics in favor of something a caller can reason
//! about without a truth table.

use crate::layout::{Row, Value};

use super::mode::{BoundExpr, BoundSearch, CompareMode};

/// Filter `rows` down to those matching `search`. Intersection/union/
/// set-difference over indices is an optimization a `Table` can apply by
/// narrowing `rows` before calling this; the semantics here are the ground
/// truth a caller can fall back to when no index covers a predicate.
pub(crate) fn filter_rows<'a>(search: &BoundSearch, rows: &'a [Row]) -> Vec<&'a Row> {
    rows.iter().filter(|row| row_matches(&search.expr, row)).collect()
}

pub(crate) fn row_matches(expr: &BoundExpr, row: &Row) -> bool {
    match expr {
        BoundExpr::None => true,
        BoundExpr::And(a, b) => row_matches(a, row) && row_matches(b, row),
        BoundExpr::Or(a, b) => row_matches(a, row) || row_matches(b, row),
        BoundExpr::Compare {
            field,
            op,
            value,
            negated,
        } => {
            let result = match row.get(*field) {
                Some(v) => compare(v, *op, value),
                None => false,
            };
            result != *negated
        }
        BoundExpr::Like {
            field,
            pattern,
            negated,
        } => {
            let result = match row.get(*field) {
                Some(Value::String(s)) => super::mode::like_match(pattern, s),
                _ => false,
            };
            result != *negated
        }
        BoundExpr::In {
            field,
            values,
            negated,
        } => {
            let result = match row.get(*field) {
                Some(v) => values.iter().any(|candidate| candidate == v),
                None => false,
            };
            result != *negated
        }
    }
}

fn compare(actual: &Value, op: CompareMode, expected: &Value) -> bool {
    let Some(ord) = actual.partial_cmp(expected) else {
        return false;
    };
    match op {
        CompareMode::Equals => ord.is_eq(),
        CompareMode::Greater => ord.is_gt(),
        CompareMode::Smaller => ord.is_lt(),
        CompareMode::GreaterOrEqual => ord.is_ge(),
        CompareMode::SmallerOrEqual => ord.is_le(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DataType, FieldFlags, FieldProperties, RowLayout};
    use std::sync::Arc;

    fn layout() -> Arc<RowLayout> {
        Arc::new(
            RowLayout::untyped(
                "t",
                vec![
                    FieldProperties::new("id", DataType::Int64).with_flags(FieldFlags::ID),
                    FieldProperties::new("name", DataType::String),
                    FieldProperties::new("age", DataType::Int64),
                ],
            )
            .unwrap(),
        )
    }

    fn row(l: &Arc<RowLayout>, id: i64, name: &str, age: Option<i64>) -> Row {
        Row::new(
            l.clone(),
            vec![
                Some(Value::Int64(id)),
                Some(Value::String(name.into())),
                age.map(Value::Int64),
            ],
        )
        .unwrap()
    }

    #[test]
    fn and_intersects_or_unions() {
        let l = layout();
        let rows = vec![
            row(&l, 1, "a", Some(10)),
            row(&l, 2, "b", Some(20)),
            row(&l, 3, "a", Some(20)),
        ];
        let search = (super::super::mode::Search::eq("name", Value::String("a".into()))
            & super::super::mode::Search::eq("age", Value::Int64(20)))
        .bind(&l)
        .unwrap();
        let matched = filter_rows(&search, &rows);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id().unwrap(), 3);

        let search = (super::super::mode::Search::eq("name", Value::String("a".into()))
            | super::super::mode::Search::eq("age", Value::Int64(20)))
        .bind(&l)
        .unwrap();
        let matched = filter_rows(&search, &rows);
        assert_eq!(matched.len(), 3);
    }

    #[test]
    fn null_slot_never_matches_positive_predicate_but_matches_its_negation() {
        let l = layout();
        let rows = vec![row(&l, 1, "a", None)];
        let search = super::super::mode::Search::ge("age", Value::Int64(0))
            .bind(&l)
            .unwrap();
        assert!(filter_rows(&search, &rows).is_empty());

        let negated = (!super::super::mode::Search::ge("age", Value::Int64(0)))
            .unwrap()
            .bind(&l)
            .unwrap();
        assert_eq!(filter_rows(&negated, &rows).len(), 1);
    }

    #[test]
    fn in_set_matches_any_candidate() {
        let l = layout();
        let rows = vec![row(&l, 1, "a", Some(1)), row(&l, 2, "b", Some(2))];
        let search = super::super::mode::Search::in_set(
            "name",
            vec![Value::String("b".into()), Value::String("c".into())],
        )
        .bind(&l)
        .unwrap();
        let matched = filter_rows(&search, &rows);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id().unwrap(), 2);
    }
}
