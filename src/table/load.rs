//! Bulk loading: clears the target, then inserts rows from `source` in
//! bounded windows, reporting progress and bypassing the transaction log.

use crate::layout::Row;
use crate::search::Search;

use super::error::TableError;
use super::memory::MemoryTable;

/// Default window size used when no `Storage` collaborator supplies its own
/// "default transaction row count" (§6 of the design notes).
const DEFAULT_WINDOW: usize = 1000;

/// Progress callback for [`MemoryTable::load_from`]. Returning `false`
/// requests an early break.
pub trait LoadProgress {
    fn on_progress(&mut self, current: u64, total: Option<u64>) -> bool;
}

impl MemoryTable {
    /// Clears this table, then inserts every row of `source` that matches
    /// `search` (or every row, if `search` is `None`), in ascending windows
    /// of [`DEFAULT_WINDOW`] rows. Insertion here never appends to a
    /// transaction log — a caller driving a `TableWriter` on top of this
    /// table is responsible for that separately.
    pub fn load_from(
        &mut self,
        source: impl IntoIterator<Item = Row>,
        search: Option<&Search>,
        mut progress: Option<&mut dyn LoadProgress>,
    ) -> Result<u64, TableError> {
        self.clear(true)?;
        let bound = match search {
            Some(s) => Some(s.bind(self.layout())?),
            None => None,
        };

        let mut current: u64 = 0;
        let mut window = 0usize;
        for row in source {
            if let Some(bound) = &bound {
                if !crate::search::row_matches(&bound.expr, &row) {
                    continue;
                }
            }
            self.insert(row)?;
            current += 1;
            window += 1;

            if window >= DEFAULT_WINDOW {
                window = 0;
                if let Some(p) = progress.as_deref_mut() {
                    if !p.on_progress(current, None) {
                        return Ok(current);
                    }
                }
            }
        }
        if let Some(p) = progress.as_deref_mut() {
            p.on_progress(current, Some(current));
        }
        Ok(current)
    }
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
                    FieldProperties::new("name", DataType::String),
                ],
            )
            .unwrap(),
        )
    }

    struct Counter {
        calls: u32,
    }

    impl LoadProgress for Counter {
        fn on_progress(&mut self, _current: u64, _total: Option<u64>) -> bool {
            self.calls += 1;
            true
        }
    }

    #[test]
    fn load_from_clears_then_repopulates() {
        let l = layout();
        let mut t = MemoryTable::new(l.clone());
        t.insert(Row::new(l.clone(), vec![Some(Value::Int64(0)), Some(Value::String("stale".into()))]).unwrap()).unwrap();

        let rows = vec![
            Row::new(l.clone(), vec![Some(Value::Int64(1)), Some(Value::String("a".into()))]).unwrap(),
            Row::new(l.clone(), vec![Some(Value::Int64(2)), Some(Value::String("b".into()))]).unwrap(),
        ];
        let mut counter = Counter { calls: 0 };
        let loaded = t.load_from(rows, None, Some(&mut counter)).unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(t.count(), 2);
        assert!(t.exist(1) && t.exist(2));
    }

    #[test]
    fn load_from_filters_by_search() {
        let l = layout();
        let mut t = MemoryTable::new(l.clone());
        let rows = vec![
            Row::new(l.clone(), vec![Some(Value::Int64(1)), Some(Value::String("a".into()))]).unwrap(),
            Row::new(l.clone(), vec![Some(Value::Int64(2)), Some(Value::String("b".into()))]).unwrap(),
        ];
        let search = crate::search::Search::eq("name", Value::String("b".into()));
        let loaded = t.load_from(rows, Some(&search), None).unwrap();
        assert_eq!(loaded, 1);
        assert!(t.exist(2) && !t.exist(1));
    }
}
