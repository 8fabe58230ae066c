//! `MemoryTable`: the non-concurrent table core.
//!
//! Owns row storage, insertion order, and per-field secondary indices.
//! [`super::concurrent::ConcurrentMemoryTable`] wraps this with the
//! readers-writer discipline; this type has none of its own and is not
//! `Sync`-safe to share without that wrapper.

use std::collections::HashMap;
use std::sync::Arc;

use crate::layout::{LayoutError, Row, RowLayout, Value};
use crate::search::{ResultOption, Search};

use super::error::TableError;
use super::index::Index;

fn value_as_i64(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Int8(v)) => Some(*v as i64),
        Some(Value::Int16(v)) => Some(*v as i64),
        Some(Value::Int32(v)) => Some(*v as i64),
        Some(Value::Int64(v)) => Some(*v),
        Some(Value::UInt8(v)) => Some(*v as i64),
        Some(Value::UInt16(v)) => Some(*v as i64),
        Some(Value::UInt32(v)) => Some(*v as i64),
        Some(Value::UInt64(v)) => i64::try_from(*v).ok(),
        _ => None,
    }
}

pub struct MemoryTable {
    layout: Arc<RowLayout>,
    rows: HashMap<i64, Row>,
    order: Vec<i64>,
    next_free_id: i64,
    indices: HashMap<usize, Index>,
    sequence_number: u64,
    read_only: bool,
}

impl MemoryTable {
    pub fn new(layout: Arc<RowLayout>) -> Self {
        let indices = layout
            .indexed_field_positions()
            .map(|i| (i, Index::new()))
            .collect();
        Self {
            layout,
            rows: HashMap::new(),
            order: Vec::new(),
            next_free_id: 1,
            indices,
            sequence_number: 0,
            read_only: false,
        }
    }

    pub fn layout(&self) -> &Arc<RowLayout> {
        &self.layout
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// One-way: once frozen, a table never becomes writable again.
    pub fn freeze(&mut self) {
        self.read_only = true;
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn count(&self) -> usize {
        self.order.len()
    }

    /// Insertion-ordered identifiers.
    pub fn ids(&self) -> Vec<i64> {
        self.order.clone()
    }

    /// Ascending identifiers.
    pub fn sorted_ids(&self) -> Vec<i64> {
        let mut ids = self.order.clone();
        ids.sort_unstable();
        ids
    }

    pub fn exist(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn get_row(&self, id: i64) -> Option<&Row> {
        self.rows.get(&id)
    }

    /// Positional lookup over the ascending-identifier view.
    pub fn get_row_at(&self, position: usize) -> Option<&Row> {
        let ids = self.sorted_ids();
        ids.get(position).and_then(|id| self.rows.get(id))
    }

    fn id_field_index(&self) -> Result<usize, TableError> {
        self.layout
            .id_field_index()
            .ok_or_else(|| TableError::Layout(LayoutError::NoIdentifierField))
    }

    fn check_writable(&self) -> Result<(), TableError> {
        if self.read_only {
            Err(TableError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn bump_sequence(&mut self) {
        self.sequence_number += 1;
    }

    fn index_insert(&mut self, row: &Row, id: i64) {
        for (field, index) in self.indices.iter_mut() {
            index.insert(row.get(*field).cloned(), id);
        }
    }

    fn index_remove(&mut self, row: &Row, id: i64) {
        for (field, index) in self.indices.iter_mut() {
            index.remove(&row.get(*field).cloned(), id);
        }
    }

    /// If `row`'s id slot is `<= 0`, assigns `nextFreeId` and advances it.
    /// Otherwise honors the supplied positive id, advancing `nextFreeId`
    /// past it if needed. Fails with `DuplicateId` on an existing positive id.
    pub fn insert(&mut self, row: Row) -> Result<i64, TableError> {
        self.check_writable()?;
        let id_field = self.id_field_index()?;
        let requested = value_as_i64(row.get(id_field)).unwrap_or(0);
        let id = if requested <= 0 {
            let id = self.next_free_id;
            self.next_free_id += 1;
            id
        } else {
            if self.rows.contains_key(&requested) {
                return Err(TableError::DuplicateId(requested));
            }
            if requested >= self.next_free_id {
                self.next_free_id = requested + 1;
            }
            requested
        };
        let row = row.with_value(id_field, Some(Value::Int64(id)));
        self.index_insert(&row, id);
        self.rows.insert(id, row);
        self.order.push(id);
        self.bump_sequence();
        Ok(id)
    }

    /// Requires a positive id already present in storage.
    pub fn update(&mut self, row: Row) -> Result<(), TableError> {
        self.check_writable()?;
        let id_field = self.id_field_index()?;
        let id = value_as_i64(row.get(id_field))
            .filter(|v| *v > 0)
            .ok_or_else(|| TableError::InvalidOperation("update requires a positive id".into()))?;
        let old = self
            .rows
            .get(&id)
            .cloned()
            .ok_or(TableError::NotFound(id))?;
        self.index_remove(&old, id);
        self.index_insert(&row, id);
        self.rows.insert(id, row);
        self.bump_sequence();
        Ok(())
    }

    /// `Insert` if the id is absent, `Update` otherwise. Always requires a
    /// positive identifier.
    pub fn replace(&mut self, row: Row) -> Result<i64, TableError> {
        self.check_writable()?;
        let id_field = self.id_field_index()?;
        let id = value_as_i64(row.get(id_field))
            .filter(|v| *v > 0)
            .ok_or_else(|| TableError::InvalidOperation("replace requires a positive id".into()))?;
        if self.rows.contains_key(&id) {
            self.update(row)?;
            Ok(id)
        } else {
            self.insert(row)
        }
    }

    pub fn delete(&mut self, id: i64) -> Result<(), TableError> {
        self.check_writable()?;
        let row = self.rows.remove(&id).ok_or(TableError::NotFound(id))?;
        self.index_remove(&row, id);
        self.order.retain(|&existing| existing != id);
        self.bump_sequence();
        Ok(())
    }

    /// Evaluates `search` and deletes every match. Never fails for "no
    /// match"; a `None` search deletes every row.
    pub fn try_delete(&mut self, search: &Search) -> Result<usize, TableError> {
        self.check_writable()?;
        let bound = search.bind(&self.layout)?;
        let matches: Vec<i64> = self
            .order
            .iter()
            .copied()
            .filter(|id| crate::search::row_matches(&bound.expr, &self.rows[id]))
            .collect();
        for id in &matches {
            self.delete(*id)?;
        }
        Ok(matches.len())
    }

    /// Empties storage and indices. If `reset_ids`, `nextFreeId` returns to 1.
    pub fn clear(&mut self, reset_ids: bool) -> Result<(), TableError> {
        self.check_writable()?;
        self.rows.clear();
        self.order.clear();
        for index in self.indices.values_mut() {
            *index = Index::new();
        }
        if reset_ids {
            self.next_free_id = 1;
        }
        self.bump_sequence();
        Ok(())
    }

    /// Run `search`, shaped by `options`, against this table's rows.
    pub fn find(&self, search: &Search, options: &ResultOption) -> Result<Vec<Row>, TableError> {
        let bound = search.bind(&self.layout)?;
        let matched: Vec<Row> = self
            .order
            .iter()
            .filter_map(|id| self.rows.get(id))
            .filter(|row| crate::search::row_matches(&bound.expr, row))
            .cloned()
            .collect();
        Ok(options.apply(matched)?)
    }

    /// Distinct values of `field` across the full row set, in first-seen
    /// (insertion) order.
    pub fn distinct_values(&self, field: usize) -> Vec<Option<Value>> {
        let mut seen: Vec<Option<Value>> = Vec::new();
        for id in &self.order {
            let value = self.rows[id].get(field).cloned();
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        seen
    }

    /// Forbids rewriting the identifier field; rewrites every other row
    /// individually, going through the same index-maintenance path as
    /// `update`.
    pub fn set_value(&mut self, field: usize, value: Value) -> Result<(), TableError> {
        self.check_writable()?;
        if Some(field) == self.layout.id_field_index() {
            return Err(TableError::InvalidOperation(
                "cannot rewrite the identifier field via set_value".into(),
            ));
        }
        let ids = self.order.clone();
        for id in ids {
            let row = self.rows[&id].clone();
            let updated = row.with_value(field, Some(value.clone()));
            self.index_remove(&row, id);
            self.index_insert(&updated, id);
            self.rows.insert(id, updated);
        }
        self.bump_sequence();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn bucket_sum(&self, field: usize) -> Option<usize> {
        self.indices.get(&field).map(Index::bucket_sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DataType, FieldFlags, FieldProperties};

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

    fn colored_layout() -> Arc<RowLayout> {
        Arc::new(
            RowLayout::untyped(
                "t",
                vec![
                    FieldProperties::new("id", DataType::Int64).with_flags(FieldFlags::ID),
                    FieldProperties::new("color", DataType::String).with_flags(FieldFlags::INDEX),
                ],
            )
            .unwrap(),
        )
    }

    fn row(l: &Arc<RowLayout>, id: i64, name: &str) -> Row {
        Row::new(
            l.clone(),
            vec![Some(Value::Int64(id)), Some(Value::String(name.into()))],
        )
        .unwrap()
    }

    #[test]
    fn auto_id_assignment_scenario() {
        let l = layout();
        let mut t = MemoryTable::new(l.clone());
        let a = t.insert(row(&l, 0, "a")).unwrap();
        let b = t.insert(row(&l, 0, "b")).unwrap();
        let c = t.insert(row(&l, 10, "c")).unwrap();
        let d = t.insert(row(&l, 0, "d")).unwrap();
        assert_eq!([a, b, c, d], [1, 2, 10, 11]);
        assert_eq!(t.ids(), vec![1, 2, 10, 11]);
        assert_eq!(t.sorted_ids(), vec![1, 2, 10, 11]);
    }

    #[test]
    fn index_consistency_on_update_scenario() {
        let l = colored_layout();
        let mut t = MemoryTable::new(l.clone());
        t.insert(row(&l, 0, "red")).unwrap();
        t.insert(row(&l, 0, "red")).unwrap();
        t.update(row(&l, 1, "blue")).unwrap();

        let red = t.bucket_sum(1).unwrap();
        assert_eq!(red, 2);
    }

    #[test]
    fn insert_then_delete_restores_bucket_sums() {
        let l = colored_layout();
        let mut t = MemoryTable::new(l.clone());
        let id = t.insert(row(&l, 0, "red")).unwrap();
        t.delete(id).unwrap();
        assert!(!t.exist(id));
        assert_eq!(t.bucket_sum(1), Some(0));
    }

    #[test]
    fn duplicate_positive_id_is_rejected() {
        let l = layout();
        let mut t = MemoryTable::new(l.clone());
        t.insert(row(&l, 5, "a")).unwrap();
        let err = t.insert(row(&l, 5, "b")).unwrap_err();
        assert!(matches!(err, TableError::DuplicateId(5)));
    }

    #[test]
    fn read_only_table_rejects_mutation() {
        let l = layout();
        let mut t = MemoryTable::new(l.clone());
        t.freeze();
        assert!(matches!(
            t.insert(row(&l, 0, "a")),
            Err(TableError::ReadOnly)
        ));
    }

    #[test]
    fn sequence_number_increases_once_per_mutation() {
        let l = layout();
        let mut t = MemoryTable::new(l.clone());
        t.insert(row(&l, 0, "a")).unwrap();
        assert_eq!(t.sequence_number(), 1);
        t.insert(row(&l, 0, "b")).unwrap();
        assert_eq!(t.sequence_number(), 2);
    }

    #[test]
    fn set_value_rejects_identifier_field() {
        let l = layout();
        let mut t = MemoryTable::new(l.clone());
        assert!(matches!(
            t.set_value(0, Value::Int64(99)),
            Err(TableError::InvalidOperation(_))
        ));
    }
}
