//! Secondary index: value → insertion-ordered bucket of row ids.
//!
//! `Value` carries `f32`/`f64` variants, which have no `Hash`/`Eq`
//! implementation in `std`, so buckets are kept in a flat `Vec` and found by
//! linear scan rather than through a `HashMap`. Indexed fields are expected
//! to carry a small number of distinct values relative to row count; this
//! trades lookup complexity for not needing a parallel "is this value
//! hashable" carve-out. A null slot lives in its own sentinel bucket (key
//! `None`), per the single-sentinel-null-bucket design.

use crate::layout::Value;

#[derive(Debug, Default)]
pub(crate) struct Index {
    buckets: Vec<(Option<Value>, Vec<i64>)>,
}

impl Index {
    pub(crate) fn new() -> Self {
        Self { buckets: Vec::new() }
    }

    fn bucket_position(&self, key: &Option<Value>) -> Option<usize> {
        self.buckets.iter().position(|(k, _)| k == key)
    }

    pub(crate) fn insert(&mut self, key: Option<Value>, id: i64) {
        match self.bucket_position(&key) {
            Some(i) => self.buckets[i].1.push(id),
            None => self.buckets.push((key, vec![id])),
        }
    }

    pub(crate) fn remove(&mut self, key: &Option<Value>, id: i64) {
        if let Some(i) = self.bucket_position(key) {
            self.buckets[i].1.retain(|&existing| existing != id);
            if self.buckets[i].1.is_empty() {
                self.buckets.remove(i);
            }
        }
    }

    pub(crate) fn lookup(&self, key: &Option<Value>) -> &[i64] {
        self.bucket_position(key)
            .map(|i| self.buckets[i].1.as_slice())
            .unwrap_or(&[])
    }

    /// Sum of all bucket sizes — checked against row count as a table
    /// invariant after every mutation in tests.
    pub(crate) fn bucket_sum(&self) -> usize {
        self.buckets.iter().map(|(_, ids)| ids.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassigning_a_value_moves_the_id_between_buckets() {
        let mut idx = Index::new();
        idx.insert(Some(Value::String("red".into())), 1);
        idx.insert(Some(Value::String("red".into())), 2);
        idx.remove(&Some(Value::String("red".into())), 1);
        idx.insert(Some(Value::String("blue".into())), 1);

        assert_eq!(idx.lookup(&Some(Value::String("red".into()))), &[2]);
        assert_eq!(idx.lookup(&Some(Value::String("blue".into()))), &[1]);
        assert_eq!(idx.bucket_sum(), 2);
    }

    #[test]
    fn null_values_share_a_sentinel_bucket() {
        let mut idx = Index::new();
        idx.insert(None, 1);
        idx.insert(None, 2);
        assert_eq!(idx.lookup(&None), &[1, 2]);
        assert_eq!(idx.bucket_sum(), 2);
    }
}
