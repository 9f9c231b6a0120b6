//! Ordered secondary index over a relation.

use crate::relation::{Relation, Tuple};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ordered map from an extracted key to the sorted run of tuples carrying
/// it; point lookups and inclusive key-range scans return borrowed views.
pub struct SecondaryIndex<T: Tuple, K: Ord + Clone> {
    key_fn: Box<dyn Fn(&T) -> K + Send + Sync>,
    buckets: BTreeMap<K, Vec<T>>,
    len: usize,
}

impl<T: Tuple, K: Ord + Clone> SecondaryIndex<T, K> {
    /// Build the index by scanning `source`.
    pub fn build<F>(source: &Relation<T>, key_fn: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        let mut index = Self {
            key_fn: Box::new(key_fn),
            buckets: BTreeMap::new(),
            len: 0,
        };
        index.insert_slice(source.elements());
        index
    }

    /// All tuples with exactly this key (empty if absent).
    pub fn get(&self, key: &K) -> &[T] {
        self.buckets.get(key).map_or(&[], Vec::as_slice)
    }

    /// Bucket views for every key in `[lo, hi]`, in key order.
    pub fn get_range(&self, lo: &K, hi: &K) -> Vec<&[T]> {
        self.buckets
            .range((Bound::Included(lo), Bound::Included(hi)))
            .map(|(_, bucket)| bucket.as_slice())
            .collect()
    }

    /// Insert one tuple, keeping its bucket sorted and deduplicated.
    pub fn insert(&mut self, tuple: T) {
        let key = (self.key_fn)(&tuple);
        let bucket = self.buckets.entry(key).or_default();
        match bucket.binary_search(&tuple) {
            Ok(_) => {}
            Err(at) => {
                bucket.insert(at, tuple);
                self.len += 1;
            }
        }
    }

    pub fn insert_slice(&mut self, tuples: &[T]) {
        for tuple in tuples {
            self.insert(tuple.clone());
        }
    }

    /// Total tuples across all buckets.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.buckets.len()
    }
}
