//! Immutable sorted deduplicated relations.

use crate::error::StoreError;
use crate::storable::Storable;
use std::fmt;
use std::sync::Arc;

/// Element type of a relation: lexicographically ordered, cheap to clone,
/// shareable across the executor's tasks. Blanket-implemented.
pub trait Tuple: Ord + Clone + Send + Sync + 'static {}

impl<T: Ord + Clone + Send + Sync + 'static> Tuple for T {}

const MAGIC: [u8; 8] = *b"STLREL\0\0";

/// An immutable, sorted, deduplicated multiset of tuples.
///
/// Backed by a reference-counted slice, so cloning is O(1) and the contents
/// never change after construction. All construction funnels through
/// [`Relation::from_slice`] (sort + dedup) or [`Relation::merge`]
/// (two-pointer sorted merge).
pub struct Relation<T: Tuple> {
    elements: Arc<[T]>,
}

impl<T: Tuple> Clone for Relation<T> {
    fn clone(&self) -> Self {
        Self {
            elements: Arc::clone(&self.elements),
        }
    }
}

impl<T: Tuple> Default for Relation<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Tuple> Relation<T> {
    /// The shared empty relation.
    pub fn empty() -> Self {
        Self {
            elements: Vec::new().into(),
        }
    }

    /// Sort and deduplicate an arbitrary batch of tuples.
    pub fn from_slice(mut data: Vec<T>) -> Self {
        data.sort_unstable();
        data.dedup();
        Self {
            elements: data.into(),
        }
    }

    /// Wrap data that is already sorted and deduplicated (diff outputs,
    /// merge results).
    pub(crate) fn from_sorted(data: Vec<T>) -> Self {
        debug_assert!(data.windows(2).all(|w| w[0] < w[1]));
        Self {
            elements: data.into(),
        }
    }

    /// Two-pointer merge of two sorted relations, dropping duplicates.
    pub fn merge(a: &Relation<T>, b: &Relation<T>) -> Relation<T> {
        if a.is_empty() {
            return b.clone();
        }
        if b.is_empty() {
            return a.clone();
        }

        let left = a.elements();
        let right = b.elements();
        let mut result = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            match left[i].cmp(&right[j]) {
                std::cmp::Ordering::Less => {
                    result.push(left[i].clone());
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    result.push(right[j].clone());
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    result.push(left[i].clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        result.extend_from_slice(&left[i..]);
        result.extend_from_slice(&right[j..]);
        Self::from_sorted(result)
    }

    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn contains(&self, tuple: &T) -> bool {
        self.elements.binary_search(tuple).is_ok()
    }
}

impl<T: Tuple> PartialEq for Relation<T> {
    fn eq(&self, other: &Self) -> bool {
        self.elements() == other.elements()
    }
}

impl<T: Tuple> Eq for Relation<T> {}

impl<T: Tuple + fmt::Debug> fmt::Debug for Relation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Tuple> From<Vec<T>> for Relation<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_slice(data)
    }
}

impl<'a, T: Tuple> IntoIterator for &'a Relation<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Tuple + Storable> Relation<T> {
    /// Append the wire form: 8-byte magic `"STLREL\0\0"`, little-endian
    /// `u64` count, then `count` fixed-width tuples.
    pub fn save(&self, out: &mut Vec<u8>) {
        out.reserve(16 + self.len() * T::ENCODED_LEN);
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for tuple in self.iter() {
            tuple.encode(out);
        }
    }

    /// Decode a buffer produced by [`Relation::save`]. Validates the magic
    /// and that the declared count fits; trailing bytes are tolerated.
    pub fn load(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < 16 {
            return Err(StoreError::ShortBuffer { len: bytes.len() });
        }
        if bytes[..8] != MAGIC {
            return Err(StoreError::BadMagic);
        }
        let mut count_buf = [0u8; 8];
        count_buf.copy_from_slice(&bytes[8..16]);
        let count = u64::from_le_bytes(count_buf) as usize;

        let expected = count
            .checked_mul(T::ENCODED_LEN)
            .and_then(|n| n.checked_add(16))
            .ok_or(StoreError::Truncated {
                expected: usize::MAX,
                actual: bytes.len(),
            })?;
        if bytes.len() < expected {
            return Err(StoreError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }

        let mut data = Vec::with_capacity(count);
        let mut offset = 16;
        for _ in 0..count {
            data.push(T::decode(&bytes[offset..offset + T::ENCODED_LEN]));
            offset += T::ENCODED_LEN;
        }
        Ok(Self {
            elements: data.into(),
        })
    }
}
