//! Semi-naive delta variables.

use crate::gallop::gallop_from;
use crate::relation::{Relation, Tuple};
use std::cell::RefCell;
use std::rc::Rc;

struct VariableInner<T: Tuple> {
    // Consolidated facts from past iterations, one layer per promotion.
    stable: Vec<Relation<T>>,
    // The delta produced by the most recent changed() call.
    recent: Relation<T>,
    // Batches queued for the next changed() step.
    to_add: Vec<Relation<T>>,
    // Lazily merged view of `stable`, invalidated on promotion.
    stable_cache: Option<Relation<T>>,
}

/// The semi-naive evaluation delta holder.
///
/// A variable keeps facts in three layers: `stable` (everything confirmed
/// in earlier iterations), `recent` (the last iteration's delta, what join
/// operators key on), and `to_add` (pending inserts). `stable ∩ recent`
/// is empty by construction: [`Variable::changed`] only promotes facts not
/// already present in the merged stable view.
///
/// Handles are cheap clones sharing one underlying variable; the driver is
/// single-threaded (parallelism lives inside the operators), so the shared
/// state sits behind `Rc<RefCell<…>>`.
///
/// ```rust
/// use arbor_logic::{Iteration, Relation};
///
/// let mut iteration = Iteration::new();
/// let reachable = iteration.variable();
/// reachable.insert_slice(&[(1u32, 2u32), (2, 3)]);
/// while iteration.changed() {
///     // read reachable.recent(), derive, insert back
/// }
/// let result: Relation<(u32, u32)> = reachable.complete();
/// assert_eq!(result.len(), 2);
/// ```
pub struct Variable<T: Tuple> {
    inner: Rc<RefCell<VariableInner<T>>>,
}

impl<T: Tuple> Clone for Variable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Tuple> Default for Variable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Tuple> Variable<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(VariableInner {
                stable: Vec::new(),
                recent: Relation::empty(),
                to_add: Vec::new(),
                stable_cache: None,
            })),
        }
    }

    // ---- insertion -------------------------------------------------------

    pub fn insert(&self, tuple: T) {
        self.insert_relation(Relation::from_slice(vec![tuple]));
    }

    pub fn insert_slice(&self, tuples: &[T]) {
        if !tuples.is_empty() {
            self.insert_relation(Relation::from_slice(tuples.to_vec()));
        }
    }

    pub fn insert_relation(&self, relation: Relation<T>) {
        if !relation.is_empty() {
            self.inner.borrow_mut().to_add.push(relation);
        }
    }

    // ---- layer access ----------------------------------------------------

    /// The most recent delta. O(1): relations are reference-counted.
    pub fn recent(&self) -> Relation<T> {
        self.inner.borrow().recent.clone()
    }

    /// Merged view of all stable layers (cached until the next promotion).
    pub fn stable(&self) -> Relation<T> {
        let mut inner = self.inner.borrow_mut();
        Self::merged_stable(&mut inner)
    }

    /// Total tuple count across all three layers (with multiplicity across
    /// layers).
    pub fn total_len(&self) -> usize {
        let inner = self.inner.borrow();
        inner.recent.len()
            + inner.stable.iter().map(Relation::len).sum::<usize>()
            + inner.to_add.iter().map(Relation::len).sum::<usize>()
    }

    // ---- the semi-naive step ---------------------------------------------

    /// Advance one iteration step.
    ///
    /// Merges the pending batches, subtracts everything already stable
    /// (one gallop-accelerated scan), and promotes the remainder to
    /// `recent` plus a new stable layer. Returns `true` iff the step
    /// produced at least one genuinely new fact.
    pub fn changed(&self) -> bool {
        let mut inner = self.inner.borrow_mut();

        let pending = std::mem::take(&mut inner.to_add);
        let mut batches = pending.into_iter();
        let Some(mut candidate) = batches.next() else {
            inner.recent = Relation::empty();
            return false;
        };
        for batch in batches {
            candidate = Relation::merge(&candidate, &batch);
        }

        let stable = Self::merged_stable(&mut inner);
        let stable_elems = stable.elements();
        let mut cursor = 0;
        let mut fresh = Vec::with_capacity(candidate.len());
        for tuple in candidate.elements() {
            cursor = gallop_from(stable_elems, cursor, |t| t < tuple);
            if cursor >= stable_elems.len() || stable_elems[cursor] != *tuple {
                fresh.push(tuple.clone());
            }
        }

        if fresh.is_empty() {
            inner.recent = Relation::empty();
            return false;
        }
        let delta = Relation::from_sorted(fresh);
        inner.recent = delta.clone();
        inner.stable.push(delta);
        inner.stable_cache = None;
        true
    }

    // ---- finishing -------------------------------------------------------

    /// Drain pending batches and return one relation holding every fact
    /// ever inserted, exactly once.
    pub fn complete(&self) -> Relation<T> {
        let mut inner = self.inner.borrow_mut();
        let pending = std::mem::take(&mut inner.to_add);
        if !pending.is_empty() {
            let mut merged = Relation::empty();
            for batch in pending {
                merged = Relation::merge(&merged, &batch);
            }
            inner.stable.push(merged);
            inner.stable_cache = None;
        }
        Self::merged_stable(&mut inner)
    }

    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.stable.clear();
        inner.recent = Relation::empty();
        inner.to_add.clear();
        inner.stable_cache = None;
    }

    fn merged_stable(inner: &mut VariableInner<T>) -> Relation<T> {
        if let Some(cache) = &inner.stable_cache {
            return cache.clone();
        }
        let mut merged = Relation::empty();
        for layer in &inner.stable {
            merged = Relation::merge(&merged, layer);
        }
        inner.stable_cache = Some(merged.clone());
        merged
    }
}
