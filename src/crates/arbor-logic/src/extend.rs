//! Leapfrog trie join: the `Leaper` capability and `extend_into`.

use crate::context::ExecutionContext;
use crate::gallop::{find_key_range, gallop_from};
use crate::relation::{Relation, Tuple};
use crate::variable::Variable;
use parking_lot::Mutex;
use std::marker::PhantomData;

/// Prefixes processed per parallel task.
const LEAPFROG_CHUNK: usize = 128;

/// Constrains which values extend a given prefix.
///
/// - `count` estimates the candidates for a prefix; leapers are consulted
///   cheapest-first, and a count of zero makes a blocking leaper the
///   proposer (which then proposes nothing, skipping the prefix).
/// - `propose` yields the smallest candidate for the prefix.
/// - `intersect` yields this leaper's first acceptable value `>=` the
///   shared candidate: returning the candidate itself is agreement,
///   returning a larger value advances the shared candidate, and `None`
///   abandons the prefix.
/// - `boxed_clone` exists because parallel chunks each own their leapers.
pub trait Leaper<P: Tuple, V: Tuple>: Send + Sync {
    fn count(&self, prefix: &P) -> usize;

    fn propose(&self, prefix: &P) -> Option<V>;

    fn intersect(&self, prefix: &P, val: &V) -> Option<V>;

    fn boxed_clone(&self) -> Box<dyn Leaper<P, V>>;
}

/// Semi-join extend: proposes values from `source` whose key matches the
/// prefix key.
pub struct ExtendWith<S, K, V, PK, SK, SV>
where
    S: Tuple,
{
    source: Relation<S>,
    prefix_key: PK,
    source_key: SK,
    source_val: SV,
    _shape: PhantomData<fn() -> (K, V)>,
}

impl<S, K, V, PK, SK, SV> ExtendWith<S, K, V, PK, SK, SV>
where
    S: Tuple,
{
    pub fn new(source: Relation<S>, prefix_key: PK, source_key: SK, source_val: SV) -> Self {
        Self {
            source,
            prefix_key,
            source_key,
            source_val,
            _shape: PhantomData,
        }
    }
}

impl<S, K, V, PK, SK, SV> Clone for ExtendWith<S, K, V, PK, SK, SV>
where
    S: Tuple,
    PK: Clone,
    SK: Clone,
    SV: Clone,
{
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            prefix_key: self.prefix_key.clone(),
            source_key: self.source_key.clone(),
            source_val: self.source_val.clone(),
            _shape: PhantomData,
        }
    }
}

impl<P, S, K, V, PK, SK, SV> Leaper<P, V> for ExtendWith<S, K, V, PK, SK, SV>
where
    P: Tuple,
    S: Tuple,
    K: Ord + 'static,
    V: Tuple,
    PK: Fn(&P) -> K + Clone + Send + Sync + 'static,
    SK: Fn(&S) -> K + Clone + Send + Sync + 'static,
    SV: Fn(&S) -> V + Clone + Send + Sync + 'static,
{
    fn count(&self, prefix: &P) -> usize {
        let key = (self.prefix_key)(prefix);
        let (start, end) = find_key_range(self.source.elements(), &key, &self.source_key);
        end - start
    }

    fn propose(&self, prefix: &P) -> Option<V> {
        let key = (self.prefix_key)(prefix);
        let (start, end) = find_key_range(self.source.elements(), &key, &self.source_key);
        if start == end {
            return None;
        }
        Some((self.source_val)(&self.source.elements()[start]))
    }

    fn intersect(&self, prefix: &P, val: &V) -> Option<V> {
        let key = (self.prefix_key)(prefix);
        let elements = self.source.elements();
        let (start, end) = find_key_range(elements, &key, &self.source_key);
        if start == end {
            return None;
        }
        let run = &elements[start..end];
        let at = gallop_from(run, 0, |t| (self.source_val)(t) < *val);
        if at >= run.len() {
            return None;
        }
        Some((self.source_val)(&run[at]))
    }

    fn boxed_clone(&self) -> Box<dyn Leaper<P, V>> {
        Box::new(self.clone())
    }
}

/// Key-level anti filter: a prefix whose key appears in `source` proposes
/// nothing (its count of zero makes it the proposer), so the prefix is
/// skipped; prefixes with no match pass every value through.
pub struct FilterAnti<S, K, V, PK, SK, SV>
where
    S: Tuple,
{
    source: Relation<S>,
    prefix_key: PK,
    source_key: SK,
    source_val: SV,
    _shape: PhantomData<fn() -> (K, V)>,
}

impl<S, K, V, PK, SK, SV> FilterAnti<S, K, V, PK, SK, SV>
where
    S: Tuple,
{
    pub fn new(source: Relation<S>, prefix_key: PK, source_key: SK, source_val: SV) -> Self {
        Self {
            source,
            prefix_key,
            source_key,
            source_val,
            _shape: PhantomData,
        }
    }
}

impl<S, K, V, PK, SK, SV> Clone for FilterAnti<S, K, V, PK, SK, SV>
where
    S: Tuple,
    PK: Clone,
    SK: Clone,
    SV: Clone,
{
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            prefix_key: self.prefix_key.clone(),
            source_key: self.source_key.clone(),
            source_val: self.source_val.clone(),
            _shape: PhantomData,
        }
    }
}

impl<P, S, K, V, PK, SK, SV> Leaper<P, V> for FilterAnti<S, K, V, PK, SK, SV>
where
    P: Tuple,
    S: Tuple,
    K: Ord + 'static,
    V: Tuple,
    PK: Fn(&P) -> K + Clone + Send + Sync + 'static,
    SK: Fn(&S) -> K + Clone + Send + Sync + 'static,
    SV: Fn(&S) -> V + Clone + Send + Sync + 'static,
{
    fn count(&self, prefix: &P) -> usize {
        let key = (self.prefix_key)(prefix);
        let (start, end) = find_key_range(self.source.elements(), &key, &self.source_key);
        if start == end {
            usize::MAX
        } else {
            0
        }
    }

    fn propose(&self, _prefix: &P) -> Option<V> {
        // Filters never propose; a zero count routes proposal here exactly
        // to block the prefix.
        None
    }

    fn intersect(&self, prefix: &P, val: &V) -> Option<V> {
        let key = (self.prefix_key)(prefix);
        let elements = self.source.elements();
        let (start, end) = find_key_range(elements, &key, &self.source_key);
        if start == end {
            return Some(val.clone());
        }
        let run = &elements[start..end];
        let at = gallop_from(run, 0, |t| (self.source_val)(t) < *val);
        if at < run.len() && (self.source_val)(&run[at]) == *val {
            // This exact value is excluded.
            return None;
        }
        Some(val.clone())
    }

    fn boxed_clone(&self) -> Box<dyn Leaper<P, V>> {
        Box::new(self.clone())
    }
}

/// Extend from a base source minus an exclusion set: proposes values
/// present in `base` for the prefix key that do not appear in `exclude`.
pub struct ExtendAnti<S, E, K, V, PK, SK, SV, EK, EV>
where
    S: Tuple,
    E: Tuple,
{
    base: Relation<S>,
    exclude: Relation<E>,
    prefix_key: PK,
    source_key: SK,
    source_val: SV,
    exclude_key: EK,
    exclude_val: EV,
    _shape: PhantomData<fn() -> (K, V)>,
}

impl<S, E, K, V, PK, SK, SV, EK, EV> ExtendAnti<S, E, K, V, PK, SK, SV, EK, EV>
where
    S: Tuple,
    E: Tuple,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        base: Relation<S>,
        exclude: Relation<E>,
        prefix_key: PK,
        source_key: SK,
        source_val: SV,
        exclude_key: EK,
        exclude_val: EV,
    ) -> Self {
        Self {
            base,
            exclude,
            prefix_key,
            source_key,
            source_val,
            exclude_key,
            exclude_val,
            _shape: PhantomData,
        }
    }
}

impl<S, E, K, V, PK, SK, SV, EK, EV> Clone for ExtendAnti<S, E, K, V, PK, SK, SV, EK, EV>
where
    S: Tuple,
    E: Tuple,
    PK: Clone,
    SK: Clone,
    SV: Clone,
    EK: Clone,
    EV: Clone,
{
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            exclude: self.exclude.clone(),
            prefix_key: self.prefix_key.clone(),
            source_key: self.source_key.clone(),
            source_val: self.source_val.clone(),
            exclude_key: self.exclude_key.clone(),
            exclude_val: self.exclude_val.clone(),
            _shape: PhantomData,
        }
    }
}

impl<P, S, E, K, V, PK, SK, SV, EK, EV> Leaper<P, V> for ExtendAnti<S, E, K, V, PK, SK, SV, EK, EV>
where
    P: Tuple,
    S: Tuple,
    E: Tuple,
    K: Ord + 'static,
    V: Tuple,
    PK: Fn(&P) -> K + Clone + Send + Sync + 'static,
    SK: Fn(&S) -> K + Clone + Send + Sync + 'static,
    SV: Fn(&S) -> V + Clone + Send + Sync + 'static,
    EK: Fn(&E) -> K + Clone + Send + Sync + 'static,
    EV: Fn(&E) -> V + Clone + Send + Sync + 'static,
{
    fn count(&self, prefix: &P) -> usize {
        let key = (self.prefix_key)(prefix);
        let (bs, be) = find_key_range(self.base.elements(), &key, &self.source_key);
        let (es, ee) = find_key_range(self.exclude.elements(), &key, &self.exclude_key);
        (be - bs).saturating_sub(ee - es)
    }

    fn propose(&self, prefix: &P) -> Option<V> {
        let smallest = {
            let key = (self.prefix_key)(prefix);
            let (start, end) = find_key_range(self.base.elements(), &key, &self.source_key);
            if start == end {
                return None;
            }
            (self.source_val)(&self.base.elements()[start])
        };
        self.intersect(prefix, &smallest)
    }

    fn intersect(&self, prefix: &P, val: &V) -> Option<V> {
        let key = (self.prefix_key)(prefix);
        let base = self.base.elements();
        let (bs, be) = find_key_range(base, &key, &self.source_key);
        if bs == be {
            return None;
        }
        let exclude = self.exclude.elements();
        let (es, ee) = find_key_range(exclude, &key, &self.exclude_key);
        let run = &base[bs..be];
        let excl = &exclude[es..ee];

        let mut at = gallop_from(run, 0, |t| (self.source_val)(t) < *val);
        while at < run.len() {
            let candidate = (self.source_val)(&run[at]);
            let hit = gallop_from(excl, 0, |t| (self.exclude_val)(t) < candidate);
            if hit >= excl.len() || (self.exclude_val)(&excl[hit]) != candidate {
                return Some(candidate);
            }
            at += 1;
        }
        None
    }

    fn boxed_clone(&self) -> Box<dyn Leaper<P, V>> {
        Box::new(self.clone())
    }
}

fn process_prefixes<P, V, R, C, N>(
    prefixes: &[P],
    leapers: &mut [Box<dyn Leaper<P, V>>],
    combine: &C,
    successor: &N,
    results: &mut Vec<R>,
) where
    P: Tuple,
    V: Tuple,
    C: Fn(&P, &V) -> R,
    N: Fn(&V) -> Option<V>,
{
    for prefix in prefixes {
        // Cheapest leaper proposes; the rest constrain.
        leapers.sort_by_key(|leaper| leaper.count(prefix));
        let Some(mut val) = leapers[0].propose(prefix) else {
            continue;
        };

        'prefix: loop {
            let mut agreed = true;
            for leaper in leapers.iter() {
                match leaper.intersect(prefix, &val) {
                    None => break 'prefix,
                    Some(next) => {
                        if next != val {
                            val = next;
                            agreed = false;
                            break;
                        }
                    }
                }
            }
            if agreed {
                results.push(combine(prefix, &val));
                match successor(&val) {
                    Some(next) => val = next,
                    None => break 'prefix,
                }
            }
        }
    }
}

/// Leapfrog trie join: for each tuple in `source`, emit
/// `combine(prefix, val)` for every `val` all leapers accept.
///
/// `successor` advances past an emitted value (`None` ends the prefix);
/// for integer values pass something like `|v| v.checked_add(1)`.
///
/// With an executor in `ctx`, prefixes are processed in chunks of 128,
/// each chunk owning cloned leapers.
pub fn extend_into<P, V, R, C, N>(
    source: &Relation<P>,
    leapers: &[&dyn Leaper<P, V>],
    output: &Variable<R>,
    combine: C,
    successor: N,
    ctx: &ExecutionContext,
) where
    P: Tuple,
    V: Tuple,
    R: Tuple,
    C: Fn(&P, &V) -> R + Send + Sync,
    N: Fn(&V) -> Option<V> + Send + Sync,
{
    if source.is_empty() || leapers.is_empty() {
        return;
    }
    let prefixes = source.elements();
    let chunk_count = prefixes.len().div_ceil(LEAPFROG_CHUNK);

    match ctx.executor() {
        Some(executor) if chunk_count > 1 => {
            let slots: Vec<Mutex<Vec<R>>> = (0..chunk_count).map(|_| Mutex::new(Vec::new())).collect();
            executor.bulk(chunk_count, &|chunk| {
                let lo = chunk * LEAPFROG_CHUNK;
                let hi = (lo + LEAPFROG_CHUNK).min(prefixes.len());
                let mut local: Vec<Box<dyn Leaper<P, V>>> =
                    leapers.iter().map(|leaper| leaper.boxed_clone()).collect();
                let mut results = Vec::new();
                process_prefixes(
                    &prefixes[lo..hi],
                    &mut local,
                    &combine,
                    &successor,
                    &mut results,
                );
                *slots[chunk].lock() = results;
            });
            for slot in slots {
                let results = slot.into_inner();
                if !results.is_empty() {
                    output.insert_relation(Relation::from_slice(results));
                }
            }
        }
        _ => {
            let mut local: Vec<Box<dyn Leaper<P, V>>> =
                leapers.iter().map(|leaper| leaper.boxed_clone()).collect();
            let mut results = Vec::new();
            process_prefixes(prefixes, &mut local, &combine, &successor, &mut results);
            if !results.is_empty() {
                output.insert_relation(Relation::from_slice(results));
            }
        }
    }
}
