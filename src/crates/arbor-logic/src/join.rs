//! Semi-naive binary join and anti-join.

use crate::context::ExecutionContext;
use crate::gallop::gallop_from;
use crate::relation::{Relation, Tuple};
use crate::variable::Variable;
use parking_lot::Mutex;

/// Sort-merge join of two sorted slices on a shared key, galloping over
/// runs of unmatched keys. Every matching pair is combined into `out`.
fn merge_join<T1, T2, K, R, KL, KR, C>(
    left: &[T1],
    right: &[T2],
    key_left: &KL,
    key_right: &KR,
    combine: &C,
    out: &mut Vec<R>,
) where
    K: Ord,
    KL: Fn(&T1) -> K,
    KR: Fn(&T2) -> K,
    C: Fn(&T1, &T2) -> R,
{
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        let lk = key_left(&left[i]);
        let rk = key_right(&right[j]);
        match lk.cmp(&rk) {
            std::cmp::Ordering::Less => {
                i = gallop_from(left, i, |t| key_left(t) < rk);
            }
            std::cmp::Ordering::Greater => {
                j = gallop_from(right, j, |t| key_right(t) < lk);
            }
            std::cmp::Ordering::Equal => {
                let left_end = gallop_from(left, i, |t| key_left(t) <= lk);
                let right_end = gallop_from(right, j, |t| key_right(t) <= lk);
                for a in &left[i..left_end] {
                    for b in &right[j..right_end] {
                        out.push(combine(a, b));
                    }
                }
                i = left_end;
                j = right_end;
            }
        }
    }
}

/// Semi-naive binary join: derives only tuples involving at least one
/// *recent* fact, in three passes —
///
/// 1. `stable(left) × recent(right)`
/// 2. `recent(left) × stable(right)`
/// 3. `recent(left) × recent(right)`
///
/// Results land in `output`'s pending batch. With an executor in `ctx`,
/// the three passes run as parallel tasks and are merged before returning.
pub fn join_into<T1, T2, K, R>(
    left: &Variable<T1>,
    right: &Variable<T2>,
    output: &Variable<R>,
    key_left: impl Fn(&T1) -> K + Send + Sync,
    key_right: impl Fn(&T2) -> K + Send + Sync,
    combine: impl Fn(&T1, &T2) -> R + Send + Sync,
    ctx: &ExecutionContext,
) where
    T1: Tuple,
    T2: Tuple,
    R: Tuple,
    K: Ord,
{
    let left_stable = left.stable();
    let left_recent = left.recent();
    let right_stable = right.stable();
    let right_recent = right.recent();

    let passes: [(&Relation<T1>, &Relation<T2>); 3] = [
        (&left_stable, &right_recent),
        (&left_recent, &right_stable),
        (&left_recent, &right_recent),
    ];

    if let Some(executor) = ctx.executor() {
        let results: [Mutex<Vec<R>>; 3] = [
            Mutex::new(Vec::new()),
            Mutex::new(Vec::new()),
            Mutex::new(Vec::new()),
        ];
        executor.bulk(3, &|pass| {
            let (l, r) = passes[pass];
            let mut buf = Vec::new();
            merge_join(
                l.elements(),
                r.elements(),
                &key_left,
                &key_right,
                &combine,
                &mut buf,
            );
            *results[pass].lock() = buf;
        });
        for slot in results {
            let buf = slot.into_inner();
            if !buf.is_empty() {
                output.insert_relation(Relation::from_slice(buf));
            }
        }
    } else {
        for (l, r) in passes {
            let mut buf = Vec::new();
            merge_join(
                l.elements(),
                r.elements(),
                &key_left,
                &key_right,
                &combine,
                &mut buf,
            );
            if !buf.is_empty() {
                output.insert_relation(Relation::from_slice(buf));
            }
        }
    }
}

/// Anti-join: emits tuples from `recent(left)` whose key appears in
/// neither `stable(right)` nor `recent(right)`.
pub fn join_anti<T1, T2, K>(
    left: &Variable<T1>,
    right: &Variable<T2>,
    output: &Variable<T1>,
    key_left: impl Fn(&T1) -> K,
    key_right: impl Fn(&T2) -> K,
    _ctx: &ExecutionContext,
) where
    T1: Tuple,
    T2: Tuple,
    K: Ord,
{
    let right_stable = right.stable();
    let right_recent = right.recent();

    let has_key = |haystack: &[T2], key: &K| {
        haystack
            .binary_search_by(|t| key_right(t).cmp(key))
            .is_ok()
    };

    let mut out = Vec::new();
    for tuple in left.recent().elements() {
        let key = key_left(tuple);
        if !has_key(right_stable.elements(), &key) && !has_key(right_recent.elements(), &key) {
            out.push(tuple.clone());
        }
    }
    if !out.is_empty() {
        output.insert_relation(Relation::from_slice(out));
    }
}
