//! Group-by aggregation over tuple slices.

use crate::context::ExecutionContext;
use parking_lot::Mutex;

/// Tuples extracted per parallel task.
const AGGREGATE_CHUNK: usize = 256;

/// Group `input` by `key_fn`, fold each group's `val_fn` outputs with
/// `fold` starting from `identity`. Returns one `(key, value)` pair per
/// group, in key order.
///
/// With an executor in `ctx`, the (key, value) extraction runs in 256-item
/// chunks in parallel; the merged pairs are then sorted by key and folded
/// serially across equal-key runs.
pub fn aggregate<T, K, V, KF, VF, F>(
    input: &[T],
    key_fn: KF,
    val_fn: VF,
    fold: F,
    identity: V,
    ctx: &ExecutionContext,
) -> Vec<(K, V)>
where
    T: Send + Sync,
    K: Ord + Send,
    V: Clone + Send,
    KF: Fn(&T) -> K + Send + Sync,
    VF: Fn(&T) -> V + Send + Sync,
    F: Fn(V, V) -> V + Send + Sync,
{
    if input.is_empty() {
        return Vec::new();
    }

    let chunk_count = input.len().div_ceil(AGGREGATE_CHUNK);
    let mut pairs: Vec<(K, V)> = match ctx.executor() {
        Some(executor) if chunk_count > 1 => {
            let slots: Vec<Mutex<Vec<(K, V)>>> =
                (0..chunk_count).map(|_| Mutex::new(Vec::new())).collect();
            executor.bulk(chunk_count, &|chunk| {
                let lo = chunk * AGGREGATE_CHUNK;
                let hi = (lo + AGGREGATE_CHUNK).min(input.len());
                let mut local = Vec::with_capacity(hi - lo);
                for tuple in &input[lo..hi] {
                    local.push((key_fn(tuple), val_fn(tuple)));
                }
                *slots[chunk].lock() = local;
            });
            let mut merged = Vec::with_capacity(input.len());
            for slot in slots {
                merged.append(&mut slot.into_inner());
            }
            merged
        }
        _ => input
            .iter()
            .map(|tuple| (key_fn(tuple), val_fn(tuple)))
            .collect(),
    };

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut result: Vec<(K, V)> = Vec::new();
    let mut pairs = pairs.into_iter();
    let Some((mut run_key, first_val)) = pairs.next() else {
        return result;
    };
    let mut acc = fold(identity.clone(), first_val);
    for (key, val) in pairs {
        if key == run_key {
            acc = fold(acc, val);
        } else {
            result.push((std::mem::replace(&mut run_key, key), acc));
            acc = fold(identity.clone(), val);
        }
    }
    result.push((run_key, acc));
    result
}
