//! Gallop (exponential + binary) search over sorted slices.
//!
//! Gallop search finds the first position not satisfying a monotone
//! predicate in O(log d) where d is the distance from the starting cursor,
//! which beats a fresh binary search when successive probes land close
//! together. It backs the `Variable` diff, the merge-join key skip, and
//! key-range lookups.

/// First index `>= start` whose element fails `pred`, assuming `pred` is
/// monotone (true then false) over `slice[start..]`.
///
/// Phase 1 doubles a step width until it overshoots; phase 2 binary
/// searches inside the final bracket.
pub fn gallop_from<T>(slice: &[T], start: usize, mut pred: impl FnMut(&T) -> bool) -> usize {
    let mut lo = start;
    if lo >= slice.len() || !pred(&slice[lo]) {
        return lo;
    }
    let mut step = 1;
    while lo + step < slice.len() && pred(&slice[lo + step]) {
        lo += step;
        step <<= 1;
    }
    // Answer lies in (lo, min(lo + step, len)].
    let mut hi = (lo + step + 1).min(slice.len());
    lo += 1;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(&slice[mid]) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// First index whose element fails `pred`, from the front.
pub fn gallop<T>(slice: &[T], pred: impl FnMut(&T) -> bool) -> usize {
    gallop_from(slice, 0, pred)
}

/// Half-open index range of elements whose extracted key equals `key`,
/// found with a gallop on both ends.
pub fn find_key_range<T, K: Ord>(
    slice: &[T],
    key: &K,
    key_fn: impl Fn(&T) -> K,
) -> (usize, usize) {
    let start = gallop(slice, |t| key_fn(t) < *key);
    if start >= slice.len() || key_fn(&slice[start]) != *key {
        return (start, start);
    }
    let end = gallop_from(slice, start, |t| key_fn(t) <= *key);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn gallop_finds_first_failure() {
        let data: Vec<u32> = (0..100).collect();
        assert_eq!(gallop(&data, |&x| x < 37), 37);
        assert_eq!(gallop(&data, |&x| x < 0), 0);
        assert_eq!(gallop(&data, |&x| x < 1000), 100);
    }

    #[test]
    fn gallop_from_respects_the_cursor() {
        let data: Vec<u32> = (0..100).collect();
        assert_eq!(gallop_from(&data, 50, |&x| x < 80), 80);
        // Cursor already past the boundary: stays put.
        assert_eq!(gallop_from(&data, 90, |&x| x < 80), 90);
    }

    #[test]
    fn gallop_on_empty_slice() {
        let data: Vec<u32> = Vec::new();
        assert_eq!(gallop(&data, |&x| x < 10), 0);
    }

    #[test]
    fn key_range_covers_duplicate_runs() {
        let data = vec![(1, 'a'), (2, 'a'), (2, 'b'), (2, 'c'), (3, 'a')];
        assert_eq!(find_key_range(&data, &2, |t| t.0), (1, 4));
        assert_eq!(find_key_range(&data, &1, |t| t.0), (0, 1));
        assert_eq!(find_key_range(&data, &9, |t| t.0), (5, 5));
        assert_eq!(find_key_range(&data, &0, |t| t.0), (0, 0));
    }

    proptest! {
        #[test]
        fn gallop_agrees_with_partition_point(mut data: Vec<u16>, key: u16, start_raw: usize) {
            data.sort_unstable();
            let start = if data.is_empty() { 0 } else { start_raw % (data.len() + 1) };
            let expected = data[start..].partition_point(|&x| x < key) + start;
            prop_assert_eq!(gallop_from(&data, start, |&x| x < key), expected);
        }
    }
}
