//! Interpolation search over gap-keyed slots.

use arbor_common::GapKey;

/// Interpolation rounds before falling back to binary search.
const INTERPOLATION_ROUNDS: usize = 3;

/// Ranges this small go straight to binary search.
const BINARY_CUTOFF: usize = 8;

/// Finds the index of `key` in a block's strictly sorted slots.
///
/// Gap keys are spread close to evenly after relabeling, so an interpolated
/// probe usually lands on or next to the target: O(log log n) expected, with a
/// binary search fallback bounding the worst case at O(log n).
pub fn interpolation_search<T>(items: &[(GapKey, T)], key: GapKey) -> Option<usize> {
    let count = items.len();
    if count == 0 {
        return None;
    }

    let first_key = items[0].0;
    let last_key = items[count - 1].0;

    // Early exit: key out of range
    if key < first_key || key > last_key {
        return None;
    }

    // Exact match on boundaries
    if key == first_key {
        return Some(0);
    }
    if key == last_key {
        return Some(count - 1);
    }

    let mut lo = 0usize;
    let mut hi = count;

    for _ in 0..INTERPOLATION_ROUNDS {
        if hi - lo <= BINARY_CUTOFF {
            break;
        }

        let lo_key = items[lo].0;
        let hi_key = items[hi - 1].0;
        if lo_key >= hi_key || key < lo_key || key > hi_key {
            break;
        }

        // Estimate position proportionally to the key's offset in the range
        let range = hi - lo;
        let key_range = hi_key - lo_key;
        let key_offset = key - lo_key;
        let estimate =
            lo + ((key_offset as u128 * range as u128 / key_range as u128) as usize).min(range - 1);

        let entry_key = items[estimate].0;
        if entry_key == key {
            return Some(estimate);
        } else if key < entry_key {
            hi = estimate;
        } else {
            lo = estimate + 1;
        }
    }

    // Binary search for remaining range
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let entry_key = items[mid].0;
        if entry_key == key {
            return Some(mid);
        } else if entry_key < key {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    None
}
