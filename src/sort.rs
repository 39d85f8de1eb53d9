//! Integer sorting primitives for the deduplication-heavy paths.
//!
//! Rank lists and owned-index lists are 32-bit and non-negative, which makes
//! an LSD radix sort the right tool: the dedup paths run once per collective
//! construction and dominate setup time on wide halos.

/// In-place LSD radix sort of `u32` keys, 8-bit digits.
///
/// Stable between passes; `O(4·(n + 256))` with a scratch buffer the size of
/// the input. Falls back to nothing clever for short slices because the
/// counting passes already degenerate gracefully.
pub fn radix_sort_u32(keys: &mut [u32]) {
    if keys.len() < 2 {
        return;
    }
    let n = keys.len();
    let mut scratch = vec![0u32; n];
    let mut src_is_keys = true;
    for shift in [0u32, 8, 16, 24] {
        let (src, dst): (&[u32], &mut [u32]) = if src_is_keys {
            (&keys[..], &mut scratch[..])
        } else {
            (&scratch[..], &mut keys[..])
        };
        let mut counts = [0usize; 256];
        for &k in src {
            counts[((k >> shift) & 0xff) as usize] += 1;
        }
        // A pass where every key shares the digit is the identity.
        if counts.iter().any(|&c| c == n) {
            continue;
        }
        let mut offsets = [0usize; 256];
        let mut acc = 0usize;
        for (o, &c) in offsets.iter_mut().zip(counts.iter()) {
            *o = acc;
            acc += c;
        }
        for &k in src {
            let d = ((k >> shift) & 0xff) as usize;
            dst[offsets[d]] = k;
            offsets[d] += 1;
        }
        src_is_keys = !src_is_keys;
    }
    if !src_is_keys {
        keys.copy_from_slice(&scratch);
    }
}

/// Sort and deduplicate, consuming the input.
pub fn sort_unique_u32(mut keys: Vec<u32>) -> Vec<u32> {
    radix_sort_u32(&mut keys);
    keys.dedup();
    keys
}

/// Sorted, duplicate-free rank list from an arbitrary rank iterator.
///
/// Ranks are communicator-sized, so the `u32` round-trip is lossless.
pub fn sorted_unique_ranks<I: IntoIterator<Item = usize>>(ranks: I) -> Vec<usize> {
    let keys: Vec<u32> = ranks.into_iter().map(|r| r as u32).collect();
    sort_unique_u32(keys).into_iter().map(|r| r as usize).collect()
}
