//! Resolve the owning rank of ghost global indices.

use crate::algs::communicator::Communicator;
use crate::map_error::MapError;

/// Compute the owning rank of each ghost index.
///
/// Collective: gathers every rank's `local_size`, forms the widened prefix
/// sum `all_ranges[0..=M]`, and locates each ghost by binary search. The
/// widening to `i64` happens before summation so the global size may exceed
/// `i32` range.
///
/// # Errors
/// `InvalidGhost` if a ghost lies outside `[0, size_global)` or inside the
/// caller's own owned range (an owned index is not a ghost).
pub fn ghost_owners<C: Communicator>(
    comm: &C,
    local_size: u32,
    ghosts: &[i64],
) -> Result<Vec<usize>, MapError> {
    let local_sizes = comm.all_gather_i64(local_size as i64)?;

    let mut all_ranges = Vec::with_capacity(local_sizes.len() + 1);
    all_ranges.push(0i64);
    let mut acc = 0i64;
    for &s in &local_sizes {
        acc += s;
        all_ranges.push(acc);
    }
    let size_global = acc;
    let rank = comm.rank();
    let own = (all_ranges[rank], all_ranges[rank + 1]);

    let mut owners = Vec::with_capacity(ghosts.len());
    for &g in ghosts {
        if g < 0 || g >= size_global || (g >= own.0 && g < own.1) {
            return Err(MapError::InvalidGhost {
                ghost: g,
                range_start: own.0,
                range_end: own.1,
                size_global,
            });
        }
        // Largest r with all_ranges[r] <= g.
        let r = all_ranges.partition_point(|&bound| bound <= g) - 1;
        owners.push(r);
    }
    Ok(owners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{SerialComm, ThreadComm};

    #[test]
    fn serial_rejects_every_ghost() {
        // A single rank owns the whole set; nothing is ghostable.
        assert!(ghost_owners(&SerialComm, 4, &[]).unwrap().is_empty());
        assert!(matches!(
            ghost_owners(&SerialComm, 4, &[2]),
            Err(MapError::InvalidGhost { ghost: 2, .. })
        ));
        assert!(matches!(
            ghost_owners(&SerialComm, 4, &[4]),
            Err(MapError::InvalidGhost { ghost: 4, .. })
        ));
    }

    #[test]
    fn owners_follow_the_partition() {
        // Sizes 3, 0, 5, 2 -> ranges [0,3), [3,3), [3,8), [8,10).
        let comms = ThreadComm::universe(4);
        let sizes = [3u32, 0, 5, 2];
        let handles: Vec<_> = comms
            .into_iter()
            .map(|c| {
                std::thread::spawn(move || {
                    let r = c.rank();
                    let ghosts: Vec<i64> = match r {
                        0 => vec![3, 7, 9],
                        1 => vec![0, 8],
                        2 => vec![2, 9, 0],
                        _ => vec![5],
                    };
                    (r, ghost_owners(&c, sizes[r], &ghosts).unwrap())
                })
            })
            .collect();
        for h in handles {
            let (rank, owners) = h.join().unwrap();
            let expect: Vec<usize> = match rank {
                0 => vec![2, 2, 3],
                1 => vec![0, 3],
                2 => vec![0, 3, 0],
                _ => vec![2],
            };
            assert_eq!(owners, expect, "rank {rank}");
        }
    }

    #[test]
    fn own_range_and_overflow_ghosts_are_invalid() {
        let comms = ThreadComm::universe(2);
        let handles: Vec<_> = comms
            .into_iter()
            .map(|c| {
                std::thread::spawn(move || {
                    let r = c.rank();
                    // Global set is [0, 10); each rank owns 5.
                    let own = ghost_owners(&c, 5, &[(5 * r) as i64]);
                    let beyond = ghost_owners(&c, 5, &[10]);
                    (own, beyond)
                })
            })
            .collect();
        for h in handles {
            let (own, beyond) = h.join().unwrap();
            assert!(matches!(own, Err(MapError::InvalidGhost { .. })));
            assert!(matches!(beyond, Err(MapError::InvalidGhost { ghost: 10, .. })));
        }
    }
}
