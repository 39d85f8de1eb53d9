//! Back-resolution of mixed owned/ghost index lists to their owners.

mod common;

use common::run_on_ranks;
use halo_map::map::{compute_owned_indices, IndexMap};
use halo_map::prelude::*;
use std::sync::Arc;

fn ring_map(comm: Arc<ThreadComm>) -> IndexMap<ThreadComm> {
    let r = comm.rank();
    let n = comm.size();
    let owner = (r + 1) % n;
    IndexMap::ghosted(comm, 5, vec![5 * owner as i64], vec![owner]).unwrap()
}

#[test]
fn ghost_references_land_on_their_owner() {
    run_on_ranks(4, |comm| {
        let map = ring_map(comm);
        // Reference one owned index and the single ghost (local 5).
        let owned = compute_owned_indices(&[1, 5], &map).unwrap();
        // My ghost went to its owner; the previous rank's ghost (my local 0)
        // came back to me.
        assert_eq!(owned, vec![0, 1]);
    });
}

#[test]
fn duplicate_references_collapse() {
    run_on_ranks(4, |comm| {
        let map = ring_map(comm);
        let owned = compute_owned_indices(&[5, 0, 5, 0], &map).unwrap();
        assert_eq!(owned, vec![0]);
    });
}

#[test]
fn empty_reference_lists_still_participate() {
    // Rank 2 references nothing; everyone else references their ghost. The
    // exchange is collective, so rank 2 still answers and still receives.
    run_on_ranks(4, |comm| {
        let r = comm.rank();
        let map = ring_map(comm);
        let refs: Vec<i32> = if r == 2 { vec![] } else { vec![5] };
        let owned = compute_owned_indices(&refs, &map).unwrap();
        // Rank 1's ghost is rank 2's local 0, so rank 1 (the predecessor of
        // rank 2) still produces a hit on rank 2.
        if r == 3 {
            // Rank 2 referenced nothing, so nothing came back to rank 3.
            assert!(owned.is_empty());
        } else {
            assert_eq!(owned, vec![0]);
        }
    });
}

#[test]
fn rejects_out_of_range_references() {
    let comm = Arc::new(SerialComm);
    let map = IndexMap::new(comm, 3).unwrap();
    assert!(matches!(
        compute_owned_indices(&[3], &map),
        Err(MapError::InvalidArgument(_))
    ));
    assert_eq!(compute_owned_indices(&[2, 0], &map).unwrap(), vec![0, 2]);
}
