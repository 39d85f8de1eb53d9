//! Stacking and sub-map construction: identity round-trips, block
//! expansion, and the ghost retention rule.

mod common;

use common::run_on_ranks;
use halo_map::map::{stack_index_maps, IndexMap};
use halo_map::prelude::*;
use std::sync::Arc;

fn ring_map(comm: Arc<ThreadComm>, local_size: u32) -> IndexMap<ThreadComm> {
    let r = comm.rank();
    let n = comm.size();
    if n == 1 {
        return IndexMap::ghosted(comm, local_size, vec![], vec![]).unwrap();
    }
    let owner = (r + 1) % n;
    let ghost = (local_size as usize * owner) as i64;
    IndexMap::ghosted(comm, local_size, vec![ghost], vec![owner]).unwrap()
}

#[test]
fn stacking_a_single_map_with_unit_block_is_identity() {
    run_on_ranks(4, |comm| {
        let map = ring_map(comm, 5);
        let (process_offset, local_offset, ghosts_new, owners_new) =
            stack_index_maps(&[(&map, 1)]).unwrap();
        assert_eq!(process_offset, map.local_range().0);
        assert_eq!(local_offset, vec![0, map.size_local()]);
        assert_eq!(ghosts_new[0], map.ghosts());
        assert_eq!(owners_new[0], map.owners());
    });
}

#[test]
fn stacking_expands_blocks_in_halo_order() {
    // Two ghosts per rank so the order-preservation is visible: rank r
    // ghosts locals 0 and 2 of rank (r + 1) % n, in that order.
    let n = 4usize;
    run_on_ranks(n, move |comm| {
        let r = comm.rank();
        let owner = (r + 1) % n;
        let base = 5 * owner as i64;
        let map = IndexMap::ghosted(
            Arc::clone(&comm),
            5,
            vec![base, base + 2],
            vec![owner, owner],
        )
        .unwrap();
        let (process_offset, local_offset, ghosts_new, owners_new) =
            stack_index_maps(&[(&map, 2)]).unwrap();

        assert_eq!(process_offset, 10 * r as i64);
        assert_eq!(local_offset, vec![0, 10]);
        // Ghost i of the input becomes entries [2i, 2i + 2), consecutive in
        // the stacked numbering.
        let new_base = 10 * owner as i64;
        assert_eq!(
            ghosts_new[0],
            vec![new_base, new_base + 1, new_base + 4, new_base + 5]
        );
        assert_eq!(owners_new[0], vec![owner; 4]);
    });
}

#[test]
fn stack_rejects_bad_arguments() {
    let empty: &[(&IndexMap<SerialComm>, i32)] = &[];
    assert!(matches!(
        stack_index_maps(empty),
        Err(MapError::InvalidArgument(_))
    ));

    let comm = Arc::new(SerialComm);
    let map = IndexMap::new(Arc::clone(&comm), 4).unwrap();
    assert!(matches!(
        stack_index_maps(&[(&map, 0)]),
        Err(MapError::InvalidArgument(_))
    ));

    // Two maps on distinct communicator handles cannot be spliced.
    let other = IndexMap::new(Arc::new(SerialComm), 4).unwrap();
    assert!(matches!(
        stack_index_maps(&[(&map, 1), (&other, 1)]),
        Err(MapError::InvalidArgument(_))
    ));
}

#[test]
fn serial_stack_of_two_maps() {
    let comm = Arc::new(SerialComm);
    let a = IndexMap::new(Arc::clone(&comm), 3).unwrap();
    let b = IndexMap::new(Arc::clone(&comm), 2).unwrap();
    let (process_offset, local_offset, ghosts_new, owners_new) =
        stack_index_maps(&[(&a, 2), (&b, 3)]).unwrap();
    assert_eq!(process_offset, 0);
    assert_eq!(local_offset, vec![0, 6, 12]);
    assert!(ghosts_new.iter().all(|g| g.is_empty()));
    assert!(owners_new.iter().all(|o| o.is_empty()));
}

#[test]
fn identity_submap_reproduces_the_map() {
    run_on_ranks(4, |comm| {
        let map = ring_map(comm, 5);
        let all: Vec<i32> = (0..map.size_local()).collect();
        let (sub, new_to_old) = map.create_submap(&all).unwrap();

        assert_eq!(sub.local_range(), map.local_range());
        assert_eq!(sub.size_global(), map.size_global());
        assert_eq!(sub.ghosts(), map.ghosts());
        assert_eq!(sub.owners(), map.owners());
        assert_eq!(
            new_to_old,
            (0..map.num_ghosts()).collect::<Vec<_>>()
        );
        assert_eq!(
            sub.forward_neighborhood().sources(),
            map.forward_neighborhood().sources()
        );
    });
}

#[test]
fn submap_drops_ghost_when_owner_drops_index() {
    // Even ranks keep locals {1, 3}; odd ranks keep everything. The ring
    // ghost targets the owner's local 0, so it survives iff the owner is
    // odd.
    let n = 4usize;
    run_on_ranks(n, move |comm| {
        let r = comm.rank();
        let map = ring_map(comm, 5);
        let indices: Vec<i32> = if r % 2 == 0 { vec![1, 3] } else { (0..5).collect() };
        let (sub, new_to_old) = map.create_submap(&indices).unwrap();

        // Sizes 2, 5, 2, 5 -> offsets 0, 2, 7, 9.
        assert_eq!(sub.size_global(), 14);
        let offsets = [0i64, 2, 7, 9];
        assert_eq!(sub.local_range().0, offsets[r]);
        assert_eq!(sub.size_local(), indices.len() as i32);

        let owner = (r + 1) % n;
        if owner % 2 == 1 {
            // Owner kept local 0 at position 0 of its selection.
            assert_eq!(sub.ghosts(), &[offsets[owner]]);
            assert_eq!(sub.owners(), &[owner]);
            assert_eq!(new_to_old, vec![0]);
        } else {
            assert_eq!(sub.num_ghosts(), 0);
            assert!(new_to_old.is_empty());
        }
    });
}

#[test]
fn submap_rejects_bad_selections() {
    let comm = Arc::new(SerialComm);
    let map = IndexMap::new(comm, 4).unwrap();
    for bad in [
        vec![2, 1],  // unsorted
        vec![1, 1],  // duplicate
        vec![0, 4],  // unowned
        vec![-1, 0], // negative
    ] {
        assert!(matches!(
            map.create_submap(&bad),
            Err(MapError::InvalidArgument(_))
        ));
    }
    // The empty and identity selections are both fine serially.
    let (sub, perm) = map.create_submap(&[]).unwrap();
    assert_eq!(sub.size_local(), 0);
    assert!(perm.is_empty());
    let (sub, _) = map.create_submap(&[0, 1, 2, 3]).unwrap();
    assert_eq!(sub.size_global(), 4);
}
