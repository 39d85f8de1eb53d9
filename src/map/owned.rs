//! Back-resolve a mixed owned/ghost index list to owned indices.

use crate::algs::communicator::{CommTag, Communicator};
use crate::graph::AdjacencyList;
use crate::map::IndexMap;
use crate::map_error::MapError;
use crate::sort::sort_unique_u32;

/// Tags (base, base+1) for the ghost→owner exchange.
const TAG_OWNED: CommTag = CommTag::new(0x70);

/// Given local indices (owned or ghost), return the owned indices this rank
/// is responsible for: the owned entries of `indices` plus every owned
/// index that appears as a ghost in some other rank's list.
///
/// Collective. The result is sorted and duplicate-free (the same ghost may
/// arrive from several ranks).
///
/// # Errors
/// `InvalidArgument` if an index is outside `[0, size_local + num_ghosts)`.
pub fn compute_owned_indices<C: Communicator>(
    indices: &[i32],
    map: &IndexMap<C>,
) -> Result<Vec<i32>, MapError> {
    let size_local = map.size_local();
    let num_local = size_local + map.num_ghosts();

    let mut owned: Vec<u32> = Vec::with_capacity(indices.len());
    let forward = map.forward_neighborhood();
    let mut ghosts_by_owner: Vec<Vec<i64>> = vec![Vec::new(); forward.sources().len()];
    for &idx in indices {
        if idx < 0 || idx >= num_local {
            return Err(MapError::InvalidArgument(format!(
                "local index {idx} out of range [0, {num_local})"
            )));
        }
        if idx < size_local {
            owned.push(idx as u32);
        } else {
            let p = (idx - size_local) as usize;
            let node = forward
                .source_position(map.owners()[p])
                .expect("ghost owners are the forward source set by construction");
            ghosts_by_owner[node].push(map.ghosts()[p]);
        }
    }

    // Tell each owner which of its indices this rank references.
    let send = AdjacencyList::from_lists(ghosts_by_owner);
    let received = map
        .reverse_neighborhood()
        .all_to_allv(map.comm(), TAG_OWNED.get(), &send)?;

    let low = map.local_range().0;
    for &g in received.array() {
        let local = g - low;
        if local < 0 || local >= size_local as i64 {
            return Err(MapError::InvalidArgument(format!(
                "received global {g} outside this rank's owned range"
            )));
        }
        owned.push(local as u32);
    }

    Ok(sort_unique_u32(owned).into_iter().map(|i| i as i32).collect())
}
