//! Stack (concatenate) several index maps into one logical numbering.
//!
//! Each input map is expanded by its block size: index `i` of a map with
//! block size `bs` becomes the `bs` consecutive indices `bs·i + k`. The
//! stacked numbering places every rank's expanded owned blocks
//! back-to-back, so rank r's first stacked global is
//! the sum of `bs_m · low_{m,r}` over the inputs; each map already encodes
//! its own per-rank offset, which is why this is not a plain prefix over
//! ranks.
//!
//! Ghost indices need communication: only the owner of a ghost knows where
//! its block landed in the stacked numbering, so each map's ghosts make one
//! round-trip to their owners. All maps share the communicator, so a single
//! neighborhood pair built from the union of their source ranks carries
//! every round-trip.

use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::nbx::compute_graph_edges_nbx;
use crate::algs::neighborhood::Neighborhood;
use crate::graph::AdjacencyList;
use crate::map::scatter::group_ghosts_by_owner;
use crate::map::IndexMap;
use crate::map_error::MapError;
use crate::sort::sorted_unique_ranks;

const TAG_STACK_NBX: CommTag = CommTag::new(0x40);
/// Tags (base, base+1) for the ghost→owner leg, (base+2, base+3) for the
/// reply leg.
const TAG_STACK_EXCHANGE: CommTag = CommTag::new(0x42);

/// Compute layout data and ghost indices for a stacked (spliced) map.
///
/// Collective. Returns, in order: the global offset of the stacked map on
/// this rank, the local offset of each input map inside the stacked local
/// numbering (length `maps.len() + 1`), the stacked ghost globals per input
/// map, and their owner ranks per input map. Within each map, ghost i of
/// the input becomes entries `[bs·i, bs·(i+1))` of the output, preserving
/// halo order under block expansion.
///
/// # Errors
/// `InvalidArgument` if `maps` is empty, a block size is not positive, or
/// the maps do not share a communicator.
pub fn stack_index_maps<C: Communicator>(
    maps: &[(&IndexMap<C>, i32)],
) -> Result<(i64, Vec<i32>, Vec<Vec<i64>>, Vec<Vec<usize>>), MapError> {
    let (first, _) = maps
        .first()
        .ok_or_else(|| MapError::InvalidArgument("cannot stack zero index maps".into()))?;
    let comm = first.comm_arc();
    for (map, bs) in maps {
        if *bs <= 0 {
            return Err(MapError::InvalidArgument(format!(
                "block size must be positive, got {bs}"
            )));
        }
        if !std::sync::Arc::ptr_eq(map.comm_arc(), comm) {
            return Err(MapError::InvalidArgument(
                "stacked maps must share a communicator".into(),
            ));
        }
    }

    let process_offset: i64 = maps
        .iter()
        .map(|(map, bs)| *bs as i64 * map.local_range().0)
        .sum();

    let mut local_offset = Vec::with_capacity(maps.len() + 1);
    local_offset.push(0i32);
    let mut acc = 0i32;
    for (map, bs) in maps {
        acc += *bs * map.size_local();
        local_offset.push(acc);
    }

    // Union of ghost-owner ranks across all maps, then one discovery and one
    // neighborhood pair reused by every per-map round-trip.
    let src: Vec<usize> =
        sorted_unique_ranks(maps.iter().flat_map(|(map, _)| map.owners().iter().copied()));
    let dest = compute_graph_edges_nbx(&**comm, &src, TAG_STACK_NBX.get())?;
    let forward = Neighborhood::new(comm.size(), src, dest)?;
    let reverse = forward.reverse();

    let mut ghosts_new = Vec::with_capacity(maps.len());
    let mut owners_new = Vec::with_capacity(maps.len());

    for (m, (map, bs)) in maps.iter().enumerate() {
        let bs = *bs;
        let (ghost_by_rank, buffer_to_ghost) =
            group_ghosts_by_owner(forward.sources(), map.ghosts(), map.owners())?;

        // Ghosts to owners.
        let send = AdjacencyList::from_lists(ghost_by_rank);
        let received = reverse.all_to_allv(&**comm, TAG_STACK_EXCHANGE.get(), &send)?;

        // Owners translate each received global into the stacked numbering.
        let offset_old = map.local_range().0;
        let offset_new = local_offset[m] as i64 + process_offset;
        let mut replies = Vec::with_capacity(received.num_nodes());
        for node in 0..received.num_nodes() {
            let mut out = Vec::with_capacity(received.links(node).len());
            for &g in received.links(node) {
                let local = g - offset_old;
                if local < 0 || local >= map.size_local() as i64 {
                    return Err(MapError::InvalidArgument(format!(
                        "rank {} ghosts global {g}, which is not in this rank's owned range",
                        reverse.sources()[node]
                    )));
                }
                out.push(bs as i64 * local + offset_new);
            }
            replies.push(out);
        }

        // New indices back to the ghosting ranks, along the transposed
        // edges and in the same per-neighbor order.
        let reply_list = AdjacencyList::from_lists(replies);
        let new_indices =
            forward.all_to_allv(&**comm, TAG_STACK_EXCHANGE.offset(2).get(), &reply_list)?;

        // Unpack with block expansion, restoring original halo order.
        let num_ghosts = map.ghosts().len();
        let mut ghost_idx = vec![0i64; bs as usize * num_ghosts];
        let mut ghost_own = vec![0usize; bs as usize * num_ghosts];
        let mut slot = 0usize;
        for (node, &rank) in forward.sources().iter().enumerate() {
            for &new_global in new_indices.links(node) {
                let p = buffer_to_ghost[slot] as usize;
                for k in 0..bs as usize {
                    ghost_idx[bs as usize * p + k] = new_global + k as i64;
                    ghost_own[bs as usize * p + k] = rank;
                }
                slot += 1;
            }
        }
        if slot != num_ghosts {
            return Err(MapError::InvalidArgument(format!(
                "owner replies cover {slot} ghosts, expected {num_ghosts}"
            )));
        }

        ghosts_new.push(ghost_idx);
        owners_new.push(ghost_own);
    }

    Ok((process_offset, local_offset, ghosts_new, owners_new))
}
