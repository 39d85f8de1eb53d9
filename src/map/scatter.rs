//! Derived scatter-forward state: which owned indices feed which
//! destination neighbor, and where each ghost lands in the forward receive
//! buffer.
//!
//! Built once during ghosted construction by a single round-trip over the
//! reverse (ghost→owner) plan, then immutable for the life of the map.

use crate::algs::communicator::Communicator;
use crate::algs::neighborhood::Neighborhood;
use crate::graph::AdjacencyList;
use crate::map_error::MapError;

/// Scatter-forward plan for one map.
#[derive(Clone, Debug)]
pub(crate) struct ScatterLayout {
    /// Node d holds the owned local indices to send to the d-th forward
    /// destination, in send-buffer order.
    pub(crate) send_indices: AdjacencyList<i32>,
    /// Slot in the forward receive buffer for each ghost.
    pub(crate) ghost_positions: Vec<i32>,
    /// Ghost position for each forward receive-buffer slot (inverse of
    /// `ghost_positions`).
    pub(crate) buffer_to_ghost: Vec<i32>,
}

impl ScatterLayout {
    pub(crate) fn empty() -> Self {
        Self {
            send_indices: AdjacencyList::empty(0),
            ghost_positions: Vec::new(),
            buffer_to_ghost: Vec::new(),
        }
    }
}

/// Group `ghosts` by the position of their owner in `sources`.
///
/// Returns per-source ghost lists and, flattened, the ghost position each
/// send-buffer slot corresponds to.
pub(crate) fn group_ghosts_by_owner(
    sources: &[usize],
    ghosts: &[i64],
    owners: &[usize],
) -> Result<(Vec<Vec<i64>>, Vec<i32>), MapError> {
    let mut ghost_by_rank: Vec<Vec<i64>> = vec![Vec::new(); sources.len()];
    let mut pos_by_rank: Vec<Vec<i32>> = vec![Vec::new(); sources.len()];
    for (i, (&g, &o)) in ghosts.iter().zip(owners).enumerate() {
        let r = sources.binary_search(&o).map_err(|_| {
            MapError::InvalidArgument(format!("ghost owner rank {o} missing from source list"))
        })?;
        ghost_by_rank[r].push(g);
        pos_by_rank[r].push(i as i32);
    }
    let buffer_to_ghost: Vec<i32> = pos_by_rank.into_iter().flatten().collect();
    Ok((ghost_by_rank, buffer_to_ghost))
}

/// Build the scatter-forward layout by sending each rank's ghost globals to
/// their owners over the reverse plan. Owners translate the received
/// globals to owned locals; the per-sender receive lists become the send
/// map of the forward scatter.
pub(crate) fn build_scatter<C: Communicator>(
    comm: &C,
    forward: &Neighborhood,
    reverse: &Neighborhood,
    offset: i64,
    local_size: i32,
    ghosts: &[i64],
    owners: &[usize],
    tag: u16,
) -> Result<ScatterLayout, MapError> {
    let (ghost_by_rank, buffer_to_ghost) =
        group_ghosts_by_owner(forward.sources(), ghosts, owners)?;

    let send = AdjacencyList::from_lists(ghost_by_rank);
    let received = reverse.all_to_allv(comm, tag, &send)?;

    let mut lists = Vec::with_capacity(received.num_nodes());
    for node in 0..received.num_nodes() {
        let mut locals = Vec::with_capacity(received.links(node).len());
        for &g in received.links(node) {
            let l = g - offset;
            if l < 0 || l >= local_size as i64 {
                return Err(MapError::InvalidArgument(format!(
                    "rank {} ghosts global {g}, which is not in this rank's owned range",
                    reverse.sources()[node]
                )));
            }
            locals.push(l as i32);
        }
        lists.push(locals);
    }
    let send_indices = AdjacencyList::from_lists(lists);

    let mut ghost_positions = vec![0i32; ghosts.len()];
    for (slot, &pos) in buffer_to_ghost.iter().enumerate() {
        ghost_positions[pos as usize] = slot as i32;
    }

    Ok(ScatterLayout {
        send_indices,
        ghost_positions,
        buffer_to_ghost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grouping_preserves_per_owner_ghost_order() {
        let sources = vec![1, 3];
        let ghosts = vec![30, 10, 31, 11];
        let owners = vec![3, 1, 3, 1];
        let (by_rank, buffer_to_ghost) =
            group_ghosts_by_owner(&sources, &ghosts, &owners).unwrap();
        assert_eq!(by_rank, vec![vec![10, 11], vec![30, 31]]);
        // Buffer slots: rank-1 ghosts first (positions 1, 3), then rank-3
        // ghosts (positions 0, 2).
        assert_eq!(buffer_to_ghost, vec![1, 3, 0, 2]);
    }

    #[test]
    fn grouping_rejects_unknown_owner() {
        let err = group_ghosts_by_owner(&[1], &[5], &[2]).unwrap_err();
        assert!(matches!(err, MapError::InvalidArgument(_)));
    }
}
