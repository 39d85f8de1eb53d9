//! Compress an index map to a subset of its owned indices.

use crate::algs::communicator::{CommTag, Communicator};
use crate::graph::AdjacencyList;
use crate::map::scatter::group_ghosts_by_owner;
use crate::map::IndexMap;
use crate::map_error::MapError;
use std::sync::Arc;

/// Tags (base, base+1) for the ghost→owner leg, (base+2, base+3) for the
/// reply leg.
const TAG_SUBMAP: CommTag = CommTag::new(0x60);

impl<C: Communicator> IndexMap<C> {
    /// Create a new index map from a subset of owned indices in this map.
    ///
    /// Each selected index becomes an owned index of the new map, in input
    /// order, so the new map is a 'compressed' version of this one. A ghost
    /// survives the compression iff its owner kept the corresponding owned
    /// index in its own selection; retained ghosts keep their original halo
    /// order. Also returns, for each ghost position of the new map, the
    /// ghost position in this map it descends from.
    ///
    /// Collective. `indices` must be sorted, duplicate-free, and owned
    /// (`< size_local`).
    ///
    /// # Errors
    /// `InvalidArgument` if `indices` is unsorted, has duplicates, or names
    /// an unowned index.
    pub fn create_submap(&self, indices: &[i32]) -> Result<(IndexMap<C>, Vec<i32>), MapError> {
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MapError::InvalidArgument(
                "sub-map indices must be sorted and duplicate-free".into(),
            ));
        }
        if indices.first().is_some_and(|&i| i < 0)
            || indices.last().is_some_and(|&i| i >= self.size_local())
        {
            return Err(MapError::InvalidArgument(
                "sub-map indices must be owned by this rank".into(),
            ));
        }

        let comm = self.comm_arc();
        let (new_offset, _new_size_global) = comm.scan_and_sum(indices.len() as i64)?;

        // Ghosts to owners, grouped the way the forward source list orders
        // them.
        let forward = self.forward_neighborhood();
        let reverse = self.reverse_neighborhood();
        let (ghost_by_rank, buffer_to_ghost) =
            group_ghosts_by_owner(forward.sources(), self.ghosts(), self.owners())?;
        let send = AdjacencyList::from_lists(ghost_by_rank);
        let received = reverse.all_to_allv(&**comm, TAG_SUBMAP.get(), &send)?;

        // Answer each ghosted global with its new global index, or -1 when
        // the owner dropped it from the selection.
        let low = self.local_range().0;
        let mut replies = Vec::with_capacity(received.num_nodes());
        for node in 0..received.num_nodes() {
            let mut out = Vec::with_capacity(received.links(node).len());
            for &g in received.links(node) {
                let local = (g - low) as i32;
                let answer = match indices.binary_search(&local) {
                    Ok(pos) => new_offset + pos as i64,
                    Err(_) => -1,
                };
                out.push(answer);
            }
            replies.push(out);
        }
        let reply_list = AdjacencyList::from_lists(replies);
        let answers = forward.all_to_allv(&**comm, TAG_SUBMAP.offset(2).get(), &reply_list)?;

        // Scatter the answers back to halo order, then collect the
        // survivors.
        let mut new_global_of_ghost = vec![-1i64; self.ghosts().len()];
        let mut slot = 0usize;
        for node in 0..answers.num_nodes() {
            for &answer in answers.links(node) {
                new_global_of_ghost[buffer_to_ghost[slot] as usize] = answer;
                slot += 1;
            }
        }
        if slot != self.ghosts().len() {
            return Err(MapError::InvalidArgument(format!(
                "owner replies cover {slot} ghosts, expected {}",
                self.ghosts().len()
            )));
        }

        let mut new_ghosts = Vec::new();
        let mut new_owners = Vec::new();
        let mut new_to_old = Vec::new();
        for (p, &g) in new_global_of_ghost.iter().enumerate() {
            if g >= 0 {
                new_ghosts.push(g);
                new_owners.push(self.owners()[p]);
                new_to_old.push(p as i32);
            }
        }

        let submap = IndexMap::ghosted(
            Arc::clone(comm),
            indices.len() as u32,
            new_ghosts,
            new_owners,
        )?;
        Ok((submap, new_to_old))
    }
}
