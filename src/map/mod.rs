//! The distributed index map: how a contiguous global index set is
//! partitioned and ghosted across the ranks of a communicator.
//!
//! An index array is a contiguous collection of indices `[0, N)` distributed
//! across M ranks. Rank r owns the half-open range
//! `[offset_r, offset_r + local_size_r)`; the ranges tile the set with no
//! gaps, in rank order. On top of its owned range each rank holds an ordered
//! halo of *ghost* indices owned elsewhere. Local numbering puts owned
//! indices at `[0, size_local)` and ghosts after them, in halo insertion
//! order; that order is part of the identity of the map and is preserved (or
//! explicitly remapped) by stacking and sub-map construction.
//!
//! Construction is collective; queries are purely local. A map is never
//! mutated after construction: moves transfer ownership of the communicator
//! handle and the map is deliberately not `Clone`.

pub mod ghost_owners;
pub mod owned;
pub(crate) mod scatter;
pub mod stacking;
mod submap;

pub use ghost_owners::ghost_owners;
pub use owned::compute_owned_indices;
pub use stacking::stack_index_maps;

use crate::algs::communicator::{CommTag, Communicator};
use crate::algs::nbx::compute_graph_edges_nbx;
use crate::algs::neighborhood::Neighborhood;
use crate::debug_invariants::DebugInvariants;
use crate::graph::AdjacencyList;
use crate::map_error::MapError;
use crate::sort::sorted_unique_ranks;
use once_cell::sync::OnceCell;
use scatter::{build_scatter, ScatterLayout};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Tag for destination discovery during construction.
const TAG_CONSTRUCT_NBX: CommTag = CommTag::new(0x20);
/// Tags (base, base+1) for the scatter-layout round-trip.
const TAG_CONSTRUCT_SCATTER: CommTag = CommTag::new(0x22);

/// Distributed index map over a communicator `C`.
///
/// Holds the owned range, the ghost halo with its owner array, the
/// forward (owner→ghost) and reverse (ghost→owner) neighbor plans, and the
/// derived scatter-forward layout. The communicator handle is owned for the
/// lifetime of the map and released exactly once on drop.
pub struct IndexMap<C: Communicator> {
    comm: Arc<C>,
    local_range: (i64, i64),
    size_global: i64,
    ghosts: Vec<i64>,
    owners: Vec<usize>,
    forward: Neighborhood,
    reverse: Neighborhood,
    scatter: ScatterLayout,
    ghost_lookup: OnceCell<hashbrown::HashMap<i64, i32>>,
}

impl<C: Communicator> IndexMap<C> {
    /// Create a non-overlapping index map with `local_size` owned indices
    /// on this rank and no ghosts.
    ///
    /// Collective. The rank offset comes from an exclusive scan of
    /// `local_size` and the global size from a sum reduction; the backend
    /// overlaps the two.
    pub fn new(comm: Arc<C>, local_size: u32) -> Result<Self, MapError> {
        let (offset, size_global) = comm.scan_and_sum(local_size as i64)?;
        let map = Self {
            comm,
            local_range: (offset, offset + local_size as i64),
            size_global,
            ghosts: Vec::new(),
            owners: Vec::new(),
            forward: Neighborhood::empty(),
            reverse: Neighborhood::empty(),
            scatter: ScatterLayout::empty(),
            ghost_lookup: OnceCell::new(),
        };
        map.debug_check_symmetry()?;
        map.debug_assert_invariants();
        Ok(map)
    }

    /// Create a ghosted index map, discovering the destination ranks (the
    /// ranks that ghost this rank's owned indices) by non-blocking
    /// consensus.
    ///
    /// Collective. `owners[i]` must be the rank whose owned range contains
    /// `ghosts[i]`; debug builds verify this by re-resolving the owners
    /// from the global partition.
    pub fn ghosted(
        comm: Arc<C>,
        local_size: u32,
        ghosts: Vec<i64>,
        owners: Vec<usize>,
    ) -> Result<Self, MapError> {
        Self::build(comm, local_size, None, ghosts, owners)
    }

    /// Create a ghosted index map with the destination ranks already known
    /// to the caller, skipping discovery.
    ///
    /// Collective. `dest_ranks` must name exactly the ranks that ghost
    /// indices owned by this rank; the list is sorted and deduplicated
    /// here.
    pub fn ghosted_with_dest(
        comm: Arc<C>,
        local_size: u32,
        dest_ranks: Vec<usize>,
        ghosts: Vec<i64>,
        owners: Vec<usize>,
    ) -> Result<Self, MapError> {
        Self::build(comm, local_size, Some(dest_ranks), ghosts, owners)
    }

    fn build(
        comm: Arc<C>,
        local_size: u32,
        dest_ranks: Option<Vec<usize>>,
        ghosts: Vec<i64>,
        owners: Vec<usize>,
    ) -> Result<Self, MapError> {
        if ghosts.len() != owners.len() {
            return Err(MapError::LengthMismatch {
                ghosts: ghosts.len(),
                owners: owners.len(),
            });
        }

        let (offset, size_global) = comm.scan_and_sum(local_size as i64)?;
        let local_range = (offset, offset + local_size as i64);

        for &g in &ghosts {
            if g < 0 || g >= size_global || (g >= local_range.0 && g < local_range.1) {
                return Err(MapError::InvalidGhost {
                    ghost: g,
                    range_start: local_range.0,
                    range_end: local_range.1,
                    size_global,
                });
            }
        }

        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        {
            let resolved = ghost_owners(&*comm, local_size, &ghosts)?;
            if resolved != owners {
                log::warn!(
                    "ghost owner list disagrees with the global partition on rank {}",
                    comm.rank()
                );
            }
            crate::debug_invariants!(
                if resolved == owners {
                    Ok(())
                } else {
                    Err(MapError::InvalidArgument(
                        "ghost owners disagree with the global partition".into(),
                    ))
                },
                "IndexMap ghost owners"
            );
        }

        let sources = sorted_unique_ranks(owners.iter().copied());
        let destinations = match dest_ranks {
            Some(dests) => sorted_unique_ranks(dests),
            None => compute_graph_edges_nbx(&*comm, &sources, TAG_CONSTRUCT_NBX.get())?,
        };
        let forward = Neighborhood::new(comm.size(), sources, destinations)?;
        let reverse = forward.reverse();

        let scatter = build_scatter(
            &*comm,
            &forward,
            &reverse,
            local_range.0,
            local_size as i32,
            &ghosts,
            &owners,
            TAG_CONSTRUCT_SCATTER.get(),
        )?;

        let map = Self {
            comm,
            local_range,
            size_global,
            ghosts,
            owners,
            forward,
            reverse,
            scatter,
            ghost_lookup: OnceCell::new(),
        };
        map.debug_check_symmetry()?;
        map.debug_assert_invariants();
        Ok(map)
    }

    /// Range of global indices owned by this rank, as `(low, high)`.
    #[inline]
    pub fn local_range(&self) -> (i64, i64) {
        self.local_range
    }

    /// Number of indices owned by this rank.
    #[inline]
    pub fn size_local(&self) -> i32 {
        (self.local_range.1 - self.local_range.0) as i32
    }

    /// Number of indices across the communicator.
    #[inline]
    pub fn size_global(&self) -> i64 {
        self.size_global
    }

    /// Number of ghost indices on this rank.
    #[inline]
    pub fn num_ghosts(&self) -> i32 {
        self.ghosts.len() as i32
    }

    /// Ghost global indices, in halo order.
    #[inline]
    pub fn ghosts(&self) -> &[i64] {
        &self.ghosts
    }

    /// Owning rank of each ghost.
    #[inline]
    pub fn owners(&self) -> &[usize] {
        &self.owners
    }

    /// The communicator the map was created on. The handle stays owned by
    /// the map; it cannot be released through this reference.
    #[inline]
    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub(crate) fn comm_arc(&self) -> &Arc<C> {
        &self.comm
    }

    /// Forward (owner→ghost) neighbor plan: in-edges from the owners of
    /// this rank's ghosts, out-edges to the ranks that ghost its owned
    /// indices.
    #[inline]
    pub fn forward_neighborhood(&self) -> &Neighborhood {
        &self.forward
    }

    /// Reverse (ghost→owner) neighbor plan; the transpose of
    /// [`forward_neighborhood`](Self::forward_neighborhood).
    #[inline]
    pub fn reverse_neighborhood(&self) -> &Neighborhood {
        &self.reverse
    }

    /// Owned local indices that are ghosted elsewhere, grouped by
    /// destination neighbor position. `scatter_fwd_indices().links(d)` is
    /// the send list for the d-th forward destination, in send-buffer
    /// order; `offsets()` doubles as the send displacement array.
    #[inline]
    pub fn scatter_fwd_indices(&self) -> &AdjacencyList<i32> {
        &self.scatter.send_indices
    }

    /// Slot of each ghost in the forward receive buffer: after a forward
    /// scatter into buffer `b`, ghost i's value is
    /// `b[scatter_fwd_ghost_positions()[i]]`.
    #[inline]
    pub fn scatter_fwd_ghost_positions(&self) -> &[i32] {
        &self.scatter.ghost_positions
    }

    /// Ghost position for each forward receive-buffer slot: the inverse
    /// permutation of
    /// [`scatter_fwd_ghost_positions`](Self::scatter_fwd_ghost_positions).
    #[inline]
    pub fn scatter_fwd_buffer_to_ghost(&self) -> &[i32] {
        &self.scatter.buffer_to_ghost
    }

    /// Owner of each ghost in neighbor-local numbering: the position of the
    /// owning rank in `forward_neighborhood().sources()`.
    pub fn ghost_owner_neighbor_rank(&self) -> Vec<usize> {
        self.owners
            .iter()
            .map(|&o| {
                self.forward
                    .source_position(o)
                    .expect("ghost owners are the forward source set by construction")
            })
            .collect()
    }

    /// Map from each shared owned local index to the ranks that ghost it.
    pub fn shared_indices(&self) -> BTreeMap<i32, BTreeSet<usize>> {
        let mut shared: BTreeMap<i32, BTreeSet<usize>> = BTreeMap::new();
        for (node, &rank) in self.forward.destinations().iter().enumerate() {
            for &local in self.scatter.send_indices.links(node) {
                shared.entry(local).or_default().insert(rank);
            }
        }
        shared
    }

    /// Convert local indices to global indices.
    ///
    /// # Errors
    /// `InvalidArgument` if a local index is not in
    /// `[0, size_local + num_ghosts)`.
    pub fn local_to_global(&self, locals: &[i32]) -> Result<Vec<i64>, MapError> {
        let size_local = self.size_local();
        locals
            .iter()
            .map(|&l| {
                if l < 0 || l >= size_local + self.num_ghosts() {
                    Err(MapError::InvalidArgument(format!(
                        "local index {l} out of range [0, {})",
                        size_local + self.num_ghosts()
                    )))
                } else if l < size_local {
                    Ok(self.local_range.0 + l as i64)
                } else {
                    Ok(self.ghosts[(l - size_local) as usize])
                }
            })
            .collect()
    }

    /// Convert global indices to local indices. Globals that are neither
    /// owned nor ghosted here map to `-1`.
    ///
    /// The ghost lookup table is built on first use and cached; queries
    /// after that are O(1) per index.
    pub fn global_to_local(&self, globals: &[i64]) -> Vec<i32> {
        let (low, high) = self.local_range;
        let lookup = self.ghost_lookup.get_or_init(|| {
            let size_local = self.size_local();
            self.ghosts
                .iter()
                .enumerate()
                .map(|(i, &g)| (g, size_local + i as i32))
                .collect()
        });
        globals
            .iter()
            .map(|&g| {
                if g >= low && g < high {
                    (g - low) as i32
                } else {
                    lookup.get(&g).copied().unwrap_or(-1)
                }
            })
            .collect()
    }

    /// The global index of every local index on this rank: owned indices
    /// first (`offset, offset+1, …`), then the ghosts verbatim.
    pub fn global_indices(&self) -> Vec<i64> {
        let mut global = Vec::with_capacity(self.size_local() as usize + self.ghosts.len());
        global.extend(self.local_range.0..self.local_range.1);
        global.extend_from_slice(&self.ghosts);
        global
    }

    /// Debug-only symmetry assertion: all ranks must have computed the same
    /// global size. Costs one all-gather, so it only runs in debug builds
    /// or under `check-invariants`.
    fn debug_check_symmetry(&self) -> Result<(), MapError> {
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        {
            let sizes = self.comm.all_gather_i64(self.size_global)?;
            if sizes.iter().any(|&s| s != self.size_global) {
                log::warn!(
                    "size_global differs across ranks after construction: {sizes:?} on rank {}",
                    self.comm.rank()
                );
            }
            crate::debug_invariants!(
                if sizes.iter().all(|&s| s == self.size_global) {
                    Ok(())
                } else {
                    Err(MapError::InvalidArgument(
                        "size_global differs across ranks".into(),
                    ))
                },
                "IndexMap symmetry"
            );
        }
        Ok(())
    }
}

impl<C: Communicator> DebugInvariants for IndexMap<C> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "IndexMap");
    }

    fn validate_invariants(&self) -> Result<(), MapError> {
        if self.local_range.1 < self.local_range.0 {
            return Err(MapError::InvalidArgument(
                "local range must satisfy high >= low".into(),
            ));
        }
        if self.ghosts.len() != self.owners.len() {
            return Err(MapError::LengthMismatch {
                ghosts: self.ghosts.len(),
                owners: self.owners.len(),
            });
        }
        let mut seen = hashbrown::HashSet::with_capacity(self.ghosts.len());
        for (&g, &o) in self.ghosts.iter().zip(&self.owners) {
            if g < 0 || g >= self.size_global || (g >= self.local_range.0 && g < self.local_range.1)
            {
                return Err(MapError::InvalidGhost {
                    ghost: g,
                    range_start: self.local_range.0,
                    range_end: self.local_range.1,
                    size_global: self.size_global,
                });
            }
            if !seen.insert(g) {
                return Err(MapError::InvalidArgument(format!(
                    "duplicate ghost index {g}"
                )));
            }
            if self.forward.source_position(o).is_none() {
                return Err(MapError::InvalidArgument(format!(
                    "ghost owner {o} missing from forward sources"
                )));
            }
        }
        if self.scatter.ghost_positions.len() != self.ghosts.len()
            || self.scatter.buffer_to_ghost.len() != self.ghosts.len()
        {
            return Err(MapError::InvalidArgument(
                "scatter ghost position arrays must have one entry per ghost".into(),
            ));
        }
        if self.scatter.send_indices.num_nodes() != self.forward.destinations().len() {
            return Err(MapError::InvalidArgument(
                "scatter send map must have one node per forward destination".into(),
            ));
        }
        Ok(())
    }
}

impl<C: Communicator> std::fmt::Debug for IndexMap<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexMap")
            .field("local_range", &self.local_range)
            .field("size_global", &self.size_global)
            .field("num_ghosts", &self.ghosts.len())
            .field("sources", &self.forward.sources())
            .field("destinations", &self.forward.destinations())
            .finish()
    }
}
