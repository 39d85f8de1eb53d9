//! Neighborhood exchange plans over sparse rank topologies.
//!
//! A [`Neighborhood`] is the pair of sorted rank lists a distributed-graph
//! topology is made of: `sources` are the in-edges (ranks we receive from)
//! and `destinations` the out-edges (ranks we send to). Buffers in the
//! neighbor collectives are matched **positionally** against these lists,
//! which is why both must be sorted and agreed upon by every participating
//! rank before any exchange runs.
//!
//! Two plans are provided, mirroring the uniform and vector forms of a
//! neighbor all-to-all: [`Neighborhood::all_to_all`] moves one count per
//! edge, [`Neighborhood::all_to_allv`] moves ragged typed payloads
//! (sizes first, then data, the two-phase shape every completion-style
//! exchange uses).

use crate::algs::communicator::{Communicator, Wait};
use crate::graph::AdjacencyList;
use crate::map_error::MapError;
use bytemuck::Pod;

/// Sparse neighbor topology: sorted in-edge and out-edge rank lists.
///
/// A forward (owner→ghost) and reverse (ghost→owner) plan are each other's
/// [`reverse`](Self::reverse); building both from the same lists keeps their
/// edge sets mutually transposed by construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Neighborhood {
    sources: Vec<usize>,
    destinations: Vec<usize>,
}

impl Neighborhood {
    /// Build from sorted, duplicate-free rank lists.
    ///
    /// # Errors
    /// `InvalidArgument` if either list is unsorted, has duplicates, or
    /// names a rank outside `[0, comm_size)`.
    pub fn new(
        comm_size: usize,
        sources: Vec<usize>,
        destinations: Vec<usize>,
    ) -> Result<Self, MapError> {
        for (name, list) in [("sources", &sources), ("destinations", &destinations)] {
            if list.windows(2).any(|w| w[0] >= w[1]) {
                return Err(MapError::InvalidArgument(format!(
                    "neighborhood {name} must be sorted and duplicate-free"
                )));
            }
            if list.last().is_some_and(|&r| r >= comm_size) {
                return Err(MapError::InvalidArgument(format!(
                    "neighborhood {name} names a rank outside the communicator (size {comm_size})"
                )));
            }
        }
        Ok(Self {
            sources,
            destinations,
        })
    }

    /// An empty topology (no neighbors in either direction).
    pub fn empty() -> Self {
        Self {
            sources: Vec::new(),
            destinations: Vec::new(),
        }
    }

    /// The transposed topology: every in-edge becomes an out-edge and vice
    /// versa.
    pub fn reverse(&self) -> Self {
        Self {
            sources: self.destinations.clone(),
            destinations: self.sources.clone(),
        }
    }

    /// In-edge ranks, sorted.
    #[inline]
    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    /// Out-edge ranks, sorted.
    #[inline]
    pub fn destinations(&self) -> &[usize] {
        &self.destinations
    }

    /// Position of `rank` in the source list, if present.
    #[inline]
    pub fn source_position(&self, rank: usize) -> Option<usize> {
        self.sources.binary_search(&rank).ok()
    }

    /// Position of `rank` in the destination list, if present.
    #[inline]
    pub fn destination_position(&self, rank: usize) -> Option<usize> {
        self.destinations.binary_search(&rank).ok()
    }

    /// Uniform neighbor exchange: send one `u64` to each destination,
    /// receive one from each source (in list order).
    ///
    /// `send.len()` must equal `destinations().len()`.
    pub fn all_to_all<C: Communicator>(
        &self,
        comm: &C,
        tag: u16,
        send: &[u64],
    ) -> Result<Vec<u64>, MapError> {
        if send.len() != self.destinations.len() {
            return Err(MapError::InvalidArgument(format!(
                "neighbor all-to-all send buffer has {} entries for {} destinations",
                send.len(),
                self.destinations.len()
            )));
        }

        let mut recvs = Vec::with_capacity(self.sources.len());
        for &src in &self.sources {
            let mut template = [0u8; 8];
            recvs.push((src, comm.irecv(src, tag, &mut template)));
        }
        let mut sends = Vec::with_capacity(self.destinations.len());
        for (&dst, &value) in self.destinations.iter().zip(send) {
            sends.push(comm.isend(dst, tag, &value.to_le_bytes()));
        }

        let mut out = Vec::with_capacity(self.sources.len());
        for (src, h) in recvs {
            let data = h
                .wait()
                .ok_or_else(|| MapError::comm(src, "neighbor count receive returned no data"))?;
            if data.len() != 8 {
                return Err(MapError::comm(
                    src,
                    format!("neighbor count expected 8 bytes, got {}", data.len()),
                ));
            }
            let mut word = [0u8; 8];
            word.copy_from_slice(&data);
            out.push(u64::from_le_bytes(word));
        }
        for s in sends {
            let _ = s.wait();
        }
        Ok(out)
    }

    /// Vector neighbor exchange: send `send.links(d)` to the d-th
    /// destination, receive one list per source. The returned adjacency has
    /// one node per source, in source-list order.
    ///
    /// Counts travel under `tag`, payloads under `tag + 1`.
    pub fn all_to_allv<C: Communicator, T: Pod>(
        &self,
        comm: &C,
        tag: u16,
        send: &AdjacencyList<T>,
    ) -> Result<AdjacencyList<T>, MapError> {
        if send.num_nodes() != self.destinations.len() {
            return Err(MapError::InvalidArgument(format!(
                "neighbor all-to-allv send list has {} nodes for {} destinations",
                send.num_nodes(),
                self.destinations.len()
            )));
        }

        let send_counts: Vec<u64> = send.iter().map(|l| l.len() as u64).collect();
        let recv_counts = self.all_to_all(comm, tag, &send_counts)?;

        let item = std::mem::size_of::<T>();
        let data_tag = tag.wrapping_add(1);
        let mut recvs = Vec::with_capacity(self.sources.len());
        for (&src, &count) in self.sources.iter().zip(&recv_counts) {
            let mut template = vec![0u8; count as usize * item];
            recvs.push((src, count as usize, comm.irecv(src, data_tag, &mut template)));
        }
        let mut sends = Vec::with_capacity(self.destinations.len());
        for (node, &dst) in self.destinations.iter().enumerate() {
            sends.push(comm.isend(dst, data_tag, bytemuck::cast_slice(send.links(node))));
        }

        let mut lists = Vec::with_capacity(self.sources.len());
        for (src, count, h) in recvs {
            let data = h
                .wait()
                .ok_or_else(|| MapError::comm(src, "neighbor payload receive returned no data"))?;
            if data.len() != count * item {
                return Err(MapError::comm(
                    src,
                    format!(
                        "neighbor payload expected {} bytes, got {}",
                        count * item,
                        data.len()
                    ),
                ));
            }
            let typed: Vec<T> = if data.is_empty() {
                Vec::new()
            } else {
                bytemuck::cast_slice(&data).to_vec()
            };
            lists.push(typed);
        }
        for s in sends {
            let _ = s.wait();
        }
        Ok(AdjacencyList::from_lists(lists))
    }
}
