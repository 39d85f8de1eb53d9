//! # halo-map
//!
//! halo-map describes how a contiguous global index set `[0, N)` is
//! partitioned and ghosted across the ranks of a message-passing
//! communicator. Each rank owns a contiguous half-open range of global
//! indices and additionally holds a halo of *ghost* indices owned by other
//! ranks. The [`IndexMap`](map::IndexMap) translates between local
//! numbering (owned first, ghosts after) and global numbering, exposes the
//! neighbor topology needed to move values along owner↔ghost edges, and
//! supports stacking several maps into one, compressing a map to a subset
//! of its owned indices, and resolving which rank owns a ghost.
//!
//! ## Features
//! - Pluggable communication backends: serial, in-process thread-ranks, and
//!   MPI (feature `mpi-support`)
//! - Sparse neighbor discovery by non-blocking consensus, so halo setup
//!   scales with the number of neighbors rather than the number of ranks
//! - Scatter-forward plans (who sends which owned index where) derived once
//!   at construction and immutable thereafter
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! halo-map = "0.1"
//! # Optional: features = ["mpi-support"]
//! ```
//!
//! Collective operations (constructors, stacking, sub-maps) must be called
//! by every rank of the communicator in the same order; query methods are
//! purely local. There is no intra-rank parallelism: the rank is the unit
//! of concurrency.

pub mod algs;
pub mod debug_invariants;
pub mod graph;
pub mod map;
pub mod map_error;
pub mod sort;

/// A convenient prelude to import the most-used traits & types.
pub mod prelude {
    pub use crate::algs::communicator::{CommTag, Communicator, SerialComm, ThreadComm, Wait};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::neighborhood::Neighborhood;
    pub use crate::graph::AdjacencyList;
    pub use crate::map::{stack_index_maps, IndexMap};
    pub use crate::map_error::MapError;
}
