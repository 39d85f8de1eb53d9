//! Communication algorithms: the pluggable communicator, sparse neighbor
//! discovery, and the neighborhood exchange plans.

pub mod communicator;
pub mod nbx;
pub mod neighborhood;

pub use communicator::{CommTag, Communicator, SerialComm, Test, ThreadComm, Wait};
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
pub use nbx::compute_graph_edges_nbx;
pub use neighborhood::Neighborhood;
