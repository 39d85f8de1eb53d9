//! Sparse neighbor discovery by non-blocking consensus (NBX).
//!
//! Every rank announces itself to the ranks it ghosts from; the set of
//! announcements a rank receives is exactly the set of ranks that ghost its
//! owned indices. The protocol terminates without any global size exchange:
//! announcements use synchronous sends, each rank joins a non-blocking
//! barrier once its own sends have been matched, and barrier completion
//! implies every announcement everywhere has been received.
//!
//! Cost scales with the number of edges, not the number of ranks, which is
//! what makes sparse halos cheap on wide communicators.

use crate::algs::communicator::{Communicator, Test};
use crate::map_error::MapError;
use crate::sort::sorted_unique_ranks;

/// Discover the destination ranks (ranks that ghost the caller's owned
/// indices) from the caller's source ranks (owners of the caller's ghosts).
///
/// Collective over `comm`. `sources` need not be sorted; the returned
/// destinations are sorted and duplicate-free, which every rank must agree
/// on before the lists are used to match neighbor exchanges positionally.
pub fn compute_graph_edges_nbx<C: Communicator>(
    comm: &C,
    sources: &[usize],
    tag: u16,
) -> Result<Vec<usize>, MapError> {
    let sources = sorted_unique_ranks(sources.iter().copied());
    if let Some(&bad) = sources.iter().find(|&&s| s >= comm.size()) {
        return Err(MapError::InvalidArgument(format!(
            "source rank {bad} out of range for communicator of size {}",
            comm.size()
        )));
    }

    let mut sends: Vec<C::SendHandle> = sources
        .iter()
        .map(|&src| comm.issend(src, tag, &[]))
        .collect();

    let mut destinations = Vec::new();
    let mut barrier: Option<C::BarrierHandle> = None;
    loop {
        if let Some((source, _len)) = comm.iprobe(tag) {
            comm.recv(source, tag)
                .ok_or_else(|| MapError::comm(source, "nbx announcement receive failed"))?;
            destinations.push(source);
            continue;
        }
        match barrier.as_mut() {
            None => {
                // Enter the consensus barrier once all announcements have
                // been matched by their receivers.
                if sends.iter_mut().all(|s| s.test()) {
                    barrier = Some(comm.ibarrier());
                }
            }
            Some(b) => {
                if b.test() {
                    break;
                }
            }
        }
        std::thread::yield_now();
    }

    Ok(sorted_unique_ranks(destinations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{SerialComm, ThreadComm};

    const TAG: u16 = 0x700;

    #[test]
    fn single_rank_has_no_edges() {
        let dests = compute_graph_edges_nbx(&SerialComm, &[], TAG).unwrap();
        assert!(dests.is_empty());
    }

    #[test]
    fn rejects_out_of_range_source() {
        let err = compute_graph_edges_nbx(&SerialComm, &[3], TAG).unwrap_err();
        assert!(matches!(err, MapError::InvalidArgument(_)));
    }

    #[test]
    fn ring_discovers_reverse_edges() {
        // Rank r ghosts from (r + 1) % n, so rank r must discover (r - 1) % n.
        let n = 4;
        let comms = ThreadComm::universe(n);
        let handles: Vec<_> = comms
            .into_iter()
            .map(|c| {
                std::thread::spawn(move || {
                    let src = (c.rank() + 1) % n;
                    let dests = compute_graph_edges_nbx(&c, &[src], TAG).unwrap();
                    (c.rank(), dests)
                })
            })
            .collect();
        for h in handles {
            let (rank, dests) = h.join().unwrap();
            assert_eq!(dests, vec![(rank + n - 1) % n]);
        }
    }

    #[test]
    fn hub_discovers_all_spokes() {
        // Every spoke ghosts from rank 0; rank 0 discovers all spokes.
        let n = 4;
        let comms = ThreadComm::universe(n);
        let handles: Vec<_> = comms
            .into_iter()
            .map(|c| {
                std::thread::spawn(move || {
                    let sources = if c.rank() == 0 { vec![] } else { vec![0] };
                    let dests = compute_graph_edges_nbx(&c, &sources, TAG).unwrap();
                    (c.rank(), dests)
                })
            })
            .collect();
        for h in handles {
            let (rank, dests) = h.join().unwrap();
            if rank == 0 {
                assert_eq!(dests, vec![1, 2, 3]);
            } else {
                assert!(dests.is_empty());
            }
        }
    }

    #[test]
    fn duplicate_sources_collapse() {
        let n = 2;
        let comms = ThreadComm::universe(n);
        let handles: Vec<_> = comms
            .into_iter()
            .map(|c| {
                std::thread::spawn(move || {
                    let peer = 1 - c.rank();
                    let dests = compute_graph_edges_nbx(&c, &[peer, peer], TAG).unwrap();
                    (c.rank(), dests)
                })
            })
            .collect();
        for h in handles {
            let (rank, dests) = h.join().unwrap();
            assert_eq!(dests, vec![1 - rank]);
        }
    }
}
