#![allow(dead_code)]
use halo_map::algs::communicator::ThreadComm;
use std::sync::Arc;

/// Run `f` once per rank of a fresh thread-rank universe and return the
/// results in rank order. Panics in any rank propagate.
pub fn run_on_ranks<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(Arc<ThreadComm>) -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let handles: Vec<_> = ThreadComm::universe(size)
        .into_iter()
        .map(|comm| {
            let f = Arc::clone(&f);
            std::thread::spawn(move || f(Arc::new(comm)))
        })
        .collect();
    handles
        .into_iter()
        .map(|h| h.join().expect("rank thread panicked"))
        .collect()
}

/// Exclusive prefix ranges for a partition given per-rank sizes.
pub fn ranges(sizes: &[u32]) -> Vec<i64> {
    let mut out = Vec::with_capacity(sizes.len() + 1);
    out.push(0i64);
    let mut acc = 0i64;
    for &s in sizes {
        acc += s as i64;
        out.push(acc);
    }
    out
}
