//! Communication abstraction for in-process (thread-rank) and inter-process
//! (MPI) message passing.
//!
//! Wire format conventions (for higher-level exchange plans):
//! - All integers are LE fixed width (u64 counts, i64 global indices,
//!   i32 local indices).
//! - Payloads are `bytemuck::Pod` slices; no `#[repr(packed)]`.
//! - Receivers may truncate to their provided buffer length; plans exchange
//!   sizes first whenever exact lengths are required.
//!
//! The trait carries exactly the primitives the collective algorithms need:
//! point-to-point sends in buffered (`isend`) and synchronous (`issend`)
//! flavors, posted receives, an any-source probe, a testable consensus
//! barrier, and the two small collectives every map construction performs
//! (`all_gather_i64`, `scan_and_sum`). Backends may override the collectives
//! with native implementations; the defaults are built from point-to-point.

use crate::map_error::MapError;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

/// Non-blocking completion test for sends and barriers.
pub trait Test {
    /// Returns true once the operation has completed. Idempotent after
    /// completion.
    fn test(&mut self) -> bool;
}

/// Tag newtype for safer tag arithmetic.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct CommTag(pub u16);

impl CommTag {
    /// Create a new tag from a raw `u16`.
    #[inline]
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    /// Return the underlying `u16` value.
    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Safely offset the tag by `dx`, wrapping on overflow.
    #[inline]
    pub const fn offset(self, dx: u16) -> Self {
        Self(self.0.wrapping_add(dx))
    }
}

impl From<u16> for CommTag {
    #[inline]
    fn from(x: u16) -> Self {
        CommTag::new(x)
    }
}

/// Tag reserved for the default `all_gather_i64` implementation.
const TAG_ALL_GATHER: CommTag = CommTag::new(0xff00);

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`/`issend`.
    type SendHandle: Wait + Test;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;
    /// Handle returned by `ibarrier`.
    type BarrierHandle: Test;

    /// Rank of this process (0..size-1).
    fn rank(&self) -> usize;
    /// Total number of ranks.
    fn size(&self) -> usize;

    /// Buffered non-blocking send; completes locally.
    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;

    /// Synchronous non-blocking send; completes only once the receiver has
    /// matched it. This is the send the non-blocking consensus protocol
    /// builds on.
    fn issend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;

    /// Non-blocking receive of at most `buf.len()` bytes from `peer`.
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Probe for an incoming message with `tag` from any source. Returns
    /// `(source, message_bytes)` without consuming the message.
    fn iprobe(&self, tag: u16) -> Option<(usize, usize)>;

    /// Blocking receive of one whole message from `peer`.
    fn recv(&self, peer: usize, tag: u16) -> Option<Vec<u8>>;

    /// Non-blocking consensus barrier.
    fn ibarrier(&self) -> Self::BarrierHandle;

    /// Blocking barrier.
    fn barrier(&self) {
        let mut h = self.ibarrier();
        while !h.test() {
            std::thread::yield_now();
        }
    }

    /// Gather one `i64` from every rank, in rank order.
    fn all_gather_i64(&self, value: i64) -> Result<Vec<i64>, MapError> {
        let rank = self.rank();
        let size = self.size();
        let mut out = vec![0i64; size];
        out[rank] = value;

        let mut recvs = Vec::with_capacity(size.saturating_sub(1));
        for peer in (0..size).filter(|&p| p != rank) {
            let mut template = [0u8; 8];
            let h = self.irecv(peer, TAG_ALL_GATHER.get(), &mut template);
            recvs.push((peer, h));
        }
        let bytes = value.to_le_bytes();
        let mut sends = Vec::with_capacity(size.saturating_sub(1));
        for peer in (0..size).filter(|&p| p != rank) {
            sends.push(self.isend(peer, TAG_ALL_GATHER.get(), &bytes));
        }
        for (peer, h) in recvs {
            let data = h
                .wait()
                .ok_or_else(|| MapError::comm(peer, "all-gather receive returned no data"))?;
            if data.len() != 8 {
                return Err(MapError::comm(
                    peer,
                    format!("all-gather expected 8 bytes, got {}", data.len()),
                ));
            }
            let mut word = [0u8; 8];
            word.copy_from_slice(&data);
            out[peer] = i64::from_le_bytes(word);
        }
        for s in sends {
            let _ = s.wait();
        }
        Ok(out)
    }

    /// Exclusive prefix sum and total of one `i64` across ranks, as a single
    /// fused operation so backends can overlap the two reductions.
    fn scan_and_sum(&self, value: i64) -> Result<(i64, i64), MapError> {
        let all = self.all_gather_i64(value)?;
        let offset: i64 = all[..self.rank()].iter().sum();
        let total: i64 = all.iter().sum();
        Ok((offset, total))
    }
}

/// Compile-time no-op comm for single-rank use and pure serial unit tests.
#[derive(Clone, Debug, Default)]
pub struct SerialComm;

/// Handle that is complete from birth.
pub struct ReadyHandle;

impl Wait for ReadyHandle {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl Test for ReadyHandle {
    fn test(&mut self) -> bool {
        true
    }
}

impl Communicator for SerialComm {
    type SendHandle = ReadyHandle;
    type RecvHandle = ReadyHandle;
    type BarrierHandle = ReadyHandle;

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) -> ReadyHandle {
        ReadyHandle
    }
    fn issend(&self, _peer: usize, _tag: u16, _buf: &[u8]) -> ReadyHandle {
        ReadyHandle
    }
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) -> ReadyHandle {
        ReadyHandle
    }
    fn iprobe(&self, _tag: u16) -> Option<(usize, usize)> {
        None
    }
    fn recv(&self, _peer: usize, _tag: u16) -> Option<Vec<u8>> {
        None
    }
    fn ibarrier(&self) -> ReadyHandle {
        ReadyHandle
    }
}

// --- ThreadComm: in-process thread-ranks over a private mailbox universe ---

type Key = (usize, usize, u16); // (src, dst, tag)

struct Message {
    bytes: Vec<u8>,
    delivered: Arc<AtomicBool>,
}

#[derive(Default)]
struct Slot {
    q: VecDeque<Message>,
}

type Cell = Arc<(Mutex<Slot>, Condvar)>;

struct BarrierState {
    epoch: u64,
    arrived: usize,
}

struct UniverseState {
    size: usize,
    slots: Mutex<HashMap<Key, Cell>>,
    barrier: Mutex<BarrierState>,
    barrier_cv: Condvar,
}

impl UniverseState {
    fn cell(&self, key: Key) -> Cell {
        let mut g = self.slots.lock().expect("mailbox poisoned");
        g.entry(key)
            .or_insert_with(|| Arc::new((Mutex::new(Slot::default()), Condvar::new())))
            .clone()
    }
}

/// In-process communicator: every rank is a thread, the universe is a shared
/// mailbox private to the group. A fresh universe per collective session
/// keeps concurrently running sessions (e.g. parallel tests) fully isolated.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    universe: Arc<UniverseState>,
}

impl ThreadComm {
    /// Create a universe of `size` ranks sharing one mailbox.
    pub fn universe(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0, "a communicator needs at least one rank");
        let universe = Arc::new(UniverseState {
            size,
            slots: Mutex::new(HashMap::new()),
            barrier: Mutex::new(BarrierState { epoch: 0, arrived: 0 }),
            barrier_cv: Condvar::new(),
        });
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                universe: universe.clone(),
            })
            .collect()
    }

    fn push(&self, peer: usize, tag: u16, buf: &[u8], delivered: Arc<AtomicBool>) {
        let cell = self.universe.cell((self.rank, peer, tag));
        let (lock, cv) = &*cell;
        {
            let mut slot = lock.lock().expect("slot poisoned");
            slot.q.push_back(Message {
                bytes: buf.to_vec(),
                delivered,
            });
        }
        cv.notify_all();
    }
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.universe.size)
            .finish()
    }
}

/// Send handle; complete immediately for `isend`, on delivery for `issend`.
pub struct LocalSendHandle {
    delivered: Arc<AtomicBool>,
}

impl Wait for LocalSendHandle {
    fn wait(mut self) -> Option<Vec<u8>> {
        while !self.test() {
            std::thread::yield_now();
        }
        None
    }
}

impl Test for LocalSendHandle {
    fn test(&mut self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }
}

pub struct LocalRecvHandle {
    cell: Cell,
    want_len: usize,
}

impl LocalRecvHandle {
    fn take(self, truncate: bool) -> Option<Vec<u8>> {
        let (lock, cv) = &*self.cell;
        let mut slot = lock.lock().expect("slot poisoned");
        while slot.q.is_empty() {
            slot = cv.wait(slot).expect("condvar poisoned");
        }
        let msg = slot.q.pop_front().expect("queue non-empty");
        msg.delivered.store(true, Ordering::Release);
        let mut bytes = msg.bytes;
        if truncate {
            bytes.truncate(self.want_len.min(bytes.len()));
        }
        Some(bytes)
    }
}

impl Wait for LocalRecvHandle {
    fn wait(self) -> Option<Vec<u8>> {
        self.take(true)
    }
}

/// Barrier handle over the universe's epoch counter.
pub struct LocalBarrierHandle {
    universe: Arc<UniverseState>,
    target: u64,
}

impl Test for LocalBarrierHandle {
    fn test(&mut self) -> bool {
        let b = self.universe.barrier.lock().expect("barrier poisoned");
        b.epoch >= self.target
    }
}

impl Communicator for ThreadComm {
    type SendHandle = LocalSendHandle;
    type RecvHandle = LocalRecvHandle;
    type BarrierHandle = LocalBarrierHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.universe.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> LocalSendHandle {
        let delivered = Arc::new(AtomicBool::new(true));
        self.push(peer, tag, buf, delivered.clone());
        LocalSendHandle { delivered }
    }

    fn issend(&self, peer: usize, tag: u16, buf: &[u8]) -> LocalSendHandle {
        let delivered = Arc::new(AtomicBool::new(false));
        self.push(peer, tag, buf, delivered.clone());
        LocalSendHandle { delivered }
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> LocalRecvHandle {
        LocalRecvHandle {
            cell: self.universe.cell((peer, self.rank, tag)),
            want_len: buf.len(),
        }
    }

    fn iprobe(&self, tag: u16) -> Option<(usize, usize)> {
        let slots = self.universe.slots.lock().expect("mailbox poisoned");
        for (key, cell) in slots.iter() {
            if key.1 != self.rank || key.2 != tag {
                continue;
            }
            let slot = cell.0.lock().expect("slot poisoned");
            if let Some(front) = slot.q.front() {
                return Some((key.0, front.bytes.len()));
            }
        }
        None
    }

    fn recv(&self, peer: usize, tag: u16) -> Option<Vec<u8>> {
        LocalRecvHandle {
            cell: self.universe.cell((peer, self.rank, tag)),
            want_len: usize::MAX,
        }
        .take(false)
    }

    fn ibarrier(&self) -> LocalBarrierHandle {
        let universe = self.universe.clone();
        let target = {
            let mut b = universe.barrier.lock().expect("barrier poisoned");
            let target = b.epoch + 1;
            b.arrived += 1;
            if b.arrived == universe.size {
                b.arrived = 0;
                b.epoch += 1;
                universe.barrier_cv.notify_all();
            }
            target
        };
        LocalBarrierHandle { universe, target }
    }

    fn barrier(&self) {
        let target = {
            let mut b = self.universe.barrier.lock().expect("barrier poisoned");
            let target = b.epoch + 1;
            b.arrived += 1;
            if b.arrived == self.universe.size {
                b.arrived = 0;
                b.epoch += 1;
                self.universe.barrier_cv.notify_all();
                return;
            }
            target
        };
        let mut b = self.universe.barrier.lock().expect("barrier poisoned");
        while b.epoch < target {
            b = self.universe.barrier_cv.wait(b).expect("condvar poisoned");
        }
    }
}

// --- MPI backend ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use core::ptr::NonNull;
    use mpi::collective::{CommunicatorCollectives, SystemOperation};
    use mpi::environment::Universe;
    use mpi::point_to_point::{Destination, Source};
    use mpi::topology::{Communicator as _, SimpleCommunicator};
    use mpi::traits::Equivalence;

    /// Communicator over a duplicated MPI communicator. Owns the duplicate
    /// for its lifetime; dropping the comm releases it exactly once.
    pub struct MpiComm {
        _universe: Option<Universe>,
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    unsafe impl Send for MpiComm {}
    unsafe impl Sync for MpiComm {}

    impl MpiComm {
        /// Initialize MPI and duplicate the world communicator.
        pub fn world() -> Self {
            let uni = mpi::initialize().expect("MPI already initialized");
            let world = uni.world().duplicate();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self {
                _universe: Some(uni),
                world,
                rank,
                size,
            }
        }

        /// Duplicate an existing communicator, e.g. to give a second map an
        /// independent message context.
        pub fn duplicate(&self) -> Self {
            let world = self.world.duplicate();
            Self {
                _universe: None,
                world,
                rank: self.rank,
                size: self.size,
            }
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiSendHandle;
        type RecvHandle = MpiRecvHandle;
        type BarrierHandle = MpiBarrierHandle;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiSendHandle {
            use mpi::request::StaticScope;
            let boxed = buf.to_vec().into_boxed_slice();
            let raw: *mut [u8] = Box::into_raw(boxed);
            let slice: &[u8] = unsafe { &*raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_send_with_tag(StaticScope, slice, tag as i32);
            MpiSendHandle {
                req: Some(req),
                buf: Some(unsafe { NonNull::new_unchecked(raw) }),
            }
        }

        fn issend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiSendHandle {
            use mpi::request::StaticScope;
            let boxed = buf.to_vec().into_boxed_slice();
            let raw: *mut [u8] = Box::into_raw(boxed);
            let slice: &[u8] = unsafe { &*raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_synchronous_send_with_tag(StaticScope, slice, tag as i32);
            MpiSendHandle {
                req: Some(req),
                buf: Some(unsafe { NonNull::new_unchecked(raw) }),
            }
        }

        fn irecv(&self, peer: usize, tag: u16, template: &mut [u8]) -> MpiRecvHandle {
            use mpi::request::StaticScope;
            let len = template.len();
            let boxed = vec![0u8; len].into_boxed_slice();
            let raw: *mut [u8] = Box::into_raw(boxed);
            let slice_mut: &mut [u8] = unsafe { &mut *raw };
            let req = self
                .world
                .process_at_rank(peer as i32)
                .immediate_receive_into_with_tag(StaticScope, slice_mut, tag as i32);
            MpiRecvHandle {
                req: Some(req),
                buf: Some(unsafe { NonNull::new_unchecked(raw) }),
                len,
            }
        }

        fn iprobe(&self, tag: u16) -> Option<(usize, usize)> {
            self.world
                .any_process()
                .immediate_probe_with_tag(tag as i32)
                .map(|status| {
                    let count = status.count(u8::equivalent_datatype()) as usize;
                    (status.source_rank() as usize, count)
                })
        }

        fn recv(&self, peer: usize, tag: u16) -> Option<Vec<u8>> {
            let (data, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(tag as i32);
            Some(data)
        }

        fn ibarrier(&self) -> MpiBarrierHandle {
            MpiBarrierHandle {
                req: Some(self.world.immediate_barrier()),
            }
        }

        fn barrier(&self) {
            self.world.barrier();
        }

        fn all_gather_i64(&self, value: i64) -> Result<Vec<i64>, MapError> {
            let mut out = vec![0i64; self.size];
            self.world.all_gather_into(&value, &mut out[..]);
            Ok(out)
        }

        fn scan_and_sum(&self, value: i64) -> Result<(i64, i64), MapError> {
            let mut offset = 0i64;
            let mut total = 0i64;
            mpi::request::scope(|scope| {
                let scan = self.world.immediate_exclusive_scan_into(
                    scope,
                    &value,
                    &mut offset,
                    SystemOperation::sum(),
                );
                let reduce = self.world.immediate_all_reduce_into(
                    scope,
                    &value,
                    &mut total,
                    SystemOperation::sum(),
                );
                scan.wait();
                reduce.wait();
            });
            // The exclusive scan leaves rank 0's buffer undefined.
            if self.rank == 0 {
                offset = 0;
            }
            Ok((offset, total))
        }
    }

    pub struct MpiSendHandle {
        req: Option<mpi::request::Request<'static, [u8], mpi::request::StaticScope>>,
        buf: Option<NonNull<[u8]>>,
    }

    impl Wait for MpiSendHandle {
        fn wait(mut self) -> Option<Vec<u8>> {
            if let Some(r) = self.req.take() {
                let _ = r.wait();
            }
            if let Some(ptr) = self.buf.take() {
                unsafe {
                    drop(Box::from_raw(ptr.as_ptr()));
                }
            }
            None
        }
    }

    impl Test for MpiSendHandle {
        fn test(&mut self) -> bool {
            match self.req.take() {
                None => true,
                Some(r) => match r.test() {
                    Ok(_status) => true,
                    Err(r) => {
                        self.req = Some(r);
                        false
                    }
                },
            }
        }
    }

    impl Drop for MpiSendHandle {
        fn drop(&mut self) {
            if let Some(r) = self.req.take() {
                let _ = r.wait();
            }
            if let Some(ptr) = self.buf.take() {
                unsafe {
                    drop(Box::from_raw(ptr.as_ptr()));
                }
            }
        }
    }

    pub struct MpiRecvHandle {
        req: Option<mpi::request::Request<'static, [u8], mpi::request::StaticScope>>,
        buf: Option<NonNull<[u8]>>,
        len: usize,
    }

    impl Wait for MpiRecvHandle {
        fn wait(mut self) -> Option<Vec<u8>> {
            if let Some(r) = self.req.take() {
                let _ = r.wait();
            }
            let ptr = self.buf.take()?;
            let boxed: Box<[u8]> = unsafe { Box::from_raw(ptr.as_ptr()) };
            let mut v = Vec::from(boxed);
            v.truncate(self.len);
            Some(v)
        }
    }

    impl Drop for MpiRecvHandle {
        fn drop(&mut self) {
            if let Some(r) = self.req.take() {
                let _ = r.wait();
            }
            if let Some(ptr) = self.buf.take() {
                unsafe {
                    drop(Box::from_raw(ptr.as_ptr()));
                }
            }
        }
    }

    pub struct MpiBarrierHandle {
        req: Option<mpi::request::Request<'static, (), mpi::request::StaticScope>>,
    }

    impl Test for MpiBarrierHandle {
        fn test(&mut self) -> bool {
            match self.req.take() {
                None => true,
                Some(r) => match r.test() {
                    Ok(_status) => true,
                    Err(r) => {
                        self.req = Some(r);
                        false
                    }
                },
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_comm_round_trip() {
        let comms = ThreadComm::universe(2);
        let tag = CommTag::new(0x100);

        let msg = b"hello";
        let _s = comms[0].isend(1, tag.get(), msg);

        let mut buf = [0u8; 5];
        let h = comms[1].irecv(0, tag.get(), &mut buf);
        assert_eq!(h.wait().unwrap(), msg);
    }

    #[test]
    fn thread_comm_fifo_order() {
        let comms = ThreadComm::universe(2);
        let tag = CommTag::new(0x101);

        for i in 0..10u8 {
            let _ = comms[0].isend(1, tag.get(), &[i]);
        }
        let mut out = Vec::new();
        for _ in 0..10 {
            let mut b = [0u8; 1];
            out.push(comms[1].irecv(0, tag.get(), &mut b).wait().unwrap()[0]);
        }
        assert_eq!(out, (0u8..10u8).collect::<Vec<_>>());
    }

    #[test]
    fn issend_completes_only_on_delivery() {
        let comms = ThreadComm::universe(2);
        let tag = CommTag::new(0x102);

        let mut s = comms[0].issend(1, tag.get(), &[42]);
        assert!(!s.test());
        let got = comms[1].recv(0, tag.get()).unwrap();
        assert_eq!(got, vec![42]);
        assert!(s.test());
    }

    #[test]
    fn probe_sees_pending_message() {
        let comms = ThreadComm::universe(2);
        let tag = CommTag::new(0x103);

        assert!(comms[1].iprobe(tag.get()).is_none());
        let _ = comms[0].isend(1, tag.get(), &[1, 2, 3]);
        assert_eq!(comms[1].iprobe(tag.get()), Some((0, 3)));
        // Different tag stays invisible.
        assert!(comms[1].iprobe(tag.offset(1).get()).is_none());
        let _ = comms[1].recv(0, tag.get());
        assert!(comms[1].iprobe(tag.get()).is_none());
    }

    #[test]
    fn ibarrier_completes_after_all_arrive() {
        let comms = ThreadComm::universe(3);
        let mut h0 = comms[0].ibarrier();
        assert!(!h0.test());
        let _h1 = comms[1].ibarrier();
        assert!(!h0.test());
        let _h2 = comms[2].ibarrier();
        assert!(h0.test());
    }

    #[test]
    fn all_gather_and_scan_across_threads() {
        let comms = ThreadComm::universe(4);
        let handles: Vec<_> = comms
            .into_iter()
            .map(|c| {
                std::thread::spawn(move || {
                    let v = (c.rank() as i64 + 1) * 10;
                    let gathered = c.all_gather_i64(v).unwrap();
                    let (offset, total) = c.scan_and_sum(v).unwrap();
                    (c.rank(), gathered, offset, total)
                })
            })
            .collect();
        for h in handles {
            let (rank, gathered, offset, total) = h.join().unwrap();
            assert_eq!(gathered, vec![10, 20, 30, 40]);
            assert_eq!(total, 100);
            let expect: i64 = gathered[..rank].iter().sum();
            assert_eq!(offset, expect);
        }
    }

    #[test]
    fn serial_comm_collectives_are_local() {
        let c = SerialComm;
        assert_eq!(c.all_gather_i64(7).unwrap(), vec![7]);
        assert_eq!(c.scan_and_sum(7).unwrap(), (0, 7));
        c.barrier();
    }
}
