//! `AdjacencyList`: a ragged integer array stored as a flat data array plus
//! an offsets array.
//!
//! The list maps each node `i` to the slice
//! `array[offsets[i]..offsets[i + 1]]`. This is the layout every exchange
//! plan speaks: `offsets()` doubles as the displacement array of a
//! neighbor exchange and `array()` as its flat buffer.
//!
//! # Invariants
//!
//! - `offsets` is non-empty, starts at 0, is non-decreasing, and ends at
//!   `array.len()`.
//! - `num_nodes() == offsets.len() - 1`.
//!
//! These are checked at construction and, after that, hold by immutability.

use crate::debug_invariants::DebugInvariants;
use crate::map_error::MapError;

/// Ragged array: nodes → lists of links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdjacencyList<T> {
    array: Vec<T>,
    offsets: Vec<usize>,
}

impl<T> AdjacencyList<T> {
    /// Build from a flat data array and an offsets array of length
    /// `num_nodes + 1`.
    ///
    /// # Errors
    /// `InvalidArgument` if the offsets are empty, decreasing, or do not
    /// cover `array` exactly.
    pub fn new(array: Vec<T>, offsets: Vec<usize>) -> Result<Self, MapError> {
        let list = Self { array, offsets };
        list.validate_invariants()?;
        Ok(list)
    }

    /// Build from per-node link lists, concatenating them in order.
    pub fn from_lists<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = Vec<T>>,
    {
        let mut array = Vec::new();
        let mut offsets = vec![0usize];
        for list in lists {
            array.extend(list);
            offsets.push(array.len());
        }
        let out = Self { array, offsets };
        out.debug_assert_invariants();
        out
    }

    /// An empty list with `num_nodes` nodes and no links.
    pub fn empty(num_nodes: usize) -> Self {
        Self {
            array: Vec::new(),
            offsets: vec![0; num_nodes + 1],
        }
    }

    /// Number of nodes.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Links of `node`.
    ///
    /// # Panics
    /// If `node >= num_nodes()`; node indices are internal and bounded by
    /// construction everywhere this is called.
    #[inline]
    pub fn links(&self, node: usize) -> &[T] {
        &self.array[self.offsets[node]..self.offsets[node + 1]]
    }

    /// The flat data array.
    #[inline]
    pub fn array(&self) -> &[T] {
        &self.array
    }

    /// The offsets array, length `num_nodes() + 1`.
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Iterator over per-node link slices.
    pub fn iter(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.num_nodes()).map(move |n| self.links(n))
    }
}

impl<T> DebugInvariants for AdjacencyList<T> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "AdjacencyList");
    }

    fn validate_invariants(&self) -> Result<(), MapError> {
        if self.offsets.is_empty() {
            return Err(MapError::InvalidArgument(
                "adjacency offsets must have length num_nodes + 1".into(),
            ));
        }
        if self.offsets[0] != 0 {
            return Err(MapError::InvalidArgument(
                "adjacency offsets must start at 0".into(),
            ));
        }
        if self.offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(MapError::InvalidArgument(
                "adjacency offsets must be non-decreasing".into(),
            ));
        }
        if *self.offsets.last().unwrap() != self.array.len() {
            return Err(MapError::InvalidArgument(format!(
                "adjacency offsets end at {} but array has length {}",
                self.offsets.last().unwrap(),
                self.array.len()
            )));
        }
        Ok(())
    }
}
