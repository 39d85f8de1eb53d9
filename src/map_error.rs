//! MapError: unified error type for halo-map public APIs.
//!
//! Every fallible public operation returns `Result<_, MapError>`. Collective
//! operations report errors rank-locally; the library never reduces error
//! state across ranks (that would cost an extra collective per call), so
//! callers that need symmetric failure must raise it themselves.

use thiserror::Error;

/// Unified error type for index-map operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    /// A ghost global index is outside `[0, size_global)` or falls inside
    /// the caller's own owned range.
    #[error("invalid ghost index {ghost}: not ghostable with owned range [{range_start}, {range_end}) and global size {size_global}")]
    InvalidGhost {
        ghost: i64,
        range_start: i64,
        range_end: i64,
        size_global: i64,
    },
    /// A caller-supplied argument violates a precondition, e.g. a sub-map
    /// request naming an unowned index, or stacking maps that live on
    /// different communicators.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// `ghosts` and `owners` arrays have different lengths at construction.
    #[error("ghost list length {ghosts} does not match owner list length {owners}")]
    LengthMismatch { ghosts: usize, owners: usize },
    /// A message-passing primitive failed.
    #[error("communication with rank {rank} failed: {reason}")]
    Communicator { rank: usize, reason: String },
}

impl MapError {
    /// Shorthand for a failed receive/send against `rank`.
    pub(crate) fn comm(rank: usize, reason: impl Into<String>) -> Self {
        MapError::Communicator {
            rank,
            reason: reason.into(),
        }
    }
}
