//! User-visible array-semantics errors.
//!
//! These are the recoverable errors of this layer: a caller asked for
//! something the array's shape does not support, or asked in throwing mode
//! for a key that is not there. Every variant names the concrete kind and
//! the operation so the host can produce a precise diagnostic. Invariant
//! violations (invalid kind bytes, pre-seal lattice queries, wrong-layout
//! downcasts) are *not* represented here; those are panics.

use thiserror::Error;

use crate::value::Key;

/// Error type for array operations. Returning one of these leaves the
/// array unmodified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArrayError {
    /// A throwing-mode lookup did not find the key.
    #[error("undefined key {key} in {kind} array")]
    MissingKey {
        /// Kind name of the array the lookup was performed on
        kind: &'static str,
        /// The missing key
        key: Key,
    },
    /// The key is of a type the array's shape cannot hold.
    #[error("invalid key {key} for {op} on {kind} array")]
    InvalidKey {
        /// Kind name of the array
        kind: &'static str,
        /// Operation that rejected the key
        op: &'static str,
        /// The offending key
        key: Key,
    },
    /// An integer index fell outside the valid range of a vector-shaped
    /// array.
    #[error("index {index} out of bounds for {kind} array of size {size}")]
    OutOfBounds {
        /// Kind name of the array
        kind: &'static str,
        /// The offending index
        index: i64,
        /// Size of the array at the time of the access
        size: usize,
    },
    /// The operation is never legal for this kind, regardless of arguments.
    #[error("cannot {op} a {kind} array")]
    IllegalOperation {
        /// Kind name of the array
        kind: &'static str,
        /// The rejected operation
        op: &'static str,
    },
}
