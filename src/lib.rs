//! # Large-scale indexed array storage
//!
//! Fixed-length, random-access containers for the big in-memory tables a
//! genomics pipeline carries around: per-position coverage counts, per-read
//! identifiers, k-mer hash queues. Two concerns drive the design:
//!
//! 1. **Scale past a single allocation.** A chromosome-length count table can
//!    exceed what one contiguous allocation should hold. The chunked
//!    implementations split storage into power-of-two sized sub-arrays and
//!    address them with a shift and a mask, so `get`/`set` stay O(1).
//! 2. **Memory density.** Many tables hold values from a tiny range (a base
//!    code, a small count). [`PackedIndex`] stores each value in
//!    `ceil(log2(range))` bits, packed back to back across 64-bit words with
//!    no padding.
//!
//! ## Picking an implementation
//!
//! Callers normally go through the dispatching constructors and never name a
//! backing strategy:
//!
//! ```
//! use bigindex::{LongIndex, PackedIndex, UnsignedIndex};
//!
//! let mut counts = LongIndex::with_length(1_000)?;
//! counts.set(42, 7);
//! counts.increment(42);
//! assert_eq!(counts.get(42), 8);
//!
//! // Ten values in [0, 5): three bits each.
//! let mut codes = PackedIndex::new(10, 5)?;
//! codes.set(3, 4);
//! assert_eq!(codes.get(3), 4);
//! # Ok::<(), bigindex::IndexError>(())
//! ```
//!
//! ## Concurrency
//!
//! Nothing here synchronizes internally. The [`WordTearSafe`] marker trait
//! records, per implementation, whether unsynchronized access to *different*
//! positions is safe; see its docs for the contract and for why
//! [`PackedIndex`] is excluded.

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod array;

// Re-exports for convenience
pub use array::chunked::{ByteChunks, LongChunks, PrimChunks, ShortChunks};
pub use array::create::{ByteIndex, LongIndex, PrimIndex, ShortIndex};
pub use array::flat::{ByteArray, LongArray, PrimArray, ShortArray};
pub use array::object::{ObjectArray, ObjectChunks, ObjectIndex};
pub use array::packed::PackedIndex;
pub use array::value::PrimitiveValue;
pub use array::{IndexBase, UnsignedIndex, WordTearSafe};

use thiserror::Error;

/// Errors raised while constructing, loading, or saving an index.
///
/// Out-of-bounds access is a caller bug and panics instead; see the
/// `# Panics` sections on [`UnsignedIndex`].
#[derive(Error, Debug)]
pub enum IndexError {
    /// Requested length whose storage footprint is not addressable.
    #[error("index length {length} is not addressable with {element_bits} bits per element")]
    InvalidLength {
        /// The rejected length.
        length: u64,
        /// Bits each element would have occupied.
        element_bits: u32,
    },

    /// Packed value range outside `[2, 2^63]`.
    #[error("packed value range must be in [2, 2^63], got {range}")]
    InvalidRange {
        /// The rejected range.
        range: u64,
    },

    /// Malformed persisted index: unknown tag, inconsistent lengths.
    #[error("corrupt index stream: {0}")]
    Corrupt(String),

    /// Underlying stream failure during save or load.
    #[error("index I/O failed")]
    Io(#[from] std::io::Error),
}
