//! Indexed array storage
//!
//! Every container in this module maps a 64-bit logical position to a value
//! in O(1): a flat store resolves it with one offset, a chunked store with a
//! shift, a mask, and one indirection, a packed store with a constant number
//! of shifts and masks. No implementation searches or scans per access.

pub mod chunked;
pub mod create;
pub mod flat;
pub mod object;
pub mod packed;
pub mod value;

use std::fmt;

/// Default chunk size exponent: 2^24 elements per chunk.
///
/// One benchmarked default instead of per-width tuning constants. The
/// testing constructors on the chunked types override it.
pub const DEFAULT_CHUNK_BITS: u32 = 24;

/// Largest length served by a flat (single-allocation) backing store.
///
/// Not a correctness boundary on 64-bit targets, only a bound on worst-case
/// single-allocation size; the dispatching constructors switch to chunked
/// storage above it.
pub const MAX_FLAT_LENGTH: u64 = i32::MAX as u64;

/// Approximate bookkeeping bytes for one heap-allocated vector.
pub(crate) const VEC_OVERHEAD_BYTES: u64 = 24;

/// Values printed per line by the diagnostic `Display` dumps.
pub(crate) const DUMP_VALUES_PER_LINE: u64 = 10;

/// Maximum values a diagnostic dump renders before eliding the rest.
pub(crate) const DUMP_LIMIT: u64 = 300;

/// Shared contract for every index: logical length and memory accounting.
pub trait IndexBase {
    /// Number of logical positions.
    fn len(&self) -> u64;

    /// `true` when the index holds no positions.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate memory footprint in bytes, including chunk bookkeeping.
    fn bytes(&self) -> u64;
}

/// Random access to unsigned values by logical position.
///
/// Every method is O(1). Positions are checked: out-of-bounds access is a
/// caller bug and panics.
pub trait UnsignedIndex: IndexBase {
    /// Read the value at `index`.
    ///
    /// # Panics
    /// If `index >= self.len()`.
    fn get(&self, index: u64) -> u64;

    /// Write `value` at `index`.
    ///
    /// # Panics
    /// If `index >= self.len()`, or if `value` does not fit the element
    /// width.
    fn set(&mut self, index: u64, value: u64);

    /// Exchange the values at `first` and `second`.
    ///
    /// The default reads both positions and writes them back swapped;
    /// implementations may override when they can do better.
    fn swap(&mut self, first: u64, second: u64) {
        let a = self.get(first);
        let b = self.get(second);
        self.set(first, b);
        self.set(second, a);
    }

    /// Add one to the value at `index`.
    fn increment(&mut self, index: u64) {
        let v = self.get(index);
        self.set(index, v + 1);
    }

    /// Set every position to `value`.
    fn fill(&mut self, value: u64) {
        for i in 0..self.len() {
            self.set(i, value);
        }
    }
}

/// Marker: unsynchronized concurrent access to *different* positions is safe.
///
/// Implementations carry this marker when every logical value occupies its
/// own independently-addressable storage cell, so two threads touching
/// different positions can never tear each other's values. It says nothing
/// about access to the *same* position, which still needs external
/// coordination.
///
/// [`packed::PackedIndex`] deliberately does not implement this: a packed
/// value may straddle two 64-bit words, so a writer updating one position
/// can expose a half-updated word to a reader of an *adjacent* position.
/// Packed writers must be externally synchronized, or partitioned into
/// ranges that never share a word.
pub trait WordTearSafe {}

/// Panic with a uniform message on an out-of-range logical position.
#[inline]
pub(crate) fn check_position(index: u64, len: u64) {
    assert!(index < len, "index out of bounds: {index} >= length {len}");
}

/// Fixed-width tabular dump shared by the `Display` implementations.
///
/// One `[index]` label per line, `DUMP_VALUES_PER_LINE` values per line,
/// `width` columns per value. Long indices are truncated after
/// `DUMP_LIMIT` values so an accidental log of a huge table stays bounded.
pub(crate) fn dump_values(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    len: u64,
    width: usize,
    get: impl Fn(u64) -> u64,
) -> fmt::Result {
    writeln!(f, "{name} [{len}]")?;
    let shown = len.min(DUMP_LIMIT);
    let mut start = 0;
    while start < shown {
        write!(f, "[{start}]")?;
        let end = (start + DUMP_VALUES_PER_LINE).min(shown);
        for i in start..end {
            if i > start {
                write!(f, ",")?;
            }
            write!(f, "{:>width$}", get(i))?;
        }
        writeln!(f)?;
        start = end;
    }
    if shown < len {
        writeln!(f, "... {} more", len - shown)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteArray;

    #[test]
    fn default_swap_exchanges_exactly_two_positions() {
        let mut index = ByteArray::new(4).unwrap();
        index.set(0, 10);
        index.set(1, 20);
        index.set(2, 30);
        index.swap(0, 2);
        assert_eq!(index.get(0), 30);
        assert_eq!(index.get(1), 20);
        assert_eq!(index.get(2), 10);
        assert_eq!(index.get(3), 0);
    }

    #[test]
    fn increment_and_fill() {
        let mut index = ByteArray::new(3).unwrap();
        index.fill(5);
        index.increment(1);
        assert_eq!(index.get(0), 5);
        assert_eq!(index.get(1), 6);
        assert_eq!(index.get(2), 5);
    }

    #[test]
    fn dump_shows_label_and_fixed_columns() {
        let mut index = ByteArray::new(3).unwrap();
        index.set(1, 1);
        let dump = index.to_string();
        assert!(dump.contains("[0]   0,   1,   0"), "got: {dump}");
    }

    #[test]
    fn dump_truncates_long_indices() {
        let index = ByteArray::new(10_000).unwrap();
        let dump = index.to_string();
        assert!(dump.lines().count() < 50);
        assert!(dump.contains("more"));
    }
}
