//! Flat (single-allocation) backing store
//!
//! One contiguous vector of exactly `length` elements. Only valid up to
//! [`MAX_FLAT_LENGTH`]; the dispatching constructors hand longer indices to
//! the chunked store.

use std::fmt;
use std::io::Write;

use super::create;
use super::value::PrimitiveValue;
use super::{check_position, IndexBase, UnsignedIndex, WordTearSafe, MAX_FLAT_LENGTH, VEC_OVERHEAD_BYTES};
use crate::IndexError;

/// Flat unsigned index over a byte-wide element.
pub type ByteArray = PrimArray<u8>;
/// Flat unsigned index over a 16-bit element.
pub type ShortArray = PrimArray<u16>;
/// Flat unsigned index over a 64-bit element.
pub type LongArray = PrimArray<u64>;

/// Fixed-length index backed by a single contiguous allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimArray<V: PrimitiveValue> {
    values: Vec<V>,
}

impl<V: PrimitiveValue> PrimArray<V> {
    /// Allocate a zero-filled flat index of `length` elements.
    ///
    /// Fails with [`IndexError::InvalidLength`] when `length` exceeds
    /// [`MAX_FLAT_LENGTH`].
    pub fn new(length: u64) -> Result<Self, IndexError> {
        if length > MAX_FLAT_LENGTH {
            return Err(IndexError::InvalidLength {
                length,
                element_bits: V::BITS,
            });
        }
        Ok(Self {
            values: vec![V::default(); length as usize],
        })
    }

    pub(crate) fn from_values(values: Vec<V>) -> Self {
        Self { values }
    }

    /// Persist as `[tag ARRAY][length][length-prefixed elements]`.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), IndexError> {
        create::write_header(writer, create::TAG_ARRAY, self.len())?;
        create::write_run(writer, &self.values)?;
        Ok(())
    }
}

impl<V: PrimitiveValue> IndexBase for PrimArray<V> {
    fn len(&self) -> u64 {
        self.values.len() as u64
    }

    fn bytes(&self) -> u64 {
        VEC_OVERHEAD_BYTES + self.len() * V::BYTES as u64
    }
}

impl<V: PrimitiveValue> UnsignedIndex for PrimArray<V> {
    #[inline]
    fn get(&self, index: u64) -> u64 {
        check_position(index, self.len());
        self.values[index as usize].to_unsigned()
    }

    #[inline]
    fn set(&mut self, index: u64, value: u64) {
        check_position(index, self.len());
        self.values[index as usize] = V::from_unsigned(value);
    }

    fn swap(&mut self, first: u64, second: u64) {
        check_position(first, self.len());
        check_position(second, self.len());
        self.values.swap(first as usize, second as usize);
    }
}

// One element per cell: no shared storage words between positions.
impl<V: PrimitiveValue> WordTearSafe for PrimArray<V> {}

impl<V: PrimitiveValue> fmt::Display for PrimArray<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::dump_values(f, V::NAME, self.len(), V::DISPLAY_WIDTH, |i| self.get(i))
    }
}
