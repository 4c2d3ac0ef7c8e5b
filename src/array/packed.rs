//! Bit-field packed unsigned index
//!
//! Stores `length` values drawn from `[0, range)` in `ceil(log2(range))`
//! bits each, packed back to back with no padding or alignment into the bit
//! space of a chunked word store. A field may straddle two adjacent 64-bit
//! words; get and set reassemble or rewrite the two halves explicitly.
//!
//! The backing store is always chunked, even for small lengths: one code
//! path, and single allocations stay bounded however long the index gets.

use std::fmt;

use tracing::debug;

use super::chunked::LongChunks;
use super::{check_position, IndexBase, UnsignedIndex, DEFAULT_CHUNK_BITS};
use crate::IndexError;

/// Fixed-length array of small-range unsigned values, bit-packed across
/// 64-bit words.
///
/// # Word tearing
///
/// `PackedIndex` does **not** implement [`WordTearSafe`]: adjacent logical
/// positions share backing words, and a field can span two of them. A
/// writer mid-update can expose a torn value to a concurrent reader of a
/// *neighboring* position. Synchronize all writers externally, or partition
/// writers by index ranges that never straddle the same word. The usual
/// build-once, read-many discipline is safe.
///
/// [`WordTearSafe`]: super::WordTearSafe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedIndex {
    words: LongChunks,
    length: u64,
    bits: u32,
    mask: u64,
}

impl PackedIndex {
    /// Allocate a zero-filled packed index of `length` values in
    /// `[0, range)`.
    ///
    /// Fails with [`IndexError::InvalidRange`] unless `2 <= range <= 2^63`,
    /// and with [`IndexError::InvalidLength`] when `length * bits` overflows
    /// the addressable bit space.
    pub fn new(length: u64, range: u64) -> Result<Self, IndexError> {
        Self::with_chunk_bits(length, range, DEFAULT_CHUNK_BITS)
    }

    /// Allocate with an explicit chunk size for the backing word store.
    ///
    /// Intended for tests that need word-store chunk boundaries at small
    /// positions; production callers use [`PackedIndex::new`].
    pub fn with_chunk_bits(length: u64, range: u64, chunk_bits: u32) -> Result<Self, IndexError> {
        if range < 2 {
            return Err(IndexError::InvalidRange { range });
        }
        let bits = 64 - (range - 1).leading_zeros();
        if bits > 63 {
            return Err(IndexError::InvalidRange { range });
        }
        let total_bits = length
            .checked_mul(bits as u64)
            .ok_or(IndexError::InvalidLength {
                length,
                element_bits: bits,
            })?;
        // The trailing word keeps the final cross-word read in bounds.
        let word_count = total_bits / 64 + 1;
        debug!(length, range, bits, word_count, "allocating packed index");
        Ok(Self {
            words: LongChunks::with_chunk_bits(word_count, chunk_bits)?,
            length,
            bits,
            mask: (1u64 << bits) - 1,
        })
    }

    /// Field width in bits: `ceil(log2(range))`.
    pub fn bits(&self) -> u32 {
        self.bits
    }
}

impl IndexBase for PackedIndex {
    fn len(&self) -> u64 {
        self.length
    }

    fn bytes(&self) -> u64 {
        self.words.bytes()
    }
}

impl UnsignedIndex for PackedIndex {
    fn get(&self, index: u64) -> u64 {
        check_position(index, self.length);
        let bit_pos = index * self.bits as u64;
        let shift = (bit_pos & 63) as u32;
        let first = bit_pos >> 6;
        let last = (bit_pos + self.bits as u64) >> 6;
        let word1 = self.words.get_value(first);
        if first == last {
            (word1 >> shift) & self.mask
        } else {
            // Field straddles two words; shift is nonzero here, so the
            // complementary shift below stays under 64.
            let word2 = self.words.get_value(last);
            ((word2 << (64 - shift)) | (word1 >> shift)) & self.mask
        }
    }

    fn set(&mut self, index: u64, value: u64) {
        check_position(index, self.length);
        assert!(
            value <= self.mask,
            "value {value} does not fit {} packed bits",
            self.bits
        );
        let bit_pos = index * self.bits as u64;
        let shift = (bit_pos & 63) as u32;
        let first = bit_pos >> 6;
        let last = (bit_pos + self.bits as u64) >> 6;
        let word1 = self.words.get_value(first);
        self.words
            .set_value(first, (word1 & !(self.mask << shift)) | (value << shift));
        if first != last {
            let word2 = self.words.get_value(last);
            self.words.set_value(
                last,
                (word2 & !(self.mask >> (64 - shift))) | (value >> (64 - shift)),
            );
        }
    }
}

impl fmt::Display for PackedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Column wide enough for the largest packable value.
        let width = decimal_digits(self.mask) + 1;
        super::dump_values(f, "packed", self.length, width, |i| self.get(i))
    }
}

fn decimal_digits(mut value: u64) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}
