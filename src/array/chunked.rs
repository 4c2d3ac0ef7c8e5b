//! Chunked backing store
//!
//! An array of power-of-two sized sub-arrays. Splitting the storage keeps
//! any single allocation bounded and lets an index grow by appending chunks,
//! while addressing stays O(1): the chunk is `position >> chunk_bits`, the
//! offset `position & chunk_mask`, a shift and a mask rather than a division.

use std::fmt;
use std::io::{Read, Write};

use tracing::trace;

use super::create;
use super::value::PrimitiveValue;
use super::{
    check_position, IndexBase, UnsignedIndex, WordTearSafe, DEFAULT_CHUNK_BITS, VEC_OVERHEAD_BYTES,
};
use crate::IndexError;

/// Chunked unsigned index over a byte-wide element.
pub type ByteChunks = PrimChunks<u8>;
/// Chunked unsigned index over a 16-bit element.
pub type ShortChunks = PrimChunks<u16>;
/// Chunked unsigned index over a 64-bit element.
pub type LongChunks = PrimChunks<u64>;

/// Fixed-length index backed by fixed-capacity chunks.
///
/// Every chunk holds exactly `1 << chunk_bits` elements except possibly the
/// last, which may be shorter. A zero-length instance from [`extensible`]
/// grows by appending further chunks via [`extend_by`].
///
/// [`extensible`]: PrimChunks::extensible
/// [`extend_by`]: PrimChunks::extend_by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimChunks<V: PrimitiveValue> {
    chunks: Vec<Vec<V>>,
    length: u64,
    chunk_bits: u32,
    chunk_mask: u64,
}

impl<V: PrimitiveValue> PrimChunks<V> {
    /// Allocate a zero-filled chunked index of `length` elements with the
    /// default chunk size.
    pub fn new(length: u64) -> Result<Self, IndexError> {
        Self::with_chunk_bits(length, DEFAULT_CHUNK_BITS)
    }

    /// Allocate with an explicit chunk size of `1 << chunk_bits` elements.
    ///
    /// Intended for tests that need chunk boundaries at small positions;
    /// production callers use [`PrimChunks::new`].
    pub fn with_chunk_bits(length: u64, chunk_bits: u32) -> Result<Self, IndexError> {
        assert!(
            chunk_bits > 0 && chunk_bits <= 31,
            "chunk bits must be in [1, 31], got {chunk_bits}"
        );
        if length.checked_mul(V::BYTES as u64).is_none() {
            return Err(IndexError::InvalidLength {
                length,
                element_bits: V::BITS,
            });
        }

        let chunk_size = 1u64 << chunk_bits;
        let full_chunks = (length >> chunk_bits) as usize;
        let tail = length & (chunk_size - 1);

        let mut chunks = Vec::with_capacity(full_chunks + usize::from(tail > 0));
        for _ in 0..full_chunks {
            chunks.push(vec![V::default(); chunk_size as usize]);
        }
        if tail > 0 {
            chunks.push(vec![V::default(); tail as usize]);
        }

        let allocated: u64 = chunks.iter().map(|c| c.len() as u64).sum();
        assert_eq!(allocated, length, "chunk lengths must sum to the index length");

        Ok(Self {
            chunks,
            length,
            chunk_bits,
            chunk_mask: chunk_size - 1,
        })
    }

    /// Zero-length index intended to grow by [`PrimChunks::extend_by`].
    pub fn extensible() -> Self {
        Self::extensible_with_chunk_bits(DEFAULT_CHUNK_BITS)
    }

    /// Zero-length extensible index with an explicit chunk size.
    pub fn extensible_with_chunk_bits(chunk_bits: u32) -> Self {
        Self::with_chunk_bits(0, chunk_bits)
            .unwrap_or_else(|_| unreachable!("zero length is always addressable"))
    }

    /// Append `n` zero-filled positions, returning the previous length.
    ///
    /// Growth is append-only: the trailing short chunk (if any) is topped up
    /// to capacity, then full-size chunks are added as needed. Existing
    /// contents are untouched.
    pub fn extend_by(&mut self, n: u64) -> u64 {
        let start = self.length;
        let chunk_size = self.chunk_mask + 1;
        let mut remaining = n;
        while remaining > 0 {
            match self.chunks.last_mut() {
                Some(last) if (last.len() as u64) < chunk_size => {
                    let grow = remaining.min(chunk_size - last.len() as u64);
                    last.resize(last.len() + grow as usize, V::default());
                    remaining -= grow;
                }
                _ => {
                    let grow = remaining.min(chunk_size);
                    self.chunks.push(vec![V::default(); grow as usize]);
                    remaining -= grow;
                }
            }
        }
        self.length += n;
        trace!(
            element = V::NAME,
            old_length = start,
            new_length = self.length,
            chunks = self.chunks.len(),
            "extended chunked index"
        );
        start
    }

    /// Chunk size exponent in use.
    pub fn chunk_bits(&self) -> u32 {
        self.chunk_bits
    }

    #[inline]
    fn locate(&self, index: u64) -> (usize, usize) {
        ((index >> self.chunk_bits) as usize, (index & self.chunk_mask) as usize)
    }

    #[inline]
    pub(crate) fn get_value(&self, index: u64) -> V {
        let (chunk, offset) = self.locate(index);
        self.chunks[chunk][offset]
    }

    #[inline]
    pub(crate) fn set_value(&mut self, index: u64, value: V) {
        let (chunk, offset) = self.locate(index);
        self.chunks[chunk][offset] = value;
    }

    /// Persist as `[tag CHUNKS][length][chunk count][length-prefixed chunks]`.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), IndexError> {
        create::write_header(writer, create::TAG_CHUNKS, self.length)?;
        create::write_u64(writer, self.chunks.len() as u64)?;
        for chunk in &self.chunks {
            create::write_run(writer, chunk)?;
        }
        Ok(())
    }

    /// Rebuild from the body of a persisted chunked index.
    ///
    /// The persisted chunk layout is not preserved; contents are repacked
    /// into the default layout, which is observationally identical.
    ///
    /// Storage grows run by run as data is actually read, so a corrupt
    /// header declaring an absurd length fails on validation instead of
    /// allocating the declared length up front.
    pub(crate) fn load_contents<R: Read + ?Sized>(
        reader: &mut R,
        length: u64,
    ) -> Result<Self, IndexError> {
        let mut index = Self::extensible();
        let chunk_count = create::read_u64(reader)?;
        let mut position = 0u64;
        for _ in 0..chunk_count {
            let run: Vec<V> = create::read_run(reader)?;
            if run.len() as u64 > length - position {
                return Err(IndexError::Corrupt(format!(
                    "chunk data overruns declared length {length}"
                )));
            }
            index.extend_by(run.len() as u64);
            for value in run {
                index.set_value(position, value);
                position += 1;
            }
        }
        if position != length {
            return Err(IndexError::Corrupt(format!(
                "chunk lengths sum to {position}, expected {length}"
            )));
        }
        Ok(index)
    }
}

impl<V: PrimitiveValue> IndexBase for PrimChunks<V> {
    fn len(&self) -> u64 {
        self.length
    }

    fn bytes(&self) -> u64 {
        VEC_OVERHEAD_BYTES
            + self.chunks.len() as u64 * VEC_OVERHEAD_BYTES
            + self.length * V::BYTES as u64
    }
}

impl<V: PrimitiveValue> UnsignedIndex for PrimChunks<V> {
    #[inline]
    fn get(&self, index: u64) -> u64 {
        check_position(index, self.length);
        self.get_value(index).to_unsigned()
    }

    #[inline]
    fn set(&mut self, index: u64, value: u64) {
        check_position(index, self.length);
        self.set_value(index, V::from_unsigned(value));
    }
}

// One element per cell; chunks are exclusively owned and never shared.
impl<V: PrimitiveValue> WordTearSafe for PrimChunks<V> {}

impl<V: PrimitiveValue> fmt::Display for PrimChunks<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        super::dump_values(f, V::NAME, self.length, V::DISPLAY_WIDTH, |i| self.get(i))
    }
}
