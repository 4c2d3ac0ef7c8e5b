//! Index construction and persistence
//!
//! The dispatching constructors pick a backing store by size so callers
//! never name one; the persisted layout records which store was chosen.
//!
//! On-stream layout: `[i32 type_tag][i64 length][backing data]`, all
//! little-endian. Tag `0` is a flat store followed by one length-prefixed
//! element run; tag `1` is a chunked store followed by a chunk count and one
//! length-prefixed run per chunk.

use std::fmt;
use std::io::{self, Read, Write};

use tracing::debug;

use super::chunked::PrimChunks;
use super::flat::PrimArray;
use super::value::PrimitiveValue;
use super::{IndexBase, UnsignedIndex, WordTearSafe, MAX_FLAT_LENGTH};
use crate::IndexError;

/// Dispatching byte-wide index.
pub type ByteIndex = PrimIndex<u8>;
/// Dispatching 16-bit index.
pub type ShortIndex = PrimIndex<u16>;
/// Dispatching 64-bit index.
pub type LongIndex = PrimIndex<u64>;

pub(crate) const TAG_ARRAY: i32 = 0;
pub(crate) const TAG_CHUNKS: i32 = 1;

/// An unsigned index with its backing store chosen by length.
///
/// Flat up to [`MAX_FLAT_LENGTH`] elements, chunked beyond. Both variants
/// satisfy the same contract; the split exists only to bound single
/// allocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimIndex<V: PrimitiveValue> {
    /// Single-allocation backing store.
    Flat(PrimArray<V>),
    /// Chunked backing store.
    Chunked(PrimChunks<V>),
}

impl<V: PrimitiveValue> PrimIndex<V> {
    /// Allocate a zero-filled index of `length` elements, picking the
    /// backing store by size.
    pub fn with_length(length: u64) -> Result<Self, IndexError> {
        if length <= MAX_FLAT_LENGTH {
            debug!(element = V::NAME, length, backing = "flat", "allocating index");
            Ok(Self::Flat(PrimArray::new(length)?))
        } else {
            debug!(element = V::NAME, length, backing = "chunked", "allocating index");
            Ok(Self::Chunked(PrimChunks::new(length)?))
        }
    }

    /// Zero-length index intended to grow by [`PrimIndex::extend_by`].
    ///
    /// Always chunked: growth means appending chunks.
    pub fn extensible() -> Self {
        Self::Chunked(PrimChunks::extensible())
    }

    /// Append `n` zero-filled positions, returning the previous length.
    ///
    /// # Panics
    /// On a flat-backed index; only indices from [`PrimIndex::extensible`]
    /// grow.
    pub fn extend_by(&mut self, n: u64) -> u64 {
        match self {
            Self::Flat(_) => panic!("flat-backed indices are fixed-length"),
            Self::Chunked(inner) => inner.extend_by(n),
        }
    }

    /// Persist with the layout described in the module docs.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), IndexError> {
        match self {
            Self::Flat(index) => index.save(writer),
            Self::Chunked(index) => index.save(writer),
        }
    }

    /// Reconstruct a persisted index.
    ///
    /// Fails with [`IndexError::Corrupt`] on an unknown tag or inconsistent
    /// lengths; never returns a partially populated index.
    pub fn load<R: Read + ?Sized>(reader: &mut R) -> Result<Self, IndexError> {
        let (tag, length) = read_header(reader)?;
        debug!(element = V::NAME, tag, length, "loading index");
        match tag {
            TAG_ARRAY => {
                if length > MAX_FLAT_LENGTH {
                    return Err(IndexError::Corrupt(format!(
                        "flat-tagged index of length {length} exceeds the flat ceiling"
                    )));
                }
                let values: Vec<V> = read_run(reader)?;
                if values.len() as u64 != length {
                    return Err(IndexError::Corrupt(format!(
                        "element run holds {} values, header says {length}",
                        values.len()
                    )));
                }
                Ok(Self::Flat(PrimArray::from_values(values)))
            }
            TAG_CHUNKS => Ok(Self::Chunked(PrimChunks::load_contents(reader, length)?)),
            other => Err(IndexError::Corrupt(format!("unknown index type tag {other}"))),
        }
    }
}

impl<V: PrimitiveValue> IndexBase for PrimIndex<V> {
    fn len(&self) -> u64 {
        match self {
            Self::Flat(index) => index.len(),
            Self::Chunked(index) => index.len(),
        }
    }

    fn bytes(&self) -> u64 {
        match self {
            Self::Flat(index) => index.bytes(),
            Self::Chunked(index) => index.bytes(),
        }
    }
}

impl<V: PrimitiveValue> UnsignedIndex for PrimIndex<V> {
    #[inline]
    fn get(&self, index: u64) -> u64 {
        match self {
            Self::Flat(inner) => inner.get(index),
            Self::Chunked(inner) => inner.get(index),
        }
    }

    #[inline]
    fn set(&mut self, index: u64, value: u64) {
        match self {
            Self::Flat(inner) => inner.set(index, value),
            Self::Chunked(inner) => inner.set(index, value),
        }
    }

    fn swap(&mut self, first: u64, second: u64) {
        match self {
            Self::Flat(inner) => inner.swap(first, second),
            Self::Chunked(inner) => inner.swap(first, second),
        }
    }
}

// Both backing stores keep one element per cell.
impl<V: PrimitiveValue> WordTearSafe for PrimIndex<V> {}

impl<V: PrimitiveValue> fmt::Display for PrimIndex<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat(index) => fmt::Display::fmt(index, f),
            Self::Chunked(index) => fmt::Display::fmt(index, f),
        }
    }
}

pub(crate) fn write_header<W: Write + ?Sized>(
    writer: &mut W,
    tag: i32,
    length: u64,
) -> io::Result<()> {
    writer.write_all(&tag.to_le_bytes())?;
    writer.write_all(&(length as i64).to_le_bytes())
}

pub(crate) fn read_header<R: Read + ?Sized>(reader: &mut R) -> Result<(i32, u64), IndexError> {
    let mut tag_buf = [0u8; 4];
    reader.read_exact(&mut tag_buf)?;
    let mut len_buf = [0u8; 8];
    reader.read_exact(&mut len_buf)?;
    let length = i64::from_le_bytes(len_buf);
    if length < 0 {
        return Err(IndexError::Corrupt(format!("negative index length {length}")));
    }
    Ok((i32::from_le_bytes(tag_buf), length as u64))
}

pub(crate) fn write_u64<W: Write + ?Sized>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub(crate) fn read_u64<R: Read + ?Sized>(reader: &mut R) -> Result<u64, IndexError> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Write one length-prefixed element run.
pub(crate) fn write_run<W, V>(writer: &mut W, values: &[V]) -> io::Result<()>
where
    W: Write + ?Sized,
    V: PrimitiveValue,
{
    write_u64(writer, values.len() as u64)?;
    for value in values {
        value.write_le(writer)?;
    }
    Ok(())
}

/// Read one length-prefixed element run.
///
/// Capacity is reserved incrementally so a corrupt count fails on the read
/// rather than on a huge up-front allocation.
pub(crate) fn read_run<R, V>(reader: &mut R) -> Result<Vec<V>, IndexError>
where
    R: Read + ?Sized,
    V: PrimitiveValue,
{
    const RESERVE_CAP: u64 = 1 << 20;
    let count = read_u64(reader)?;
    let mut values = Vec::with_capacity(count.min(RESERVE_CAP) as usize);
    for _ in 0..count {
        values.push(V::read_le(reader)?);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn small_lengths_dispatch_to_flat() {
        let index = LongIndex::with_length(5).unwrap();
        assert!(matches!(index, PrimIndex::Flat(_)));
    }

    #[test]
    fn set_then_get_through_the_dispatcher() {
        let mut index = LongIndex::with_length(5).unwrap();
        index.set(0, 123_456_789_012);
        assert_eq!(index.get(0), 123_456_789_012);
        assert_eq!(index.get(1), 0);
    }

    #[test]
    fn flat_save_load_round_trip() {
        let mut index = ShortIndex::with_length(100).unwrap();
        for i in 0..100 {
            index.set(i, (i * 31) % 60_000);
        }
        let mut buf = Vec::new();
        index.save(&mut buf).unwrap();
        let loaded = ShortIndex::load(&mut Cursor::new(buf)).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn chunked_save_loads_back_observationally_equal() {
        let mut original = crate::LongChunks::with_chunk_bits(50, 4).unwrap();
        for i in 0..50 {
            original.set(i, i * i);
        }
        let mut buf = Vec::new();
        original.save(&mut buf).unwrap();
        let loaded = LongIndex::load(&mut Cursor::new(buf)).unwrap();
        assert_eq!(loaded.len(), 50);
        for i in 0..50 {
            assert_eq!(loaded.get(i), i * i);
        }
    }

    #[test]
    fn extensible_dispatcher_grows_by_appending() {
        let mut index = LongIndex::extensible();
        assert!(index.is_empty());
        assert_eq!(index.extend_by(100), 0);
        index.set(99, 5);
        assert_eq!(index.get(99), 5);
        assert_eq!(index.extend_by(1), 100);
        assert_eq!(index.len(), 101);
    }

    #[test]
    #[should_panic(expected = "fixed-length")]
    fn fixed_length_indices_refuse_to_grow() {
        let mut index = LongIndex::with_length(10).unwrap();
        index.extend_by(1);
    }

    #[test]
    fn absurd_declared_chunked_length_fails_without_allocating() {
        // A header can claim any length; storage must grow only with data
        // actually read, so this returns promptly instead of exhausting
        // memory on the declared size.
        let mut buf = Vec::new();
        write_header(&mut buf, TAG_CHUNKS, 1 << 60).unwrap();
        write_u64(&mut buf, 1).unwrap();
        write_run(&mut buf, &[1u64, 2, 3]).unwrap();
        let err = LongIndex::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn absurd_length_with_truncated_body_is_an_io_error() {
        let mut buf = Vec::new();
        write_header(&mut buf, TAG_CHUNKS, 1 << 60).unwrap();
        let err = LongIndex::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
    }

    #[test]
    fn unknown_tag_is_corrupt() {
        let mut buf = Vec::new();
        write_header(&mut buf, 7, 3).unwrap();
        let err = ByteIndex::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn negative_length_is_corrupt() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&TAG_ARRAY.to_le_bytes());
        buf.extend_from_slice(&(-1i64).to_le_bytes());
        let err = ByteIndex::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }

    #[test]
    fn truncated_stream_is_an_io_error() {
        let mut index = LongIndex::with_length(10).unwrap();
        index.set(9, 99);
        let mut buf = Vec::new();
        index.save(&mut buf).unwrap();
        buf.truncate(buf.len() - 4);
        let err = LongIndex::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
    }

    #[test]
    fn short_element_run_is_corrupt() {
        let mut buf = Vec::new();
        write_header(&mut buf, TAG_ARRAY, 5).unwrap();
        write_run(&mut buf, &[1u8, 2, 3]).unwrap();
        let err = ByteIndex::load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, IndexError::Corrupt(_)));
    }
}
