//! Object-typed indices
//!
//! Fixed-length stores of owned values, flat or chunked, for tables whose
//! entries are structs rather than packed integers (read metadata, contig
//! records). Slots start empty and are populated with [`set`].
//!
//! Large object tables can pin a lot of heap; [`release`] drops every
//! backing slot immediately instead of waiting for the index itself to go
//! out of scope. A released index is closed: any further access panics.
//!
//! [`set`]: ObjectIndex::set
//! [`release`]: ObjectIndex::release

use std::fmt;

use super::{check_position, IndexBase, WordTearSafe, DEFAULT_CHUNK_BITS, MAX_FLAT_LENGTH, VEC_OVERHEAD_BYTES};
use crate::IndexError;

/// Flat object store backed by a single allocation of slots.
#[derive(Debug, Clone)]
pub struct ObjectArray<T> {
    // None after release()
    slots: Option<Vec<Option<T>>>,
    length: u64,
}

impl<T> ObjectArray<T> {
    /// Allocate `length` empty slots.
    pub fn new(length: u64) -> Result<Self, IndexError> {
        if length > MAX_FLAT_LENGTH {
            return Err(IndexError::InvalidLength {
                length,
                element_bits: slot_bits::<T>(),
            });
        }
        let mut slots = Vec::new();
        slots.resize_with(length as usize, || None);
        Ok(Self {
            slots: Some(slots),
            length,
        })
    }

    fn slots(&self) -> &Vec<Option<T>> {
        self.slots
            .as_ref()
            .expect("object index accessed after release")
    }

    fn slots_mut(&mut self) -> &mut Vec<Option<T>> {
        self.slots
            .as_mut()
            .expect("object index accessed after release")
    }

    /// Borrow the value at `index`, if the slot is populated.
    pub fn get(&self, index: u64) -> Option<&T> {
        check_position(index, self.length);
        self.slots()[index as usize].as_ref()
    }

    /// Store `value` at `index`, returning the previous occupant.
    pub fn set(&mut self, index: u64, value: T) -> Option<T> {
        check_position(index, self.length);
        self.slots_mut()[index as usize].replace(value)
    }

    /// Move the value out of `index`, leaving the slot empty.
    pub fn take(&mut self, index: u64) -> Option<T> {
        check_position(index, self.length);
        self.slots_mut()[index as usize].take()
    }

    /// Exchange the slots at `first` and `second`.
    pub fn swap(&mut self, first: u64, second: u64) {
        check_position(first, self.length);
        check_position(second, self.length);
        self.slots_mut().swap(first as usize, second as usize);
    }

    /// Drop every slot now and close the index.
    pub fn release(&mut self) {
        self.slots = None;
    }

    /// `true` once [`ObjectArray::release`] has run.
    pub fn is_released(&self) -> bool {
        self.slots.is_none()
    }
}

impl<T> IndexBase for ObjectArray<T> {
    fn len(&self) -> u64 {
        self.length
    }

    fn bytes(&self) -> u64 {
        match &self.slots {
            Some(_) => VEC_OVERHEAD_BYTES + self.length * slot_bytes::<T>(),
            None => VEC_OVERHEAD_BYTES,
        }
    }
}

impl<T> WordTearSafe for ObjectArray<T> {}

/// Chunked object store; layout mirrors [`PrimChunks`](super::chunked::PrimChunks).
#[derive(Debug, Clone)]
pub struct ObjectChunks<T> {
    // None after release()
    chunks: Option<Vec<Vec<Option<T>>>>,
    length: u64,
    chunk_bits: u32,
    chunk_mask: u64,
}

impl<T> ObjectChunks<T> {
    /// Allocate `length` empty slots with the default chunk size.
    pub fn new(length: u64) -> Result<Self, IndexError> {
        Self::with_chunk_bits(length, DEFAULT_CHUNK_BITS)
    }

    /// Allocate with an explicit chunk size of `1 << chunk_bits` slots.
    pub fn with_chunk_bits(length: u64, chunk_bits: u32) -> Result<Self, IndexError> {
        assert!(
            chunk_bits > 0 && chunk_bits <= 31,
            "chunk bits must be in [1, 31], got {chunk_bits}"
        );
        if length.checked_mul(slot_bytes::<T>()).is_none() {
            return Err(IndexError::InvalidLength {
                length,
                element_bits: slot_bits::<T>(),
            });
        }

        let chunk_size = 1u64 << chunk_bits;
        let full_chunks = (length >> chunk_bits) as usize;
        let tail = length & (chunk_size - 1);

        let mut chunks = Vec::with_capacity(full_chunks + usize::from(tail > 0));
        for _ in 0..full_chunks {
            let mut chunk = Vec::new();
            chunk.resize_with(chunk_size as usize, || None);
            chunks.push(chunk);
        }
        if tail > 0 {
            let mut chunk = Vec::new();
            chunk.resize_with(tail as usize, || None);
            chunks.push(chunk);
        }

        let allocated: u64 = chunks.iter().map(|c| c.len() as u64).sum();
        assert_eq!(allocated, length, "chunk lengths must sum to the index length");

        Ok(Self {
            chunks: Some(chunks),
            length,
            chunk_bits,
            chunk_mask: chunk_size - 1,
        })
    }

    #[inline]
    fn locate(&self, index: u64) -> (usize, usize) {
        ((index >> self.chunk_bits) as usize, (index & self.chunk_mask) as usize)
    }

    fn chunks(&self) -> &Vec<Vec<Option<T>>> {
        self.chunks
            .as_ref()
            .expect("object index accessed after release")
    }

    fn chunks_mut(&mut self) -> &mut Vec<Vec<Option<T>>> {
        self.chunks
            .as_mut()
            .expect("object index accessed after release")
    }

    /// Borrow the value at `index`, if the slot is populated.
    pub fn get(&self, index: u64) -> Option<&T> {
        check_position(index, self.length);
        let (chunk, offset) = self.locate(index);
        self.chunks()[chunk][offset].as_ref()
    }

    /// Store `value` at `index`, returning the previous occupant.
    pub fn set(&mut self, index: u64, value: T) -> Option<T> {
        check_position(index, self.length);
        let (chunk, offset) = self.locate(index);
        self.chunks_mut()[chunk][offset].replace(value)
    }

    /// Move the value out of `index`, leaving the slot empty.
    pub fn take(&mut self, index: u64) -> Option<T> {
        check_position(index, self.length);
        let (chunk, offset) = self.locate(index);
        self.chunks_mut()[chunk][offset].take()
    }

    /// Exchange the slots at `first` and `second`.
    pub fn swap(&mut self, first: u64, second: u64) {
        check_position(first, self.length);
        check_position(second, self.length);
        if first == second {
            return;
        }
        let (chunk_a, offset_a) = self.locate(first);
        let (chunk_b, offset_b) = self.locate(second);
        let chunks = self.chunks_mut();
        if chunk_a == chunk_b {
            chunks[chunk_a].swap(offset_a, offset_b);
        } else {
            let (lo, lo_off, hi, hi_off) = if chunk_a < chunk_b {
                (chunk_a, offset_a, chunk_b, offset_b)
            } else {
                (chunk_b, offset_b, chunk_a, offset_a)
            };
            let (left, right) = chunks.split_at_mut(hi);
            std::mem::swap(&mut left[lo][lo_off], &mut right[0][hi_off]);
        }
    }

    /// Drop every chunk now and close the index.
    pub fn release(&mut self) {
        self.chunks = None;
    }

    /// `true` once [`ObjectChunks::release`] has run.
    pub fn is_released(&self) -> bool {
        self.chunks.is_none()
    }
}

impl<T> IndexBase for ObjectChunks<T> {
    fn len(&self) -> u64 {
        self.length
    }

    fn bytes(&self) -> u64 {
        match &self.chunks {
            Some(chunks) => {
                VEC_OVERHEAD_BYTES
                    + chunks.len() as u64 * VEC_OVERHEAD_BYTES
                    + self.length * slot_bytes::<T>()
            }
            None => VEC_OVERHEAD_BYTES,
        }
    }
}

impl<T> WordTearSafe for ObjectChunks<T> {}

/// An object index with its backing store chosen by length.
#[derive(Debug, Clone)]
pub enum ObjectIndex<T> {
    /// Single-allocation slot store.
    Flat(ObjectArray<T>),
    /// Chunked slot store.
    Chunked(ObjectChunks<T>),
}

impl<T> ObjectIndex<T> {
    /// Allocate `length` empty slots, picking the backing store by size.
    pub fn with_length(length: u64) -> Result<Self, IndexError> {
        if length <= MAX_FLAT_LENGTH {
            Ok(Self::Flat(ObjectArray::new(length)?))
        } else {
            Ok(Self::Chunked(ObjectChunks::new(length)?))
        }
    }

    /// Borrow the value at `index`, if the slot is populated.
    pub fn get(&self, index: u64) -> Option<&T> {
        match self {
            Self::Flat(inner) => inner.get(index),
            Self::Chunked(inner) => inner.get(index),
        }
    }

    /// Store `value` at `index`, returning the previous occupant.
    pub fn set(&mut self, index: u64, value: T) -> Option<T> {
        match self {
            Self::Flat(inner) => inner.set(index, value),
            Self::Chunked(inner) => inner.set(index, value),
        }
    }

    /// Move the value out of `index`, leaving the slot empty.
    pub fn take(&mut self, index: u64) -> Option<T> {
        match self {
            Self::Flat(inner) => inner.take(index),
            Self::Chunked(inner) => inner.take(index),
        }
    }

    /// Exchange the slots at `first` and `second`.
    pub fn swap(&mut self, first: u64, second: u64) {
        match self {
            Self::Flat(inner) => inner.swap(first, second),
            Self::Chunked(inner) => inner.swap(first, second),
        }
    }

    /// Drop every slot now and close the index.
    pub fn release(&mut self) {
        match self {
            Self::Flat(inner) => inner.release(),
            Self::Chunked(inner) => inner.release(),
        }
    }

    /// `true` once [`ObjectIndex::release`] has run.
    pub fn is_released(&self) -> bool {
        match self {
            Self::Flat(inner) => inner.is_released(),
            Self::Chunked(inner) => inner.is_released(),
        }
    }
}

impl<T> IndexBase for ObjectIndex<T> {
    fn len(&self) -> u64 {
        match self {
            Self::Flat(inner) => inner.len(),
            Self::Chunked(inner) => inner.len(),
        }
    }

    fn bytes(&self) -> u64 {
        match self {
            Self::Flat(inner) => inner.bytes(),
            Self::Chunked(inner) => inner.bytes(),
        }
    }
}

impl<T> WordTearSafe for ObjectIndex<T> {}

fn slot_bytes<T>() -> u64 {
    std::mem::size_of::<Option<T>>() as u64
}

fn slot_bits<T>() -> u32 {
    (std::mem::size_of::<Option<T>>() * 8).min(u32::MAX as usize) as u32
}

impl<T> fmt::Display for ObjectIndex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_released() { "released" } else { "open" };
        write!(f, "object [{}] ({state})", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_start_empty_and_hold_values() {
        let mut index: ObjectIndex<String> = ObjectIndex::with_length(4).unwrap();
        assert!(index.get(2).is_none());
        assert!(index.set(2, "chr7".to_string()).is_none());
        assert_eq!(index.get(2).map(String::as_str), Some("chr7"));
        let old = index.set(2, "chrX".to_string());
        assert_eq!(old.as_deref(), Some("chr7"));
    }

    #[test]
    fn take_empties_the_slot() {
        let mut index: ObjectArray<Vec<u8>> = ObjectArray::new(3).unwrap();
        index.set(0, vec![1, 2, 3]);
        assert_eq!(index.take(0), Some(vec![1, 2, 3]));
        assert!(index.get(0).is_none());
    }

    #[test]
    fn chunked_boundary_slots_behave_like_interior_ones() {
        // chunk size 8: positions 7, 8, 9 straddle the first chunk edge
        let mut index: ObjectChunks<u32> = ObjectChunks::with_chunk_bits(20, 3).unwrap();
        for i in [0, 7, 8, 9, 19] {
            index.set(i, i as u32 * 10);
        }
        for i in [0, 7, 8, 9, 19] {
            assert_eq!(index.get(i), Some(&(i as u32 * 10)));
        }
        assert!(index.get(10).is_none());
    }

    #[test]
    fn swap_across_chunks_moves_ownership() {
        let mut index: ObjectChunks<String> = ObjectChunks::with_chunk_bits(20, 3).unwrap();
        index.set(1, "a".to_string());
        index.set(17, "b".to_string());
        index.swap(1, 17);
        assert_eq!(index.get(1).map(String::as_str), Some("b"));
        assert_eq!(index.get(17).map(String::as_str), Some("a"));
        index.swap(4, 5); // both empty: still fine
        assert!(index.get(4).is_none());
    }

    #[test]
    fn release_closes_the_index_and_frees_slots() {
        let mut index: ObjectIndex<String> = ObjectIndex::with_length(100).unwrap();
        index.set(50, "payload".to_string());
        let before = index.bytes();
        index.release();
        assert!(index.is_released());
        assert!(index.bytes() < before);
    }

    #[test]
    #[should_panic(expected = "after release")]
    fn access_after_release_panics() {
        let mut index: ObjectIndex<u64> = ObjectIndex::with_length(4).unwrap();
        index.release();
        index.get(0);
    }
}
