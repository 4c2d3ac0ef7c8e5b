use std::io::Cursor;

use anyhow::Result;
use bigindex::{
    ByteIndex, IndexBase, LongArray, LongChunks, LongIndex, PrimIndex, ShortChunks, ShortIndex,
    UnsignedIndex,
};

/// Deterministic 64-bit generator (splitmix64) so failures reproduce.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

#[test]
fn long_flat_round_trips_a_thousand_random_values() -> Result<()> {
    let mut rng = SplitMix64(0xC0FFEE);
    let mut original = LongArray::new(1_000)?;
    for i in 0..1_000 {
        original.set(i, rng.next());
    }

    let mut buf = Vec::new();
    original.save(&mut buf)?;
    let loaded = LongIndex::load(&mut Cursor::new(buf))?;

    assert_eq!(loaded.len(), original.len());
    for i in 0..1_000 {
        assert_eq!(loaded.get(i), original.get(i), "position {i}");
    }
    Ok(())
}

#[test]
fn long_chunked_round_trips_across_chunk_boundaries() -> Result<()> {
    let mut rng = SplitMix64(7);
    // chunk size 32: many chunks plus a short tail
    let mut original = LongChunks::with_chunk_bits(1_000, 5)?;
    for i in 0..1_000 {
        original.set(i, rng.next());
    }

    let mut buf = Vec::new();
    original.save(&mut buf)?;
    let loaded = LongIndex::load(&mut Cursor::new(buf))?;

    assert_eq!(loaded.len(), 1_000);
    for i in 0..1_000 {
        assert_eq!(loaded.get(i), original.get(i), "position {i}");
    }
    Ok(())
}

#[test]
fn short_round_trip_preserves_width_extremes() -> Result<()> {
    let mut original = ShortChunks::with_chunk_bits(100, 4)?;
    original.set(0, u16::MAX as u64);
    original.set(63, 1);
    original.set(64, u16::MAX as u64);
    original.set(99, 12_345);

    let mut buf = Vec::new();
    original.save(&mut buf)?;
    let loaded = ShortIndex::load(&mut Cursor::new(buf))?;

    for i in 0..100 {
        assert_eq!(loaded.get(i), original.get(i), "position {i}");
    }
    Ok(())
}

#[test]
fn byte_round_trip_through_the_dispatcher() -> Result<()> {
    let mut original = ByteIndex::with_length(256)?;
    for i in 0..256 {
        original.set(i, i % 256);
    }

    let mut buf = Vec::new();
    original.save(&mut buf)?;
    let loaded = ByteIndex::load(&mut Cursor::new(buf))?;

    assert_eq!(loaded, original);
    Ok(())
}

#[test]
fn empty_index_round_trips() -> Result<()> {
    let original = LongIndex::with_length(0)?;
    let mut buf = Vec::new();
    original.save(&mut buf)?;
    let loaded = LongIndex::load(&mut Cursor::new(buf))?;
    assert!(loaded.is_empty());
    Ok(())
}

#[test]
fn loading_garbage_fails_without_panicking() {
    let garbage = vec![0xABu8; 64];
    assert!(LongIndex::load(&mut Cursor::new(garbage)).is_err());
}

#[test]
fn loaded_variant_matches_the_persisted_tag() -> Result<()> {
    let flat = LongIndex::with_length(10)?;
    let mut buf = Vec::new();
    flat.save(&mut buf)?;
    assert!(matches!(
        LongIndex::load(&mut Cursor::new(buf))?,
        PrimIndex::Flat(_)
    ));

    let chunked = LongChunks::with_chunk_bits(10, 3)?;
    let mut buf = Vec::new();
    chunked.save(&mut buf)?;
    assert!(matches!(
        LongIndex::load(&mut Cursor::new(buf))?,
        PrimIndex::Chunked(_)
    ));
    Ok(())
}
