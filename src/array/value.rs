//! Element width specialization
//!
//! One generic store per backing strategy instead of a hand-written family
//! per width; this trait is the specialization point. Each width supplies
//! its constants and conversions so the shift/mask code in the stores
//! compiles down to width-specific arithmetic.

use std::fmt;
use std::io::{self, Read, Write};

/// An unsigned element width storable by the primitive indices.
pub trait PrimitiveValue: Copy + Default + Eq + fmt::Debug + Send + Sync + 'static {
    /// Bits per element.
    const BITS: u32;

    /// Bytes per element in memory and in the persisted layout.
    const BYTES: usize;

    /// Largest value the width can hold.
    const MAX_UNSIGNED: u64;

    /// Column width used by the diagnostic dumps.
    const DISPLAY_WIDTH: usize;

    /// Width name used in dumps and trace output.
    const NAME: &'static str;

    /// Narrow a widened value back to the element width.
    ///
    /// # Panics
    /// If `value > Self::MAX_UNSIGNED`.
    fn from_unsigned(value: u64) -> Self;

    /// Widen to the common 64-bit access type.
    fn to_unsigned(self) -> u64;

    /// Write the element in little-endian byte order.
    fn write_le<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<()>;

    /// Read one little-endian element.
    fn read_le<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self>;
}

macro_rules! primitive_value {
    ($ty:ty, $name:literal, $width:literal) => {
        impl PrimitiveValue for $ty {
            const BITS: u32 = <$ty>::BITS;
            const BYTES: usize = std::mem::size_of::<$ty>();
            const MAX_UNSIGNED: u64 = <$ty>::MAX as u64;
            const DISPLAY_WIDTH: usize = $width;
            const NAME: &'static str = $name;

            #[inline]
            fn from_unsigned(value: u64) -> Self {
                assert!(
                    value <= Self::MAX_UNSIGNED,
                    "value {value} does not fit a {}-bit element",
                    Self::BITS
                );
                value as $ty
            }

            #[inline]
            fn to_unsigned(self) -> u64 {
                self as u64
            }

            fn write_le<W: Write + ?Sized>(self, writer: &mut W) -> io::Result<()> {
                writer.write_all(&self.to_le_bytes())
            }

            fn read_le<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
                let mut buf = [0u8; std::mem::size_of::<$ty>()];
                reader.read_exact(&mut buf)?;
                Ok(<$ty>::from_le_bytes(buf))
            }
        }
    };
}

primitive_value!(u8, "byte", 4);
primitive_value!(u16, "short", 7);
primitive_value!(u64, "long", 21);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_and_narrow_round_trip() {
        assert_eq!(u8::from_unsigned(200).to_unsigned(), 200);
        assert_eq!(u16::from_unsigned(60_000).to_unsigned(), 60_000);
        assert_eq!(
            u64::from_unsigned(123_456_789_012).to_unsigned(),
            123_456_789_012
        );
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn narrowing_overflow_panics() {
        u8::from_unsigned(256);
    }

    #[test]
    fn little_endian_stream_round_trip() {
        let mut buf = Vec::new();
        0xBEEFu16.write_le(&mut buf).unwrap();
        let mut cursor = &buf[..];
        assert_eq!(u16::read_le(&mut cursor).unwrap(), 0xBEEF);
    }
}
