//! In-memory sample buffers.
//!
//! The six sample kinds are a closed set.
//! Code which works on samples is written once over [`Sample`]
//! and selected with [`dispatch_samples!`](crate::dispatch_samples)
//! on the buffer's kind.

use num_traits::{NumCast, PrimInt, ToPrimitive};
use std::fmt;

/// Storage width and signedness of in-memory samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SampleKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
}

impl SampleKind {
    /// The narrowest kind which holds a value whose top bit is `high_bit`.
    pub fn for_high_bit(high_bit: u32, signed: bool) -> Self {
        match (high_bit, signed) {
            (h, false) if h >= 16 => SampleKind::U32,
            (h, true) if h >= 16 => SampleKind::I32,
            (h, false) if h >= 8 => SampleKind::U16,
            (h, true) if h >= 8 => SampleKind::I16,
            (_, false) => SampleKind::U8,
            (_, true) => SampleKind::I8,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            SampleKind::U8 | SampleKind::I8 => 8,
            SampleKind::U16 | SampleKind::I16 => 16,
            SampleKind::U32 | SampleKind::I32 => 32,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, SampleKind::I8 | SampleKind::I16 | SampleKind::I32)
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.is_signed() { 'i' } else { 'u' };
        write!(f, "{}{}", sign, self.bits())
    }
}

/// A primitive sample type.
pub trait Sample: PrimInt + NumCast + Default + fmt::Debug + Send + Sync + 'static {
    const KIND: SampleKind;

    fn into_buffer(samples: Vec<Self>) -> SampleBuffer;
}

macro_rules! impl_sample {
    ($t:ty, $kind:ident) => {
        impl Sample for $t {
            const KIND: SampleKind = SampleKind::$kind;

            fn into_buffer(samples: Vec<Self>) -> SampleBuffer {
                SampleBuffer::$kind(samples)
            }
        }
    };
}

impl_sample!(u8, U8);
impl_sample!(i8, I8);
impl_sample!(u16, U16);
impl_sample!(i16, I16);
impl_sample!(u32, U32);
impl_sample!(i32, I32);

/// Samples of one of the six kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleBuffer {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
}

/// Evaluate an expression generic over [`Sample`]
/// with the vector inside a [`SampleBuffer`] bound to a name.
#[macro_export]
macro_rules! dispatch_samples {
    ($buffer:expr, $v:ident => $e:expr) => {
        match $buffer {
            $crate::SampleBuffer::U8($v) => $e,
            $crate::SampleBuffer::I8($v) => $e,
            $crate::SampleBuffer::U16($v) => $e,
            $crate::SampleBuffer::I16($v) => $e,
            $crate::SampleBuffer::U32($v) => $e,
            $crate::SampleBuffer::I32($v) => $e,
        }
    };
}

impl SampleBuffer {
    /// A buffer of `len` zero samples.
    pub fn zeroed(kind: SampleKind, len: usize) -> Self {
        match kind {
            SampleKind::U8 => SampleBuffer::U8(vec![0; len]),
            SampleKind::I8 => SampleBuffer::I8(vec![0; len]),
            SampleKind::U16 => SampleBuffer::U16(vec![0; len]),
            SampleKind::I16 => SampleBuffer::I16(vec![0; len]),
            SampleKind::U32 => SampleBuffer::U32(vec![0; len]),
            SampleKind::I32 => SampleBuffer::I32(vec![0; len]),
        }
    }

    pub fn kind(&self) -> SampleKind {
        match self {
            SampleBuffer::U8(_) => SampleKind::U8,
            SampleBuffer::I8(_) => SampleKind::I8,
            SampleBuffer::U16(_) => SampleKind::U16,
            SampleBuffer::I16(_) => SampleKind::I16,
            SampleBuffer::U32(_) => SampleKind::U32,
            SampleBuffer::I32(_) => SampleKind::I32,
        }
    }

    pub fn len(&self) -> usize {
        dispatch_samples!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample `index` widened to 64 bits.
    pub fn get(&self, index: usize) -> Option<i64> {
        dispatch_samples!(self, v => v.get(index).and_then(|s| s.to_i64()))
    }
}

macro_rules! impl_from_vec {
    ($t:ty, $kind:ident) => {
        impl From<Vec<$t>> for SampleBuffer {
            fn from(samples: Vec<$t>) -> Self {
                SampleBuffer::$kind(samples)
            }
        }
    };
}

impl_from_vec!(u8, U8);
impl_from_vec!(i8, I8);
impl_from_vec!(u16, U16);
impl_from_vec!(i16, I16);
impl_from_vec!(u32, U32);
impl_from_vec!(i32, I32);

/// The mask of a stored field whose top bit is `high_bit`.
pub(crate) fn field_mask(high_bit: u32) -> u32 {
    if high_bit >= 31 {
        u32::MAX
    } else {
        (1 << (high_bit + 1)) - 1
    }
}

/// Encode a sample as a stored field of `high_bit + 1` bits,
/// in two's complement for negative values.
pub(crate) fn to_field<T: Sample>(sample: T, high_bit: u32) -> u32 {
    let value = sample.to_i64().unwrap_or(0);
    (value as u32) & field_mask(high_bit)
}

/// Decode a stored field, sign extending from `high_bit` for signed kinds.
///
/// Fields wider than the sample kind saturate at its bounds.
pub(crate) fn from_field<T: Sample>(field: u32, high_bit: u32) -> T {
    let field = field & field_mask(high_bit);
    let value = if T::KIND.is_signed() && high_bit < 32 && field & (1 << high_bit) != 0 {
        <i64 as From<u32>>::from(field) - (1i64 << (high_bit + 1))
    } else {
        <i64 as From<u32>>::from(field)
    };
    saturate(value)
}

/// Convert a 64-bit value to a sample, saturating at the kind's bounds.
pub(crate) fn saturate<T: Sample>(value: i64) -> T {
    match <T as NumCast>::from(value) {
        Some(sample) => sample,
        None if value < 0 => T::min_value(),
        None => T::max_value(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, false, SampleKind::U8)]
    #[case(7, true, SampleKind::I8)]
    #[case(8, false, SampleKind::U16)]
    #[case(15, true, SampleKind::I16)]
    #[case(16, false, SampleKind::U32)]
    #[case(31, true, SampleKind::I32)]
    fn kind_by_high_bit(#[case] high_bit: u32, #[case] signed: bool, #[case] kind: SampleKind) {
        assert_eq!(SampleKind::for_high_bit(high_bit, signed), kind);
    }

    #[test]
    fn sign_extends_from_high_bit() {
        // 12 bit field 0xFFF is -1 when signed
        assert_eq!(from_field::<i16>(0xFFF, 11), -1);
        assert_eq!(from_field::<i32>(0x800, 11), -2048);
        assert_eq!(from_field::<i16>(0x7FF, 11), 2047);
        assert_eq!(from_field::<u16>(0xFFF, 11), 4095);
        // bits above the high bit are ignored
        assert_eq!(from_field::<u16>(0xF0FF, 11), 0xFF);
    }

    #[rstest]
    #[case(0x1FF, 8, SampleKind::U8, 255)]
    #[case(0x0FF, 8, SampleKind::I8, 127)]
    #[case(0x100, 8, SampleKind::I8, -128)]
    #[case(0x1_0000, 16, SampleKind::U16, 0xFFFF)]
    #[case(0x1_0000, 16, SampleKind::I16, -32768)]
    fn narrow_kinds_saturate(
        #[case] field: u32,
        #[case] high_bit: u32,
        #[case] kind: SampleKind,
        #[case] expected: i64,
    ) {
        let value = match kind {
            SampleKind::U8 => <i64 as From<_>>::from(from_field::<u8>(field, high_bit)),
            SampleKind::I8 => <i64 as From<_>>::from(from_field::<i8>(field, high_bit)),
            SampleKind::U16 => <i64 as From<_>>::from(from_field::<u16>(field, high_bit)),
            SampleKind::I16 => <i64 as From<_>>::from(from_field::<i16>(field, high_bit)),
            SampleKind::U32 => <i64 as From<_>>::from(from_field::<u32>(field, high_bit)),
            SampleKind::I32 => <i64 as From<_>>::from(from_field::<i32>(field, high_bit)),
        };
        assert_eq!(value, expected);
    }

    #[test]
    fn fields_are_masked() {
        assert_eq!(to_field(-1i16, 11), 0xFFF);
        assert_eq!(to_field(-2048i32, 11), 0x800);
        assert_eq!(to_field(255u8, 7), 0xFF);
        assert_eq!(to_field(-1i32, 31), u32::MAX);
        assert_eq!(from_field::<i32>(u32::MAX, 31), -1);
        assert_eq!(from_field::<u32>(u32::MAX, 31), u32::MAX);
    }

    #[test]
    fn buffer_dispatch() {
        let buffer = SampleBuffer::from(vec![-3i16, 4]);
        assert_eq!(buffer.kind(), SampleKind::I16);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.get(0), Some(-3));
        assert_eq!(buffer.get(2), None);
        assert_eq!(SampleBuffer::zeroed(SampleKind::U32, 3), SampleBuffer::U32(vec![0; 3]));
        assert_eq!(saturate::<u8>(300), 255);
        assert_eq!(saturate::<i8>(-300), -128);
    }
}
