//! This module provides implementations for basic decoders: little endian and big endian.
//!

use super::BasicDecode;
use byteordered::{ByteOrdered, Endianness};
use std::io::Read;

type Result<T> = std::io::Result<T>;

/// A basic decoder of primitive values in little endian.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct LittleEndianBasicDecoder;

impl BasicDecode for LittleEndianBasicDecoder {
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn decode_us<S>(&self, source: S) -> Result<u16>
    where
        S: Read,
    {
        ByteOrdered::le(source).read_u16()
    }

    fn decode_ul<S>(&self, source: S) -> Result<u32>
    where
        S: Read,
    {
        ByteOrdered::le(source).read_u32()
    }
}

/// A basic decoder of primitive values in big endian.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct BigEndianBasicDecoder;

impl BasicDecode for BigEndianBasicDecoder {
    fn endianness(&self) -> Endianness {
        Endianness::Big
    }

    fn decode_us<S>(&self, source: S) -> Result<u16>
    where
        S: Read,
    {
        ByteOrdered::be(source).read_u16()
    }

    fn decode_ul<S>(&self, source: S) -> Result<u32>
    where
        S: Read,
    {
        ByteOrdered::be(source).read_u32()
    }
}

/// A basic decoder with support for both Little Endian an Big Endian
/// encoding, decided at run-time.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum BasicDecoder {
    /// Decode in Little Endian
    LE(LittleEndianBasicDecoder),
    /// Decode in Big Endian
    BE(BigEndianBasicDecoder),
}

impl BasicDecoder {
    /// Create a basic decoder for the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        match endianness {
            Endianness::Little => LittleEndianBasicDecoder.into(),
            Endianness::Big => BigEndianBasicDecoder.into(),
        }
    }
}

impl From<Endianness> for BasicDecoder {
    fn from(endianness: Endianness) -> Self {
        BasicDecoder::new(endianness)
    }
}

impl From<LittleEndianBasicDecoder> for BasicDecoder {
    fn from(decoder: LittleEndianBasicDecoder) -> Self {
        BasicDecoder::LE(decoder)
    }
}

impl From<BigEndianBasicDecoder> for BasicDecoder {
    fn from(decoder: BigEndianBasicDecoder) -> Self {
        BasicDecoder::BE(decoder)
    }
}

macro_rules! for_both {
    ($s: expr, $i: ident => $e: expr) => {
        match *$s {
            BasicDecoder::LE(ref $i) => $e,
            BasicDecoder::BE(ref $i) => $e,
        }
    };
}

impl BasicDecode for BasicDecoder {
    fn endianness(&self) -> Endianness {
        for_both!(self, e => e.endianness())
    }

    fn decode_us<S>(&self, source: S) -> Result<u16>
    where
        S: Read,
    {
        for_both!(self, e => e.decode_us(source))
    }

    fn decode_ul<S>(&self, source: S) -> Result<u32>
    where
        S: Read,
    {
        for_both!(self, e => e.decode_ul(source))
    }
}
