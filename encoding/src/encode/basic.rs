//! Basic encoders of the numeric fields of element headers,
//! in little endian and big endian.

use super::BasicEncode;
use byteordered::{ByteOrdered, Endianness};
use std::io::{self, Write};

/// A basic encoder of primitive values in little endian.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct LittleEndianBasicEncoder;

impl BasicEncode for LittleEndianBasicEncoder {
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn encode_us<W>(&self, to: W, value: u16) -> io::Result<()>
    where
        W: Write,
    {
        ByteOrdered::le(to).write_u16(value)
    }

    fn encode_ul<W>(&self, to: W, value: u32) -> io::Result<()>
    where
        W: Write,
    {
        ByteOrdered::le(to).write_u32(value)
    }
}

/// A basic encoder of primitive values in big endian.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct BigEndianBasicEncoder;

impl BasicEncode for BigEndianBasicEncoder {
    fn endianness(&self) -> Endianness {
        Endianness::Big
    }

    fn encode_us<W>(&self, to: W, value: u16) -> io::Result<()>
    where
        W: Write,
    {
        ByteOrdered::be(to).write_u16(value)
    }

    fn encode_ul<W>(&self, to: W, value: u32) -> io::Result<()>
    where
        W: Write,
    {
        ByteOrdered::be(to).write_u32(value)
    }
}

/// A basic encoder with support for both byte orders,
/// decided at run-time.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub enum BasicEncoder {
    /// Encode in Little Endian
    LE(LittleEndianBasicEncoder),
    /// Encode in Big Endian
    BE(BigEndianBasicEncoder),
}

impl BasicEncoder {
    pub fn new(endianness: Endianness) -> Self {
        match endianness {
            Endianness::Little => BasicEncoder::LE(LittleEndianBasicEncoder),
            Endianness::Big => BasicEncoder::BE(BigEndianBasicEncoder),
        }
    }
}

impl From<Endianness> for BasicEncoder {
    fn from(endianness: Endianness) -> Self {
        BasicEncoder::new(endianness)
    }
}

macro_rules! for_both {
    ($s: expr, |$e: ident| $f: expr) => {
        match *$s {
            BasicEncoder::LE(ref $e) => $f,
            BasicEncoder::BE(ref $e) => $f,
        }
    };
}

impl BasicEncode for BasicEncoder {
    fn endianness(&self) -> Endianness {
        for_both!(self, |e| e.endianness())
    }

    fn encode_us<W>(&self, to: W, value: u16) -> io::Result<()>
    where
        W: Write,
    {
        for_both!(self, |e| e.encode_us(to, value))
    }

    fn encode_ul<W>(&self, to: W, value: u32) -> io::Result<()>
    where
        W: Write,
    {
        for_both!(self, |e| e.encode_ul(to, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_both_orders() {
        let mut out = Vec::new();
        BasicEncoder::new(Endianness::Little)
            .encode_ul(&mut out, 0x0102_0304)
            .unwrap();
        BasicEncoder::new(Endianness::Big)
            .encode_us(&mut out, 0x0A0B)
            .unwrap();
        assert_eq!(out, vec![0x04, 0x03, 0x02, 0x01, 0x0A, 0x0B]);
    }
}
