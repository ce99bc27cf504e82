//! This module contains the element header encoding logic.

use byteordered::Endianness;
use dcmcodec_core::header::{DataElementHeader, Length};
use dcmcodec_core::{Tag, VR};
use snafu::{Backtrace, ResultExt, Snafu};
use std::io::{self, Write};

pub mod basic;
pub mod explicit;
pub mod implicit;

use self::basic::BasicEncoder;
pub use self::explicit::ExplicitVrEncoder;
pub use self::implicit::ImplicitVrEncoder;

/// Module-level error type:
/// for errors which may occur while encoding element headers.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Failed to write element header"))]
    WriteHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write item header"))]
    WriteItemHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write item delimiter"))]
    WriteItemDelimiter {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write sequence delimiter"))]
    WriteSequenceDelimiter {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to write tag"))]
    WriteTag {
        backtrace: Backtrace,
        source: io::Error,
    },
    /// The value is too long for the 16-bit length field of its VR.
    #[snafu(display("Length {} does not fit in the short length field of {} {}", len, tag, vr))]
    ShortLengthOverflow {
        tag: Tag,
        vr: VR,
        len: Length,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Type trait for an encoder of the numeric fields of headers.
pub trait BasicEncode {
    /// Retrieve the encoder's endianness.
    fn endianness(&self) -> Endianness;

    /// Encode an unsigned short value to the given writer.
    fn encode_us<W>(&self, to: W, value: u16) -> io::Result<()>
    where
        W: Write;

    /// Encode an unsigned long value to the given writer.
    fn encode_ul<W>(&self, to: W, value: u32) -> io::Result<()>
    where
        W: Write;

    /// Encode an attribute tag to the given writer.
    fn encode_tag<W>(&self, mut to: W, tag: Tag) -> io::Result<()>
    where
        W: Write,
    {
        self.encode_us(&mut to, tag.group())?;
        self.encode_us(to, tag.element())
    }
}

/// Type trait for a data element header encoder.
pub trait Encode {
    /// Encode and write an element tag.
    fn encode_tag<W>(&self, to: W, tag: Tag) -> Result<()>
    where
        W: Write;

    /// Encode and write a data element header to the given destination.
    /// Returns the number of bytes effectively written on success.
    fn encode_element_header<W>(&self, to: W, de: DataElementHeader) -> Result<usize>
    where
        W: Write;

    /// Encode and write an item header,
    /// where `len` may be undefined.
    fn encode_item_header<W>(&self, to: W, len: u32) -> Result<()>
    where
        W: Write;

    /// Encode and write an item delimiter.
    fn encode_item_delimiter<W>(&self, to: W) -> Result<()>
    where
        W: Write;

    /// Encode and write a sequence delimiter.
    fn encode_sequence_delimiter<W>(&self, to: W) -> Result<()>
    where
        W: Write;
}

/// Write the 8 bytes of an item group (FFFE) header.
fn encode_item_group<B, W>(basic: &B, mut to: W, element: u16, len: u32) -> io::Result<()>
where
    B: BasicEncode,
    W: Write,
{
    basic.encode_tag(&mut to, Tag(0xFFFE, element))?;
    basic.encode_ul(to, len)
}

pub(crate) fn write_item_header<B: BasicEncode, W: Write>(
    basic: &B,
    to: W,
    len: u32,
) -> Result<()> {
    encode_item_group(basic, to, 0xE000, len).context(WriteItemHeaderSnafu)
}

pub(crate) fn write_item_delimiter<B: BasicEncode, W: Write>(basic: &B, to: W) -> Result<()> {
    encode_item_group(basic, to, 0xE00D, 0).context(WriteItemDelimiterSnafu)
}

pub(crate) fn write_sequence_delimiter<B: BasicEncode, W: Write>(basic: &B, to: W) -> Result<()> {
    encode_item_group(basic, to, 0xE0DD, 0).context(WriteSequenceDelimiterSnafu)
}

/// The number of bytes taken by the header of an element
/// with the given VR.
pub fn element_header_length(vr: VR, explicit_vr: bool) -> u32 {
    if explicit_vr && !vr.has_short_length() {
        12
    } else {
        8
    }
}

/// An element header encoder for any of the supported
/// combinations of VR explicitness and byte order, decided at run-time.
#[derive(Debug, Clone)]
pub enum ElementEncoder {
    Explicit(ExplicitVrEncoder<BasicEncoder>),
    Implicit(ImplicitVrEncoder<BasicEncoder>),
}

impl ElementEncoder {
    pub fn new(explicit_vr: bool, endianness: Endianness) -> Self {
        let basic = BasicEncoder::new(endianness);
        if explicit_vr {
            ElementEncoder::Explicit(ExplicitVrEncoder::new(basic))
        } else {
            ElementEncoder::Implicit(ImplicitVrEncoder::new(basic))
        }
    }

    /** Obtain an encoder for the file meta group,
     * which is always Explicit VR Little Endian.
     */
    pub fn file_meta() -> Self {
        ElementEncoder::new(true, Endianness::Little)
    }

    pub fn explicit_vr(&self) -> bool {
        matches!(self, ElementEncoder::Explicit(_))
    }

    pub fn endianness(&self) -> Endianness {
        match self {
            ElementEncoder::Explicit(e) => e.endianness(),
            ElementEncoder::Implicit(e) => e.endianness(),
        }
    }

    /// The header length of an element with the given VR
    /// under this encoder.
    pub fn header_length(&self, vr: VR) -> u32 {
        element_header_length(vr, self.explicit_vr())
    }
}

macro_rules! for_both {
    ($s: expr, |$e: ident| $f: expr) => {
        match $s {
            ElementEncoder::Explicit($e) => $f,
            ElementEncoder::Implicit($e) => $f,
        }
    };
}

impl Encode for ElementEncoder {
    fn encode_tag<W>(&self, to: W, tag: Tag) -> Result<()>
    where
        W: Write,
    {
        for_both!(self, |e| e.encode_tag(to, tag))
    }

    fn encode_element_header<W>(&self, to: W, de: DataElementHeader) -> Result<usize>
    where
        W: Write,
    {
        for_both!(self, |e| e.encode_element_header(to, de))
    }

    fn encode_item_header<W>(&self, to: W, len: u32) -> Result<()>
    where
        W: Write,
    {
        for_both!(self, |e| e.encode_item_header(to, len))
    }

    fn encode_item_delimiter<W>(&self, to: W) -> Result<()>
    where
        W: Write,
    {
        for_both!(self, |e| e.encode_item_delimiter(to))
    }

    fn encode_sequence_delimiter<W>(&self, to: W) -> Result<()>
    where
        W: Write,
    {
        for_both!(self, |e| e.encode_sequence_delimiter(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmcodec_core::Length;

    #[test]
    fn header_lengths() {
        assert_eq!(element_header_length(VR::US, true), 8);
        assert_eq!(element_header_length(VR::OB, true), 12);
        assert_eq!(element_header_length(VR::SQ, true), 12);
        assert_eq!(element_header_length(VR::UT, true), 12);
        assert_eq!(element_header_length(VR::OB, false), 8);
    }

    #[test]
    fn runtime_encoder_selection() {
        let encoder = ElementEncoder::new(false, Endianness::Big);
        assert!(!encoder.explicit_vr());
        let mut out = Vec::new();
        let written = encoder
            .encode_element_header(
                &mut out,
                DataElementHeader::new((0x0028, 0x0010), VR::US, Length(2)),
            )
            .unwrap();
        assert_eq!(written, 8);
        #[rustfmt::skip]
        assert_eq!(out, vec![
            0x00, 0x28, 0x00, 0x10,
            0x00, 0x00, 0x00, 0x02,
        ]);
    }
}
