//! This module contains the element header decoding logic.

use byteordered::Endianness;
use dcmcodec_core::header::{DataElementHeader, SequenceItemHeader, SequenceItemHeaderError};
use dcmcodec_core::Tag;
use snafu::{Backtrace, Snafu};
use std::io::{self, Read};

pub mod basic;
pub mod explicit;
pub mod implicit;

use self::basic::BasicDecoder;
pub use self::explicit::ExplicitVrDecoder;
pub use self::implicit::ImplicitVrDecoder;

/// Module-level error type:
/// for errors which may occur while decoding element headers.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Failed to read the beginning (tag) of the header"))]
    ReadHeaderTag {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the item header"))]
    ReadItemHeader {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's item length field"))]
    ReadItemLength {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's reserved bytes"))]
    ReadReserved {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's element length field"))]
    ReadLength {
        backtrace: Backtrace,
        source: io::Error,
    },
    #[snafu(display("Failed to read the header's value representation"))]
    ReadVr {
        backtrace: Backtrace,
        source: io::Error,
    },
    /// The two bytes where the value representation should be
    /// do not spell any known code.
    #[snafu(display("Unrecognized value representation {:02X?} in header of {}", bytes, tag))]
    UnrecognizedVr {
        tag: Tag,
        bytes: [u8; 2],
        backtrace: Backtrace,
    },
    #[snafu(display("Bad sequence item header"))]
    BadSequenceHeader { source: SequenceItemHeaderError },
}

impl Error {
    /// Whether the source ended in the middle of the header.
    pub fn is_truncated(&self) -> bool {
        match self {
            Error::ReadHeaderTag { source, .. }
            | Error::ReadItemHeader { source, .. }
            | Error::ReadItemLength { source, .. }
            | Error::ReadReserved { source, .. }
            | Error::ReadLength { source, .. }
            | Error::ReadVr { source, .. } => source.kind() == io::ErrorKind::UnexpectedEof,
            Error::UnrecognizedVr { .. } | Error::BadSequenceHeader { .. } => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/** Type trait for reading and decoding basic data values from a data source.
 *
 * This trait aims to provide methods for reading binary numbers based on the
 * source's endianness. There are only two possible implementations
 * (`LittleEndianBasicDecoder` and `BigEndianBasicDecoder`),
 * plus the run-time choice between them (`BasicDecoder`).
 */
pub trait BasicDecode {
    /// Retrieve the source's endianness, as expected by this decoder.
    fn endianness(&self) -> Endianness;

    /// Decode an unsigned short value from the given source.
    fn decode_us<S>(&self, source: S) -> io::Result<u16>
    where
        S: Read;

    /// Decode an unsigned long value from the given source.
    fn decode_ul<S>(&self, source: S) -> io::Result<u32>
    where
        S: Read;

    /// Decode an attribute tag from the given source.
    fn decode_tag<S>(&self, mut source: S) -> io::Result<Tag>
    where
        S: Read,
    {
        let g = self.decode_us(&mut source)?;
        let e = self.decode_us(source)?;
        Ok(Tag(g, e))
    }
}

/** Type trait for reading and decoding element headers.
 *
 * The specific behaviour of decoding depends on the transfer syntax:
 * whether the value representation is explicit, and the byte order.
 */
pub trait Decode {
    /** Fetch and decode the next data element header from the given source.
     * At the end of this operation, the source will be pointing at the
     * element's value data, which should be read or skipped as necessary.
     *
     * Headers in the item group (FFFE) are decoded with VR `UN`
     * in every transfer syntax.
     *
     * Returns the header and the exact number of bytes read from the source.
     */
    fn decode_header<S>(&self, source: &mut S) -> Result<(DataElementHeader, usize)>
    where
        S: ?Sized + Read;

    /** Fetch and decode the next sequence item header from the given source.
     * Item headers and delimiters never carry a value representation.
     */
    fn decode_item_header<S>(&self, source: &mut S) -> Result<SequenceItemHeader>
    where
        S: ?Sized + Read;
}

/// Decode the 8 bytes of an item header or delimiter
/// with the given basic decoder.
pub(crate) fn decode_item<B, S>(basic: &B, source: &mut S) -> Result<SequenceItemHeader>
where
    B: BasicDecode,
    S: ?Sized + Read,
{
    use snafu::ResultExt;

    let tag = basic
        .decode_tag(&mut *source)
        .context(ReadItemHeaderSnafu)?;
    let len = basic.decode_ul(&mut *source).context(ReadItemLengthSnafu)?;
    SequenceItemHeader::new(tag, dcmcodec_core::Length(len)).context(BadSequenceHeaderSnafu)
}

/// An element header decoder for any of the supported
/// combinations of VR explicitness and byte order, decided at run-time.
#[derive(Debug, Clone)]
pub enum ElementDecoder {
    Explicit(ExplicitVrDecoder<BasicDecoder>),
    Implicit(ImplicitVrDecoder<BasicDecoder>),
}

impl ElementDecoder {
    pub fn new(explicit_vr: bool, endianness: Endianness) -> Self {
        let basic = BasicDecoder::new(endianness);
        if explicit_vr {
            ElementDecoder::Explicit(ExplicitVrDecoder::new(basic))
        } else {
            ElementDecoder::Implicit(ImplicitVrDecoder::new(basic))
        }
    }

    /** Obtain a decoder for the file meta group,
     * which is always encoded in Explicit VR Little Endian.
     */
    pub fn file_meta() -> Self {
        ElementDecoder::new(true, Endianness::Little)
    }

    pub fn explicit_vr(&self) -> bool {
        matches!(self, ElementDecoder::Explicit(_))
    }

    pub fn endianness(&self) -> Endianness {
        match self {
            ElementDecoder::Explicit(d) => d.endianness(),
            ElementDecoder::Implicit(d) => d.endianness(),
        }
    }
}

impl Decode for ElementDecoder {
    fn decode_header<S>(&self, source: &mut S) -> Result<(DataElementHeader, usize)>
    where
        S: ?Sized + Read,
    {
        match self {
            ElementDecoder::Explicit(d) => d.decode_header(source),
            ElementDecoder::Implicit(d) => d.decode_header(source),
        }
    }

    fn decode_item_header<S>(&self, source: &mut S) -> Result<SequenceItemHeader>
    where
        S: ?Sized + Read,
    {
        match self {
            ElementDecoder::Explicit(d) => d.decode_item_header(source),
            ElementDecoder::Implicit(d) => d.decode_item_header(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmcodec_core::{Length, VR};
    use std::io::Cursor;

    #[test]
    fn runtime_decoder_selection() {
        // (0028,0010) US, length 2, in explicit VR big endian
        #[rustfmt::skip]
        const RAW: &[u8] = &[
            0x00, 0x28, 0x00, 0x10,
            b'U', b'S',
            0x00, 0x02,
        ];
        let decoder = ElementDecoder::new(true, Endianness::Big);
        assert!(decoder.explicit_vr());
        assert_eq!(decoder.endianness(), Endianness::Big);
        let (header, read) = decoder.decode_header(&mut Cursor::new(RAW)).unwrap();
        assert_eq!(header, DataElementHeader::new((0x0028, 0x0010), VR::US, Length(2)));
        assert_eq!(read, 8);
    }

    #[test]
    fn truncated_headers_are_flagged() {
        let decoder = ElementDecoder::new(false, Endianness::Little);
        let err = decoder
            .decode_header(&mut Cursor::new(&[0x08, 0x00, 0x16][..]))
            .unwrap_err();
        assert!(err.is_truncated());
    }
}
