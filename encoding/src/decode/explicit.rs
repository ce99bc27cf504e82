//! Explicit VR element header decoding, in either byte order.

use crate::decode::basic::{BasicDecoder, LittleEndianBasicDecoder};
use crate::decode::{
    decode_item, BasicDecode, Decode, ReadHeaderTagSnafu, ReadItemLengthSnafu, ReadLengthSnafu,
    ReadReservedSnafu, ReadVrSnafu, Result, UnrecognizedVrSnafu,
};
use byteordered::Endianness;
use dcmcodec_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmcodec_core::VR;
use snafu::{OptionExt, ResultExt};
use std::io::Read;

/// A header decoder for explicit VR transfer syntaxes.
#[derive(Debug, Default, Clone)]
pub struct ExplicitVrDecoder<B = BasicDecoder> {
    basic: B,
}

/// The file meta group decoder.
pub type ExplicitVrLittleEndianDecoder = ExplicitVrDecoder<LittleEndianBasicDecoder>;

impl<B: BasicDecode> ExplicitVrDecoder<B> {
    pub fn new(basic: B) -> Self {
        ExplicitVrDecoder { basic }
    }

    pub fn endianness(&self) -> Endianness {
        self.basic.endianness()
    }
}

impl<B: BasicDecode> Decode for ExplicitVrDecoder<B> {
    fn decode_header<S>(&self, source: &mut S) -> Result<(DataElementHeader, usize)>
    where
        S: ?Sized + Read,
    {
        let tag = self
            .basic
            .decode_tag(&mut *source)
            .context(ReadHeaderTagSnafu)?;

        if tag.is_item_group() {
            // item headers and delimiters have no VR
            let len = self
                .basic
                .decode_ul(&mut *source)
                .context(ReadItemLengthSnafu)?;
            return Ok((DataElementHeader::new(tag, VR::UN, Length(len)), 8));
        }

        let mut buf = [0u8; 2];
        source.read_exact(&mut buf).context(ReadVrSnafu)?;
        let vr = VR::from_binary(buf).context(UnrecognizedVrSnafu { tag, bytes: buf })?;

        if vr.has_short_length() {
            let len = self
                .basic
                .decode_us(&mut *source)
                .context(ReadLengthSnafu)?;
            Ok((DataElementHeader::new(tag, vr, Length(u32::from(len))), 8))
        } else {
            // 2 reserved bytes, then a 32-bit length
            let mut reserved = [0u8; 2];
            source
                .read_exact(&mut reserved)
                .context(ReadReservedSnafu)?;
            let len = self
                .basic
                .decode_ul(&mut *source)
                .context(ReadLengthSnafu)?;
            Ok((DataElementHeader::new(tag, vr, Length(len)), 12))
        }
    }

    fn decode_item_header<S>(&self, source: &mut S) -> Result<SequenceItemHeader>
    where
        S: ?Sized + Read,
    {
        decode_item(&self.basic, source)
    }
}
