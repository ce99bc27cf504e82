//! Implicit VR element header encoding, in either byte order.

use crate::encode::basic::BasicEncoder;
use crate::encode::{
    write_item_delimiter, write_item_header, write_sequence_delimiter, BasicEncode, Encode,
    Result, WriteHeaderSnafu, WriteTagSnafu,
};
use byteordered::Endianness;
use dcmcodec_core::header::DataElementHeader;
use dcmcodec_core::Tag;
use snafu::ResultExt;
use std::io::Write;

/// A header encoder for implicit VR transfer syntaxes.
/// Every header is the tag followed by a 32-bit length.
#[derive(Debug, Default, Clone)]
pub struct ImplicitVrEncoder<B = BasicEncoder> {
    basic: B,
}

impl<B: BasicEncode> ImplicitVrEncoder<B> {
    pub fn new(basic: B) -> Self {
        ImplicitVrEncoder { basic }
    }

    pub fn endianness(&self) -> Endianness {
        self.basic.endianness()
    }
}

impl<B: BasicEncode> Encode for ImplicitVrEncoder<B> {
    fn encode_tag<W>(&self, to: W, tag: Tag) -> Result<()>
    where
        W: Write,
    {
        self.basic.encode_tag(to, tag).context(WriteTagSnafu)
    }

    fn encode_element_header<W>(&self, mut to: W, de: DataElementHeader) -> Result<usize>
    where
        W: Write,
    {
        let mut buf = Vec::with_capacity(8);
        self.basic
            .encode_tag(&mut buf, de.tag)
            .context(WriteHeaderSnafu)?;
        self.basic
            .encode_ul(&mut buf, de.len.0)
            .context(WriteHeaderSnafu)?;
        to.write_all(&buf).context(WriteHeaderSnafu)?;
        Ok(8)
    }

    fn encode_item_header<W>(&self, to: W, len: u32) -> Result<()>
    where
        W: Write,
    {
        write_item_header(&self.basic, to, len)
    }

    fn encode_item_delimiter<W>(&self, to: W) -> Result<()>
    where
        W: Write,
    {
        write_item_delimiter(&self.basic, to)
    }

    fn encode_sequence_delimiter<W>(&self, to: W) -> Result<()>
    where
        W: Write,
    {
        write_sequence_delimiter(&self.basic, to)
    }
}
