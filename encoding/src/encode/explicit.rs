//! Explicit VR element header encoding, in either byte order.

use crate::encode::basic::{BasicEncoder, LittleEndianBasicEncoder};
use crate::encode::{
    write_item_delimiter, write_item_header, write_sequence_delimiter, BasicEncode, Encode,
    Result, ShortLengthOverflowSnafu, WriteHeaderSnafu, WriteTagSnafu,
};
use byteordered::Endianness;
use dcmcodec_core::header::DataElementHeader;
use dcmcodec_core::Tag;
use snafu::{ensure, ResultExt};
use std::io::Write;

/// A header encoder for explicit VR transfer syntaxes.
#[derive(Debug, Default, Clone)]
pub struct ExplicitVrEncoder<B = BasicEncoder> {
    basic: B,
}

/// The file meta group encoder.
pub type ExplicitVrLittleEndianEncoder = ExplicitVrEncoder<LittleEndianBasicEncoder>;

impl<B: BasicEncode> ExplicitVrEncoder<B> {
    pub fn new(basic: B) -> Self {
        ExplicitVrEncoder { basic }
    }

    pub fn endianness(&self) -> Endianness {
        self.basic.endianness()
    }
}

impl<B: BasicEncode> Encode for ExplicitVrEncoder<B> {
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
        let mut buf = Vec::with_capacity(12);
        self.basic
            .encode_tag(&mut buf, de.tag)
            .context(WriteHeaderSnafu)?;

        if de.tag.is_item_group() {
            self.basic
                .encode_ul(&mut buf, de.len.0)
                .context(WriteHeaderSnafu)?;
        } else {
            buf.extend_from_slice(&de.vr.to_bytes());
            if de.vr.has_short_length() {
                ensure!(
                    de.len.0 <= u32::from(u16::MAX),
                    ShortLengthOverflowSnafu {
                        tag: de.tag,
                        vr: de.vr,
                        len: de.len,
                    }
                );
                self.basic
                    .encode_us(&mut buf, de.len.0 as u16)
                    .context(WriteHeaderSnafu)?;
            } else {
                buf.extend_from_slice(&[0, 0]);
                self.basic
                    .encode_ul(&mut buf, de.len.0)
                    .context(WriteHeaderSnafu)?;
            }
        }

        to.write_all(&buf).context(WriteHeaderSnafu)?;
        Ok(buf.len())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::basic::BigEndianBasicEncoder;
    use crate::encode::Error;
    use dcmcodec_core::{Length, VR};

    #[test]
    fn encode_short_and_long_headers() {
        let enc = ExplicitVrLittleEndianEncoder::default();
        let mut out = Vec::new();
        let n = enc
            .encode_element_header(
                &mut out,
                DataElementHeader::new((0x0002, 0x0010), VR::UI, Length(20)),
            )
            .unwrap();
        assert_eq!(n, 8);
        let n = enc
            .encode_element_header(
                &mut out,
                DataElementHeader::new((0x7FE0, 0x0010), VR::OB, Length::UNDEFINED),
            )
            .unwrap();
        assert_eq!(n, 12);

        #[rustfmt::skip]
        assert_eq!(out, vec![
            0x02, 0x00, 0x10, 0x00, b'U', b'I', 0x14, 0x00,
            0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        ]);
    }

    #[test]
    fn encode_items_big_endian() {
        let enc = ExplicitVrEncoder::new(BigEndianBasicEncoder);
        let mut out = Vec::new();
        enc.encode_item_header(&mut out, 6).unwrap();
        enc.encode_item_delimiter(&mut out).unwrap();
        enc.encode_sequence_delimiter(&mut out).unwrap();

        #[rustfmt::skip]
        assert_eq!(out, vec![
            0xFF, 0xFE, 0xE0, 0x00, 0x00, 0x00, 0x00, 0x06,
            0xFF, 0xFE, 0xE0, 0x0D, 0x00, 0x00, 0x00, 0x00,
            0xFF, 0xFE, 0xE0, 0xDD, 0x00, 0x00, 0x00, 0x00,
        ]);
    }

    #[test]
    fn short_length_overflow() {
        let enc = ExplicitVrLittleEndianEncoder::default();
        let mut out = Vec::new();
        let res = enc.encode_element_header(
            &mut out,
            DataElementHeader::new((0x0010, 0x0010), VR::PN, Length(0x1_0000)),
        );
        assert!(matches!(res, Err(Error::ShortLengthOverflow { .. })));
        assert!(out.is_empty());
    }
}
