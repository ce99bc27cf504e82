//! Implicit VR element header decoding, in either byte order.
//!
//! The value representation of each element is resolved
//! with a data dictionary, `UN` for unknown attributes.

use crate::decode::basic::BasicDecoder;
use crate::decode::{
    decode_item, BasicDecode, Decode, ReadHeaderTagSnafu, ReadLengthSnafu, Result,
};
use byteordered::Endianness;
use dcmcodec_core::dictionary::{DataDictionary, StandardDataDictionary};
use dcmcodec_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmcodec_core::VR;
use snafu::ResultExt;
use std::fmt;
use std::io::Read;

/// A header decoder for implicit VR transfer syntaxes.
#[derive(Clone)]
pub struct ImplicitVrDecoder<B = BasicDecoder, D = StandardDataDictionary> {
    basic: B,
    dict: D,
}

impl<B: fmt::Debug, D> fmt::Debug for ImplicitVrDecoder<B, D> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ImplicitVrDecoder")
            .field("basic", &self.basic)
            .field("dict", &"«omitted»")
            .finish()
    }
}

impl<B: BasicDecode> ImplicitVrDecoder<B> {
    /// Create a decoder using the built-in dictionary.
    pub fn new(basic: B) -> Self {
        ImplicitVrDecoder {
            basic,
            dict: StandardDataDictionary,
        }
    }
}

impl<B: BasicDecode, D: DataDictionary> ImplicitVrDecoder<B, D> {
    /// Create a decoder using the given dictionary.
    pub fn with_dict(basic: B, dict: D) -> Self {
        ImplicitVrDecoder { basic, dict }
    }

    pub fn endianness(&self) -> Endianness {
        self.basic.endianness()
    }

    pub fn dictionary(&self) -> &D {
        &self.dict
    }
}

impl<B: BasicDecode, D: DataDictionary> Decode for ImplicitVrDecoder<B, D> {
    fn decode_header<S>(&self, source: &mut S) -> Result<(DataElementHeader, usize)>
    where
        S: ?Sized + Read,
    {
        let tag = self
            .basic
            .decode_tag(&mut *source)
            .context(ReadHeaderTagSnafu)?;
        let len = self
            .basic
            .decode_ul(&mut *source)
            .context(ReadLengthSnafu)?;

        let vr = if tag.is_item_group() {
            VR::UN
        } else {
            self.dict.vr_of(tag)
        };
        Ok((DataElementHeader::new(tag, vr, Length(len)), 8))
    }

    fn decode_item_header<S>(&self, source: &mut S) -> Result<SequenceItemHeader>
    where
        S: ?Sized + Read,
    {
        decode_item(&self.basic, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::basic::{BigEndianBasicDecoder, LittleEndianBasicDecoder};
    use dcmcodec_core::Tag;
    use std::io::{Cursor, Read};

    //  Tag: (0002,0002) Media Storage SOP Class UID
    //  Length: 26
    //  Value: "1.2.840.10008.5.1.4.1.1.1\0"
    // --
    //  Tag: (0002,0010) Transfer Syntax UID
    //  Length: 20
    //  Value: "1.2.840.10008.1.2.1\0" == ExplicitVRLittleEndian
    // --
    #[rustfmt::skip]
    const RAW: &[u8] = &[
        0x02, 0x00, 0x02, 0x00,
            0x1a, 0x00, 0x00, 0x00,
            b'1', b'.', b'2', b'.', b'8', b'4', b'0', b'.', b'1', b'0', b'0', b'0', b'8', b'.',
            b'5', b'.', b'1', b'.', b'4', b'.', b'1', b'.', b'1', b'.', b'1', 0x00,
        0x02, 0x00, 0x10, 0x00,
            0x14, 0x00, 0x00, 0x00,
            b'1', b'.', b'2', b'.', b'8', b'4', b'0', b'.', b'1', b'0', b'0', b'0', b'8', b'.',
            b'1', b'.', b'2', b'.', b'1', 0x00,
    ];

    #[test]
    fn implicit_vr_le() {
        let reader = ImplicitVrDecoder::new(LittleEndianBasicDecoder);
        let mut cursor = Cursor::new(RAW.as_ref());
        {
            let (elem, bytes_read) = reader
                .decode_header(&mut cursor)
                .expect("should find an element");
            assert_eq!(elem.tag, Tag(0x0002, 0x0002));
            assert_eq!(elem.vr, VR::UI);
            assert_eq!(elem.len, Length(26));
            assert_eq!(bytes_read, 8);
            let mut value = vec![0; 26];
            cursor.read_exact(&mut value).unwrap();
        }
        {
            let (elem, _) = reader
                .decode_header(&mut cursor)
                .expect("should find an element");
            assert_eq!(elem.tag, Tag(0x0002, 0x0010));
            assert_eq!(elem.vr, VR::UI);
            assert_eq!(elem.len, Length(20));
        }
    }

    #[test]
    fn unknown_attributes_are_un() {
        #[rustfmt::skip]
        const RAW: &[u8] = &[
            // private element (0029,1010), big endian, length 4
            0x00, 0x29, 0x10, 0x10,
            0x00, 0x00, 0x00, 0x04,
        ];
        let reader = ImplicitVrDecoder::new(BigEndianBasicDecoder);
        let (elem, _) = reader.decode_header(&mut Cursor::new(RAW)).unwrap();
        assert_eq!(elem.tag, Tag(0x0029, 0x1010));
        assert_eq!(elem.vr, VR::UN);
        assert_eq!(elem.len, Length(4));
    }

    #[test]
    fn item_group_has_no_vr() {
        #[rustfmt::skip]
        const RAW: &[u8] = &[
            0xFE, 0xFF, 0x00, 0xE0,
            0x0A, 0x00, 0x00, 0x00,
        ];
        let reader = ImplicitVrDecoder::new(LittleEndianBasicDecoder);
        let (elem, _) = reader.decode_header(&mut Cursor::new(RAW)).unwrap();
        assert_eq!(elem.vr, VR::UN);
        assert_eq!(
            reader.decode_item_header(&mut Cursor::new(RAW)).unwrap(),
            SequenceItemHeader::Item { len: Length(10) }
        );
    }
}
