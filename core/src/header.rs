//! Element header primitives: attribute tags, value representations
//! and value lengths, plus the headers read in front of each value.

use snafu::{Backtrace, Snafu};
use std::fmt;
use std::str::FromStr;

/// Error type for issues constructing a sequence item header.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum SequenceItemHeaderError {
    /// Only Item (FFFE,E000), Item Delimiter (FFFE,E00D)
    /// and Sequence Delimiter (FFFE,E0DD) are admitted.
    #[snafu(display("Unexpected item tag {}", tag))]
    UnexpectedTag { tag: Tag, backtrace: Backtrace },
    /// Delimiters must have a zero length.
    #[snafu(display("Unexpected delimiter length {}", len))]
    UnexpectedDelimiterLength { len: Length, backtrace: Backtrace },
}

/// Idiomatic alias for a tag's group number.
pub type GroupNumber = u16;
/// Idiomatic alias for a tag's element number.
pub type ElementNumber = u16;

/// A data element tag: a `(group, element)` pair.
///
/// Tags are ordered by group first and element second,
/// which is also the order in which elements are laid out in a stream.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy, Default)]
pub struct Tag(pub GroupNumber, pub ElementNumber);

impl Tag {
    /// Getter for the tag's group value.
    #[inline]
    pub fn group(self) -> GroupNumber {
        self.0
    }

    /// Getter for the tag's element value.
    #[inline]
    pub fn element(self) -> ElementNumber {
        self.1
    }

    /// Whether this is a group length tag `(gggg,0000)`.
    #[inline]
    pub fn is_group_length(self) -> bool {
        self.1 == 0
    }

    /// Whether this tag belongs to a private (odd) group.
    #[inline]
    pub fn is_private(self) -> bool {
        self.0 & 1 == 1
    }

    /// Whether this tag lives in the item/delimiter group `FFFE`,
    /// whose headers never carry a value representation.
    #[inline]
    pub fn is_item_group(self) -> bool {
        self.0 == 0xFFFE
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({:#06X}, {:#06X})", self.0, self.1)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

impl From<(u16, u16)> for Tag {
    #[inline]
    fn from((group, element): (u16, u16)) -> Tag {
        Tag(group, element)
    }
}

impl PartialEq<(u16, u16)> for Tag {
    fn eq(&self, other: &(u16, u16)) -> bool {
        self.0 == other.0 && self.1 == other.1
    }
}

/// A value length in bytes, as declared in an element or item header.
///
/// The internal value `0xFFFF_FFFF` is the undefined length sentinel,
/// used by sequences and encapsulated pixel data
/// whose extent is given by delimiters instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Length(pub u32);

impl Length {
    /// The undefined length sentinel.
    pub const UNDEFINED: Length = Length(0xFFFF_FFFF);

    /// Create a defined length.
    /// Passing `0xFFFF_FFFF` yields an undefined length.
    #[inline]
    pub const fn defined(len: u32) -> Length {
        Length(len)
    }

    #[inline]
    pub fn is_undefined(self) -> bool {
        self == Length::UNDEFINED
    }

    #[inline]
    pub fn is_defined(self) -> bool {
        !self.is_undefined()
    }

    /// The length in bytes, or `None` if undefined.
    #[inline]
    pub fn get(self) -> Option<u32> {
        if self.is_undefined() {
            None
        } else {
            Some(self.0)
        }
    }
}

impl fmt::Debug for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get() {
            Some(len) => write!(f, "Length({})", len),
            None => f.write_str("Length(Undefined)"),
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.get() {
            Some(len) => write!(f, "{}", len),
            None => f.write_str("U/L"),
        }
    }
}

/// A value representation: the two-character type code of an element.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
pub enum VR {
    /// Application Entity
    AE,
    /// Age String
    AS,
    /// Attribute Tag
    AT,
    /// Code String
    CS,
    /// Date
    DA,
    /// Decimal String
    DS,
    /// Date Time
    DT,
    /// Floating Point Single
    FL,
    /// Floating Point Double
    FD,
    /// Integer String
    IS,
    /// Long String
    LO,
    /// Long Text
    LT,
    /// Other Byte
    OB,
    /// Other Double
    OD,
    /// Other Float
    OF,
    /// Other Long
    OL,
    /// Other Very Long
    OV,
    /// Other Word
    OW,
    /// Person Name
    PN,
    /// Short String
    SH,
    /// Signed Long
    SL,
    /// Sequence of Items
    SQ,
    /// Signed Short
    SS,
    /// Short Text
    ST,
    /// Signed Very Long
    SV,
    /// Time
    TM,
    /// Unlimited Characters
    UC,
    /// Unique Identifier (UID)
    UI,
    /// Unsigned Long
    UL,
    /// Unknown
    UN,
    /// Universal Resource Identifier or Locator
    UR,
    /// Unsigned Short
    US,
    /// Unlimited Text
    UT,
    /// Unsigned Very Long
    UV,
}

const ALL_VRS: [VR; 34] = {
    use VR::*;
    [
        AE, AS, AT, CS, DA, DS, DT, FL, FD, IS, LO, LT, OB, OD, OF, OL, OV, OW, PN, SH, SL, SQ,
        SS, ST, SV, TM, UC, UI, UL, UN, UR, US, UT, UV,
    ]
};

impl VR {
    /// Obtain the value representation spelled by the two given bytes.
    /// Anything other than a known upper case code yields `None`.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        ALL_VRS.iter().copied().find(|vr| vr.to_bytes() == chars)
    }

    /// The two-character code of this VR.
    pub fn as_str(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OV => "OV",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            SV => "SV",
            TM => "TM",
            UC => "UC",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            UR => "UR",
            US => "US",
            UT => "UT",
            UV => "UV",
        }
    }

    /// The byte representation of this VR as it appears in explicit VR headers.
    pub fn to_bytes(self) -> [u8; 2] {
        let bytes = self.as_str().as_bytes();
        [bytes[0], bytes[1]]
    }

    /// Whether an explicit VR header of this type
    /// uses a 16-bit length right after the code (8 byte header).
    /// All other types carry two reserved bytes and a 32-bit length
    /// (12 byte header).
    pub fn has_short_length(self) -> bool {
        use VR::*;
        matches!(
            self,
            AE | AS
                | AT
                | CS
                | DA
                | DS
                | DT
                | FL
                | FD
                | IS
                | LO
                | LT
                | PN
                | SH
                | SL
                | SS
                | ST
                | TM
                | UI
                | UL
                | US
        )
    }

    /// The size of the unit which gets byte swapped
    /// when converting the value between byte orders.
    pub fn word_size(self) -> usize {
        use VR::*;
        match self {
            US | SS | OW | AT => 2,
            UL | SL | FL | OF | OL => 4,
            FD | OD | SV | UV | OV => 8,
            _ => 1,
        }
    }

    /// Whether values of this type are character strings.
    pub fn is_text(self) -> bool {
        use VR::*;
        matches!(
            self,
            AE | AS | CS | DA | DS | DT | IS | LO | LT | PN | SH | ST | TM | UC | UR | UT
        )
    }

    /// The byte used to pad an odd value to an even length.
    pub fn padding(self) -> u8 {
        if self.is_text() {
            b' '
        } else {
            0
        }
    }
}

impl FromStr for VR {
    type Err = &'static str;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let bytes = string.as_bytes();
        if bytes.len() != 2 {
            return Err("no such value representation");
        }
        VR::from_binary([bytes[0], bytes[1]]).ok_or("no such value representation")
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The header in front of a data element value.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct DataElementHeader {
    /// DICOM tag
    pub tag: Tag,
    /// Value Representation
    pub vr: VR,
    /// Element length
    pub len: Length,
}

impl DataElementHeader {
    #[inline]
    pub fn new<T: Into<Tag>>(tag: T, vr: VR, len: Length) -> DataElementHeader {
        DataElementHeader {
            tag: tag.into(),
            vr,
            len,
        }
    }

    /// Whether the header opens a nested item stream:
    /// a sequence, or an unknown element of undefined length.
    #[inline]
    pub fn is_sequence(&self) -> bool {
        self.vr == VR::SQ || (self.vr == VR::UN && self.len.is_undefined())
    }
}

/// The header found where a sequence item or a delimiter is expected.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SequenceItemHeader {
    /// An item, with its length (possibly undefined).
    Item { len: Length },
    /// End of an item of undefined length.
    ItemDelimiter,
    /// End of a sequence (or of encapsulated pixel data) of undefined length.
    SequenceDelimiter,
}

impl SequenceItemHeader {
    /// Classify an `FFFE` group header.
    pub fn new<T: Into<Tag>>(
        tag: T,
        len: Length,
    ) -> Result<SequenceItemHeader, SequenceItemHeaderError> {
        match tag.into() {
            Tag(0xFFFE, 0xE000) => Ok(SequenceItemHeader::Item { len }),
            Tag(0xFFFE, 0xE00D) | Tag(0xFFFE, 0xE0DD) if len != Length(0) => {
                UnexpectedDelimiterLengthSnafu { len }.fail()
            }
            Tag(0xFFFE, 0xE00D) => Ok(SequenceItemHeader::ItemDelimiter),
            Tag(0xFFFE, 0xE0DD) => Ok(SequenceItemHeader::SequenceDelimiter),
            tag => UnexpectedTagSnafu { tag }.fail(),
        }
    }

    pub fn tag(&self) -> Tag {
        match self {
            SequenceItemHeader::Item { .. } => Tag(0xFFFE, 0xE000),
            SequenceItemHeader::ItemDelimiter => Tag(0xFFFE, 0xE00D),
            SequenceItemHeader::SequenceDelimiter => Tag(0xFFFE, 0xE0DD),
        }
    }

    pub fn length(&self) -> Length {
        match self {
            SequenceItemHeader::Item { len } => *len,
            _ => Length(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_display_and_order() {
        assert_eq!(Tag(0x0028, 0x0010).to_string(), "(0028,0010)");
        assert!(Tag(0x0008, 0xFFFF) < Tag(0x0010, 0x0000));
        assert!(Tag(0x0010, 0x0010) < Tag(0x0010, 0x0020));
        assert!(Tag(0x0009, 0x0000).is_group_length());
        assert!(Tag(0x0009, 0x0010).is_private());
    }

    #[test]
    fn length_sentinel() {
        assert!(Length::UNDEFINED.is_undefined());
        assert_eq!(Length::UNDEFINED.get(), None);
        assert_eq!(Length(12).get(), Some(12));
        assert_eq!(Length::UNDEFINED.to_string(), "U/L");
        assert_eq!(format!("{:?}", Length(4)), "Length(4)");
    }

    #[test]
    fn vr_codes() {
        assert_eq!(VR::from_binary(*b"OW"), Some(VR::OW));
        assert_eq!(VR::from_binary(*b"ow"), None);
        assert_eq!(VR::from_binary([0x04, 0x00]), None);
        assert_eq!("SQ".parse::<VR>(), Ok(VR::SQ));
        assert!("SQX".parse::<VR>().is_err());
        for vr in ALL_VRS.iter() {
            assert_eq!(VR::from_binary(vr.to_bytes()), Some(*vr));
        }
    }

    #[test]
    fn vr_length_class() {
        let short: Vec<_> = ALL_VRS.iter().filter(|vr| vr.has_short_length()).collect();
        assert_eq!(short.len(), 21);
        assert!(!VR::OB.has_short_length());
        assert!(!VR::UT.has_short_length());
        assert!(!VR::SV.has_short_length());
        assert!(VR::US.has_short_length());
    }

    #[test]
    fn vr_padding() {
        assert_eq!(VR::UI.padding(), 0);
        assert_eq!(VR::CS.padding(), b' ');
        assert_eq!(VR::OB.padding(), 0);
        assert_eq!(VR::OW.word_size(), 2);
        assert_eq!(VR::FD.word_size(), 8);
        assert_eq!(VR::OB.word_size(), 1);
    }

    #[test]
    fn item_headers() {
        assert_eq!(
            SequenceItemHeader::new(Tag(0xFFFE, 0xE000), Length(10)).unwrap(),
            SequenceItemHeader::Item { len: Length(10) }
        );
        assert_eq!(
            SequenceItemHeader::new(Tag(0xFFFE, 0xE0DD), Length(0)).unwrap(),
            SequenceItemHeader::SequenceDelimiter
        );
        assert!(SequenceItemHeader::new(Tag(0xFFFE, 0xE00D), Length(2)).is_err());
        assert!(SequenceItemHeader::new(Tag(0x0008, 0x0016), Length(0)).is_err());
    }
}
