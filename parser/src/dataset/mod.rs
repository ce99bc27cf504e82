//! Reading and writing of whole data sets over a byte stream.
//!
//! [`read::parse_stream`] turns a run of encoded elements into a [`DataSet`],
//! descending into sequence items and encapsulated pixel data.
//! [`write::build_stream`] does the inverse,
//! first measuring every element and then writing them in tag order.
//!
//! [`DataSet`]: dcmcodec_core::DataSet

use dcmcodec_encoding::{Endianness, TransferSyntax};
use std::fmt;

pub mod read;
pub mod write;

pub use self::read::{parse_stream, Parsed};
pub use self::write::{build_stream, BuildOptions};

/// The maximum nesting depth of sequence items.
/// The root data set is at depth 0.
pub const MAX_DEPTH: u32 = 16;

/// How element headers are decoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ReadMode {
    pub explicit_vr: bool,
    pub endianness: Endianness,
}

/// How element headers are encoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct WriteMode {
    pub explicit_vr: bool,
    pub endianness: Endianness,
}

impl ReadMode {
    pub const IMPLICIT_VR_LITTLE_ENDIAN: ReadMode = ReadMode {
        explicit_vr: false,
        endianness: Endianness::Little,
    };

    pub const EXPLICIT_VR_LITTLE_ENDIAN: ReadMode = ReadMode {
        explicit_vr: true,
        endianness: Endianness::Little,
    };

    pub const EXPLICIT_VR_BIG_ENDIAN: ReadMode = ReadMode {
        explicit_vr: true,
        endianness: Endianness::Big,
    };

    /// The same mode with the other byte order.
    pub fn swapped(self) -> ReadMode {
        let endianness = match self.endianness {
            Endianness::Little => Endianness::Big,
            Endianness::Big => Endianness::Little,
        };
        ReadMode { endianness, ..self }
    }
}

impl From<&TransferSyntax> for ReadMode {
    fn from(ts: &TransferSyntax) -> Self {
        ReadMode {
            explicit_vr: ts.explicit_vr(),
            endianness: ts.endianness(),
        }
    }
}

impl From<&TransferSyntax> for WriteMode {
    fn from(ts: &TransferSyntax) -> Self {
        WriteMode {
            explicit_vr: ts.explicit_vr(),
            endianness: ts.endianness(),
        }
    }
}

impl From<ReadMode> for WriteMode {
    fn from(mode: ReadMode) -> Self {
        WriteMode {
            explicit_vr: mode.explicit_vr,
            endianness: mode.endianness,
        }
    }
}

fn describe(f: &mut fmt::Formatter, explicit_vr: bool, endianness: Endianness) -> fmt::Result {
    let vr = if explicit_vr { "explicit" } else { "implicit" };
    let order = match endianness {
        Endianness::Little => "little",
        Endianness::Big => "big",
    };
    write!(f, "{} VR {} endian", vr, order)
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        describe(f, self.explicit_vr, self.endianness)
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        describe(f, self.explicit_vr, self.endianness)
    }
}
