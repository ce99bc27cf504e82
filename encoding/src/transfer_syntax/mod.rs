//! Transfer syntax specifiers and the registry of known transfer syntaxes.
//!
//! A [`TransferSyntax`] states how a data set is laid out on the wire:
//! its byte order, whether value representations are explicit,
//! and how pixel data is stored.
//! Specifiers are looked up by UID with [`get`].

use byteordered::Endianness;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

pub mod entries;

/// The pixel data storage scheme of a transfer syntax.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Native pixel data, a single contiguous value.
    None,
    /// Encapsulated pixel data compressed with RLE Lossless,
    /// which this library encodes and decodes.
    Rle,
    /// Encapsulated pixel data in a compressed format
    /// without a pixel codec in this library.
    /// The data set itself can still be read and written.
    Encapsulated,
    /// The data set itself is encoded in a way that is not supported
    /// (e.g. deflated).
    Unsupported,
}

impl Codec {
    /// Whether pixel data is stored as a sequence of fragments.
    pub fn is_encapsulated(self) -> bool {
        matches!(self, Codec::Rle | Codec::Encapsulated)
    }

    /// Whether a data set in this transfer syntax can be parsed and built.
    pub fn is_supported(self) -> bool {
        self != Codec::Unsupported
    }
}

/// A DICOM transfer syntax specifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TransferSyntax {
    /// The unique identifier of the transfer syntax.
    uid: &'static str,
    /// The name of the transfer syntax.
    name: &'static str,
    /// The byte order of data.
    byte_order: Endianness,
    /// Whether the transfer syntax mandates an explicit value representation,
    /// or the VR is implicit.
    explicit_vr: bool,
    /// How pixel data is stored.
    codec: Codec,
}

impl TransferSyntax {
    pub const fn new(
        uid: &'static str,
        name: &'static str,
        byte_order: Endianness,
        explicit_vr: bool,
        codec: Codec,
    ) -> Self {
        TransferSyntax {
            uid,
            name,
            byte_order,
            explicit_vr,
            codec,
        }
    }

    /// Create an explicit VR little endian transfer syntax.
    pub const fn new_ele(uid: &'static str, name: &'static str, codec: Codec) -> Self {
        TransferSyntax::new(uid, name, Endianness::Little, true, codec)
    }

    /// Obtain this transfer syntax' unique identifier.
    pub const fn uid(&self) -> &'static str {
        self.uid
    }

    /// Obtain the name of this transfer syntax.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Obtain this transfer syntax' expected endianness.
    pub const fn endianness(&self) -> Endianness {
        self.byte_order
    }

    /// Check whether this transfer syntax expects data sets
    /// with explicit value representations.
    pub const fn explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    pub const fn codec(&self) -> Codec {
        self.codec
    }

    /// Whether pixel data must be encapsulated in this transfer syntax.
    pub fn is_encapsulated(&self) -> bool {
        self.codec.is_encapsulated()
    }

    /// Whether data sets in this transfer syntax can be read and written.
    pub fn is_supported(&self) -> bool {
        self.codec.is_supported()
    }
}

impl fmt::Display for TransferSyntax {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.uid)
    }
}

lazy_static! {
    static ref REGISTRY: HashMap<&'static str, TransferSyntax> = {
        entries::ALL.iter().map(|ts| (ts.uid(), *ts)).collect()
    };
}

/// Obtain a transfer syntax specifier by UID.
///
/// Trailing padding (NUL or space) in `uid` is ignored.
pub fn get(uid: &str) -> Option<&'static TransferSyntax> {
    let uid = uid.trim_end_matches(|c: char| c == '\0' || c == ' ');
    REGISTRY.get(uid)
}

/// Iterate over all known transfer syntaxes.
pub fn iter() -> impl Iterator<Item = &'static TransferSyntax> {
    entries::ALL.iter()
}

/// The default transfer syntax of DICOM,
/// used when none is declared.
pub fn default() -> TransferSyntax {
    entries::IMPLICIT_VR_LITTLE_ENDIAN
}
