//! The attribute dictionary consulted when decoding implicit VR streams,
//! where element headers do not carry their value representation.
//!
//! [`StandardDataDictionary`] is backed by the registry of
//! [`dicom_dictionary_std`], with its entries adapted to this crate's
//! [`Tag`] and [`VR`] types.

use crate::header::{Tag, VR};
use dicom_core::dictionary::{DataDictionary as _, DataDictionaryEntryRef};
use std::fmt::{self, Debug};

/// An attribute known to a dictionary.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DictionaryEntry {
    /// The attribute tag.
    /// For repeating groups, the varying part of the tag is zero.
    pub tag: Tag,
    /// The alias of the attribute, with no spaces, in UpperCamelCase
    pub alias: &'static str,
    /// The typical value representation of the attribute
    pub vr: VR,
}

impl DictionaryEntry {
    /// Adapt an entry of the standard registry.
    ///
    /// Context dependent representations resolve to their relaxed form
    /// (`US` for `xs`, `OW` for pixel data, overlay data and LUT data).
    fn from_registry(entry: &DataDictionaryEntryRef<'static>) -> Option<Self> {
        let inner = entry.tag.inner();
        let vr = VR::from_binary(entry.vr.relaxed().to_bytes())?;
        Some(DictionaryEntry {
            tag: Tag(inner.group(), inner.element()),
            alias: entry.alias,
            vr,
        })
    }
}

/** Type trait for a dictionary of DICOM attributes.
 *
 * The methods herein have no generic parameters, so as to enable being
 * used as a trait object.
 */
pub trait DataDictionary: Debug {
    /// Fetch an entry by its alias (e.g. "PatientName").
    fn by_name(&self, name: &str) -> Option<DictionaryEntry>;

    /// Fetch an entry by its tag.
    fn by_tag(&self, tag: Tag) -> Option<DictionaryEntry>;

    /// The value representation to assume for the given tag,
    /// `UN` if the attribute is not known.
    fn vr_of(&self, tag: Tag) -> VR {
        self.by_tag(tag).map(|e| e.vr).unwrap_or(VR::UN)
    }
}

static REGISTRY: dicom_dictionary_std::StandardDataDictionary =
    dicom_dictionary_std::StandardDataDictionary;

/// The built-in dictionary, covering every attribute of the standard
/// registry.
///
/// Repeating groups (such as overlays, `60xx`),
/// group length elements and private creator elements are resolved too.
/// The index is initialized upon first use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StandardDataDictionary;

impl DataDictionary for StandardDataDictionary {
    fn by_name(&self, name: &str) -> Option<DictionaryEntry> {
        REGISTRY
            .by_name(name)
            .and_then(DictionaryEntry::from_registry)
    }

    fn by_tag(&self, tag: Tag) -> Option<DictionaryEntry> {
        REGISTRY
            .by_tag(dicom_core::Tag(tag.group(), tag.element()))
            .and_then(DictionaryEntry::from_registry)
    }
}

impl fmt::Display for StandardDataDictionary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Standard DICOM Data Dictionary")
    }
}
