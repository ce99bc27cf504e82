//! Utility module for fetching key image attributes from a data set.

use dcmcodec_core::dataset::Error as DataSetError;
use dcmcodec_core::{tags, DataSet, Tag};
use dcmcodec_parser::ErrorKind;
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum GetAttributeError {
    #[snafu(display("Missing required attribute `{}`", name))]
    MissingRequiredField {
        name: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not read attribute `{}`", name))]
    ReadValue {
        name: &'static str,
        #[snafu(backtrace)]
        source: DataSetError,
    },
}

impl GetAttributeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GetAttributeError::ReadValue {
                source: DataSetError::LoadValue { .. },
                ..
            } => ErrorKind::Io,
            _ => ErrorKind::Corrupted,
        }
    }
}

pub type Result<T, E = GetAttributeError> = std::result::Result<T, E>;

fn retrieve_optional_u32(ds: &DataSet, tag: Tag, name: &'static str) -> Result<Option<u32>> {
    ds.uint(tag).context(ReadValueSnafu { name })
}

fn retrieve_required_u32(ds: &DataSet, tag: Tag, name: &'static str) -> Result<u32> {
    retrieve_optional_u32(ds, tag, name)?.context(MissingRequiredFieldSnafu { name })
}

/// Get the Columns from the data set, or 0 when absent
pub fn cols(ds: &DataSet) -> Result<u32> {
    Ok(retrieve_optional_u32(ds, tags::COLUMNS, "Columns")?.unwrap_or(0))
}

/// Get the Rows from the data set, or 0 when absent
pub fn rows(ds: &DataSet) -> Result<u32> {
    Ok(retrieve_optional_u32(ds, tags::ROWS, "Rows")?.unwrap_or(0))
}

/// Get the SamplesPerPixel from the data set, or 0 when absent
pub fn samples_per_pixel(ds: &DataSet) -> Result<u32> {
    Ok(retrieve_optional_u32(ds, tags::SAMPLES_PER_PIXEL, "SamplesPerPixel")?.unwrap_or(0))
}

/// Get the PhotometricInterpretation from the data set,
/// or `None` when it is absent or empty
pub fn photometric_interpretation(ds: &DataSet) -> Result<Option<String>> {
    let value = ds
        .string(tags::PHOTOMETRIC_INTERPRETATION)
        .context(ReadValueSnafu {
            name: "PhotometricInterpretation",
        })?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Get the PlanarConfiguration from the data set, returning 0 by default
pub fn planar_configuration(ds: &DataSet) -> Result<u32> {
    Ok(
        retrieve_optional_u32(ds, tags::PLANAR_CONFIGURATION, "PlanarConfiguration")?
            .unwrap_or(0),
    )
}

/// Get the BitsAllocated from the data set
pub fn bits_allocated(ds: &DataSet) -> Result<u32> {
    retrieve_required_u32(ds, tags::BITS_ALLOCATED, "BitsAllocated")
}

/// Get the BitsStored from the data set
pub fn bits_stored(ds: &DataSet) -> Result<Option<u32>> {
    retrieve_optional_u32(ds, tags::BITS_STORED, "BitsStored")
}

/// Get the HighBit from the data set
pub fn high_bit(ds: &DataSet) -> Result<Option<u32>> {
    retrieve_optional_u32(ds, tags::HIGH_BIT, "HighBit")
}

/// Get the PixelRepresentation from the data set, returning 0 by default
pub fn pixel_representation(ds: &DataSet) -> Result<u32> {
    Ok(
        retrieve_optional_u32(ds, tags::PIXEL_REPRESENTATION, "PixelRepresentation")?
            .unwrap_or(0),
    )
}

/// Get the NumberOfFrames from the data set, returning 1 by default
pub fn number_of_frames(ds: &DataSet) -> Result<u32> {
    Ok(retrieve_optional_u32(ds, tags::NUMBER_OF_FRAMES, "NumberOfFrames")?.unwrap_or(1))
}

/// Get the TransferSyntaxUID from the data set
pub fn transfer_syntax_uid(ds: &DataSet) -> Result<Option<String>> {
    ds.string(tags::TRANSFER_SYNTAX_UID)
        .context(ReadValueSnafu {
            name: "TransferSyntaxUID",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmcodec_core::{DataElement, VR};

    #[test]
    fn defaults_for_absent_attributes() {
        let ds = DataSet::new();
        assert_eq!(rows(&ds).unwrap(), 0);
        assert_eq!(samples_per_pixel(&ds).unwrap(), 0);
        assert_eq!(planar_configuration(&ds).unwrap(), 0);
        assert_eq!(number_of_frames(&ds).unwrap(), 1);
        assert_eq!(photometric_interpretation(&ds).unwrap(), None);
        let err = bits_allocated(&ds).unwrap_err();
        assert!(matches!(
            err,
            GetAttributeError::MissingRequiredField {
                name: "BitsAllocated",
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Corrupted);
    }

    #[test]
    fn values_are_read() {
        let mut ds = DataSet::new();
        ds.set_uint(tags::ROWS, VR::US, 512).unwrap();
        ds.set_uint(tags::NUMBER_OF_FRAMES, VR::IS, 12).unwrap();
        ds.set_string(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "RGB ");
        assert_eq!(rows(&ds).unwrap(), 512);
        assert_eq!(number_of_frames(&ds).unwrap(), 12);
        assert_eq!(photometric_interpretation(&ds).unwrap().as_deref(), Some("RGB"));

        ds.put(tags::HIGH_BIT, DataElement::new(VR::US, Vec::new()));
        assert_eq!(high_bit(&ds).unwrap(), None);
        ds.put(tags::COLUMNS, DataElement::new(VR::IS, b"abc ".to_vec()));
        assert!(matches!(
            cols(&ds),
            Err(GetAttributeError::ReadValue { name: "Columns", .. })
        ));
    }
}
