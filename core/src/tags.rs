//! Constants for the attribute tags handled by the codec.

use crate::header::Tag;

/// FileMetaInformationGroupLength (0002,0000) UL
pub const FILE_META_INFORMATION_GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
/// FileMetaInformationVersion (0002,0001) OB
pub const FILE_META_INFORMATION_VERSION: Tag = Tag(0x0002, 0x0001);
/// MediaStorageSOPClassUID (0002,0002) UI
pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
/// MediaStorageSOPInstanceUID (0002,0003) UI
pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
/// TransferSyntaxUID (0002,0010) UI
pub const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
/// ImplementationClassUID (0002,0012) UI
pub const IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
/// ImplementationVersionName (0002,0013) SH
pub const IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);

/// SOPClassUID (0008,0016) UI
pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
/// SOPInstanceUID (0008,0018) UI
pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
/// Modality (0008,0060) CS
pub const MODALITY: Tag = Tag(0x0008, 0x0060);
/// ReferencedImageSequence (0008,1140) SQ
pub const REFERENCED_IMAGE_SEQUENCE: Tag = Tag(0x0008, 0x1140);
/// PatientName (0010,0010) PN
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);

/// SamplesPerPixel (0028,0002) US
pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
/// PhotometricInterpretation (0028,0004) CS
pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
/// PlanarConfiguration (0028,0006) US
pub const PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
/// NumberOfFrames (0028,0008) IS
pub const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
/// Rows (0028,0010) US
pub const ROWS: Tag = Tag(0x0028, 0x0010);
/// Columns (0028,0011) US
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
/// BitsAllocated (0028,0100) US
pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
/// BitsStored (0028,0101) US
pub const BITS_STORED: Tag = Tag(0x0028, 0x0101);
/// HighBit (0028,0102) US
pub const HIGH_BIT: Tag = Tag(0x0028, 0x0102);
/// PixelRepresentation (0028,0103) US
pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);

/// PixelData (7FE0,0010) OB or OW
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

/// Item (FFFE,E000)
pub const ITEM: Tag = Tag(0xFFFE, 0xE000);
/// ItemDelimitationItem (FFFE,E00D)
pub const ITEM_DELIMITATION_ITEM: Tag = Tag(0xFFFE, 0xE00D);
/// SequenceDelimitationItem (FFFE,E0DD)
pub const SEQUENCE_DELIMITATION_ITEM: Tag = Tag(0xFFFE, 0xE0DD);
