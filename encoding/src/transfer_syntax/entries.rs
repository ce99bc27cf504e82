//! The transfer syntaxes known to this library.
//!
//! - **Fully implemented**: data sets and pixel data can be read and written.
//! - **Encapsulated**: data sets can be read and written,
//!   but the compressed pixel data is kept as opaque fragments.
//! - **Unsupported**: the transfer syntax is recognized, then refused.

use super::{Codec, TransferSyntax as Ts};
use byteordered::Endianness;

// -- the three base transfer syntaxes, fully supported --

/// **Fully implemented:** Implicit VR Little Endian: Default Transfer Syntax for DICOM
pub const IMPLICIT_VR_LITTLE_ENDIAN: Ts = Ts::new(
    "1.2.840.10008.1.2",
    "Implicit VR Little Endian",
    Endianness::Little,
    false,
    Codec::None,
);

/// **Fully implemented:** Explicit VR Little Endian
pub const EXPLICIT_VR_LITTLE_ENDIAN: Ts =
    Ts::new_ele("1.2.840.10008.1.2.1", "Explicit VR Little Endian", Codec::None);

/// **Fully implemented:** Explicit VR Big Endian
pub const EXPLICIT_VR_BIG_ENDIAN: Ts = Ts::new(
    "1.2.840.10008.1.2.2",
    "Explicit VR Big Endian",
    Endianness::Big,
    true,
    Codec::None,
);

/// **Fully implemented:** RLE Lossless
pub const RLE_LOSSLESS: Ts = Ts::new_ele("1.2.840.10008.1.2.5", "RLE Lossless", Codec::Rle);

/// **Unsupported:** Deflated Explicit VR Little Endian
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: Ts = Ts::new_ele(
    "1.2.840.10008.1.2.1.99",
    "Deflated Explicit VR Little Endian",
    Codec::Unsupported,
);

// -- compressed pixel data, kept encapsulated --

/// **Encapsulated:** JPEG Baseline (Process 1)
pub const JPEG_BASELINE: Ts = Ts::new_ele(
    "1.2.840.10008.1.2.4.50",
    "JPEG Baseline (Process 1)",
    Codec::Encapsulated,
);

/// **Encapsulated:** JPEG Extended (Process 2 & 4)
pub const JPEG_EXTENDED: Ts = Ts::new_ele(
    "1.2.840.10008.1.2.4.51",
    "JPEG Extended (Process 2 & 4)",
    Codec::Encapsulated,
);

/// **Encapsulated:** JPEG Lossless, Non-Hierarchical (Process 14)
pub const JPEG_LOSSLESS_NON_HIERARCHICAL: Ts = Ts::new_ele(
    "1.2.840.10008.1.2.4.57",
    "JPEG Lossless, Non-Hierarchical (Process 14)",
    Codec::Encapsulated,
);

/// **Encapsulated:** JPEG Lossless, Non-Hierarchical, First-Order Prediction
pub const JPEG_LOSSLESS_NON_HIERARCHICAL_FIRST_ORDER_PREDICTION: Ts = Ts::new_ele(
    "1.2.840.10008.1.2.4.70",
    "JPEG Lossless, Non-Hierarchical, First-Order Prediction",
    Codec::Encapsulated,
);

/// **Encapsulated:** JPEG-LS Lossless Image Compression
pub const JPEG_LS_LOSSLESS_IMAGE_COMPRESSION: Ts = Ts::new_ele(
    "1.2.840.10008.1.2.4.80",
    "JPEG-LS Lossless Image Compression",
    Codec::Encapsulated,
);

/// **Encapsulated:** JPEG-LS Lossy (Near-Lossless) Image Compression
pub const JPEG_LS_LOSSY_IMAGE_COMPRESSION: Ts = Ts::new_ele(
    "1.2.840.10008.1.2.4.81",
    "JPEG-LS Lossy (Near-Lossless) Image Compression",
    Codec::Encapsulated,
);

/// **Encapsulated:** JPEG 2000 Image Compression (Lossless Only)
pub const JPEG_2000_IMAGE_COMPRESSION_LOSSLESS_ONLY: Ts = Ts::new_ele(
    "1.2.840.10008.1.2.4.90",
    "JPEG 2000 Image Compression (Lossless Only)",
    Codec::Encapsulated,
);

/// **Encapsulated:** JPEG 2000 Image Compression
pub const JPEG_2000_IMAGE_COMPRESSION: Ts = Ts::new_ele(
    "1.2.840.10008.1.2.4.91",
    "JPEG 2000 Image Compression",
    Codec::Encapsulated,
);

/// Every entry of the registry.
pub const ALL: &[Ts] = &[
    IMPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_LITTLE_ENDIAN,
    EXPLICIT_VR_BIG_ENDIAN,
    RLE_LOSSLESS,
    DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
    JPEG_BASELINE,
    JPEG_EXTENDED,
    JPEG_LOSSLESS_NON_HIERARCHICAL,
    JPEG_LOSSLESS_NON_HIERARCHICAL_FIRST_ORDER_PREDICTION,
    JPEG_LS_LOSSLESS_IMAGE_COMPRESSION,
    JPEG_LS_LOSSY_IMAGE_COMPRESSION,
    JPEG_2000_IMAGE_COMPRESSION_LOSSLESS_ONLY,
    JPEG_2000_IMAGE_COMPRESSION,
];
