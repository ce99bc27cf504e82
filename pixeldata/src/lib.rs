#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]

//! This crate converts between the pixel data of a DICOM data set
//! and decoded [`Image`]s.
//!
//! Native (uncompressed) pixel data is supported in every layout:
//! sample-major or channel-major, 1-bit packed,
//! and with chroma subsampled horizontally and/or vertically.
//! RLE Lossless pixel data is compressed and decompressed in pure Rust.
//! Other encapsulated transfer syntaxes are kept as they are
//! by the stream codec, but their frames cannot be decoded here.
//!
//! # Examples
//!
//! ```no_run
//! # use std::error::Error;
//! use dcmcodec_parser::DicomStreamCodec;
//! use dcmcodec_pixeldata::{get_image, TranscodeOptions};
//!
//! # fn main() -> Result<(), Box<dyn Error>> {
//! let ds = DicomStreamCodec::new().read_file("image.dcm")?;
//! let image = get_image(&ds, 0, &TranscodeOptions::default())?;
//! println!("{}x{} {}", image.width(), image.height(), image.color_space());
//! #   Ok(())
//! # }
//! ```
//!
//! Writing a frame chooses the stored layout through [`ImageEncoding`]:
//!
//! ```
//! # use dcmcodec_core::DataSet;
//! # use dcmcodec_encoding::transfer_syntax::entries;
//! use dcmcodec_pixeldata::{set_image, ColorSpace, Image, ImageEncoding, SampleBuffer};
//!
//! let samples = SampleBuffer::from(vec![255u8, 0, 0, 0, 0, 255]);
//! let image = Image::new(2, 1, ColorSpace::Rgb, 7, samples)?;
//! let mut ds = DataSet::new();
//! set_image(&mut ds, 0, &image, &ImageEncoding::new().transfer_syntax(entries::RLE_LOSSLESS))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use dcmcodec_core::{buffer, dataset};
use dcmcodec_parser::ErrorKind;
use snafu::{Backtrace, Snafu};

pub mod attribute;
pub mod image;
pub mod native;
mod pixel_data;
pub mod rle;
pub mod sample;
pub mod transcode;

pub use crate::image::{ColorSpace, Image};
pub use crate::native::{size_in_bits, suggest_allocated_bits, ChromaDecimation, NativeLayout};
pub use crate::pixel_data::{
    get_image, get_image_with, set_image, set_image_with, ImageEncoding, Subsampling,
    TranscodeOptions, DEFAULT_MAX_HEIGHT, DEFAULT_MAX_WIDTH,
};
pub use crate::sample::{Sample, SampleBuffer, SampleKind};
pub use crate::transcode::Transcode;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not read image attributes"))]
    Attribute {
        #[snafu(backtrace)]
        source: attribute::GetAttributeError,
    },

    #[snafu(display("Unknown transfer syntax `{}`", uid))]
    UnknownTransferSyntax { uid: String, backtrace: Backtrace },

    #[snafu(display("No pixel data codec for transfer syntax {}", name))]
    UnsupportedTransferSyntax {
        name: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid color space"))]
    InvalidColorSpace {
        #[snafu(backtrace)]
        source: image::Error,
    },

    #[snafu(display(
        "Color space {} requires {} channels, but {} are declared",
        color_space,
        required,
        declared
    ))]
    ChannelCount {
        color_space: ColorSpace,
        required: u32,
        declared: u32,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "Image of {}x{} exceeds the maximum size of {}x{}",
        width,
        height,
        max_width,
        max_height
    ))]
    ImageTooBig {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Image dimensions are missing ({}x{})", width, height))]
    MissingDimensions {
        width: u32,
        height: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Invalid BitsAllocated {}", bits))]
    InvalidBitsAllocated { bits: u32, backtrace: Backtrace },

    #[snafu(display(
        "High bit {} is inconsistent with {} bits stored in {} bits allocated",
        high_bit,
        bits_stored,
        bits_allocated
    ))]
    InvalidHighBit {
        high_bit: u32,
        bits_stored: u32,
        bits_allocated: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Frame #{} is out of range, the image has {} frames", frame, frames))]
    FrameOutOfRange {
        frame: u32,
        frames: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Missing pixel data"))]
    MissingPixelData { backtrace: Backtrace },

    #[snafu(display("Native pixel data is stored in {} fragments", fragments))]
    UnexpectedFragments {
        fragments: usize,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not locate the fragment of frame #{}", frame))]
    MissingFragment { frame: u32, backtrace: Backtrace },

    #[snafu(display("Could not load pixel data"))]
    LoadPixelData {
        source: buffer::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not decode native pixel data"))]
    Native {
        #[snafu(backtrace)]
        source: native::Error,
    },

    #[snafu(display("Could not process RLE pixel data"))]
    Rle {
        #[snafu(backtrace)]
        source: rle::Error,
    },

    #[snafu(display("Could not create image"))]
    CreateImage {
        #[snafu(backtrace)]
        source: image::Error,
    },

    #[snafu(display("RLE Lossless cannot store {}", layout))]
    UnsupportedLayout {
        layout: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "Cannot store {} bit samples in {} allocated bits",
        high_bit + 1,
        bits_allocated
    ))]
    InvalidEncoding {
        high_bit: u32,
        bits_allocated: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Frame #{} cannot be set, the next frame is #{}", frame, expected))]
    FrameNumber {
        frame: u32,
        expected: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("Frame does not match the existing frames in `{}`", attribute))]
    FrameMismatch {
        attribute: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("Could not write attribute `{}`", name))]
    WriteAttribute {
        name: &'static str,
        #[snafu(backtrace)]
        source: dataset::Error,
    },

    #[snafu(display("Pixel data of {} bytes is too long", len))]
    PixelDataTooLong { len: usize, backtrace: Backtrace },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Attribute { source } => source.kind(),
            Error::UnknownTransferSyntax { .. } | Error::UnsupportedTransferSyntax { .. } => {
                ErrorKind::WrongTransferSyntax
            }
            Error::InvalidColorSpace { source } => source.kind(),
            Error::ImageTooBig { .. } => ErrorKind::ImageTooBig,
            Error::LoadPixelData { source, .. } if !source.is_truncated() => ErrorKind::Io,
            Error::Native { source } => source.kind(),
            Error::Rle { source } => source.kind(),
            Error::CreateImage { source } => source.kind(),
            Error::FrameOutOfRange { .. }
            | Error::UnsupportedLayout { .. }
            | Error::InvalidEncoding { .. }
            | Error::FrameNumber { .. }
            | Error::FrameMismatch { .. }
            | Error::WriteAttribute { .. }
            | Error::PixelDataTooLong { .. } => ErrorKind::Logic,
            Error::ChannelCount { .. }
            | Error::MissingDimensions { .. }
            | Error::InvalidBitsAllocated { .. }
            | Error::InvalidHighBit { .. }
            | Error::MissingPixelData { .. }
            | Error::UnexpectedFragments { .. }
            | Error::MissingFragment { .. }
            | Error::LoadPixelData { .. } => ErrorKind::Corrupted,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
