#![crate_type = "lib"]
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]

//! Tag stream parsing and building for the DICOM stream codec.
//!
//! - [`dataset`] converts between encoded element streams and [`DataSet`]s
//!   in any of the native encodings, fixing up streams
//!   which disagree with their declared encoding.
//! - [`file`] adds the preamble, magic code and file meta group
//!   of a complete DICOM file.
//!
//! All APIs are based on synchronous, positional I/O
//! over a [`ByteStream`].
//!
//! [`DataSet`]: dcmcodec_core::DataSet
//! [`ByteStream`]: dcmcodec_core::ByteStream

pub mod dataset;
pub mod file;

pub use dataset::{
    build_stream, parse_stream, BuildOptions, Parsed, ReadMode, WriteMode, MAX_DEPTH,
};
pub use file::{DicomStreamCodec, ReadOptions, ReadPreamble, WriteOptions};

/// The broad category of a codec failure,
/// shared by every error type in the codec.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The underlying stream failed.
    Io,
    /// The transfer syntax is missing or cannot be handled.
    WrongTransferSyntax,
    /// The encoded data is malformed.
    Corrupted,
    /// The image dimensions are beyond what is accepted.
    ImageTooBig,
    /// Sequences are nested deeper than [`MAX_DEPTH`].
    DepthLimitReached,
    /// The request itself is invalid,
    /// such as a value too long for its header.
    Logic,
}
