//! Element header encoding and decoding for the DICOM stream codec.
//!
//! This crate provides the element header decoders and encoders
//! for every combination of value representation explicitness and byte order,
//! and hosts the registry of [transfer syntax] specifiers
//! which select among them at run-time.
//!
//! All APIs are based on synchronous I/O.
//!
//! [transfer syntax]: ./transfer_syntax/index.html

pub mod decode;
pub mod encode;
pub mod transfer_syntax;

pub use decode::{Decode, ElementDecoder};
pub use encode::{element_header_length, ElementEncoder, Encode};
pub use transfer_syntax::{Codec, TransferSyntax};

pub use dcmcodec_core::buffer::swap_words;

pub use byteordered::Endianness;
