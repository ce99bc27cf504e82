#![crate_type = "lib"]
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    unused_qualifications,
    unused_import_braces
)]

//! Core data structures of the DICOM stream codec.
//!
//! - [`header`] holds tags, value representations, lengths and element headers.
//! - [`dictionary`] resolves the value representation of implicit VR elements.
//! - [`stream`] defines the positional byte stream the codec reads and writes.
//! - [`buffer`] holds element values, in memory or deferred to their stream.
//! - [`dataset`] is the tree of groups, elements and nested items.
//! - [`memory`] provides the allocators used for codec scratch memory.
//! - [`tags`] names the attributes the codec works with.

pub mod buffer;
pub mod dataset;
pub mod dictionary;
pub mod header;
pub mod memory;
pub mod stream;
pub mod tags;

pub use buffer::{Buffer, LazySource};
pub use dataset::{DataElement, DataSet, Group, Value};
pub use dictionary::{DataDictionary, StandardDataDictionary};
pub use header::{DataElementHeader, Length, SequenceItemHeader, Tag, VR};
pub use memory::{Allocator, MemoryPool, SystemAllocator};
pub use stream::{ByteStream, FileStream, MemoryStream, StreamReader, StreamWriter};

// re-export crates that are part of the public API
pub use byteordered::Endianness;
