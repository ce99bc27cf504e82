//! Building of encoded data sets from the in-memory tree.
//!
//! Writing happens in two passes.
//! The first pass measures every element, item, sequence and group
//! from the leaves up, since each header carries the length of what follows.
//! The second pass emits headers and values in ascending tag order.
//! Sequences and items are always written with defined lengths.
//! Pixel data is written encapsulated when [`BuildOptions`] asks for it,
//! each buffer becoming one item.

use super::WriteMode;
use crate::ErrorKind;
use dcmcodec_core::buffer::{self, swap_words};
use dcmcodec_core::header::{DataElementHeader, Length};
use dcmcodec_core::stream::{ByteStream, StreamWriter};
use dcmcodec_core::{tags, DataElement, DataSet, Endianness, Tag, Value, VR};
use dcmcodec_encoding::encode::{self, Encode, ElementEncoder};
use snafu::{Backtrace, OptionExt, ResultExt, Snafu};
use std::convert::TryFrom;
use std::io::{self, BufWriter, Write};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not write header of {}", tag))]
    WriteHeader {
        tag: Tag,
        #[snafu(backtrace)]
        source: encode::Error,
    },
    #[snafu(display("Could not write value of {}", tag))]
    WriteValue {
        tag: Tag,
        source: io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not load value of {}", tag))]
    LoadValue {
        tag: Tag,
        #[snafu(backtrace)]
        source: buffer::Error,
    },
    #[snafu(display("Value of {} is too long to encode ({} bytes)", tag, len))]
    ValueTooLong {
        tag: Tag,
        len: u64,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not flush the written data"))]
    Flush {
        source: io::Error,
        backtrace: Backtrace,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::WriteHeader {
                source: encode::Error::ShortLengthOverflow { .. },
                ..
            }
            | Error::ValueTooLong { .. } => ErrorKind::Logic,
            Error::LoadValue { source, .. } if source.is_truncated() => ErrorKind::Corrupted,
            _ => ErrorKind::Io,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Options for building a data set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct BuildOptions {
    /// Whether to write a group length element before each group.
    pub group_length: bool,
    /// Whether pixel data is written as encapsulated fragments,
    /// the first buffer being the basic offset table.
    /// Otherwise its buffers are concatenated into one native value.
    pub encapsulated_pixel_data: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            group_length: true,
            encapsulated_pixel_data: false,
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether group length elements are written.
    pub fn group_length(mut self, group_length: bool) -> Self {
        self.group_length = group_length;
        self
    }

    /// Set whether pixel data is written encapsulated,
    /// as transfer syntaxes with a compression codec require.
    pub fn encapsulated_pixel_data(mut self, encapsulated: bool) -> Self {
        self.encapsulated_pixel_data = encapsulated;
        self
    }
}

/** Write `dataset` into `stream` from `position` onwards.
 *
 * Group length elements already in the data set are ignored
 * and regenerated if `options.group_length` is set.
 * Returns the position right after the last byte written.
 */
pub fn build_stream(
    stream: &dyn ByteStream,
    position: u64,
    dataset: &DataSet,
    mode: WriteMode,
    options: &BuildOptions,
) -> Result<u64> {
    let builder = Builder {
        encoder: ElementEncoder::new(mode.explicit_vr, mode.endianness),
        endianness: mode.endianness,
        group_length: options.group_length,
        encapsulated: options.encapsulated_pixel_data,
    };
    let (layout, total) = builder.measure(dataset)?;

    let mut to = BufWriter::new(StreamWriter::new(stream, position));
    builder.emit(&mut to, &layout)?;
    let writer = to
        .into_inner()
        .map_err(|e| e.into_error())
        .context(FlushSnafu)?;
    debug_assert_eq!(writer.position(), position + total);
    Ok(writer.position())
}

/// The measured encoding of a data set, in emission order.
#[derive(Debug)]
struct Layout<'a> {
    groups: Vec<GroupLayout<'a>>,
}

#[derive(Debug)]
struct GroupLayout<'a> {
    group: u16,
    /// Encoded length of the elements, group length excluded.
    length: u32,
    elements: Vec<ElementLayout<'a>>,
}

#[derive(Debug)]
struct ElementLayout<'a> {
    tag: Tag,
    element: &'a DataElement,
    len: Length,
    items: Vec<ItemLayout<'a>>,
}

#[derive(Debug)]
struct ItemLayout<'a> {
    len: u32,
    layout: Layout<'a>,
}

fn to_u32(tag: Tag, len: u64) -> Result<u32> {
    u32::try_from(len)
        .ok()
        .filter(|l| *l != Length::UNDEFINED.0)
        .context(ValueTooLongSnafu { tag, len })
}

struct Builder {
    encoder: ElementEncoder,
    endianness: Endianness,
    group_length: bool,
    encapsulated: bool,
}

impl Builder {
    /// Measure a data set, returning its layout and encoded length.
    fn measure<'a>(&self, dataset: &'a DataSet) -> Result<(Layout<'a>, u64)> {
        let mut groups = Vec::new();
        let mut total = 0;
        for (group, reps) in dataset.groups() {
            for rep in reps {
                let mut elements = Vec::new();
                let mut length = 0u64;
                for (&element, value) in rep.iter() {
                    if element == 0x0000 {
                        continue;
                    }
                    let (layout, len) = self.measure_element(Tag(group, element), value)?;
                    elements.push(layout);
                    length += len;
                }
                if elements.is_empty() {
                    continue;
                }
                let length = to_u32(Tag(group, 0x0000), length)?;
                total += u64::from(length);
                if self.group_length {
                    total += 12;
                }
                groups.push(GroupLayout {
                    group,
                    length,
                    elements,
                });
            }
        }
        Ok((Layout { groups }, total))
    }

    fn measure_element<'a>(
        &self,
        tag: Tag,
        element: &'a DataElement,
    ) -> Result<(ElementLayout<'a>, u64)> {
        match &element.value {
            Value::Items(items) => {
                let mut body = 0;
                let mut item_layouts = Vec::with_capacity(items.len());
                for item in items {
                    let (layout, len) = self.measure(item)?;
                    let len = to_u32(tags::ITEM, len)?;
                    body += 8 + u64::from(len);
                    item_layouts.push(ItemLayout { len, layout });
                }
                let len = Length(to_u32(tag, body)?);
                let total = u64::from(self.encoder.header_length(VR::SQ)) + body;
                Ok((
                    ElementLayout {
                        tag,
                        element,
                        len,
                        items: item_layouts,
                    },
                    total,
                ))
            }
            Value::Buffers(buffers) if self.encapsulated && tag == tags::PIXEL_DATA => {
                let mut body = 8;
                for fragment in buffers {
                    to_u32(tags::ITEM, fragment.len() as u64)?;
                    body += 8 + fragment.len() as u64;
                }
                let total = u64::from(self.encoder.header_length(element.vr)) + body;
                Ok((
                    ElementLayout {
                        tag,
                        element,
                        len: Length::UNDEFINED,
                        items: Vec::new(),
                    },
                    total,
                ))
            }
            Value::Buffers(buffers) => {
                let body: u64 = buffers.iter().map(|b| b.len() as u64).sum();
                let len = Length(to_u32(tag, body)?);
                let total = u64::from(self.encoder.header_length(element.vr)) + body;
                Ok((
                    ElementLayout {
                        tag,
                        element,
                        len,
                        items: Vec::new(),
                    },
                    total,
                ))
            }
        }
    }

    fn emit<W: Write>(&self, to: &mut W, layout: &Layout) -> Result<()> {
        for group in &layout.groups {
            if self.group_length {
                let tag = Tag(group.group, 0x0000);
                self.header(to, DataElementHeader::new(tag, VR::UL, Length(4)))?;
                let bytes = match self.endianness {
                    Endianness::Little => group.length.to_le_bytes(),
                    Endianness::Big => group.length.to_be_bytes(),
                };
                to.write_all(&bytes).context(WriteValueSnafu { tag })?;
            }
            for element in &group.elements {
                self.emit_element(to, element)?;
            }
        }
        Ok(())
    }

    fn emit_element<W: Write>(&self, to: &mut W, layout: &ElementLayout) -> Result<()> {
        let tag = layout.tag;
        match &layout.element.value {
            Value::Items(items) => {
                self.header(to, DataElementHeader::new(tag, VR::SQ, layout.len))?;
                for item in &layout.items {
                    self.encoder
                        .encode_item_header(&mut *to, item.len)
                        .context(WriteHeaderSnafu { tag: tags::ITEM })?;
                    self.emit(to, &item.layout)?;
                }
                debug_assert_eq!(items.len(), layout.items.len());
            }
            Value::Buffers(buffers) if layout.len.is_undefined() => {
                let vr = layout.element.vr;
                self.header(to, DataElementHeader::new(tag, vr, Length::UNDEFINED))?;
                for fragment in buffers {
                    let data = fragment.data().context(LoadValueSnafu { tag })?;
                    self.encoder
                        .encode_item_header(&mut *to, data.len() as u32)
                        .context(WriteHeaderSnafu { tag: tags::ITEM })?;
                    to.write_all(&data).context(WriteValueSnafu { tag })?;
                }
                self.encoder
                    .encode_sequence_delimiter(&mut *to)
                    .context(WriteHeaderSnafu {
                        tag: tags::SEQUENCE_DELIMITATION_ITEM,
                    })?;
            }
            Value::Buffers(buffers) => {
                let vr = layout.element.vr;
                self.header(to, DataElementHeader::new(tag, vr, layout.len))?;
                for buffer in buffers {
                    let data = buffer.data().context(LoadValueSnafu { tag })?;
                    if self.endianness == Endianness::Big && vr.word_size() > 1 {
                        let mut data = data.to_vec();
                        swap_words(&mut data, vr.word_size());
                        to.write_all(&data)
                    } else {
                        to.write_all(&data)
                    }
                    .context(WriteValueSnafu { tag })?;
                }
            }
        }
        Ok(())
    }

    fn header<W: Write>(&self, to: &mut W, header: DataElementHeader) -> Result<()> {
        self.encoder
            .encode_element_header(&mut *to, header)
            .context(WriteHeaderSnafu { tag: header.tag })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{parse_stream, ReadMode};
    use dcmcodec_core::{Buffer, MemoryStream};
    use std::sync::Arc;

    fn sample() -> DataSet {
        let mut ds = DataSet::new();
        ds.set_string(tags::PATIENT_NAME, VR::PN, "DOE^J");
        ds.set_uint(tags::ROWS, VR::US, 2).unwrap();
        ds
    }

    #[test]
    fn write_explicit_le_with_group_length() {
        let stream = MemoryStream::new();
        let end = build_stream(
            &stream,
            0,
            &sample(),
            WriteMode::from(ReadMode::EXPLICIT_VR_LITTLE_ENDIAN),
            &BuildOptions::default(),
        )
        .unwrap();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x10, 0x00, 0x00, 0x00, b'U', b'L', 0x04, 0x00, 0x0E, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x10, 0x00, b'P', b'N', 0x06, 0x00, b'D', b'O', b'E', b'^', b'J', b' ',
            0x28, 0x00, 0x00, 0x00, b'U', b'L', 0x04, 0x00, 0x0A, 0x00, 0x00, 0x00,
            0x28, 0x00, 0x10, 0x00, b'U', b'S', 0x02, 0x00, 0x02, 0x00,
        ];
        assert_eq!(stream.to_vec(), expected);
        assert_eq!(end, expected.len() as u64);
    }

    #[test]
    fn write_implicit_be_without_group_length() {
        let stream = MemoryStream::new();
        let mode = WriteMode {
            explicit_vr: false,
            endianness: Endianness::Big,
        };
        build_stream(
            &stream,
            4,
            &sample(),
            mode,
            &BuildOptions::new().group_length(false),
        )
        .unwrap();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0, 0, 0, 0,
            0x00, 0x10, 0x00, 0x10, 0x00, 0x00, 0x00, 0x06, b'D', b'O', b'E', b'^', b'J', b' ',
            0x00, 0x28, 0x00, 0x10, 0x00, 0x00, 0x00, 0x02, 0x00, 0x02,
        ];
        assert_eq!(stream.to_vec(), expected);
    }

    #[test]
    fn sequences_get_defined_lengths() {
        let mut item = DataSet::new();
        item.set_uint(tags::ROWS, VR::US, 1).unwrap();
        let mut ds = DataSet::new();
        ds.put(
            Tag(0x0008, 0x1140),
            DataElement::sequence(vec![item, DataSet::new()]),
        );

        let stream = MemoryStream::new();
        build_stream(
            &stream,
            0,
            &ds,
            WriteMode::from(ReadMode::EXPLICIT_VR_LITTLE_ENDIAN),
            &BuildOptions::new().group_length(false),
        )
        .unwrap();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x08, 0x00, 0x40, 0x11, b'S', b'Q', 0x00, 0x00, 0x1A, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0x00, 0xE0, 0x0A, 0x00, 0x00, 0x00,
            0x28, 0x00, 0x10, 0x00, b'U', b'S', 0x02, 0x00, 0x01, 0x00,
            0xFE, 0xFF, 0x00, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(stream.to_vec(), expected);
    }

    #[test]
    fn fragments_are_encapsulated() {
        let mut ds = DataSet::new();
        ds.set_buffers(
            tags::PIXEL_DATA,
            VR::OB,
            vec![Buffer::empty(), Buffer::from(vec![1, 2, 3, 4])],
        );
        let stream = MemoryStream::new();
        build_stream(
            &stream,
            0,
            &ds,
            WriteMode::from(ReadMode::EXPLICIT_VR_BIG_ENDIAN),
            &BuildOptions::new()
                .group_length(false)
                .encapsulated_pixel_data(true),
        )
        .unwrap();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x7F, 0xE0, 0x00, 0x10, b'O', b'B', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xFE, 0xE0, 0x00, 0x00, 0x00, 0x00, 0x00,
            0xFF, 0xFE, 0xE0, 0x00, 0x00, 0x00, 0x00, 0x04, 1, 2, 3, 4,
            0xFF, 0xFE, 0xE0, 0xDD, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(stream.to_vec(), expected);
    }

    #[test]
    fn offset_table_alone_is_encapsulated() {
        let mut ds = DataSet::new();
        ds.set_buffers(tags::PIXEL_DATA, VR::OB, vec![Buffer::empty()]);
        let stream = MemoryStream::new();
        let end = build_stream(
            &stream,
            0,
            &ds,
            WriteMode::from(ReadMode::EXPLICIT_VR_LITTLE_ENDIAN),
            &BuildOptions::new()
                .group_length(false)
                .encapsulated_pixel_data(true),
        )
        .unwrap();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFE, 0xFF, 0x00, 0xE0, 0x00, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
        ];
        assert_eq!(stream.to_vec(), expected);
        assert_eq!(end, expected.len() as u64);

        let stream: Arc<dyn ByteStream> = Arc::new(stream);
        let mode = ReadMode::EXPLICIT_VR_LITTLE_ENDIAN;
        let parsed = parse_stream(&stream, 0, mode, u64::MAX, Some(end), 0).unwrap();
        assert_eq!(parsed.dataset.buffers(tags::PIXEL_DATA).map(|b| b.len()), Some(1));
    }

    #[test]
    fn native_pixel_data_buffers_are_concatenated() {
        let mut ds = DataSet::new();
        ds.set_buffers(
            tags::PIXEL_DATA,
            VR::OB,
            vec![Buffer::from(vec![1, 2]), Buffer::from(vec![3, 4])],
        );
        let stream = MemoryStream::new();
        build_stream(
            &stream,
            0,
            &ds,
            WriteMode::from(ReadMode::EXPLICIT_VR_LITTLE_ENDIAN),
            &BuildOptions::new().group_length(false),
        )
        .unwrap();

        #[rustfmt::skip]
        let expected: &[u8] = &[
            0xE0, 0x7F, 0x10, 0x00, b'O', b'B', 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
            1, 2, 3, 4,
        ];
        assert_eq!(stream.to_vec(), expected);
    }

    #[test]
    fn build_then_parse() {
        let mut ds = sample();
        ds.set_buffers(
            tags::PIXEL_DATA,
            VR::OW,
            vec![Buffer::from(vec![1, 2, 3, 4, 5, 6])],
        );
        let stream: Arc<dyn ByteStream> = Arc::new(MemoryStream::new());
        for mode in [
            ReadMode::IMPLICIT_VR_LITTLE_ENDIAN,
            ReadMode::EXPLICIT_VR_LITTLE_ENDIAN,
            ReadMode::EXPLICIT_VR_BIG_ENDIAN,
        ] {
            let end = build_stream(&*stream, 0, &ds, mode.into(), &BuildOptions::default())
                .unwrap();
            let parsed = parse_stream(&stream, 0, mode, u64::MAX, Some(end), 0).unwrap();
            assert!(!parsed.corrected);
            assert_eq!(parsed.dataset, ds, "mismatch in {}", mode);
        }
    }

    #[test]
    fn short_length_overflow_is_logic_error() {
        let mut ds = DataSet::new();
        ds.put(
            tags::PATIENT_NAME,
            DataElement::new(VR::PN, vec![b'A'; 0x1_0000]),
        );
        let err = build_stream(
            &MemoryStream::new(),
            0,
            &ds,
            WriteMode::from(ReadMode::EXPLICIT_VR_LITTLE_ENDIAN),
            &BuildOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Logic);
    }
}
