//! Parsing of encoded data sets into the in-memory tree.
//!
//! Elements are read one header at a time from a positional [`ByteStream`].
//! Sequence items are parsed recursively up to [`MAX_DEPTH`],
//! encapsulated pixel data is split into its offset table and fragments,
//! and values above a configurable size are left in the stream
//! as lazily loaded buffers.
//!
//! Streams in the wild sometimes disagree with their declared encoding.
//! The parser switches encoding once per stream, on exactly these conditions:
//!
//! - in explicit VR, the two bytes after the tag are not a value representation:
//!   the stream is read as implicit VR from there on;
//! - in implicit VR, the two bytes after the tag of a known attribute
//!   spell the attribute's own value representation:
//!   the stream is read as explicit VR from there on;
//! - a defined length does not fit in what is left of the enclosing data set,
//!   but the header read in the opposite byte order does:
//!   the stream is read in that byte order from there on.
//!
//! A second inconsistency fails with [`Error::InconsistentEncoding`].

use super::{ReadMode, MAX_DEPTH};
use crate::ErrorKind;
use dcmcodec_core::buffer::{swap_words, Buffer, LazySource};
use dcmcodec_core::dictionary::{DataDictionary, StandardDataDictionary};
use dcmcodec_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmcodec_core::stream::{ByteStream, StreamReader};
use dcmcodec_core::{tags, DataElement, DataSet, Endianness, Tag, VR};
use dcmcodec_encoding::decode::{self, Decode, ElementDecoder};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io;
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not determine the length of the stream"))]
    StreamLength {
        source: io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Header at {} is cut short", position))]
    ShortHeader { position: u64, backtrace: Backtrace },
    #[snafu(display("Could not read element header at {}", position))]
    ReadHeader {
        position: u64,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    #[snafu(display("Could not read item header at {}", position))]
    ReadItemHeader {
        position: u64,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    #[snafu(display("Could not inspect the header at {}", position))]
    InspectHeader {
        position: u64,
        source: io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not read {} value bytes of {} at {}", len, tag, position))]
    ReadValue {
        tag: Tag,
        position: u64,
        len: u32,
        source: io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display(
        "Length {} of {} at {} overruns the {} bytes left",
        len,
        tag,
        position,
        remaining
    ))]
    LengthOverrun {
        tag: Tag,
        position: u64,
        len: u32,
        remaining: u64,
        backtrace: Backtrace,
    },
    #[snafu(display("Element {} at {} cannot have an undefined length", tag, position))]
    UndefinedLength {
        tag: Tag,
        position: u64,
        backtrace: Backtrace,
    },
    /// The stream contradicted its encoding after a switch was already made.
    #[snafu(display("Inconsistent encoding of {} at {} after a previous switch", tag, position))]
    InconsistentEncoding {
        tag: Tag,
        position: u64,
        backtrace: Backtrace,
    },
    #[snafu(display("Sequence at {} is nested deeper than {} levels", position, MAX_DEPTH))]
    DepthLimit { position: u64, backtrace: Backtrace },
    #[snafu(display("Unexpected {} at {}", tag, position))]
    UnexpectedItemTag {
        tag: Tag,
        position: u64,
        backtrace: Backtrace,
    },
    #[snafu(display("Missing delimiter before position {}", position))]
    MissingDelimiter { position: u64, backtrace: Backtrace },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) fn decode_error_kind(e: &decode::Error) -> ErrorKind {
    if e.is_truncated()
        || matches!(
            e,
            decode::Error::UnrecognizedVr { .. } | decode::Error::BadSequenceHeader { .. }
        )
    {
        ErrorKind::Corrupted
    } else {
        ErrorKind::Io
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::StreamLength { .. } | Error::InspectHeader { .. } => ErrorKind::Io,
            Error::ReadHeader { source, .. } | Error::ReadItemHeader { source, .. } => {
                decode_error_kind(source)
            }
            Error::ReadValue { source, .. } if source.kind() != io::ErrorKind::UnexpectedEof => {
                ErrorKind::Io
            }
            Error::DepthLimit { .. } => ErrorKind::DepthLimitReached,
            _ => ErrorKind::Corrupted,
        }
    }
}

/// The outcome of parsing a data set.
#[derive(Debug)]
pub struct Parsed {
    pub dataset: DataSet,
    /// The position right after the last byte consumed.
    pub end: u64,
    /// The encoding in force at the end of the parse.
    pub mode: ReadMode,
    /// Whether the encoding was switched along the way.
    pub corrected: bool,
}

/** Parse the elements found from `position` onwards.
 *
 * Parsing stops at the end of the stream,
 * after `max_length` bytes if given,
 * or at an item or sequence delimiter which does not belong
 * to any nested sequence.
 * Values longer than `max_buffer_load` are not read,
 * but kept as buffers loaded on first access.
 * `depth` is the nesting level of the data set being read,
 * 0 for a root data set.
 *
 * Group length elements are not kept.
 */
pub fn parse_stream(
    stream: &Arc<dyn ByteStream>,
    position: u64,
    mode: ReadMode,
    max_buffer_load: u64,
    max_length: Option<u64>,
    depth: u32,
) -> Result<Parsed> {
    let stream_len = stream.len().context(StreamLengthSnafu)?;
    let end = match max_length {
        Some(max) => position.saturating_add(max).min(stream_len),
        None => stream_len,
    };

    let mut parser = Parser {
        stream,
        mode,
        corrected: false,
        max_buffer_load,
        dict: StandardDataDictionary,
    };
    let (dataset, end, _) = parser.read_dataset(position, end, depth, Scope::Root)?;
    Ok(Parsed {
        dataset,
        end,
        mode: parser.mode,
        corrected: parser.corrected,
    })
}

/// Where the data set being read is.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Scope {
    Root,
    DefinedItem,
    UndefinedItem,
}

struct Parser<'a> {
    stream: &'a Arc<dyn ByteStream>,
    mode: ReadMode,
    corrected: bool,
    max_buffer_load: u64,
    dict: StandardDataDictionary,
}

impl Parser<'_> {
    /// Read elements until `end` or a delimiter.
    /// Returns the data set, the position after it,
    /// and whether it was closed by an item delimiter.
    fn read_dataset(
        &mut self,
        mut position: u64,
        end: u64,
        depth: u32,
        scope: Scope,
    ) -> Result<(DataSet, u64, bool)> {
        let mut dataset = DataSet::new();

        while position < end {
            let (header, header_len) = self.read_header(position, end)?;
            let tag = header.tag;
            let value_start = position + header_len;
            trace!("{} {} {} at {}", tag, header.vr, header.len, position);

            if tag == tags::ITEM_DELIMITATION_ITEM {
                if scope != Scope::UndefinedItem {
                    warn!("Stray item delimiter at {}, ending data set", position);
                }
                return Ok((dataset, value_start, true));
            }
            if tag == tags::SEQUENCE_DELIMITATION_ITEM {
                ensure!(
                    scope == Scope::Root,
                    UnexpectedItemTagSnafu { tag, position }
                );
                warn!("Stray sequence delimiter at {}, ending data set", position);
                return Ok((dataset, value_start, false));
            }
            ensure!(tag != tags::ITEM, UnexpectedItemTagSnafu { tag, position });

            // UN with undefined length holds sequence items
            if header.is_sequence() || (header.vr == VR::UN && header.len.is_undefined()) {
                ensure!(depth + 1 <= MAX_DEPTH, DepthLimitSnafu { position });
                let (items, next) = self.read_sequence(value_start, header.len, end, depth + 1)?;
                dataset.push_parsed(tag, DataElement::sequence(items));
                position = next;
                continue;
            }

            let len = match header.len.get() {
                Some(len) => len,
                None if tag == tags::PIXEL_DATA => {
                    let (fragments, next) = self.read_fragments(value_start, end)?;
                    dataset.push_parsed(tag, DataElement::from_buffers(VR::OB, fragments));
                    position = next;
                    continue;
                }
                None => return UndefinedLengthSnafu { tag, position }.fail(),
            };

            if tag.is_group_length() {
                trace!("Skipping group length {}", tag);
            } else {
                let buffer =
                    self.read_value(tag, header.vr, value_start, len, header.vr.word_size())?;
                dataset.push_parsed(tag, DataElement::from_buffers(header.vr, vec![buffer]));
            }
            position = value_start + u64::from(len);
        }

        Ok((dataset, position, false))
    }

    /// Read the items of a sequence whose value starts at `position`.
    fn read_sequence(
        &mut self,
        mut position: u64,
        len: Length,
        end: u64,
        depth: u32,
    ) -> Result<(Vec<DataSet>, u64)> {
        let seq_end = match len.get() {
            Some(len) => position + u64::from(len),
            None => end,
        };
        let mut items = Vec::new();

        loop {
            if position >= seq_end {
                ensure!(len.is_defined(), MissingDelimiterSnafu { position });
                return Ok((items, seq_end));
            }
            let start = position + 8;
            match self.read_item_header(position)? {
                SequenceItemHeader::Item { len: item_len } => {
                    let (item_end, scope) = match item_len.get() {
                        Some(l) => {
                            let item_end = start + u64::from(l);
                            ensure!(
                                item_end <= seq_end,
                                LengthOverrunSnafu {
                                    tag: tags::ITEM,
                                    position,
                                    len: l,
                                    remaining: seq_end.saturating_sub(start),
                                }
                            );
                            (item_end, Scope::DefinedItem)
                        }
                        None => (seq_end, Scope::UndefinedItem),
                    };
                    let (item, next, delimited) =
                        self.read_dataset(start, item_end, depth, scope)?;
                    position = if scope == Scope::UndefinedItem {
                        ensure!(delimited, MissingDelimiterSnafu { position: next });
                        next
                    } else {
                        item_end
                    };
                    items.push(item);
                }
                SequenceItemHeader::SequenceDelimiter => {
                    if len.is_defined() {
                        warn!("Sequence delimiter at {} in a sequence of defined length", position);
                        return Ok((items, seq_end));
                    }
                    return Ok((items, start));
                }
                SequenceItemHeader::ItemDelimiter => {
                    return UnexpectedItemTagSnafu {
                        tag: tags::ITEM_DELIMITATION_ITEM,
                        position,
                    }
                    .fail();
                }
            }
        }
    }

    /// Read the offset table and fragments of encapsulated pixel data.
    /// Fragments are kept as they are, never byte swapped.
    fn read_fragments(&mut self, mut position: u64, end: u64) -> Result<(Vec<Buffer>, u64)> {
        let mut fragments = Vec::new();
        loop {
            ensure!(position < end, MissingDelimiterSnafu { position });
            let start = position + 8;
            match self.read_item_header(position)? {
                SequenceItemHeader::Item { len } => {
                    let len = len.get().context(UndefinedLengthSnafu {
                        tag: tags::ITEM,
                        position,
                    })?;
                    ensure!(
                        start + u64::from(len) <= end,
                        LengthOverrunSnafu {
                            tag: tags::ITEM,
                            position,
                            len,
                            remaining: end.saturating_sub(start),
                        }
                    );
                    fragments.push(self.read_value(tags::PIXEL_DATA, VR::OB, start, len, 1)?);
                    position = start + u64::from(len);
                }
                SequenceItemHeader::SequenceDelimiter => return Ok((fragments, start)),
                SequenceItemHeader::ItemDelimiter => {
                    return UnexpectedItemTagSnafu {
                        tag: tags::ITEM_DELIMITATION_ITEM,
                        position,
                    }
                    .fail();
                }
            }
        }
    }

    fn decode_at(
        &self,
        mode: ReadMode,
        position: u64,
    ) -> decode::Result<(DataElementHeader, u64)> {
        let decoder = ElementDecoder::new(mode.explicit_vr, mode.endianness);
        let mut reader = StreamReader::new(&**self.stream, position);
        decoder
            .decode_header(&mut reader)
            .map(|(header, len)| (header, len as u64))
    }

    /// Read the element header at `position`,
    /// switching encoding if the stream calls for it.
    fn read_header(&mut self, position: u64, end: u64) -> Result<(DataElementHeader, u64)> {
        let (header, header_len) = match self.decode_at(self.mode, position) {
            Ok(header) => header,
            Err(decode::Error::UnrecognizedVr { tag, .. }) => {
                let implicit = ReadMode {
                    explicit_vr: false,
                    ..self.mode
                };
                self.switch_mode(tag, position, implicit, "Unknown value representation")?;
                return self.read_header(position, end);
            }
            Err(e) if e.is_truncated() => return ShortHeaderSnafu { position }.fail(),
            Err(e) => return Err(e).context(ReadHeaderSnafu { position }),
        };
        let tag = header.tag;
        if tag.is_item_group() {
            return Ok((header, header_len));
        }

        if !self.mode.explicit_vr {
            let mut spelled = [0u8; 2];
            self.stream
                .read_exact_at(position + 4, &mut spelled)
                .context(InspectHeaderSnafu { position })?;
            let spelled = VR::from_binary(spelled);
            if spelled.is_some() && spelled == self.dict.by_tag(tag).map(|e| e.vr) {
                let explicit = ReadMode {
                    explicit_vr: true,
                    ..self.mode
                };
                self.switch_mode(
                    tag,
                    position,
                    explicit,
                    "Value representation in implicit VR header",
                )?;
                return self.read_header(position, end);
            }
        }

        if let Some(len) = header.len.get() {
            let remaining = end.saturating_sub(position + header_len);
            if u64::from(len) > remaining {
                let swapped = self.mode.swapped();
                if let Ok((alt, alt_len)) = self.decode_at(swapped, position) {
                    let fits = alt.len.get().map_or(false, |l| {
                        u64::from(l) <= end.saturating_sub(position + alt_len)
                    });
                    if fits && !alt.tag.is_item_group() {
                        self.switch_mode(tag, position, swapped, "Length overrun")?;
                        return Ok((alt, alt_len));
                    }
                }
                return LengthOverrunSnafu {
                    tag,
                    position,
                    len,
                    remaining,
                }
                .fail();
            }
        }

        Ok((header, header_len))
    }

    fn switch_mode(
        &mut self,
        tag: Tag,
        position: u64,
        mode: ReadMode,
        reason: &str,
    ) -> Result<()> {
        ensure!(
            !self.corrected,
            InconsistentEncodingSnafu { tag, position }
        );
        warn!(
            "{} in {} at {}, reading the rest as {}",
            reason, tag, position, mode
        );
        self.corrected = true;
        self.mode = mode;
        Ok(())
    }

    fn read_item_header(&self, position: u64) -> Result<SequenceItemHeader> {
        let decoder = ElementDecoder::new(self.mode.explicit_vr, self.mode.endianness);
        let mut reader = StreamReader::new(&**self.stream, position);
        match decoder.decode_item_header(&mut reader) {
            Ok(header) => Ok(header),
            Err(e) if e.is_truncated() => ShortHeaderSnafu { position }.fail(),
            Err(e) => Err(e).context(ReadItemHeaderSnafu { position }),
        }
    }

    /// Read a value into memory, or defer it if it is too large.
    fn read_value(
        &self,
        tag: Tag,
        vr: VR,
        position: u64,
        len: u32,
        word_size: usize,
    ) -> Result<Buffer> {
        let padding = vr.padding();
        if u64::from(len) > self.max_buffer_load {
            debug!("Deferring {} bytes of {} at {}", len, tag, position);
            return Ok(Buffer::lazy(LazySource::new(
                Arc::clone(self.stream),
                position,
                len,
                word_size,
                self.mode.endianness,
                padding,
            )));
        }

        let mut data = vec![0u8; len as usize];
        self.stream
            .read_exact_at(position, &mut data)
            .context(ReadValueSnafu { tag, position, len })?;
        if data.len() % 2 == 1 {
            data.push(padding);
        }
        if self.mode.endianness == Endianness::Big {
            swap_words(&mut data, word_size);
        }
        Ok(Buffer::new(data, padding))
    }
}
