//! Reading and writing of complete DICOM files.
//!
//! A file is an optional 128 byte preamble, the `DICM` magic code,
//! the file meta group in explicit VR little endian,
//! and then the main data set in the encoding named by the
//! meta group's transfer syntax.
//! Streams without the magic code are read as raw
//! implicit VR little endian data sets.

use crate::dataset::{build_stream, parse_stream, read, write, BuildOptions, ReadMode, WriteMode};
use crate::ErrorKind;
use dcmcodec_core::dataset::Error as DataSetError;
use dcmcodec_core::stream::{ByteStream, FileStream, StreamReader};
use dcmcodec_core::{tags, DataElement, DataSet, Tag, VR};
use dcmcodec_encoding::decode::explicit::ExplicitVrLittleEndianDecoder;
use dcmcodec_encoding::decode::{self, Decode};
use dcmcodec_encoding::transfer_syntax::{self, entries};
use dcmcodec_encoding::TransferSyntax;
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// The magic code which follows the preamble.
pub const DICM_MAGIC_CODE: [u8; 4] = *b"DICM";

/// The length of the file preamble.
pub const PREAMBLE_LENGTH: u64 = 128;

/// Written to the meta group when it names no implementation.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.137038125948464847900039011591283709926";
pub const IMPLEMENTATION_VERSION_NAME: &str = "DCMCODEC_010";

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Could not open file"))]
    OpenFile {
        source: io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not determine the length of the stream"))]
    StreamLength {
        source: io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not read the magic code"))]
    ReadMagic {
        source: io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Missing DICM magic code after the preamble"))]
    MissingMagic { backtrace: Backtrace },
    #[snafu(display("Could not inspect the element at {}", position))]
    InspectMeta {
        position: u64,
        source: io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("Could not read file meta element header at {}", position))]
    ReadMetaHeader {
        position: u64,
        #[snafu(backtrace)]
        source: decode::Error,
    },
    #[snafu(display("Could not read value of file meta element {}", tag))]
    ReadMetaValue {
        tag: Tag,
        source: io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display("File meta element {} has an undefined length", tag))]
    UndefinedMetaLength { tag: Tag, backtrace: Backtrace },
    #[snafu(display("Length {} of file meta element {} overruns the stream", len, tag))]
    MetaLengthOverrun {
        tag: Tag,
        len: u32,
        backtrace: Backtrace,
    },
    #[snafu(display("Invalid file meta attribute"))]
    MetaAttribute {
        #[snafu(backtrace)]
        source: DataSetError,
    },
    #[snafu(display("Missing transfer syntax UID in file meta group"))]
    MissingTransferSyntax { backtrace: Backtrace },
    #[snafu(display("Unknown transfer syntax `{}`", uid))]
    UnknownTransferSyntax { uid: String, backtrace: Backtrace },
    #[snafu(display("Unsupported transfer syntax {}", uid))]
    UnsupportedTransferSyntax { uid: String, backtrace: Backtrace },
    #[snafu(display("Could not parse data set"))]
    ParseDataSet {
        #[snafu(backtrace)]
        source: read::Error,
    },
    #[snafu(display("Could not build data set"))]
    BuildDataSet {
        #[snafu(backtrace)]
        source: write::Error,
    },
    #[snafu(display("Could not write the preamble"))]
    WritePreamble {
        source: io::Error,
        backtrace: Backtrace,
    },
    #[snafu(display(
        "Pixel data with {} buffers cannot be written in transfer syntax {}",
        buffers,
        uid
    ))]
    PixelDataEncapsulation {
        uid: &'static str,
        buffers: usize,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::OpenFile { .. }
            | Error::StreamLength { .. }
            | Error::ReadMagic { .. }
            | Error::InspectMeta { .. }
            | Error::WritePreamble { .. } => ErrorKind::Io,
            Error::ReadMetaValue { source, .. }
                if source.kind() != io::ErrorKind::UnexpectedEof =>
            {
                ErrorKind::Io
            }
            Error::ReadMetaHeader { source, .. } => read::decode_error_kind(source),
            Error::MissingMagic { .. }
            | Error::MissingTransferSyntax { .. }
            | Error::UnknownTransferSyntax { .. }
            | Error::UnsupportedTransferSyntax { .. } => ErrorKind::WrongTransferSyntax,
            Error::ParseDataSet { source } => source.kind(),
            Error::BuildDataSet { source } => source.kind(),
            Error::PixelDataEncapsulation { .. } => ErrorKind::Logic,
            Error::ReadMetaValue { .. }
            | Error::UndefinedMetaLength { .. }
            | Error::MetaLengthOverrun { .. }
            | Error::MetaAttribute { .. } => ErrorKind::Corrupted,
        }
    }
}

/// Where to look for the `DICM` magic code.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ReadPreamble {
    /// Try after a 128 byte preamble first, then at the very start.
    /// Streams with no magic code are read as raw data sets.
    #[default]
    Auto,
    /// The stream starts with the magic code or with a raw data set.
    Never,
    /// The stream always starts with a 128 byte preamble.
    Always,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct ReadOptions {
    /// Values longer than this are left in the stream
    /// and loaded on first access.
    pub max_buffer_load: u64,
    pub read_preamble: ReadPreamble,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            max_buffer_load: u64::MAX,
            read_preamble: ReadPreamble::Auto,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_buffer_load(mut self, max_buffer_load: u64) -> Self {
        self.max_buffer_load = max_buffer_load;
        self
    }

    pub fn read_preamble(mut self, read_preamble: ReadPreamble) -> Self {
        self.read_preamble = read_preamble;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct WriteOptions {
    /// Write 128 zero bytes before the magic code.
    pub write_preamble: bool,
    /// Write group length elements in the main data set.
    /// The file meta group always has one.
    pub group_length: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            write_preamble: true,
            group_length: true,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_preamble(mut self, write_preamble: bool) -> Self {
        self.write_preamble = write_preamble;
        self
    }

    pub fn group_length(mut self, group_length: bool) -> Self {
        self.group_length = group_length;
        self
    }
}

/// Reads and writes whole DICOM files over byte streams.
///
/// # Example
///
/// ```no_run
/// use dcmcodec_parser::{DicomStreamCodec, ReadOptions};
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = DicomStreamCodec::new()
///     .read_options(ReadOptions::new().max_buffer_load(1 << 20));
/// let dataset = codec.read_file("image.dcm")?;
/// codec.write_file("copy.dcm", &dataset)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default, Clone)]
pub struct DicomStreamCodec {
    read_options: ReadOptions,
    write_options: WriteOptions,
}

impl DicomStreamCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_options(mut self, options: ReadOptions) -> Self {
        self.read_options = options;
        self
    }

    pub fn write_options(mut self, options: WriteOptions) -> Self {
        self.write_options = options;
        self
    }

    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> Result<DataSet> {
        let stream: Arc<dyn ByteStream> =
            Arc::new(FileStream::open(path).context(OpenFileSnafu)?);
        self.read(&stream)
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P, dataset: &DataSet) -> Result<u64> {
        let stream = FileStream::create(path).context(OpenFileSnafu)?;
        self.write(&stream, dataset)
    }

    /// Read a file from the start of the stream.
    ///
    /// The file meta elements are merged into the returned data set
    /// as group 0002, without their group length.
    pub fn read(&self, stream: &Arc<dyn ByteStream>) -> Result<DataSet> {
        let len = stream.len().context(StreamLengthSnafu)?;

        let start = match self.read_options.read_preamble {
            ReadPreamble::Always => {
                ensure!(has_magic(&**stream, PREAMBLE_LENGTH)?, MissingMagicSnafu);
                Some(PREAMBLE_LENGTH + 4)
            }
            ReadPreamble::Never => has_magic(&**stream, 0)?.then_some(4),
            ReadPreamble::Auto => {
                if has_magic(&**stream, PREAMBLE_LENGTH)? {
                    Some(PREAMBLE_LENGTH + 4)
                } else if has_magic(&**stream, 0)? {
                    Some(4)
                } else {
                    None
                }
            }
        };

        let (meta, body_start, ts) = match start {
            Some(position) => {
                let (meta, end) = read_meta(&**stream, position, len)?;
                let ts = meta_transfer_syntax(&meta)?;
                (Some(meta), end, ts)
            }
            None => {
                debug!("No magic code, reading a raw data set");
                (None, 0, transfer_syntax::default())
            }
        };
        debug!("Reading main data set at {} as {}", body_start, ts);

        let parsed = parse_stream(
            stream,
            body_start,
            ReadMode::from(&ts),
            self.read_options.max_buffer_load,
            None,
            0,
        )
        .context(ParseDataSetSnafu)?;
        if parsed.corrected {
            debug!("Main data set finished as {}", parsed.mode);
        }

        let mut dataset = parsed.dataset;
        if let Some(mut meta) = meta {
            if let Some(reps) = meta.remove_group(0x0002) {
                dataset.put_group(0x0002, reps);
            }
        }
        Ok(dataset)
    }

    /// Write a file at the start of the stream,
    /// in the transfer syntax named by the data set's meta group
    /// (explicit VR little endian if there is none).
    ///
    /// Returns the position after the last byte written.
    pub fn write(&self, stream: &dyn ByteStream, dataset: &DataSet) -> Result<u64> {
        let ts = match dataset
            .string(tags::TRANSFER_SYNTAX_UID)
            .context(MetaAttributeSnafu)?
        {
            Some(uid) => *transfer_syntax::get(&uid)
                .context(UnknownTransferSyntaxSnafu { uid: &uid })?,
            None => entries::EXPLICIT_VR_LITTLE_ENDIAN,
        };
        ensure!(
            ts.is_supported(),
            UnsupportedTransferSyntaxSnafu { uid: ts.uid() }
        );
        if let Some(buffers) = dataset.buffers(tags::PIXEL_DATA) {
            // encapsulated pixel data always holds its offset table
            let valid = if ts.is_encapsulated() {
                !buffers.is_empty()
            } else {
                buffers.len() <= 1
            };
            ensure!(
                valid,
                PixelDataEncapsulationSnafu {
                    uid: ts.uid(),
                    buffers: buffers.len(),
                }
            );
        }

        let mut position = 0;
        if self.write_options.write_preamble {
            stream
                .write_at(0, &[0; PREAMBLE_LENGTH as usize])
                .context(WritePreambleSnafu)?;
            position = PREAMBLE_LENGTH;
        }
        stream
            .write_at(position, &DICM_MAGIC_CODE)
            .context(WritePreambleSnafu)?;
        position += 4;

        let meta = meta_group(dataset, &ts);
        position = build_stream(
            stream,
            position,
            &meta,
            WriteMode::from(&entries::EXPLICIT_VR_LITTLE_ENDIAN),
            &BuildOptions::new().group_length(true),
        )
        .context(BuildDataSetSnafu)?;

        debug!("Writing main data set at {} as {}", position, ts);
        let mut body = dataset.clone();
        body.remove_group(0x0002);
        build_stream(
            stream,
            position,
            &body,
            WriteMode::from(&ts),
            &BuildOptions::new()
                .group_length(self.write_options.group_length)
                .encapsulated_pixel_data(ts.is_encapsulated()),
        )
        .context(BuildDataSetSnafu)
    }
}

fn has_magic(stream: &dyn ByteStream, position: u64) -> Result<bool> {
    let mut magic = [0; 4];
    match stream.read_exact_at(position, &mut magic) {
        Ok(()) => Ok(magic == DICM_MAGIC_CODE),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e).context(ReadMagicSnafu),
    }
}

/// Read the file meta group starting at `position`.
/// Returns the group and the position of the first element after it.
fn read_meta(stream: &dyn ByteStream, mut position: u64, len: u64) -> Result<(DataSet, u64)> {
    let decoder = ExplicitVrLittleEndianDecoder::default();
    let mut meta = DataSet::new();

    while position + 4 <= len {
        // the main data set may use another encoding, so look at the group first
        let mut group = [0; 2];
        stream
            .read_exact_at(position, &mut group)
            .context(InspectMetaSnafu { position })?;
        if u16::from_le_bytes(group) != 0x0002 {
            break;
        }

        let mut reader = StreamReader::new(stream, position);
        let (header, header_len) = decoder
            .decode_header(&mut reader)
            .context(ReadMetaHeaderSnafu { position })?;
        let tag = header.tag;
        let value_len = header
            .len
            .get()
            .context(UndefinedMetaLengthSnafu { tag })?;
        let value_start = position + header_len as u64;
        ensure!(
            value_start + u64::from(value_len) <= len,
            MetaLengthOverrunSnafu {
                tag,
                len: value_len
            }
        );

        let mut data = vec![0; value_len as usize];
        stream
            .read_exact_at(value_start, &mut data)
            .context(ReadMetaValueSnafu { tag })?;
        if !tag.is_group_length() {
            meta.push_parsed(tag, DataElement::new(header.vr, data));
        }
        position = value_start + u64::from(value_len);
    }

    Ok((meta, position))
}

fn meta_transfer_syntax(meta: &DataSet) -> Result<TransferSyntax> {
    let uid = meta
        .string(tags::TRANSFER_SYNTAX_UID)
        .context(MetaAttributeSnafu)?
        .context(MissingTransferSyntaxSnafu)?;
    let ts = transfer_syntax::get(&uid).context(UnknownTransferSyntaxSnafu { uid: &uid })?;
    ensure!(
        ts.is_supported(),
        UnsupportedTransferSyntaxSnafu { uid: ts.uid() }
    );
    Ok(*ts)
}

/// The file meta group to write before the given data set.
fn meta_group(dataset: &DataSet, ts: &TransferSyntax) -> DataSet {
    let mut meta = DataSet::new();
    if let Some(group) = dataset.group(0x0002, 0) {
        for (&element, e) in group.iter() {
            meta.put(Tag(0x0002, element), e.clone());
        }
    }
    meta.remove(tags::FILE_META_INFORMATION_GROUP_LENGTH);

    if meta.get(tags::FILE_META_INFORMATION_VERSION).is_none() {
        meta.put(
            tags::FILE_META_INFORMATION_VERSION,
            DataElement::new(VR::OB, vec![0x00, 0x01]),
        );
    }
    for (source, target) in [
        (tags::SOP_CLASS_UID, tags::MEDIA_STORAGE_SOP_CLASS_UID),
        (tags::SOP_INSTANCE_UID, tags::MEDIA_STORAGE_SOP_INSTANCE_UID),
    ] {
        if meta.get(target).is_none() {
            if let Some(e) = dataset.get(source) {
                meta.put(target, e.clone());
            }
        }
    }
    meta.set_string(tags::TRANSFER_SYNTAX_UID, VR::UI, ts.uid());
    if meta.get(tags::IMPLEMENTATION_CLASS_UID).is_none() {
        meta.set_string(tags::IMPLEMENTATION_CLASS_UID, VR::UI, IMPLEMENTATION_CLASS_UID);
    }
    if meta.get(tags::IMPLEMENTATION_VERSION_NAME).is_none() {
        meta.set_string(
            tags::IMPLEMENTATION_VERSION_NAME,
            VR::SH,
            IMPLEMENTATION_VERSION_NAME,
        );
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmcodec_core::{Buffer, MemoryStream};

    fn sample() -> DataSet {
        let mut ds = DataSet::new();
        ds.set_string(tags::SOP_CLASS_UID, VR::UI, "1.2.840.10008.5.1.4.1.1.7");
        ds.set_string(tags::SOP_INSTANCE_UID, VR::UI, "2.25.1234");
        ds.set_string(tags::PATIENT_NAME, VR::PN, "Doe^John");
        ds.set_uint(tags::ROWS, VR::US, 2).unwrap();
        ds.set_uint(tags::COLUMNS, VR::US, 2).unwrap();
        ds.put(tags::PIXEL_DATA, DataElement::new(VR::OW, vec![1, 0, 2, 0, 3, 0, 4, 0]));
        ds
    }

    fn with_ts(mut ds: DataSet, ts: &TransferSyntax) -> DataSet {
        ds.set_string(tags::TRANSFER_SYNTAX_UID, VR::UI, ts.uid());
        ds
    }

    fn round_trip(ds: &DataSet, codec: &DicomStreamCodec) -> (Vec<u8>, DataSet) {
        let stream = MemoryStream::new();
        let end = codec.write(&stream, ds).unwrap();
        let bytes = stream.to_vec();
        assert_eq!(end, bytes.len() as u64);
        let stream: Arc<dyn ByteStream> = Arc::new(MemoryStream::from_bytes(bytes.clone()));
        (bytes, codec.read(&stream).unwrap())
    }

    #[test]
    fn write_fills_in_the_meta_group() {
        let codec = DicomStreamCodec::new();
        let (bytes, read) = round_trip(&sample(), &codec);

        assert!(bytes[..128].iter().all(|&b| b == 0));
        assert_eq!(&bytes[128..132], b"DICM");
        // group length comes first, explicit VR little endian
        assert_eq!(&bytes[132..140], &[0x02, 0x00, 0x00, 0x00, b'U', b'L', 0x04, 0x00]);

        assert_eq!(
            read.string(tags::TRANSFER_SYNTAX_UID).unwrap().as_deref(),
            Some(entries::EXPLICIT_VR_LITTLE_ENDIAN.uid())
        );
        assert_eq!(
            read.string(tags::MEDIA_STORAGE_SOP_INSTANCE_UID).unwrap().as_deref(),
            Some("2.25.1234")
        );
        assert_eq!(
            read.bytes(tags::FILE_META_INFORMATION_VERSION).unwrap().as_deref(),
            Some(&[0x00, 0x01][..])
        );
        assert!(read.get(tags::FILE_META_INFORMATION_GROUP_LENGTH).is_none());
        assert_eq!(
            read.string(tags::PATIENT_NAME).unwrap().as_deref(),
            Some("Doe^John")
        );
    }

    #[test]
    fn body_follows_the_transfer_syntax() {
        let codec = DicomStreamCodec::new();
        let ds = with_ts(sample(), &entries::EXPLICIT_VR_BIG_ENDIAN);
        let (_, read) = round_trip(&ds, &codec);

        let mut expected = read.clone();
        expected.remove_group(0x0002);
        let mut original = ds.clone();
        original.remove_group(0x0002);
        assert_eq!(expected, original);
        assert_eq!(read.uint(tags::ROWS).unwrap(), Some(2));
    }

    #[test]
    fn no_preamble_is_found_by_auto() {
        let codec =
            DicomStreamCodec::new().write_options(WriteOptions::new().write_preamble(false));
        let (bytes, read) = round_trip(&sample(), &codec);
        assert_eq!(&bytes[..4], b"DICM");
        assert_eq!(read.uint(tags::COLUMNS).unwrap(), Some(2));
    }

    #[test]
    fn preamble_required_but_missing() {
        let writer =
            DicomStreamCodec::new().write_options(WriteOptions::new().write_preamble(false));
        let stream = MemoryStream::new();
        writer.write(&stream, &sample()).unwrap();
        let stream: Arc<dyn ByteStream> = Arc::new(stream);

        let reader = DicomStreamCodec::new()
            .read_options(ReadOptions::new().read_preamble(ReadPreamble::Always));
        let err = reader.read(&stream).unwrap_err();
        assert!(matches!(err, Error::MissingMagic { .. }));
        assert_eq!(err.kind(), ErrorKind::WrongTransferSyntax);
    }

    #[test]
    fn raw_data_sets_are_implicit_vr_little_endian() {
        #[rustfmt::skip]
        let raw: Vec<u8> = vec![
            // (0028,0010) Rows, length 2, value 16
            0x28, 0x00, 0x10, 0x00, 0x02, 0x00, 0x00, 0x00, 0x10, 0x00,
        ];
        let stream: Arc<dyn ByteStream> = Arc::new(MemoryStream::from_bytes(raw));
        let read = DicomStreamCodec::new().read(&stream).unwrap();
        assert_eq!(read.uint(tags::ROWS).unwrap(), Some(16));
        assert!(read.get(tags::TRANSFER_SYNTAX_UID).is_none());
    }

    #[test]
    fn unsupported_transfer_syntax_is_rejected() {
        let codec = DicomStreamCodec::new();
        let mut ds = sample();
        ds.set_string(
            tags::TRANSFER_SYNTAX_UID,
            VR::UI,
            entries::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN.uid(),
        );
        let err = codec.write(&MemoryStream::new(), &ds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongTransferSyntax);

        ds.set_string(tags::TRANSFER_SYNTAX_UID, VR::UI, "1.2.3.4");
        let err = codec.write(&MemoryStream::new(), &ds).unwrap_err();
        assert!(matches!(err, Error::UnknownTransferSyntax { .. }));
    }

    #[test]
    fn unknown_transfer_syntax_on_read() {
        // write a valid file, then patch the meta group
        let codec = DicomStreamCodec::new();
        let ds = with_ts(sample(), &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        let stream = MemoryStream::new();
        codec.write(&stream, &ds).unwrap();
        let mut bytes = stream.to_vec();
        let uid = entries::EXPLICIT_VR_LITTLE_ENDIAN.uid().as_bytes();
        let at = bytes
            .windows(uid.len())
            .position(|w| w == uid)
            .unwrap();
        bytes[at + uid.len() - 1] = b'9';

        let stream: Arc<dyn ByteStream> = Arc::new(MemoryStream::from_bytes(bytes));
        let err = codec.read(&stream).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongTransferSyntax);
    }

    #[test]
    fn fragments_need_an_encapsulated_transfer_syntax() {
        let codec = DicomStreamCodec::new();
        let mut ds = sample();
        ds.set_buffers(
            tags::PIXEL_DATA,
            VR::OB,
            vec![Buffer::empty(), Buffer::from(vec![1, 2, 3, 4])],
        );
        let err = codec.write(&MemoryStream::new(), &ds).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Logic);

        let ds = with_ts(ds, &entries::RLE_LOSSLESS);
        let (_, read) = round_trip(&ds, &codec);
        assert_eq!(read.buffers(tags::PIXEL_DATA).map(|b| b.len()), Some(2));
    }

    #[test]
    fn offset_table_alone_follows_the_transfer_syntax() {
        let codec = DicomStreamCodec::new();
        let mut ds = with_ts(sample(), &entries::RLE_LOSSLESS);
        ds.set_buffers(tags::PIXEL_DATA, VR::OB, vec![Buffer::empty()]);
        let (_, read) = round_trip(&ds, &codec);
        assert_eq!(read.get(tags::PIXEL_DATA).map(|e| e.vr), Some(VR::OB));
        let buffers = read.buffers(tags::PIXEL_DATA).unwrap();
        assert_eq!(buffers.len(), 1);
        assert!(buffers[0].is_empty());

        // the same single buffer is a native value in a native syntax
        let ds = with_ts(ds, &entries::EXPLICIT_VR_LITTLE_ENDIAN);
        let (_, read) = round_trip(&ds, &codec);
        assert_eq!(read.buffers(tags::PIXEL_DATA).map(|b| b.len()), Some(1));
    }
}
