//! Reading and writing image frames of a data set.

use crate::attribute;
use crate::image::{ColorSpace, Image};
use crate::native::{self, suggest_allocated_bits, ChromaDecimation, Extent, NativeLayout};
use crate::rle;
use crate::sample::SampleKind;
use crate::{
    AttributeSnafu, ChannelCountSnafu, CreateImageSnafu, FrameMismatchSnafu, FrameNumberSnafu,
    FrameOutOfRangeSnafu, ImageTooBigSnafu, InvalidBitsAllocatedSnafu, InvalidColorSpaceSnafu,
    InvalidEncodingSnafu, InvalidHighBitSnafu, LoadPixelDataSnafu, MissingDimensionsSnafu,
    MissingFragmentSnafu, MissingPixelDataSnafu, NativeSnafu, PixelDataTooLongSnafu, Result,
    RleSnafu, UnexpectedFragmentsSnafu, UnknownTransferSyntaxSnafu, UnsupportedLayoutSnafu,
    UnsupportedTransferSyntaxSnafu, WriteAttributeSnafu,
};
use byteorder::{ByteOrder, LittleEndian};
use dcmcodec_core::memory::{Allocator, SystemAllocator};
use dcmcodec_core::{tags, Buffer, DataSet, Tag, VR};
use dcmcodec_encoding::transfer_syntax::{self, entries, TransferSyntax};
use dcmcodec_encoding::Codec;
use snafu::{ensure, OptionExt, ResultExt};
use std::convert::TryFrom;
use std::sync::Arc;
use tracing::debug;

/// The default maximum number of columns of a decoded image.
pub const DEFAULT_MAX_WIDTH: u32 = 4096;
/// The default maximum number of rows of a decoded image.
pub const DEFAULT_MAX_HEIGHT: u32 = 4096;

/// Which axes of the chroma channels are stored at half resolution.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Subsampling {
    pub x: bool,
    pub y: bool,
}

impl Subsampling {
    /// The subsampling implied by a color space name.
    pub fn of(color_space: ColorSpace) -> Self {
        Subsampling {
            x: color_space.subsampled_x(),
            y: color_space.subsampled_y(),
        }
    }
}

/// Options for decoding image frames.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct TranscodeOptions {
    /// Images with more columns are rejected before decoding.
    pub max_width: u32,
    /// Images with more rows are rejected before decoding.
    pub max_height: u32,
    /// Subsampling to assume instead of the one named by the color space.
    pub subsampling: Option<Subsampling>,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        TranscodeOptions {
            max_width: DEFAULT_MAX_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
            subsampling: None,
        }
    }
}

impl TranscodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_size(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn subsampling(mut self, subsampling: Subsampling) -> Self {
        self.subsampling = Some(subsampling);
        self
    }
}

/// How a frame is stored by [`set_image`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct ImageEncoding {
    /// Explicit VR little endian by default.
    pub transfer_syntax: TransferSyntax,
    /// Derived from the image's high bit when not set.
    pub allocated_bits: Option<u32>,
    /// Sample-major order, as opposed to one plane per channel.
    pub interleaved: bool,
    /// Subsampling to apply instead of the one named by the color space.
    pub subsampling: Option<Subsampling>,
    pub decimation: ChromaDecimation,
}

impl Default for ImageEncoding {
    fn default() -> Self {
        ImageEncoding {
            transfer_syntax: entries::EXPLICIT_VR_LITTLE_ENDIAN,
            allocated_bits: None,
            interleaved: true,
            subsampling: None,
            decimation: ChromaDecimation::Sample,
        }
    }
}

impl ImageEncoding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transfer_syntax(mut self, transfer_syntax: TransferSyntax) -> Self {
        self.transfer_syntax = transfer_syntax;
        self
    }

    pub fn allocated_bits(mut self, allocated_bits: u32) -> Self {
        self.allocated_bits = Some(allocated_bits);
        self
    }

    pub fn interleaved(mut self, interleaved: bool) -> Self {
        self.interleaved = interleaved;
        self
    }

    pub fn subsampling(mut self, subsampling: Subsampling) -> Self {
        self.subsampling = Some(subsampling);
        self
    }

    pub fn decimation(mut self, decimation: ChromaDecimation) -> Self {
        self.decimation = decimation;
        self
    }
}

/// The transfer syntax declared by a data set,
/// implicit VR little endian when none is.
pub(crate) fn declared_transfer_syntax(ds: &DataSet) -> Result<TransferSyntax> {
    match attribute::transfer_syntax_uid(ds).context(AttributeSnafu)? {
        None => Ok(transfer_syntax::default()),
        Some(uid) => transfer_syntax::get(&uid)
            .copied()
            .context(UnknownTransferSyntaxSnafu { uid }),
    }
}

/// Whether the native frames of `ds` are already stored
/// with the bits, planar configuration and subsampling
/// that `encoding` asks for.
///
/// Encodings which leave the allocated bits unset accept any.
pub(crate) fn has_native_layout(
    ds: &DataSet,
    encoding: &ImageEncoding,
    options: &TranscodeOptions,
) -> Result<bool> {
    let info = FrameInfo::read(ds, options)?;
    let stored = &info.layout;
    let subsampling = encoding
        .subsampling
        .unwrap_or_else(|| Subsampling::of(info.color_space));
    let bits = encoding.allocated_bits.unwrap_or(stored.allocated_bits);
    // planar configuration has no meaning for one channel or subsampled chroma
    let ordered = info.extent.channels == 1
        || stored.is_subsampled()
        || stored.interleaved == encoding.interleaved;
    Ok(bits == stored.allocated_bits
        && subsampling.x == stored.subsampled_x
        && subsampling.y == stored.subsampled_y
        && ordered)
}

fn check_pixel_codec(ts: &TransferSyntax) -> Result<()> {
    ensure!(
        matches!(ts.codec(), Codec::None | Codec::Rle),
        UnsupportedTransferSyntaxSnafu { name: ts.name() }
    );
    Ok(())
}

/// The attributes which describe how frames are stored,
/// as written in the data set.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredAttributes {
    rows: u32,
    columns: u32,
    samples_per_pixel: u32,
    photometric_interpretation: Option<String>,
    bits_allocated: u32,
    bits_stored: Option<u32>,
    high_bit: Option<u32>,
    pixel_representation: u32,
    planar_configuration: u32,
}

impl StoredAttributes {
    fn read(ds: &DataSet) -> Result<Self> {
        Self::read_attributes(ds).context(AttributeSnafu)
    }

    fn read_attributes(ds: &DataSet) -> attribute::Result<Self> {
        Ok(StoredAttributes {
            rows: attribute::rows(ds)?,
            columns: attribute::cols(ds)?,
            samples_per_pixel: attribute::samples_per_pixel(ds)?,
            photometric_interpretation: attribute::photometric_interpretation(ds)?,
            bits_allocated: attribute::bits_allocated(ds)?,
            bits_stored: attribute::bits_stored(ds)?,
            high_bit: attribute::high_bit(ds)?,
            pixel_representation: attribute::pixel_representation(ds)?,
            planar_configuration: attribute::planar_configuration(ds)?,
        })
    }

    /// The first attribute which differs from `other`.
    fn difference(&self, other: &StoredAttributes) -> Option<&'static str> {
        if self.rows != other.rows {
            Some("Rows")
        } else if self.columns != other.columns {
            Some("Columns")
        } else if self.samples_per_pixel != other.samples_per_pixel {
            Some("SamplesPerPixel")
        } else if self.photometric_interpretation != other.photometric_interpretation {
            Some("PhotometricInterpretation")
        } else if self.bits_allocated != other.bits_allocated {
            Some("BitsAllocated")
        } else if self.bits_stored != other.bits_stored {
            Some("BitsStored")
        } else if self.high_bit != other.high_bit {
            Some("HighBit")
        } else if self.pixel_representation != other.pixel_representation {
            Some("PixelRepresentation")
        } else if self.samples_per_pixel > 1
            && self.planar_configuration != other.planar_configuration
        {
            Some("PlanarConfiguration")
        } else {
            None
        }
    }

    fn write(&self, ds: &mut DataSet) -> Result<()> {
        fn set(ds: &mut DataSet, tag: Tag, name: &'static str, value: u32) -> Result<()> {
            ds.set_uint(tag, VR::US, value)
                .context(WriteAttributeSnafu { name })
        }
        set(ds, tags::ROWS, "Rows", self.rows)?;
        set(ds, tags::COLUMNS, "Columns", self.columns)?;
        set(ds, tags::SAMPLES_PER_PIXEL, "SamplesPerPixel", self.samples_per_pixel)?;
        if let Some(name) = &self.photometric_interpretation {
            ds.set_string(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, name);
        }
        set(ds, tags::BITS_ALLOCATED, "BitsAllocated", self.bits_allocated)?;
        if let Some(bits_stored) = self.bits_stored {
            set(ds, tags::BITS_STORED, "BitsStored", bits_stored)?;
        }
        if let Some(high_bit) = self.high_bit {
            set(ds, tags::HIGH_BIT, "HighBit", high_bit)?;
        }
        set(
            ds,
            tags::PIXEL_REPRESENTATION,
            "PixelRepresentation",
            self.pixel_representation,
        )?;
        if self.samples_per_pixel > 1 {
            set(
                ds,
                tags::PLANAR_CONFIGURATION,
                "PlanarConfiguration",
                self.planar_configuration,
            )?;
        } else {
            ds.remove(tags::PLANAR_CONFIGURATION);
        }
        Ok(())
    }
}

/// Validated description of the frames of a data set.
#[derive(Debug, Copy, Clone)]
struct FrameInfo {
    color_space: ColorSpace,
    extent: Extent,
    layout: NativeLayout,
    kind: SampleKind,
}

impl FrameInfo {
    fn read(ds: &DataSet, options: &TranscodeOptions) -> Result<Self> {
        let stored = StoredAttributes::read(ds)?;

        let mut channels = stored.samples_per_pixel;
        let name = match stored.photometric_interpretation.as_deref() {
            // files which predate the color space attribute
            None if channels <= 1 => {
                channels = 1;
                "MONOCHROME2"
            }
            None if channels == 3 => "RGB",
            None => "",
            Some(name) => name,
        };
        let color_space: ColorSpace = name.parse().context(InvalidColorSpaceSnafu)?;
        ensure!(
            color_space.channels() == channels,
            ChannelCountSnafu {
                color_space,
                required: color_space.channels(),
                declared: channels,
            }
        );

        let (width, height) = (stored.columns, stored.rows);
        ensure!(
            width <= options.max_width && height <= options.max_height,
            ImageTooBigSnafu {
                width,
                height,
                max_width: options.max_width,
                max_height: options.max_height,
            }
        );
        ensure!(
            width > 0 && height > 0,
            MissingDimensionsSnafu { width, height }
        );

        let bits_allocated = stored.bits_allocated;
        ensure!(
            matches!(bits_allocated, 1 | 8 | 16 | 24 | 32),
            InvalidBitsAllocatedSnafu {
                bits: bits_allocated
            }
        );
        let bits_stored = stored.bits_stored.unwrap_or(bits_allocated);
        let high_bit = stored.high_bit.unwrap_or_else(|| bits_stored.saturating_sub(1));
        ensure!(
            bits_stored > 0 && high_bit + 1 >= bits_stored && high_bit < bits_allocated,
            InvalidHighBitSnafu {
                high_bit,
                bits_stored,
                bits_allocated,
            }
        );

        let subsampling = options
            .subsampling
            .unwrap_or_else(|| Subsampling::of(color_space));
        let signed = stored.pixel_representation != 0;
        Ok(FrameInfo {
            color_space,
            extent: Extent {
                width,
                height,
                channels,
            },
            layout: NativeLayout {
                allocated_bits: bits_allocated,
                high_bit,
                interleaved: stored.planar_configuration == 0,
                subsampled_x: subsampling.x,
                subsampled_y: subsampling.y,
            },
            kind: SampleKind::for_high_bit(high_bit, signed),
        })
    }

    fn frame_bits(&self) -> u64 {
        self.layout
            .size_in_bits(self.extent.width, self.extent.height, self.extent.channels)
    }
}

fn check_rle_layout(layout: &NativeLayout) -> Result<()> {
    ensure!(
        !layout.is_subsampled(),
        UnsupportedLayoutSnafu {
            layout: "subsampled chroma"
        }
    );
    ensure!(
        layout.allocated_bits != 1,
        UnsupportedLayoutSnafu {
            layout: "1 bit samples"
        }
    );
    Ok(())
}

/// Decode frame `frame` of the image in a data set.
pub fn get_image(ds: &DataSet, frame: u32, options: &TranscodeOptions) -> Result<Image> {
    get_image_with(ds, frame, options, &SystemAllocator)
}

/// Decode frame `frame` of the image in a data set,
/// taking scratch memory from `allocator`.
pub fn get_image_with(
    ds: &DataSet,
    frame: u32,
    options: &TranscodeOptions,
    allocator: &dyn Allocator,
) -> Result<Image> {
    let ts = declared_transfer_syntax(ds)?;
    check_pixel_codec(&ts)?;

    let info = FrameInfo::read(ds, options)?;
    let frames = attribute::number_of_frames(ds).context(AttributeSnafu)?;
    ensure!(frame < frames, FrameOutOfRangeSnafu { frame, frames });

    let buffers = ds
        .buffers(tags::PIXEL_DATA)
        .context(MissingPixelDataSnafu)?;
    debug!(
        "Decoding frame #{} of {}x{} {} image in {}",
        frame, info.extent.width, info.extent.height, info.color_space, ts
    );

    let samples = if ts.codec() == Codec::Rle {
        check_rle_layout(&info.layout)?;
        let fragment = frame_fragment(buffers, frame, frames)?;
        rle::decode_image(
            &fragment,
            &info.extent,
            info.layout.allocated_bits,
            info.layout.high_bit,
            info.kind,
            allocator,
        )
        .context(RleSnafu)?
    } else {
        ensure!(
            buffers.len() == 1,
            UnexpectedFragmentsSnafu {
                fragments: buffers.len()
            }
        );
        let data = buffers[0].data().context(LoadPixelDataSnafu)?;
        let bit_offset = info.frame_bits() * u64::from(frame);
        native::read_frame(
            &data,
            bit_offset,
            &info.layout,
            &info.extent,
            info.kind,
            allocator,
        )
        .context(NativeSnafu)?
    };

    Image::new(
        info.extent.width,
        info.extent.height,
        info.color_space,
        info.layout.high_bit,
        samples,
    )
    .context(CreateImageSnafu)
}

/// The compressed bytes of one frame of encapsulated pixel data.
///
/// Frames are either one fragment each,
/// located through the basic offset table,
/// or all fragments together when there is a single frame.
fn frame_fragment(buffers: &[Buffer], frame: u32, frames: u32) -> Result<Arc<[u8]>> {
    let (table, fragments) = match buffers.split_first() {
        Some((table, fragments)) if !fragments.is_empty() => (table, fragments),
        _ => return MissingFragmentSnafu { frame }.fail(),
    };
    if fragments.len() == frames as usize {
        return fragments[frame as usize]
            .data()
            .context(LoadPixelDataSnafu);
    }

    let table = table.data().context(LoadPixelDataSnafu)?;
    let range = if !table.is_empty() {
        let mut offsets = vec![0; table.len() / 4];
        LittleEndian::read_u32_into(&table[..offsets.len() * 4], &mut offsets);
        ensure!(
            offsets.len() == frames as usize,
            MissingFragmentSnafu { frame }
        );
        let start = u64::from(offsets[frame as usize]);
        let end = offsets
            .get(frame as usize + 1)
            .map(|&o| u64::from(o))
            .unwrap_or(u64::MAX);
        start..end
    } else {
        ensure!(frames == 1, MissingFragmentSnafu { frame });
        0..u64::MAX
    };

    let mut data = Vec::new();
    let mut position = 0u64;
    for fragment in fragments {
        if range.contains(&position) {
            data.extend_from_slice(&fragment.data().context(LoadPixelDataSnafu)?);
        }
        // item header and content
        position += 8 + fragment.len() as u64;
    }
    ensure!(!data.is_empty(), MissingFragmentSnafu { frame });
    Ok(data.into())
}

/// Store `image` as frame `frame` of a data set.
pub fn set_image(
    ds: &mut DataSet,
    frame: u32,
    image: &Image,
    encoding: &ImageEncoding,
) -> Result<()> {
    set_image_with(ds, frame, image, encoding, &SystemAllocator)
}

/// Store `image` as frame `frame` of a data set,
/// taking scratch memory from `allocator`.
///
/// Frames are appended:
/// `frame` must be the number of frames already stored,
/// and every frame after the first must have the same attributes
/// and transfer syntax as the frames before it.
pub fn set_image_with(
    ds: &mut DataSet,
    frame: u32,
    image: &Image,
    encoding: &ImageEncoding,
    allocator: &dyn Allocator,
) -> Result<()> {
    let ts = encoding.transfer_syntax;
    check_pixel_codec(&ts)?;

    let existing = if ds.get(tags::PIXEL_DATA).is_some() {
        attribute::number_of_frames(ds).context(AttributeSnafu)?
    } else {
        0
    };
    ensure!(
        frame == existing,
        FrameNumberSnafu {
            frame,
            expected: existing
        }
    );

    let high_bit = image.high_bit();
    let bits_allocated = encoding
        .allocated_bits
        .unwrap_or_else(|| suggest_allocated_bits(high_bit));
    ensure!(
        matches!(bits_allocated, 1 | 8 | 16 | 24 | 32) && high_bit < bits_allocated,
        InvalidEncodingSnafu {
            high_bit,
            bits_allocated,
        }
    );
    let subsampling = encoding
        .subsampling
        .unwrap_or_else(|| Subsampling::of(image.color_space()));
    let layout = NativeLayout {
        allocated_bits: bits_allocated,
        high_bit,
        interleaved: encoding.interleaved,
        subsampled_x: subsampling.x,
        subsampled_y: subsampling.y,
    };
    let extent = Extent {
        width: image.width(),
        height: image.height(),
        channels: image.channels(),
    };
    let stored = StoredAttributes {
        rows: image.height(),
        columns: image.width(),
        samples_per_pixel: image.channels(),
        photometric_interpretation: Some(image.color_space().as_str().to_string()),
        bits_allocated,
        bits_stored: Some(high_bit + 1),
        high_bit: Some(high_bit),
        pixel_representation: u32::from(image.kind().is_signed()),
        planar_configuration: u32::from(!encoding.interleaved),
    };

    if frame > 0 {
        if let Some(attribute) = StoredAttributes::read(ds)?.difference(&stored) {
            return FrameMismatchSnafu { attribute }.fail();
        }
        ensure!(
            declared_transfer_syntax(ds)?.uid() == ts.uid(),
            FrameMismatchSnafu {
                attribute: "TransferSyntaxUID"
            }
        );
    }

    debug!(
        "Encoding frame #{} of {}x{} {} image in {}",
        frame,
        image.width(),
        image.height(),
        image.color_space(),
        ts
    );

    if ts.codec() == Codec::Rle {
        check_rle_layout(&layout)?;
        let fragment = rle::encode_image(
            image.samples(),
            &extent,
            bits_allocated,
            high_bit,
            allocator,
        )
        .context(RleSnafu)?;

        let mut buffers = match ds.buffers(tags::PIXEL_DATA) {
            Some(buffers) if frame > 0 => buffers.to_vec(),
            _ => vec![Buffer::empty()],
        };
        buffers.push(Buffer::new(fragment, 0));

        let mut table = Vec::with_capacity(4 * (buffers.len() - 1));
        let mut position = 0u64;
        for fragment in &buffers[1..] {
            let offset = u32::try_from(position)
                .ok()
                .context(PixelDataTooLongSnafu {
                    len: position as usize,
                })?;
            table.extend_from_slice(&offset.to_le_bytes());
            position += 8 + fragment.len() as u64;
        }
        buffers[0] = Buffer::new(table, 0);
        ds.set_buffers(tags::PIXEL_DATA, VR::OB, buffers);
    } else {
        let frame_bits = layout.size_in_bits(extent.width, extent.height, extent.channels);
        let bit_offset = frame_bits * u64::from(frame);
        let len = ((bit_offset + frame_bits + 7) / 8) as usize;
        ensure!(len < u32::MAX as usize, PixelDataTooLongSnafu { len });

        let mut data = match ds.buffers(tags::PIXEL_DATA) {
            Some([buffer]) if frame > 0 => buffer.data().context(LoadPixelDataSnafu)?.to_vec(),
            Some(buffers) if frame > 0 => {
                return UnexpectedFragmentsSnafu {
                    fragments: buffers.len(),
                }
                .fail()
            }
            _ => Vec::new(),
        };
        data.resize(len + (len & 1), 0);
        native::write_frame(
            image.samples(),
            &mut data,
            bit_offset,
            &layout,
            &extent,
            encoding.decimation,
            allocator,
        )
        .context(NativeSnafu)?;
        let vr = if bits_allocated > 8 { VR::OW } else { VR::OB };
        ds.set_buffers(tags::PIXEL_DATA, vr, vec![Buffer::new(data, 0)]);
    }

    stored.write(ds)?;
    ds.set_uint(tags::NUMBER_OF_FRAMES, VR::IS, frame + 1)
        .context(WriteAttributeSnafu {
            name: "NumberOfFrames",
        })?;
    ds.set_string(tags::TRANSFER_SYNTAX_UID, VR::UI, ts.uid());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleBuffer;
    use crate::Error;
    use dcmcodec_core::memory::MemoryPool;
    use dcmcodec_parser::ErrorKind;
    use rstest::rstest;

    fn rgb() -> Image {
        Image::new(
            2,
            2,
            ColorSpace::Rgb,
            7,
            SampleBuffer::from(vec![255u8, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255]),
        )
        .unwrap()
    }

    fn mono(values: Vec<u16>) -> Image {
        Image::new(2, 2, ColorSpace::Monochrome2, 11, SampleBuffer::from(values)).unwrap()
    }

    #[test]
    fn attributes_are_written() {
        let mut ds = DataSet::new();
        set_image(&mut ds, 0, &rgb(), &ImageEncoding::new().interleaved(false)).unwrap();
        assert_eq!(ds.uint(tags::ROWS).unwrap(), Some(2));
        assert_eq!(ds.uint(tags::SAMPLES_PER_PIXEL).unwrap(), Some(3));
        assert_eq!(
            ds.string(tags::PHOTOMETRIC_INTERPRETATION).unwrap().as_deref(),
            Some("RGB")
        );
        assert_eq!(ds.uint(tags::BITS_ALLOCATED).unwrap(), Some(8));
        assert_eq!(ds.uint(tags::BITS_STORED).unwrap(), Some(8));
        assert_eq!(ds.uint(tags::HIGH_BIT).unwrap(), Some(7));
        assert_eq!(ds.uint(tags::PIXEL_REPRESENTATION).unwrap(), Some(0));
        assert_eq!(ds.uint(tags::PLANAR_CONFIGURATION).unwrap(), Some(1));
        assert_eq!(ds.uint(tags::NUMBER_OF_FRAMES).unwrap(), Some(1));
        assert_eq!(
            ds.string(tags::TRANSFER_SYNTAX_UID).unwrap().as_deref(),
            Some(entries::EXPLICIT_VR_LITTLE_ENDIAN.uid())
        );
        let pixel_data = ds.get(tags::PIXEL_DATA).unwrap();
        assert_eq!(pixel_data.vr, VR::OB);
        assert_eq!(
            &*pixel_data.buffers().unwrap()[0].data().unwrap(),
            &[255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255]
        );

        let image = get_image(&ds, 0, &TranscodeOptions::default()).unwrap();
        assert_eq!(image, rgb());
    }

    #[rstest]
    fn frames_are_appended(
        #[values(entries::EXPLICIT_VR_LITTLE_ENDIAN, entries::RLE_LOSSLESS)] ts: TransferSyntax,
    ) {
        let frames = [mono(vec![1, 2, 3, 4]), mono(vec![5, 6, 7, 4095])];
        let encoding = ImageEncoding::new().transfer_syntax(ts);
        let mut ds = DataSet::new();
        for (i, frame) in frames.iter().enumerate() {
            set_image(&mut ds, i as u32, frame, &encoding).unwrap();
        }
        assert_eq!(ds.uint(tags::NUMBER_OF_FRAMES).unwrap(), Some(2));
        let vr = if ts.is_encapsulated() { VR::OB } else { VR::OW };
        assert_eq!(ds.get(tags::PIXEL_DATA).unwrap().vr, vr);
        let options = TranscodeOptions::default();
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(&get_image(&ds, i as u32, &options).unwrap(), frame);
        }
        let err = get_image(&ds, 2, &TranscodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::FrameOutOfRange { frame: 2, frames: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::Logic);
    }

    #[test]
    fn offset_table_of_rle_frames() {
        let mut ds = DataSet::new();
        let encoding = ImageEncoding::new().transfer_syntax(entries::RLE_LOSSLESS);
        set_image(&mut ds, 0, &mono(vec![0; 4]), &encoding).unwrap();
        set_image(&mut ds, 1, &mono(vec![1; 4]), &encoding).unwrap();
        let buffers = ds.buffers(tags::PIXEL_DATA).unwrap();
        assert_eq!(buffers.len(), 3);
        let table = buffers[0].data().unwrap();
        let first = 8 + buffers[1].len() as u32;
        assert_eq!(
            &*table,
            &[&0u32.to_le_bytes()[..], &first.to_le_bytes()[..]].concat()[..]
        );
        assert_eq!(
            frame_fragment(buffers, 1, 2).unwrap(),
            buffers[2].data().unwrap()
        );
    }

    #[test]
    fn frames_split_across_fragments() {
        let first = Buffer::new(vec![1, 2], 0);
        let second = Buffer::new(vec![3, 4], 0);
        let third = Buffer::new(vec![5, 6], 0);
        // frame 0 spans two fragments, frame 1 is the third
        let table: Vec<u8> = [0u32, 20].iter().flat_map(|o| o.to_le_bytes()).collect();
        let buffers = [Buffer::new(table, 0), first, second, third];
        assert_eq!(&*frame_fragment(&buffers, 0, 2).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(&*frame_fragment(&buffers, 1, 2).unwrap(), &[5, 6]);

        let no_table = [
            Buffer::empty(),
            Buffer::new(vec![1, 2], 0),
            Buffer::new(vec![3, 4], 0),
        ];
        assert_eq!(&*frame_fragment(&no_table, 0, 1).unwrap(), &[1, 2, 3, 4]);
        assert!(frame_fragment(&no_table, 0, 3).is_err());
    }

    #[test]
    fn mismatching_frames_are_rejected() {
        let mut ds = DataSet::new();
        set_image(&mut ds, 0, &mono(vec![0; 4]), &ImageEncoding::new()).unwrap();

        let err = set_image(&mut ds, 2, &mono(vec![0; 4]), &ImageEncoding::new()).unwrap_err();
        assert!(matches!(err, Error::FrameNumber { frame: 2, expected: 1, .. }));

        let err = set_image(&mut ds, 1, &rgb(), &ImageEncoding::new()).unwrap_err();
        assert!(matches!(err, Error::FrameMismatch { attribute: "SamplesPerPixel", .. }));

        let rle = ImageEncoding::new().transfer_syntax(entries::RLE_LOSSLESS);
        let err = set_image(&mut ds, 1, &mono(vec![0; 4]), &rle).unwrap_err();
        assert!(matches!(err, Error::FrameMismatch { attribute: "TransferSyntaxUID", .. }));
        assert_eq!(err.kind(), ErrorKind::Logic);
    }

    #[test]
    fn one_bit_frames_share_bytes() {
        let bitmap = |v: Vec<u8>| {
            Image::new(3, 1, ColorSpace::Monochrome2, 0, SampleBuffer::from(v)).unwrap()
        };
        let mut ds = DataSet::new();
        let encoding = ImageEncoding::new();
        set_image(&mut ds, 0, &bitmap(vec![1, 0, 1]), &encoding).unwrap();
        set_image(&mut ds, 1, &bitmap(vec![1, 1, 0]), &encoding).unwrap();
        assert_eq!(ds.uint(tags::BITS_ALLOCATED).unwrap(), Some(1));
        assert_eq!(
            &*ds.buffers(tags::PIXEL_DATA).unwrap()[0].data().unwrap(),
            &[0b1011_1000, 0]
        );
        let decoded = get_image(&ds, 1, &TranscodeOptions::default()).unwrap();
        assert_eq!(decoded, bitmap(vec![1, 1, 0]));

        let rle = ImageEncoding::new().transfer_syntax(entries::RLE_LOSSLESS);
        let err = set_image(&mut DataSet::new(), 0, &bitmap(vec![1, 0, 1]), &rle).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLayout { .. }));
    }

    fn raw_image(width: u32, height: u32) -> DataSet {
        let mut ds = DataSet::new();
        ds.set_uint(tags::ROWS, VR::US, height).unwrap();
        ds.set_uint(tags::COLUMNS, VR::US, width).unwrap();
        ds.set_uint(tags::BITS_ALLOCATED, VR::US, 8).unwrap();
        let len = (width * height) as usize;
        ds.set_buffers(tags::PIXEL_DATA, VR::OB, vec![Buffer::new(vec![7; len], 0)]);
        ds
    }

    #[test]
    fn legacy_images_without_color_space() {
        let ds = raw_image(2, 2);
        let image = get_image(&ds, 0, &TranscodeOptions::default()).unwrap();
        assert_eq!(image.color_space(), ColorSpace::Monochrome2);
        assert_eq!(image.kind(), SampleKind::U8);
        assert_eq!(image.high_bit(), 7);

        let mut ds = raw_image(2, 2);
        ds.set_uint(tags::SAMPLES_PER_PIXEL, VR::US, 3).unwrap();
        ds.set_buffers(tags::PIXEL_DATA, VR::OB, vec![Buffer::new(vec![7; 12], 0)]);
        let image = get_image(&ds, 0, &TranscodeOptions::default()).unwrap();
        assert_eq!(image.color_space(), ColorSpace::Rgb);
    }

    #[rustfmt::skip]
    #[rstest]
    #[case(|ds: &mut DataSet| ds.set_uint(tags::COLUMNS, VR::US, 5000).unwrap(), ErrorKind::ImageTooBig)]
    #[case(|ds: &mut DataSet| ds.set_uint(tags::ROWS, VR::US, 0).unwrap(), ErrorKind::Corrupted)]
    #[case(|ds: &mut DataSet| ds.set_uint(tags::SAMPLES_PER_PIXEL, VR::US, 2).unwrap(), ErrorKind::Corrupted)]
    #[case(|ds: &mut DataSet| ds.set_string(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "RGB"), ErrorKind::Corrupted)]
    #[case(|ds: &mut DataSet| ds.set_string(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "XYZ"), ErrorKind::Corrupted)]
    #[case(|ds: &mut DataSet| ds.set_uint(tags::BITS_ALLOCATED, VR::US, 12).unwrap(), ErrorKind::Corrupted)]
    #[case(|ds: &mut DataSet| {
        ds.set_uint(tags::BITS_STORED, VR::US, 8).unwrap();
        ds.set_uint(tags::HIGH_BIT, VR::US, 5).unwrap();
    }, ErrorKind::Corrupted)]
    #[case(|ds: &mut DataSet| ds.set_string(tags::TRANSFER_SYNTAX_UID, VR::UI, entries::JPEG_BASELINE.uid()), ErrorKind::WrongTransferSyntax)]
    #[case(|ds: &mut DataSet| ds.set_string(tags::TRANSFER_SYNTAX_UID, VR::UI, "1.2.3.4"), ErrorKind::WrongTransferSyntax)]
    #[case(|ds: &mut DataSet| { ds.remove(tags::PIXEL_DATA); }, ErrorKind::Corrupted)]
    #[case(|ds: &mut DataSet| ds.set_buffers(tags::PIXEL_DATA, VR::OB, vec![Buffer::new(vec![0; 2], 0)]), ErrorKind::Corrupted)]
    fn invalid_images(#[case] change: fn(&mut DataSet), #[case] kind: ErrorKind) {
        let mut ds = raw_image(2, 2);
        change(&mut ds);
        let err = get_image(&ds, 0, &TranscodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), kind, "{:?}", err);
    }

    #[test]
    fn size_limit_is_configurable() {
        let ds = raw_image(8, 2);
        let options = TranscodeOptions::new().max_size(4, 4);
        let err = get_image(&ds, 0, &options).unwrap_err();
        assert!(matches!(err, Error::ImageTooBig { width: 8, .. }));
        assert!(get_image(&ds, 0, &options.max_size(8, 8)).is_ok());
    }

    #[test]
    fn vertical_subsampling_through_options() {
        #[rustfmt::skip]
        let image = Image::new(1, 2, ColorSpace::YbrFull, 7, SampleBuffer::from(vec![
            10u8, 100, 200,
            20, 101, 201,
        ])).unwrap();
        let vertical = Subsampling { x: false, y: true };
        let pool = MemoryPool::new(0, 1024);
        let mut ds = DataSet::new();
        let encoding = ImageEncoding::new().subsampling(vertical);
        set_image_with(&mut ds, 0, &image, &encoding, &pool).unwrap();
        assert_eq!(
            &*ds.buffers(tags::PIXEL_DATA).unwrap()[0].data().unwrap(),
            &[10, 20, 100, 200]
        );
        let options = TranscodeOptions::new().subsampling(vertical);
        let decoded = get_image_with(&ds, 0, &options, &pool).unwrap();
        #[rustfmt::skip]
        assert_eq!(decoded.samples(), &SampleBuffer::from(vec![
            10u8, 100, 200,
            20, 100, 200,
        ]));
        assert!(pool.stats().requested > 0);
    }
}
