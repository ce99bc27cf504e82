//! Native (uncompressed) pixel data layouts.
//!
//! A native frame is a block of stored fields of `allocated_bits` each.
//! Fields of 8 bits or more are little endian.
//! 1-bit fields are packed eight to a byte, most significant bit first.
//!
//! Without subsampling, fields are either sample-major
//! (every channel of a pixel, then the next pixel)
//! or channel-major (all of channel 0, then all of channel 1).
//! Subsampled images are always channel-major:
//! a full resolution plane for the first channel
//! followed by one reduced resolution plane per chroma channel.
//! Dimensions which are subsampled are rounded up to an even extent,
//! the extra column or row repeating the last one of the image.

use crate::sample::{from_field, saturate, to_field, Sample, SampleBuffer, SampleKind};
use dcmcodec_core::memory::Allocator;
use dcmcodec_parser::ErrorKind;
use num_traits::ToPrimitive;
use snafu::{ensure, Backtrace, Snafu};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Subsampled images cannot have 1 bit samples"))]
    SubsampledBitmap { backtrace: Backtrace },
    #[snafu(display("Unsupported bits allocated {}", bits))]
    BitsAllocated { bits: u32, backtrace: Backtrace },
    #[snafu(display("High bit {} does not fit in {} allocated bits", high_bit, allocated_bits))]
    HighBit {
        high_bit: u32,
        allocated_bits: u32,
        backtrace: Backtrace,
    },
    #[snafu(display("Pixel data has {} bytes, {} are needed", actual, needed))]
    ShortData {
        needed: u64,
        actual: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("Output has {} bytes, {} are needed", actual, needed))]
    ShortOutput {
        needed: u64,
        actual: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("Expected {} samples, got {}", expected, actual))]
    SampleCount {
        expected: usize,
        actual: usize,
        backtrace: Backtrace,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ShortData { .. } => ErrorKind::Corrupted,
            _ => ErrorKind::Logic,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// How chroma blocks are reduced to one stored sample
/// when writing subsampled images.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChromaDecimation {
    /// Keep the top-left sample of each block.
    #[default]
    Sample,
    /// Keep the rounded mean of each block.
    Average,
}

/// The number of bits of one native frame.
///
/// Odd dimensions are rounded up when subsampled.
/// The first channel is stored at full resolution
/// and every other channel at the subsampled one.
pub fn size_in_bits(
    allocated_bits: u32,
    width: u32,
    height: u32,
    channels: u32,
    subsampled_x: bool,
    subsampled_y: bool,
) -> u64 {
    let width = u64::from(if subsampled_x { width + (width & 1) } else { width });
    let height = u64::from(if subsampled_y { height + (height & 1) } else { height });
    let channel_bits = u64::from(allocated_bits) * width * height;
    if !subsampled_x && !subsampled_y {
        return channel_bits * u64::from(channels);
    }
    let mut chroma_bits = channel_bits;
    if subsampled_x {
        chroma_bits /= 2;
    }
    if subsampled_y {
        chroma_bits /= 2;
    }
    channel_bits + chroma_bits * u64::from(channels.saturating_sub(1))
}

/// The allocated bits to use for samples whose top bit is `high_bit`.
pub fn suggest_allocated_bits(high_bit: u32) -> u32 {
    if high_bit == 0 {
        1
    } else {
        (high_bit + 8) & !7
    }
}

/// The arrangement of a native frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NativeLayout {
    pub allocated_bits: u32,
    pub high_bit: u32,
    /// Sample-major order. Ignored when subsampled.
    pub interleaved: bool,
    pub subsampled_x: bool,
    pub subsampled_y: bool,
}

impl NativeLayout {
    pub fn is_subsampled(&self) -> bool {
        self.subsampled_x || self.subsampled_y
    }

    pub fn size_in_bits(&self, width: u32, height: u32, channels: u32) -> u64 {
        size_in_bits(
            self.allocated_bits,
            width,
            height,
            channels,
            self.subsampled_x,
            self.subsampled_y,
        )
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            matches!(self.allocated_bits, 1 | 8 | 16 | 24 | 32),
            BitsAllocatedSnafu {
                bits: self.allocated_bits
            }
        );
        ensure!(
            self.high_bit < self.allocated_bits,
            HighBitSnafu {
                high_bit: self.high_bit,
                allocated_bits: self.allocated_bits,
            }
        );
        ensure!(
            !(self.allocated_bits == 1 && self.is_subsampled()),
            SubsampledBitmapSnafu
        );
        Ok(())
    }
}

/// Dimensions of a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl Extent {
    fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn samples(&self) -> usize {
        self.pixels() * self.channels as usize
    }
}

/// Positioned access to the fields of a frame.
#[derive(Debug, Copy, Clone)]
struct Fields {
    allocated_bits: u32,
    bit_offset: u64,
}

impl Fields {
    fn get(&self, data: &[u8], index: usize) -> u32 {
        if self.allocated_bits == 1 {
            let bit = self.bit_offset + index as u64;
            let byte = data[(bit / 8) as usize];
            u32::from((byte >> (7 - bit % 8)) & 1)
        } else {
            let width = (self.allocated_bits / 8) as usize;
            let start = (self.bit_offset / 8) as usize + index * width;
            data[start..start + width]
                .iter()
                .rev()
                .fold(0, |field, &b| (field << 8) | u32::from(b))
        }
    }

    fn put(&self, out: &mut [u8], index: usize, field: u32) {
        if self.allocated_bits == 1 {
            let bit = self.bit_offset + index as u64;
            let mask = 0x80 >> (bit % 8);
            let byte = &mut out[(bit / 8) as usize];
            if field & 1 == 1 {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        } else {
            let width = (self.allocated_bits / 8) as usize;
            let start = (self.bit_offset / 8) as usize + index * width;
            out[start..start + width].copy_from_slice(&field.to_le_bytes()[..width]);
        }
    }
}

/// A stored plane of a subsampled image,
/// holding raw fields.
#[derive(Debug)]
struct Channel {
    width: usize,
    height: usize,
    factor_x: usize,
    factor_y: usize,
    fields: Vec<i32>,
}

fn channel_shapes(extent: &Extent, layout: &NativeLayout) -> Vec<(usize, usize, usize, usize)> {
    let padded_width = (extent.width + (extent.width & u32::from(layout.subsampled_x))) as usize;
    let padded_height =
        (extent.height + (extent.height & u32::from(layout.subsampled_y))) as usize;
    let factor_x = if layout.subsampled_x { 2 } else { 1 };
    let factor_y = if layout.subsampled_y { 2 } else { 1 };
    (0..extent.channels)
        .map(|c| {
            if c == 0 {
                (padded_width, padded_height, 1, 1)
            } else {
                (
                    padded_width / factor_x,
                    padded_height / factor_y,
                    factor_x,
                    factor_y,
                )
            }
        })
        .collect()
}

fn check_len(len: usize, bit_offset: u64, bits: u64) -> Option<u64> {
    let needed = (bit_offset + bits + 7) / 8;
    if (len as u64) < needed {
        Some(needed)
    } else {
        None
    }
}

/// Read one frame, starting `bit_offset` bits into `data`.
pub fn read_frame(
    data: &[u8],
    bit_offset: u64,
    layout: &NativeLayout,
    extent: &Extent,
    kind: SampleKind,
    allocator: &dyn Allocator,
) -> Result<SampleBuffer> {
    layout.validate()?;
    let bits = layout.size_in_bits(extent.width, extent.height, extent.channels);
    if let Some(needed) = check_len(data.len(), bit_offset, bits) {
        return ShortDataSnafu {
            needed,
            actual: data.len(),
        }
        .fail();
    }
    let reader = Reader {
        data,
        fields: Fields {
            allocated_bits: layout.allocated_bits,
            bit_offset,
        },
        layout,
        extent,
        allocator,
    };
    Ok(match kind {
        SampleKind::U8 => reader.read::<u8>(),
        SampleKind::I8 => reader.read::<i8>(),
        SampleKind::U16 => reader.read::<u16>(),
        SampleKind::I16 => reader.read::<i16>(),
        SampleKind::U32 => reader.read::<u32>(),
        SampleKind::I32 => reader.read::<i32>(),
    })
}

/// Write one frame into `out`, starting `bit_offset` bits into it.
/// Other bits of `out` are left as they are.
pub fn write_frame(
    samples: &SampleBuffer,
    out: &mut [u8],
    bit_offset: u64,
    layout: &NativeLayout,
    extent: &Extent,
    decimation: ChromaDecimation,
    allocator: &dyn Allocator,
) -> Result<()> {
    layout.validate()?;
    ensure!(
        samples.len() == extent.samples(),
        SampleCountSnafu {
            expected: extent.samples(),
            actual: samples.len(),
        }
    );
    let bits = layout.size_in_bits(extent.width, extent.height, extent.channels);
    if let Some(needed) = check_len(out.len(), bit_offset, bits) {
        return ShortOutputSnafu {
            needed,
            actual: out.len(),
        }
        .fail();
    }
    let mut writer = Writer {
        out,
        fields: Fields {
            allocated_bits: layout.allocated_bits,
            bit_offset,
        },
        layout,
        extent,
        decimation,
        allocator,
    };
    crate::dispatch_samples!(samples, v => writer.write(v));
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
    fields: Fields,
    layout: &'a NativeLayout,
    extent: &'a Extent,
    allocator: &'a dyn Allocator,
}

impl Reader<'_> {
    fn read<T: Sample>(&self) -> SampleBuffer {
        let samples = if self.layout.is_subsampled() {
            self.read_subsampled::<T>()
        } else {
            self.read_plain::<T>()
        };
        T::into_buffer(samples)
    }

    fn read_plain<T: Sample>(&self) -> Vec<T> {
        let pixels = self.extent.pixels();
        let channels = self.extent.channels as usize;
        let sample_major = self.layout.interleaved || channels == 1;
        let mut samples = vec![T::zero(); pixels * channels];
        for p in 0..pixels {
            for c in 0..channels {
                let stored = if sample_major {
                    p * channels + c
                } else {
                    c * pixels + p
                };
                let field = self.fields.get(self.data, stored);
                samples[p * channels + c] = from_field(field, self.layout.high_bit);
            }
        }
        samples
    }

    fn read_subsampled<T: Sample>(&self) -> Vec<T> {
        let mut index = 0;
        let planes: Vec<Channel> = channel_shapes(self.extent, self.layout)
            .into_iter()
            .map(|(width, height, factor_x, factor_y)| {
                let mut fields = self.allocator.samples(width * height);
                for field in fields.iter_mut() {
                    *field = self.fields.get(self.data, index) as i32;
                    index += 1;
                }
                Channel {
                    width,
                    height,
                    factor_x,
                    factor_y,
                    fields,
                }
            })
            .collect();

        let width = self.extent.width as usize;
        let channels = planes.len();
        let mut samples = vec![T::zero(); self.extent.samples()];
        for (c, plane) in planes.iter().enumerate() {
            debug_assert!(plane.height * plane.factor_y >= self.extent.height as usize);
            for (p, sample) in samples.iter_mut().skip(c).step_by(channels).enumerate() {
                let (x, y) = (p % width, p / width);
                let field = plane.fields[(y / plane.factor_y) * plane.width + x / plane.factor_x];
                *sample = from_field(field as u32, self.layout.high_bit);
            }
        }
        for plane in planes {
            self.allocator.release_samples(plane.fields);
        }
        samples
    }
}

struct Writer<'a> {
    out: &'a mut [u8],
    fields: Fields,
    layout: &'a NativeLayout,
    extent: &'a Extent,
    decimation: ChromaDecimation,
    allocator: &'a dyn Allocator,
}

impl Writer<'_> {
    fn write<T: Sample>(&mut self, samples: &[T]) {
        if self.layout.is_subsampled() {
            self.write_subsampled(samples)
        } else {
            self.write_plain(samples)
        }
    }

    fn write_plain<T: Sample>(&mut self, samples: &[T]) {
        let pixels = self.extent.pixels();
        let channels = self.extent.channels as usize;
        let sample_major = self.layout.interleaved || channels == 1;
        for p in 0..pixels {
            for c in 0..channels {
                let stored = if sample_major {
                    p * channels + c
                } else {
                    c * pixels + p
                };
                let field = to_field(samples[p * channels + c], self.layout.high_bit);
                self.fields.put(self.out, stored, field);
            }
        }
    }

    fn write_subsampled<T: Sample>(&mut self, samples: &[T]) {
        let width = self.extent.width as usize;
        let height = self.extent.height as usize;
        let channels = self.extent.channels as usize;
        let value_at = |x: usize, y: usize, c: usize| -> i64 {
            let (x, y) = (x.min(width - 1), y.min(height - 1));
            samples[(y * width + x) * channels + c].to_i64().unwrap_or(0)
        };

        let mut index = 0;
        for (c, (plane_width, plane_height, factor_x, factor_y)) in
            channel_shapes(self.extent, self.layout).into_iter().enumerate()
        {
            let mut fields = self.allocator.samples(plane_width * plane_height);
            for by in 0..plane_height {
                for bx in 0..plane_width {
                    let (x0, y0) = (bx * factor_x, by * factor_y);
                    let value = match self.decimation {
                        ChromaDecimation::Average if factor_x * factor_y > 1 => {
                            let xs = x0..(x0 + factor_x).min(width).max(x0 + 1);
                            let ys = y0..(y0 + factor_y).min(height).max(y0 + 1);
                            let n = (xs.len() * ys.len()) as i64;
                            let sum: i64 = ys
                                .flat_map(|y| xs.clone().map(move |x| (x, y)))
                                .map(|(x, y)| value_at(x, y, c))
                                .sum();
                            (2 * sum + n).div_euclid(2 * n)
                        }
                        _ => value_at(x0, y0, c),
                    };
                    let field = to_field(saturate::<T>(value), self.layout.high_bit);
                    fields[by * plane_width + bx] = field as i32;
                }
            }
            for &field in &fields {
                self.fields.put(self.out, index, field as u32);
                index += 1;
            }
            self.allocator.release_samples(fields);
        }
    }
}
