//! RLE Lossless compression of pixel data frames.
//!
//! A compressed frame starts with a 64-byte header:
//! the number of segments followed by fifteen segment offsets,
//! all little endian 32-bit values.
//! Each segment holds one byte plane of one channel,
//! the most significant plane of a channel coming first.
//!
//! Within a segment, a header byte `n` announces
//! a literal run of `n + 1` bytes when `n < 128`,
//! a replicate run of `257 - n` copies of the next byte when `n > 128`,
//! and nothing when `n == 128`.

use crate::native::Extent;
use crate::sample::{from_field, to_field, Sample, SampleBuffer, SampleKind};
use byteorder::{ByteOrder, LittleEndian};
use dcmcodec_core::memory::Allocator;
use dcmcodec_parser::ErrorKind;
use snafu::{ensure, Backtrace, OptionExt, Snafu};

/// The length of the segment table preceding the segments.
pub const HEADER_LENGTH: usize = 64;

/// The maximum number of segments in a frame.
pub const MAX_SEGMENTS: usize = 15;

const MAX_RUN: usize = 128;
const NO_OP: u8 = 0x80;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("RLE frame of {} bytes is too short for its header", len))]
    TruncatedHeader { len: usize, backtrace: Backtrace },
    #[snafu(display("RLE frame declares {} segments, {} expected", declared, expected))]
    SegmentCount {
        declared: u32,
        expected: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("Offset {} of RLE segment #{} is out of bounds", offset, index))]
    SegmentOffset {
        index: usize,
        offset: u32,
        backtrace: Backtrace,
    },
    #[snafu(display("RLE segment expands past {} bytes", expected))]
    Overrun { expected: usize, backtrace: Backtrace },
    #[snafu(display("RLE segment expands to {} bytes, {} expected", actual, expected))]
    Underrun {
        expected: usize,
        actual: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("RLE record at {} is cut short", offset))]
    TruncatedRecord { offset: usize, backtrace: Backtrace },
    #[snafu(display("Cannot compress {} byte planes in one RLE frame", segments))]
    TooManySegments { segments: usize, backtrace: Backtrace },
    #[snafu(display("RLE compression does not support {} allocated bits", bits))]
    BitsAllocated { bits: u32, backtrace: Backtrace },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TooManySegments { .. } | Error::BitsAllocated { .. } => ErrorKind::Logic,
            _ => ErrorKind::Corrupted,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn push_literal(bytes: &[u8], out: &mut Vec<u8>) {
    for chunk in bytes.chunks(MAX_RUN) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
}

fn encode_row(row: &[u8], out: &mut Vec<u8>) {
    let mut literal_start = 0;
    let mut i = 0;
    while i < row.len() {
        let value = row[i];
        let run = row[i..]
            .iter()
            .take(MAX_RUN)
            .take_while(|&&b| b == value)
            .count();
        if run >= 2 {
            push_literal(&row[literal_start..i], out);
            out.push((257 - run) as u8);
            out.push(value);
            i += run;
            literal_start = i;
        } else {
            i += 1;
        }
    }
    push_literal(&row[literal_start..], out);
}

/// Compress one byte plane onto the end of `out`.
///
/// Runs never cross a row of `row_len` bytes,
/// and the segment is padded to an even length.
pub fn encode_segment(plane: &[u8], row_len: usize, out: &mut Vec<u8>) {
    let start = out.len();
    for row in plane.chunks(row_len.max(1)) {
        encode_row(row, out);
    }
    if (out.len() - start) % 2 == 1 {
        out.push(NO_OP);
    }
}

/// Expand one segment into exactly `out.len()` bytes.
pub fn decode_segment(segment: &[u8], out: &mut [u8]) -> Result<()> {
    let expected = out.len();
    let mut pos = 0;
    let mut written = 0;
    while written < expected {
        let header = match segment.get(pos) {
            Some(&n) => n,
            None => {
                return UnderrunSnafu {
                    expected,
                    actual: written,
                }
                .fail()
            }
        };
        let record = pos;
        pos += 1;
        match header {
            NO_OP => {}
            n if n < NO_OP => {
                let len = usize::from(n) + 1;
                let literal = segment
                    .get(pos..pos + len)
                    .context(TruncatedRecordSnafu { offset: record })?;
                ensure!(written + len <= expected, OverrunSnafu { expected });
                out[written..written + len].copy_from_slice(literal);
                pos += len;
                written += len;
            }
            n => {
                let len = 257 - usize::from(n);
                let value = *segment
                    .get(pos)
                    .context(TruncatedRecordSnafu { offset: record })?;
                ensure!(written + len <= expected, OverrunSnafu { expected });
                out[written..written + len].fill(value);
                pos += 1;
                written += len;
            }
        }
    }
    // a single byte of padding may follow, or any number of no-ops
    let rest = segment.get(pos..).unwrap_or_default();
    ensure!(
        rest.len() <= 1 || rest.iter().all(|&b| b == NO_OP),
        OverrunSnafu { expected }
    );
    Ok(())
}

/// Compress a frame made of the given byte planes, in segment order.
pub fn encode_frame(planes: &[&[u8]], row_len: usize) -> Result<Vec<u8>> {
    ensure!(
        planes.len() <= MAX_SEGMENTS,
        TooManySegmentsSnafu {
            segments: planes.len()
        }
    );
    let mut out = vec![0; HEADER_LENGTH];
    LittleEndian::write_u32(&mut out[0..4], planes.len() as u32);
    for (i, plane) in planes.iter().enumerate() {
        let offset = out.len() as u32;
        LittleEndian::write_u32(&mut out[4 + 4 * i..8 + 4 * i], offset);
        encode_segment(plane, row_len, &mut out);
    }
    Ok(out)
}

/// Expand a compressed frame into the given byte planes, in segment order.
pub fn decode_frame(fragment: &[u8], planes: &mut [&mut [u8]]) -> Result<()> {
    ensure!(
        fragment.len() >= HEADER_LENGTH,
        TruncatedHeaderSnafu {
            len: fragment.len()
        }
    );
    let declared = LittleEndian::read_u32(&fragment[0..4]);
    ensure!(
        declared as usize == planes.len() && planes.len() <= MAX_SEGMENTS,
        SegmentCountSnafu {
            declared,
            expected: planes.len(),
        }
    );
    let mut offsets = [0u32; MAX_SEGMENTS];
    LittleEndian::read_u32_into(&fragment[4..HEADER_LENGTH], &mut offsets);
    let offsets = &offsets[..planes.len()];

    for (index, plane) in planes.iter_mut().enumerate() {
        let offset = offsets[index];
        let start = offset as usize;
        let end = offsets
            .get(index + 1)
            .map(|&o| o as usize)
            .unwrap_or(fragment.len());
        ensure!(
            start >= HEADER_LENGTH && start <= end && end <= fragment.len(),
            SegmentOffsetSnafu { index, offset }
        );
        decode_segment(&fragment[start..end], plane)?;
    }
    Ok(())
}

fn byte_planes(allocated_bits: u32, channels: u32) -> Result<usize> {
    ensure!(
        matches!(allocated_bits, 8 | 16 | 24 | 32),
        BitsAllocatedSnafu {
            bits: allocated_bits
        }
    );
    let segments = channels as usize * (allocated_bits / 8) as usize;
    ensure!(segments <= MAX_SEGMENTS, TooManySegmentsSnafu { segments });
    Ok(segments)
}

/// Compress the samples of one image frame.
pub fn encode_image(
    samples: &SampleBuffer,
    extent: &Extent,
    allocated_bits: u32,
    high_bit: u32,
    allocator: &dyn Allocator,
) -> Result<Vec<u8>> {
    let segments = byte_planes(allocated_bits, extent.channels)?;
    let bytes = (allocated_bits / 8) as usize;
    let channels = extent.channels as usize;
    let pixels = extent.width as usize * extent.height as usize;

    let mut planes = Vec::with_capacity(segments);
    for c in 0..channels {
        for k in (0..bytes).rev() {
            let mut plane = allocator.bytes(pixels);
            crate::dispatch_samples!(samples, v => {
                for (p, byte) in plane.iter_mut().enumerate() {
                    *byte = (to_field(v[p * channels + c], high_bit) >> (8 * k)) as u8;
                }
            });
            planes.push(plane);
        }
    }
    let frame = {
        let refs: Vec<&[u8]> = planes.iter().map(Vec::as_slice).collect();
        encode_frame(&refs, extent.width as usize)
    };
    for plane in planes {
        allocator.release_bytes(plane);
    }
    frame
}

/// Expand one compressed frame into samples of the given kind.
pub fn decode_image(
    fragment: &[u8],
    extent: &Extent,
    allocated_bits: u32,
    high_bit: u32,
    kind: SampleKind,
    allocator: &dyn Allocator,
) -> Result<SampleBuffer> {
    let segments = byte_planes(allocated_bits, extent.channels)?;
    let pixels = extent.width as usize * extent.height as usize;
    let mut planes: Vec<Vec<u8>> = (0..segments).map(|_| allocator.bytes(pixels)).collect();
    let decoded = {
        let mut refs: Vec<&mut [u8]> = planes.iter_mut().map(Vec::as_mut_slice).collect();
        decode_frame(fragment, &mut refs)
    };
    let samples = decoded.map(|_| {
        let assembly = Assembly {
            planes: &planes,
            bytes: (allocated_bits / 8) as usize,
            channels: extent.channels as usize,
            pixels,
            high_bit,
        };
        match kind {
            SampleKind::U8 => assembly.samples::<u8>(),
            SampleKind::I8 => assembly.samples::<i8>(),
            SampleKind::U16 => assembly.samples::<u16>(),
            SampleKind::I16 => assembly.samples::<i16>(),
            SampleKind::U32 => assembly.samples::<u32>(),
            SampleKind::I32 => assembly.samples::<i32>(),
        }
    });
    for plane in planes {
        allocator.release_bytes(plane);
    }
    samples
}

struct Assembly<'a> {
    planes: &'a [Vec<u8>],
    bytes: usize,
    channels: usize,
    pixels: usize,
    high_bit: u32,
}

impl Assembly<'_> {
    fn samples<T: Sample>(&self) -> SampleBuffer {
        let mut samples = vec![T::zero(); self.pixels * self.channels];
        for c in 0..self.channels {
            let planes = &self.planes[c * self.bytes..(c + 1) * self.bytes];
            for p in 0..self.pixels {
                let field = planes
                    .iter()
                    .fold(0u32, |field, plane| (field << 8) | u32::from(plane[p]));
                samples[p * self.channels + c] = from_field(field, self.high_bit);
            }
        }
        T::into_buffer(samples)
    }
}
