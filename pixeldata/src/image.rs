//! Decoded images and their color spaces.

use crate::sample::{SampleBuffer, SampleKind};
use dcmcodec_parser::ErrorKind;
use snafu::{ensure, Backtrace, Snafu};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Unrecognized color space `{}`", name))]
    UnknownColorSpace { name: String, backtrace: Backtrace },
    #[snafu(display("Image has no pixels ({}x{})", width, height))]
    EmptyImage {
        width: u32,
        height: u32,
        backtrace: Backtrace,
    },
    #[snafu(display("Expected {} samples, got {}", expected, actual))]
    SampleCount {
        expected: usize,
        actual: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("High bit {} does not fit in {} samples", high_bit, kind))]
    HighBitOutOfRange {
        high_bit: u32,
        kind: SampleKind,
        backtrace: Backtrace,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownColorSpace { .. } => ErrorKind::Corrupted,
            _ => ErrorKind::Logic,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Photometric interpretation of the pixel samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ColorSpace {
    Monochrome1,
    Monochrome2,
    PaletteColor,
    Rgb,
    Hsv,
    Argb,
    Cmyk,
    YbrFull,
    YbrFull422,
    YbrFull420,
    YbrPartial422,
    YbrPartial420,
    YbrIct,
    YbrRct,
}

impl ColorSpace {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorSpace::Monochrome1 => "MONOCHROME1",
            ColorSpace::Monochrome2 => "MONOCHROME2",
            ColorSpace::PaletteColor => "PALETTE COLOR",
            ColorSpace::Rgb => "RGB",
            ColorSpace::Hsv => "HSV",
            ColorSpace::Argb => "ARGB",
            ColorSpace::Cmyk => "CMYK",
            ColorSpace::YbrFull => "YBR_FULL",
            ColorSpace::YbrFull422 => "YBR_FULL_422",
            ColorSpace::YbrFull420 => "YBR_FULL_420",
            ColorSpace::YbrPartial422 => "YBR_PARTIAL_422",
            ColorSpace::YbrPartial420 => "YBR_PARTIAL_420",
            ColorSpace::YbrIct => "YBR_ICT",
            ColorSpace::YbrRct => "YBR_RCT",
        }
    }

    /// The number of samples per pixel.
    pub fn channels(self) -> u32 {
        match self {
            ColorSpace::Monochrome1 | ColorSpace::Monochrome2 | ColorSpace::PaletteColor => 1,
            ColorSpace::Argb | ColorSpace::Cmyk => 4,
            _ => 3,
        }
    }

    /// Whether chroma is stored at half the horizontal resolution.
    pub fn subsampled_x(self) -> bool {
        matches!(
            self,
            ColorSpace::YbrFull422
                | ColorSpace::YbrFull420
                | ColorSpace::YbrPartial422
                | ColorSpace::YbrPartial420
        )
    }

    /// Whether chroma is stored at half the vertical resolution.
    pub fn subsampled_y(self) -> bool {
        matches!(self, ColorSpace::YbrFull420 | ColorSpace::YbrPartial420)
    }

    pub fn is_monochrome(self) -> bool {
        matches!(self, ColorSpace::Monochrome1 | ColorSpace::Monochrome2)
    }
}

impl FromStr for ColorSpace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim_matches(|c: char| c == ' ' || c == '\0');
        let color_space = match name {
            "MONOCHROME1" => ColorSpace::Monochrome1,
            "MONOCHROME2" => ColorSpace::Monochrome2,
            "PALETTE COLOR" => ColorSpace::PaletteColor,
            "RGB" => ColorSpace::Rgb,
            "HSV" => ColorSpace::Hsv,
            "ARGB" => ColorSpace::Argb,
            "CMYK" => ColorSpace::Cmyk,
            "YBR_FULL" => ColorSpace::YbrFull,
            "YBR_FULL_422" => ColorSpace::YbrFull422,
            "YBR_FULL_420" => ColorSpace::YbrFull420,
            "YBR_PARTIAL_422" => ColorSpace::YbrPartial422,
            "YBR_PARTIAL_420" => ColorSpace::YbrPartial420,
            "YBR_ICT" => ColorSpace::YbrIct,
            "YBR_RCT" => ColorSpace::YbrRct,
            _ => return UnknownColorSpaceSnafu { name }.fail(),
        };
        Ok(color_space)
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded image frame.
///
/// Samples are interleaved:
/// all channels of the first pixel, then all channels of the second,
/// row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    color_space: ColorSpace,
    high_bit: u32,
    samples: SampleBuffer,
}

impl Image {
    /// Create an image,
    /// checking that the samples cover every channel of every pixel
    /// and that the sample kind can hold `high_bit`.
    pub fn new(
        width: u32,
        height: u32,
        color_space: ColorSpace,
        high_bit: u32,
        samples: SampleBuffer,
    ) -> Result<Self> {
        ensure!(width > 0 && height > 0, EmptyImageSnafu { width, height });
        let expected = width as usize * height as usize * color_space.channels() as usize;
        ensure!(
            samples.len() == expected,
            SampleCountSnafu {
                expected,
                actual: samples.len(),
            }
        );
        let kind = samples.kind();
        ensure!(
            high_bit < kind.bits(),
            HighBitOutOfRangeSnafu { high_bit, kind }
        );
        Ok(Image {
            width,
            height,
            color_space,
            high_bit,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn channels(&self) -> u32 {
        self.color_space.channels()
    }

    /// The index of the most significant meaningful bit of each sample.
    pub fn high_bit(&self) -> u32 {
        self.high_bit
    }

    pub fn kind(&self) -> SampleKind {
        self.samples.kind()
    }

    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    pub fn into_samples(self) -> SampleBuffer {
        self.samples
    }
}
