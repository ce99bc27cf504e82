//! Conversion of a data set's pixel data to another transfer syntax.

use crate::pixel_data::{declared_transfer_syntax, has_native_layout};
use crate::{attribute, get_image_with, set_image_with, ImageEncoding, TranscodeOptions};
use dcmcodec_core::memory::{Allocator, SystemAllocator};
use dcmcodec_core::{tags, DataSet, VR};
use dcmcodec_encoding::{Codec, TransferSyntax};
use dcmcodec_parser::ErrorKind;
use snafu::{ensure, ResultExt, Snafu};
use tracing::info;

#[derive(Debug, Snafu)]
pub struct Error(InnerError);

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match &self.0 {
            InnerError::SourceTransferSyntax { source } => source.kind(),
            InnerError::UnsupportedTransferSyntax { .. } => ErrorKind::WrongTransferSyntax,
            InnerError::ReadFrameCount { source } => source.kind(),
            InnerError::ReadPlanarConfiguration { source } => source.kind(),
            InnerError::ReadLayout { source } => source.kind(),
            InnerError::DecodePixelData { source, .. } => source.kind(),
            InnerError::EncodePixelData { source, .. } => source.kind(),
        }
    }
}

/// An error occurred during the transcoding process.
#[derive(Debug, Snafu)]
pub(crate) enum InnerError {
    /// Could not resolve the transfer syntax of the receiving data set
    SourceTransferSyntax { source: crate::Error },

    /// Unsupported target transfer syntax {name}
    UnsupportedTransferSyntax { name: &'static str },

    /// Could not read the number of frames
    ReadFrameCount {
        source: attribute::GetAttributeError,
    },

    /// Could not read the planar configuration
    ReadPlanarConfiguration {
        source: attribute::GetAttributeError,
    },

    /// Could not read the layout of the stored frames
    ReadLayout { source: crate::Error },

    /// Could not decode frame #{frame} of the receiving data set
    DecodePixelData { frame: u32, source: crate::Error },

    /// Could not encode frame #{frame} to the target transfer syntax
    EncodePixelData { frame: u32, source: crate::Error },
}

/// Alias for the result of transcoding a data set.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Interface for transcoding a data set's pixel data
/// to comply with a different transfer syntax.
pub trait Transcode {
    /// Convert the receiving data set's transfer syntax
    /// to the one specified in `ts`,
    /// re-encoding every frame with the default image encoding.
    fn transcode(&mut self, ts: &TransferSyntax) -> Result<()> {
        self.transcode_with(
            &ImageEncoding::new().transfer_syntax(*ts),
            &TranscodeOptions::default(),
            &SystemAllocator,
        )
    }

    /// Convert the receiving data set's pixel data
    /// to the transfer syntax and layout in `encoding`.
    ///
    /// Every frame is decoded before the pixel data is replaced.
    /// In case of an encoding error,
    /// the data set may be left with only some of its frames.
    fn transcode_with(
        &mut self,
        encoding: &ImageEncoding,
        options: &TranscodeOptions,
        allocator: &dyn Allocator,
    ) -> Result<()>;
}

impl Transcode for DataSet {
    /// Convert the data set's transfer syntax to the one specified in `ts`,
    /// keeping the stored planar configuration.
    fn transcode(&mut self, ts: &TransferSyntax) -> Result<()> {
        let planar =
            attribute::planar_configuration(self).context(ReadPlanarConfigurationSnafu)?;
        self.transcode_with(
            &ImageEncoding::new().transfer_syntax(*ts).interleaved(planar == 0),
            &TranscodeOptions::default(),
            &SystemAllocator,
        )
    }

    fn transcode_with(
        &mut self,
        encoding: &ImageEncoding,
        options: &TranscodeOptions,
        allocator: &dyn Allocator,
    ) -> Result<()> {
        let ts = encoding.transfer_syntax;
        let current = declared_transfer_syntax(self).context(SourceTransferSyntaxSnafu)?;
        ensure!(
            matches!(ts.codec(), Codec::None | Codec::Rle),
            UnsupportedTransferSyntaxSnafu { name: ts.name() }
        );

        let no_pixel_data = self.get(tags::PIXEL_DATA).is_none();
        let same_layout = no_pixel_data
            || (current.codec() == Codec::None
                && ts.codec() == Codec::None
                && has_native_layout(self, encoding, options).context(ReadLayoutSnafu)?);
        if same_layout {
            // native pixel data is stored the same way in every native syntax
            self.set_string(tags::TRANSFER_SYNTAX_UID, VR::UI, ts.uid());
            return Ok(());
        }

        let frames = attribute::number_of_frames(self).context(ReadFrameCountSnafu)?;
        let images = (0..frames)
            .map(|frame| {
                get_image_with(self, frame, options, allocator)
                    .context(DecodePixelDataSnafu { frame })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Transcoding {} frames from {} to {}",
            frames,
            current.name(),
            ts.name()
        );
        self.remove(tags::PIXEL_DATA);
        self.remove(tags::NUMBER_OF_FRAMES);
        for (frame, image) in (0..frames).zip(&images) {
            set_image_with(self, frame, image, encoding, allocator)
                .context(EncodePixelDataSnafu { frame })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{get_image, set_image, ColorSpace, Image, SampleBuffer};
    use dcmcodec_encoding::transfer_syntax::entries;

    fn image(values: Vec<i16>) -> Image {
        Image::new(3, 1, ColorSpace::Monochrome2, 11, SampleBuffer::from(values)).unwrap()
    }

    fn multi_frame(ts: TransferSyntax) -> DataSet {
        let mut ds = DataSet::new();
        let encoding = ImageEncoding::new().transfer_syntax(ts);
        set_image(&mut ds, 0, &image(vec![-2048, 0, 2047]), &encoding).unwrap();
        set_image(&mut ds, 1, &image(vec![1, 1, 1]), &encoding).unwrap();
        ds
    }

    #[test]
    fn native_to_rle_and_back() {
        let mut ds = multi_frame(entries::EXPLICIT_VR_LITTLE_ENDIAN);
        ds.transcode(&entries::RLE_LOSSLESS).unwrap();
        assert_eq!(ds.buffers(tags::PIXEL_DATA).unwrap().len(), 3);
        assert_eq!(
            ds.string(tags::TRANSFER_SYNTAX_UID).unwrap().as_deref(),
            Some(entries::RLE_LOSSLESS.uid())
        );

        ds.transcode(&entries::EXPLICIT_VR_BIG_ENDIAN).unwrap();
        assert_eq!(ds.buffers(tags::PIXEL_DATA).unwrap().len(), 1);
        let options = TranscodeOptions::default();
        assert_eq!(get_image(&ds, 0, &options).unwrap(), image(vec![-2048, 0, 2047]));
        assert_eq!(get_image(&ds, 1, &options).unwrap(), image(vec![1, 1, 1]));
    }

    #[test]
    fn native_to_native_keeps_pixel_data() {
        let mut ds = multi_frame(entries::EXPLICIT_VR_LITTLE_ENDIAN);
        let before = ds.get(tags::PIXEL_DATA).cloned();
        ds.transcode(&entries::IMPLICIT_VR_LITTLE_ENDIAN).unwrap();
        assert_eq!(ds.get(tags::PIXEL_DATA).cloned(), before);
        assert_eq!(
            ds.string(tags::TRANSFER_SYNTAX_UID).unwrap().as_deref(),
            Some(entries::IMPLICIT_VR_LITTLE_ENDIAN.uid())
        );
    }

    #[test]
    fn native_to_native_changes_planar_configuration() {
        let mut ds = DataSet::new();
        let rgb = Image::new(
            2,
            1,
            ColorSpace::Rgb,
            7,
            SampleBuffer::from(vec![10u8, 20, 30, 40, 50, 60]),
        )
        .unwrap();
        let encoding = ImageEncoding::new().transfer_syntax(entries::EXPLICIT_VR_LITTLE_ENDIAN);
        set_image(&mut ds, 0, &rgb, &encoding).unwrap();
        assert_eq!(ds.uint(tags::PLANAR_CONFIGURATION).unwrap(), Some(0));

        let planar = ImageEncoding::new()
            .transfer_syntax(entries::EXPLICIT_VR_LITTLE_ENDIAN)
            .interleaved(false);
        ds.transcode_with(&planar, &TranscodeOptions::default(), &SystemAllocator)
            .unwrap();
        assert_eq!(ds.uint(tags::PLANAR_CONFIGURATION).unwrap(), Some(1));
        let data = ds.buffers(tags::PIXEL_DATA).unwrap()[0].data().unwrap();
        assert_eq!(&data[..], &[10, 40, 20, 50, 30, 60]);
        let options = TranscodeOptions::default();
        assert_eq!(get_image(&ds, 0, &options).unwrap(), rgb);
    }

    #[test]
    fn native_to_native_changes_allocated_bits() {
        let mut ds = multi_frame(entries::EXPLICIT_VR_LITTLE_ENDIAN);
        let wide = ImageEncoding::new()
            .transfer_syntax(entries::EXPLICIT_VR_BIG_ENDIAN)
            .allocated_bits(32);
        ds.transcode_with(&wide, &TranscodeOptions::default(), &SystemAllocator)
            .unwrap();
        assert_eq!(ds.uint(tags::BITS_ALLOCATED).unwrap(), Some(32));
        let options = TranscodeOptions::default();
        assert_eq!(get_image(&ds, 0, &options).unwrap(), image(vec![-2048, 0, 2047]));
    }

    #[test]
    fn no_encoder_for_target() {
        let mut ds = multi_frame(entries::EXPLICIT_VR_LITTLE_ENDIAN);
        let err = ds.transcode(&entries::JPEG_BASELINE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongTransferSyntax);
    }
}
