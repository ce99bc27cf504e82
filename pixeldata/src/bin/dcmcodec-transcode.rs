//! Rewrites a DICOM file in another transfer syntax,
//! optionally changing how its pixel data is laid out.
//!
//! The exit status tells the failure category apart:
//! 3 for I/O, 4 for an unsupported transfer syntax, 5 for corrupted input,
//! 6 for images beyond the size limit, 7 for excessive nesting
//! and 8 for an invalid request.
use clap::{Args, Parser, ValueEnum};
use dcmcodec_core::memory::MemoryPool;
use dcmcodec_encoding::transfer_syntax::{self, entries};
use dcmcodec_encoding::TransferSyntax;
use dcmcodec_parser::{file, DicomStreamCodec, ErrorKind};
use dcmcodec_pixeldata::{transcode, ChromaDecimation, ImageEncoding, Transcode, TranscodeOptions};
use snafu::{OptionExt, Report, ResultExt, Snafu};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, Level};

#[derive(Debug, Parser)]
#[command(version, about = "Rewrite a DICOM file in another transfer syntax")]
struct Cli {
    /// The DICOM file to rewrite
    input: PathBuf,

    /// Where to write the result (default: `<input>.<target>.dcm`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// The transfer syntax to write
    #[arg(
        short,
        long,
        value_enum,
        required_unless_present = "uid",
        conflicts_with = "uid"
    )]
    to: Option<Target>,

    /// The transfer syntax to write, by UID
    #[arg(long)]
    uid: Option<String>,

    #[command(flatten)]
    layout: LayoutArgs,

    /// Images wider or taller than this are not decoded
    #[arg(long, default_value_t = dcmcodec_pixeldata::DEFAULT_MAX_WIDTH)]
    max_size: u32,

    /// Log more details (repeat for trace output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// The transfer syntaxes the codec writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Target {
    ExplicitLe,
    ImplicitLe,
    ExplicitBe,
    Rle,
}

impl Target {
    fn transfer_syntax(self) -> TransferSyntax {
        match self {
            Target::ExplicitLe => entries::EXPLICIT_VR_LITTLE_ENDIAN,
            Target::ImplicitLe => entries::IMPLICIT_VR_LITTLE_ENDIAN,
            Target::ExplicitBe => entries::EXPLICIT_VR_BIG_ENDIAN,
            Target::Rle => entries::RLE_LOSSLESS,
        }
    }
}

/// How re-encoded frames are stored.
#[derive(Debug, Args)]
struct LayoutArgs {
    /// Bits allocated per sample (default: the smallest that fits)
    #[arg(long, value_parser = parse_bits_allocated)]
    bits_allocated: Option<u32>,

    /// Store one plane per channel
    #[arg(long)]
    planar: bool,

    /// Keep the mean of each chroma block when subsampling
    #[arg(long)]
    average_chroma: bool,
}

fn parse_bits_allocated(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(bits @ (1 | 8 | 16 | 24 | 32)) => Ok(bits),
        _ => Err(format!("{} is not one of 1, 8, 16, 24 or 32", value)),
    }
}

impl LayoutArgs {
    fn encoding(&self, ts: TransferSyntax) -> ImageEncoding {
        let decimation = if self.average_chroma {
            ChromaDecimation::Average
        } else {
            ChromaDecimation::Sample
        };
        let encoding = ImageEncoding::new()
            .transfer_syntax(ts)
            .interleaved(!self.planar)
            .decimation(decimation);
        match self.bits_allocated {
            Some(bits) => encoding.allocated_bits(bits),
            None => encoding,
        }
    }
}

#[derive(Debug, Snafu)]
enum Failure {
    #[snafu(display("No transfer syntax is registered as {}", uid))]
    UnknownUid { uid: String },
    #[snafu(display("Could not read {}", path.display()))]
    Read { path: PathBuf, source: file::Error },
    #[snafu(display("Could not rewrite the pixel data"))]
    Convert { source: transcode::Error },
    #[snafu(display("Could not write {}", path.display()))]
    Write { path: PathBuf, source: file::Error },
}

impl Failure {
    fn exit_code(&self) -> u8 {
        let kind = match self {
            Failure::UnknownUid { .. } => ErrorKind::WrongTransferSyntax,
            Failure::Read { source, .. } | Failure::Write { source, .. } => source.kind(),
            Failure::Convert { source } => source.kind(),
        };
        match kind {
            ErrorKind::Io => 3,
            ErrorKind::WrongTransferSyntax => 4,
            ErrorKind::Corrupted => 5,
            ErrorKind::ImageTooBig => 6,
            ErrorKind::DepthLimitReached => 7,
            ErrorKind::Logic => 8,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("{}", Report::from_error(e));
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            let code = failure.exit_code();
            error!("{}", Report::from_error(failure));
            ExitCode::from(code)
        }
    }
}

fn target_transfer_syntax(cli: &Cli) -> Result<TransferSyntax, Failure> {
    if let Some(target) = cli.to {
        return Ok(target.transfer_syntax());
    }
    let uid = cli.uid.as_deref().unwrap_or_default();
    transfer_syntax::get(uid)
        .copied()
        .context(UnknownUidSnafu { uid })
}

/// `scan.dcm` becomes `scan.rle.dcm` for the RLE target.
fn default_output(input: &Path, ts: &TransferSyntax) -> PathBuf {
    let suffix = match ts.uid() {
        uid if uid == entries::RLE_LOSSLESS.uid() => "rle",
        uid if uid == entries::EXPLICIT_VR_BIG_ENDIAN.uid() => "be",
        uid if uid == entries::IMPLICIT_VR_LITTLE_ENDIAN.uid() => "implicit",
        _ => "explicit",
    };
    input.with_extension(format!("{}.dcm", suffix))
}

fn run(cli: &Cli) -> Result<(), Failure> {
    let ts = target_transfer_syntax(cli)?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input, &ts));

    let codec = DicomStreamCodec::new();
    let mut ds = codec
        .read_file(&cli.input)
        .context(ReadSnafu { path: &cli.input })?;

    let encoding = cli.layout.encoding(ts);
    let options = TranscodeOptions::new().max_size(cli.max_size, cli.max_size);
    let pool = MemoryPool::default();
    ds.transcode_with(&encoding, &options, &pool)
        .context(ConvertSnafu)?;
    tracing::debug!("Scratch memory: {:?}", pool.stats());

    let written = codec
        .write_file(&output, &ds)
        .context(WriteSnafu { path: &output })?;
    info!("Wrote {} bytes in {} to {}", written, ts.name(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[rustfmt::skip]
    #[rstest]
    #[case(&["dcmcodec-transcode", "in.dcm", "--to", "rle"], entries::RLE_LOSSLESS)]
    #[case(&["dcmcodec-transcode", "in.dcm", "-t", "implicit-le"], entries::IMPLICIT_VR_LITTLE_ENDIAN)]
    #[case(&["dcmcodec-transcode", "in.dcm", "--uid", "1.2.840.10008.1.2.2"], entries::EXPLICIT_VR_BIG_ENDIAN)]
    fn target_is_resolved(#[case] args: &[&str], #[case] expected: TransferSyntax) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(target_transfer_syntax(&cli).unwrap().uid(), expected.uid());
    }

    #[test]
    fn target_is_required_once() {
        assert!(Cli::try_parse_from(["dcmcodec-transcode", "in.dcm"]).is_err());
        let both = ["dcmcodec-transcode", "in.dcm", "--to", "rle", "--uid", "1.2.840.10008.1.2"];
        assert!(Cli::try_parse_from(both).is_err());
    }

    #[test]
    fn unknown_uid_is_a_transfer_syntax_failure() {
        let args = ["dcmcodec-transcode", "in.dcm", "--uid", "1.2.3"];
        let cli = Cli::try_parse_from(args).unwrap();
        let failure = target_transfer_syntax(&cli).unwrap_err();
        assert_eq!(failure.exit_code(), 4);
    }

    #[test]
    fn layout_flags_shape_the_encoding() {
        let args = [
            "dcmcodec-transcode",
            "in.dcm",
            "--to",
            "explicit-le",
            "--planar",
            "--bits-allocated",
            "32",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let encoding = cli.layout.encoding(entries::EXPLICIT_VR_LITTLE_ENDIAN);
        assert!(!encoding.interleaved);
        assert_eq!(encoding.allocated_bits, Some(32));
        assert_eq!(encoding.decimation, ChromaDecimation::Sample);
        let odd = ["dcmcodec-transcode", "in.dcm", "--to", "rle", "--bits-allocated", "12"];
        assert!(Cli::try_parse_from(odd).is_err());
        assert_eq!(
            default_output(Path::new("scan.dcm"), &entries::RLE_LOSSLESS),
            PathBuf::from("scan.rle.dcm")
        );
    }
}
