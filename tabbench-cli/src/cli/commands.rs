//! Argument handling and dataset preparation runs for the `bench` binary.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use clap::{Arg, Command, Parser, ValueEnum, error::ErrorKind};
#[cfg(feature = "cuda")]
use tabbench_core::CudaDevice;
use tabbench_core::{DatasetError, DatasetShape, Device, HostDevice};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::registry::{DEFAULT_GENERATOR, Registry};

/// Long names of the options accepted before the generator keyword.
const DEVICE_OPTIONS: [&str; 3] = ["device", "device-id", "memory-limit"];

/// Device options accepted before the generator keyword.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "bench",
    no_binary_name = true,
    about = "Generate or load a labeled dataset into device memory."
)]
pub struct Cli {
    /// Device that receives the dataset.
    #[arg(long, value_enum, default_value_t = DeviceKind::Host)]
    pub device: DeviceKind,

    /// Ordinal of the CUDA device.
    #[arg(long = "device-id", value_name = "N", default_value_t = 0)]
    pub device_id: usize,

    /// Byte limit enforced by the host device allocator.
    #[arg(long = "memory-limit", value_name = "BYTES")]
    pub memory_limit: Option<usize>,
}

/// Devices a dataset can be placed on.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum DeviceKind {
    /// Buffers in host memory.
    Host,
    /// A CUDA accelerator; requires the `cuda` feature.
    Cuda,
}

impl DeviceKind {
    /// Returns the name used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Cuda => "cuda",
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CliError {
    /// The generator keyword is not registered.
    #[error("unknown generator `{name}`; expected one of {available}")]
    UnknownGenerator {
        /// Keyword supplied on the command line.
        name: String,
        /// Registered names joined with `|`.
        available: String,
    },
    /// A mandatory generator option was not supplied.
    #[error("missing mandatory option `{option}`")]
    MissingOption {
        /// Legacy spelling of the missing option.
        option: &'static str,
    },
    /// The requested device was not compiled into this binary.
    #[error("device `{device}` is not available; rebuild with the `{device}` feature")]
    DeviceUnavailable {
        /// Name of the unavailable device.
        device: &'static str,
    },
    /// Argument parsing failed.
    #[error(transparent)]
    Args(#[from] clap::Error),
    /// Writing generator usage failed.
    #[error("failed to write generator output: {0}")]
    Io(#[from] io::Error),
    /// Dataset preparation failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Summarises a completed dataset preparation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RunSummary {
    /// Generator that produced the dataset.
    pub generator: String,
    /// Name of the device that held the dataset.
    pub device: String,
    /// Shape of the prepared dataset.
    pub shape: DatasetShape,
    /// Number of rows carrying each class label.
    pub class_counts: Vec<usize>,
    /// Time spent generating or loading the dataset.
    pub elapsed: Duration,
}

/// Parses `args`, prepares the selected dataset and releases it again.
///
/// `args` excludes the binary name. Everything before the first registered
/// generator name is parsed as device options; without a generator name only
/// the leading device options are. Returns `Ok(None)` when a generator
/// printed its usage to `out` instead of running.
///
/// # Errors
/// Returns [`CliError`] when argument parsing, generator resolution, device
/// selection or dataset preparation fails.
///
/// # Examples
/// ```
/// use tabbench_cli::cli::run_cli;
///
/// let args: Vec<String> = ["blobs", "-nrows", "12", "-ncols", "3", "-nclusters", "3"]
///     .into_iter()
///     .map(String::from)
///     .collect();
/// let mut usage = Vec::new();
/// let summary = run_cli(&args, &mut usage)?.expect("blobs must run");
/// assert_eq!(summary.class_counts, vec![4, 4, 4]);
/// assert!(usage.is_empty());
/// # Ok::<(), tabbench_cli::cli::CliError>(())
/// ```
#[instrument(name = "cli.run", err, skip(args, out), fields(device = field::Empty))]
pub fn run_cli(args: &[String], out: &mut dyn Write) -> Result<Option<RunSummary>, CliError> {
    // Generator names do not depend on the device type.
    let keyword = Registry::<HostDevice>::new().find_generator_start(args);
    let split = if keyword < args.len() {
        keyword
    } else {
        device_option_prefix_len(args)
    };
    let (leading, rest) = args
        .split_at_checked(split)
        .unwrap_or((args, Default::default()));
    let Some(cli) = parse_args::<Cli>(leading, out)? else {
        return Ok(None);
    };
    Span::current().record("device", cli.device.as_str());

    match cli.device {
        DeviceKind::Host => {
            let device = cli
                .memory_limit
                .map_or_else(HostDevice::new, HostDevice::with_limit);
            run_generator(&device, rest, out)
        }
        DeviceKind::Cuda => run_on_cuda(&cli, rest, out),
    }
}

#[cfg(feature = "cuda")]
fn run_on_cuda(
    cli: &Cli,
    args: &[String],
    out: &mut dyn Write,
) -> Result<Option<RunSummary>, CliError> {
    if cli.memory_limit.is_some() {
        tracing::warn!("--memory-limit applies only to the host device and is ignored");
    }
    let device = CudaDevice::new(cli.device_id)
        .map_err(|error| DatasetError::device(DeviceKind::Cuda.as_str(), error))?;
    run_generator(&device, args, out)
}

#[cfg(not(feature = "cuda"))]
const fn run_on_cuda(
    _cli: &Cli,
    _args: &[String],
    _out: &mut dyn Write,
) -> Result<Option<RunSummary>, CliError> {
    Err(CliError::DeviceUnavailable {
        device: DeviceKind::Cuda.as_str(),
    })
}

#[instrument(
    name = "cli.generate",
    err,
    skip(device, args, out),
    fields(device = device.name(), generator = field::Empty),
)]
pub(super) fn run_generator<D: Device>(
    device: &D,
    args: &[String],
    out: &mut dyn Write,
) -> Result<Option<RunSummary>, CliError> {
    let registry = Registry::<D>::new();
    let start = registry.find_generator_start(args);
    let (name, generator_args) = match args.get(start..).and_then(<[String]>::split_first) {
        Some((keyword, tail)) => (keyword.as_str(), tail),
        None => match args.split_first() {
            Some((word, tail)) if !word.starts_with('-') => (word.as_str(), tail),
            _ => (DEFAULT_GENERATOR, args),
        },
    };
    Span::current().record("generator", name);
    let generator = registry.resolve(name)?;

    let started = Instant::now();
    let Some(dataset) = generator(device, generator_args, out)? else {
        info!(generator = name, "usage printed; no dataset prepared");
        return Ok(None);
    };
    let elapsed = started.elapsed();
    let shape = dataset.shape();
    info!(
        rows = shape.rows,
        cols = shape.cols,
        classes = shape.classes,
        "dataset dimension"
    );
    info!(elapsed_ms = millis(elapsed), "dataset preparation completed");

    let class_counts = match dataset.class_counts(device) {
        Ok(counts) => counts,
        Err(err) => return Err(dataset.discard(device, err.into())),
    };
    dataset.deallocate(device)?;

    Ok(Some(RunSummary {
        generator: name.to_owned(),
        device: device.name().to_owned(),
        shape,
        class_counts,
        elapsed,
    }))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Parses `args` as `P`, writing usage to `out` when help was requested.
pub(super) fn parse_args<P: Parser>(
    args: &[String],
    out: &mut dyn Write,
) -> Result<Option<P>, CliError> {
    let normalized = normalize_legacy_args(&P::command(), args);
    match P::try_parse_from(normalized) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(err) if err.kind() == ErrorKind::DisplayHelp => {
            write!(out, "{}", err.render())?;
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Rewrites legacy single-dash long options (`-nrows`) to `--nrows`.
///
/// Only tokens naming a long option of `command` (or `help`) are rewritten,
/// so values such as `-10` or `-inf` pass through untouched.
///
/// # Examples
/// ```
/// use clap::CommandFactory;
/// use tabbench_cli::cli::{BlobsArgs, normalize_legacy_args};
///
/// let args: Vec<String> = ["-nrows", "10", "-center-box-min=-5", "-h"]
///     .into_iter()
///     .map(String::from)
///     .collect();
/// let normalized = normalize_legacy_args(&BlobsArgs::command(), &args);
/// assert_eq!(normalized, ["--nrows", "10", "--center-box-min=-5", "-h"]);
/// ```
#[must_use]
pub fn normalize_legacy_args(command: &Command, args: &[String]) -> Vec<String> {
    let longs: Vec<&str> = command
        .get_arguments()
        .filter_map(Arg::get_long)
        .chain(["help"])
        .collect();
    args.iter()
        .map(|arg| {
            let legacy = !arg.starts_with("--")
                && option_name(arg).is_some_and(|name| longs.contains(&name));
            if legacy {
                format!("-{arg}")
            } else {
                arg.clone()
            }
        })
        .collect()
}

/// Counts the leading arguments that are device options and their values.
pub(super) fn device_option_prefix_len(args: &[String]) -> usize {
    let mut index = 0_usize;
    while let Some(arg) = args.get(index) {
        if !option_name(arg).is_some_and(|name| DEVICE_OPTIONS.contains(&name)) {
            break;
        }
        let step = if arg.contains('=') { 1 } else { 2 };
        index = index.saturating_add(step);
    }
    index.min(args.len())
}

fn option_name(arg: &str) -> Option<&str> {
    let body = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-'))?;
    let name = body.split_once('=').map_or(body, |(head, _)| head);
    (name.len() > 1 && name.starts_with(|c: char| c.is_ascii_alphabetic())).then_some(name)
}

/// Renders `summary` to `writer` in a line-oriented text format.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::time::Duration;
/// # use tabbench_cli::cli::{RunSummary, render_summary};
/// # use tabbench_core::DatasetShape;
/// let summary = RunSummary {
///     generator: "blobs".into(),
///     device: "host".into(),
///     shape: DatasetShape::new(3, 2, 2),
///     class_counts: vec![2, 1],
///     elapsed: Duration::from_millis(7),
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// assert_eq!(
///     String::from_utf8(buffer)?,
///     "generator: blobs\ndevice: host\ndimension: 3x2\nclasses: 2\n0\t2\n1\t1\nelapsed_ms: 7\n"
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn render_summary(summary: &RunSummary, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "generator: {}", summary.generator)?;
    writeln!(writer, "device: {}", summary.device)?;
    writeln!(
        writer,
        "dimension: {}x{}",
        summary.shape.rows, summary.shape.cols
    )?;
    writeln!(writer, "classes: {}", summary.shape.classes)?;
    for (class, count) in summary.class_counts.iter().enumerate() {
        writeln!(writer, "{class}\t{count}")?;
    }
    writeln!(writer, "elapsed_ms: {}", millis(summary.elapsed))?;
    Ok(())
}
