//! Built-in dataset generators and their options.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tabbench_core::{
    BlobsConfig, DEFAULT_CENTER_BOX_MAX, DEFAULT_CENTER_BOX_MIN, DEFAULT_CLUSTER_STD,
    DEFAULT_CLUSTERS, DEFAULT_COLS, DEFAULT_ROWS, DEFAULT_SEED, Dataset, Device,
    dump_from_device, generate_blobs, load_to_device,
};
use tracing::{Span, field, info, instrument};

use super::commands::{CliError, parse_args};

/// Options accepted by the `blobs` generator.
#[derive(Debug, Parser, Clone, PartialEq)]
#[command(
    name = "blobs",
    no_binary_name = true,
    about = "Generate isotropic Gaussian blobs on the selected device."
)]
pub struct BlobsArgs {
    /// Number of rows to generate.
    #[arg(long = "nrows", value_name = "ROWS", default_value_t = DEFAULT_ROWS)]
    pub rows: usize,

    /// Number of feature columns per row.
    #[arg(long = "ncols", value_name = "COLS", default_value_t = DEFAULT_COLS)]
    pub cols: usize,

    /// Number of clusters, which is also the class count.
    #[arg(long = "nclusters", value_name = "K", default_value_t = DEFAULT_CLUSTERS)]
    pub clusters: usize,

    /// Standard deviation of every cluster.
    #[arg(
        long = "cluster-std",
        value_name = "STD",
        default_value_t = DEFAULT_CLUSTER_STD,
        allow_negative_numbers = true
    )]
    pub cluster_std: f32,

    /// Lower bound of the box cluster centers are drawn from.
    #[arg(
        long = "center-box-min",
        value_name = "MIN",
        default_value_t = DEFAULT_CENTER_BOX_MIN,
        allow_negative_numbers = true
    )]
    pub center_box_min: f32,

    /// Upper bound of the box cluster centers are drawn from.
    #[arg(
        long = "center-box-max",
        value_name = "MAX",
        default_value_t = DEFAULT_CENTER_BOX_MAX,
        allow_negative_numbers = true
    )]
    pub center_box_max: f32,

    /// Seed of the random number generator.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Permute rows after generation.
    #[arg(long)]
    pub shuffle: bool,

    /// Write the generated dataset to this file in the text format.
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,
}

impl BlobsArgs {
    /// Returns the generator configuration described by these options.
    #[must_use]
    pub const fn config(&self) -> BlobsConfig {
        BlobsConfig {
            rows: self.rows,
            cols: self.cols,
            clusters: self.clusters,
            cluster_std: self.cluster_std,
            center_box_min: self.center_box_min,
            center_box_max: self.center_box_max,
            seed: self.seed,
            shuffle: self.shuffle,
        }
    }
}

/// Options accepted by the `load` generator.
#[derive(Debug, Parser, Clone, Eq, PartialEq)]
#[command(
    name = "load",
    no_binary_name = true,
    about = "Load a text dataset onto the selected device."
)]
pub struct LoadArgs {
    /// Dataset file in the text format. Mandatory.
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

/// Generates Gaussian blobs on `device` and optionally dumps them to a file.
///
/// Returns `Ok(None)` after writing usage to `out` when `-h` is given.
///
/// # Errors
/// Returns [`CliError::Args`] for unparseable options and
/// [`CliError::Dataset`] when generation, upload or the dump fails. A failed
/// dump releases the dataset before returning.
#[instrument(
    name = "cli.blobs",
    err,
    skip(device, args, out),
    fields(device = device.name(), dump = field::Empty),
)]
pub fn blobs<D: Device>(
    device: &D,
    args: &[String],
    out: &mut dyn Write,
) -> Result<Option<Dataset<D>>, CliError> {
    let Some(parsed) = parse_args::<BlobsArgs>(args, out)? else {
        return Ok(None);
    };
    let dataset = generate_blobs(device, &parsed.config())?;
    let Some(path) = parsed.dump.as_deref() else {
        return Ok(Some(dataset));
    };

    Span::current().record("dump", field::display(path.display()));
    info!(path = %path.display(), "dumping generated dataset");
    if let Err(err) = dump_from_device(device, &dataset, path) {
        return Err(dataset.discard(device, err.into()));
    }
    Ok(Some(dataset))
}

/// Loads a text dataset named by `-file` onto `device`.
///
/// Returns `Ok(None)` after writing usage to `out` when `-h` is given.
///
/// # Errors
/// Returns [`CliError::MissingOption`] when `-file` is absent and
/// [`CliError::Dataset`] when the file cannot be read, parsed or uploaded.
#[instrument(
    name = "cli.load",
    err,
    skip(device, args, out),
    fields(device = device.name(), file = field::Empty),
)]
pub fn load<D: Device>(
    device: &D,
    args: &[String],
    out: &mut dyn Write,
) -> Result<Option<Dataset<D>>, CliError> {
    let Some(parsed) = parse_args::<LoadArgs>(args, out)? else {
        return Ok(None);
    };
    let path = parsed
        .file
        .ok_or(CliError::MissingOption { option: "-file" })?;
    Span::current().record("file", field::display(path.display()));
    Ok(Some(load_to_device(device, &path)?))
}
