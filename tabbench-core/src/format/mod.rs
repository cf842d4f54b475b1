//! Flat-text dataset format.
//!
//! The first line holds `<rows> <cols> <classes>`. Each following line holds
//! `cols` feature values and then the integer label of that row. Values are
//! separated by whitespace; readers do not depend on line breaks.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{Span, field, info, instrument, warn};

use crate::dataset::Dataset;
use crate::device::Device;
use crate::error::{FormatError, Result, ShapeError};
use crate::host::{DatasetShape, HostDataset, label_in_range};

/// Upper bound on the number of values reserved up front from a header.
const MAX_PREALLOCATED_VALUES: usize = 1 << 20;

/// Writes `dataset` to `writer` in the text format.
///
/// Feature values are printed with six decimal places, each followed by a
/// space, and every row ends with its label and a newline.
///
/// # Errors
/// Returns [`FormatError::Io`] when writing fails.
///
/// # Examples
/// ```
/// use tabbench_core::{DatasetShape, HostDataset, write_dataset};
///
/// let dataset = HostDataset::new(DatasetShape::new(1, 2, 1), vec![0.5, -1.25], vec![0])?;
/// let mut buffer = Vec::new();
/// write_dataset(&mut buffer, &dataset)?;
/// assert_eq!(String::from_utf8(buffer)?, "1 2 1\n0.500000 -1.250000 0\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn write_dataset(mut writer: impl Write, dataset: &HostDataset) -> Result<(), FormatError> {
    writeln!(
        writer,
        "{} {} {}",
        dataset.rows(),
        dataset.cols(),
        dataset.classes()
    )?;
    for (index, label) in dataset.labels().iter().enumerate() {
        for value in dataset.row(index).unwrap_or_default() {
            write!(writer, "{value:.6} ")?;
        }
        writeln!(writer, "{label}")?;
    }
    Ok(())
}

/// Parses a dataset in the text format from `reader`.
///
/// # Errors
/// Returns [`FormatError`] naming the header field, `(row, col)` position or
/// row of the first missing or malformed value, or
/// [`FormatError::Shape`] when a label lies outside `[0, classes)`.
///
/// # Examples
/// ```
/// use tabbench_core::read_dataset;
///
/// let dataset = read_dataset("2 1 2\n0.5 1\n1.5 0\n".as_bytes())?;
/// assert_eq!(dataset.features(), &[0.5, 1.5]);
/// assert_eq!(dataset.labels(), &[1, 0]);
/// # Ok::<(), tabbench_core::FormatError>(())
/// ```
pub fn read_dataset(mut reader: impl Read) -> Result<HostDataset, FormatError> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_dataset(&text)
}

fn parse_dataset(text: &str) -> Result<HostDataset, FormatError> {
    let mut tokens = text.split_whitespace();
    let rows = header_count(tokens.next(), "rows")?;
    let cols = header_count(tokens.next(), "cols")?;
    let classes = header_count(tokens.next(), "classes")?;
    let shape = DatasetShape::new(rows, cols, classes);
    let total = shape.feature_len()?;

    let mut features = Vec::with_capacity(total.min(MAX_PREALLOCATED_VALUES));
    let mut labels = Vec::with_capacity(rows.min(MAX_PREALLOCATED_VALUES));
    for row in 0..rows {
        for col in 0..cols {
            let token = tokens.next().ok_or(FormatError::MissingFeature { row, col })?;
            let value = token
                .parse::<f32>()
                .map_err(|_| FormatError::MalformedFeature {
                    row,
                    col,
                    token: token.to_owned(),
                })?;
            features.push(value);
        }
        let token = tokens.next().ok_or(FormatError::MissingLabel { row })?;
        let label = token
            .parse::<i32>()
            .map_err(|_| FormatError::MalformedLabel {
                row,
                token: token.to_owned(),
            })?;
        if !label_in_range(label, classes) {
            return Err(ShapeError::LabelOutOfRange {
                row,
                label,
                classes,
            }
            .into());
        }
        labels.push(label);
    }

    let trailing = tokens.count();
    if trailing > 0 {
        warn!(trailing, "ignoring tokens after the last dataset row");
    }

    Ok(HostDataset::new(shape, features, labels)?)
}

fn header_count(next: Option<&str>, field: &'static str) -> Result<usize, FormatError> {
    let token = next.ok_or(FormatError::MissingHeader { field })?;
    let count = token
        .parse::<usize>()
        .map_err(|_| FormatError::MalformedHeader {
            field,
            token: token.to_owned(),
        })?;
    if count == 0 {
        return Err(FormatError::ZeroHeaderCount { field });
    }
    Ok(count)
}

/// Writes `dataset` to the file at `path`, replacing any existing file.
///
/// # Errors
/// Returns [`FormatError::Create`] when the file cannot be opened and
/// [`FormatError::Io`] when writing fails.
#[instrument(name = "format.dump", skip(dataset), fields(rows = dataset.rows()), err)]
pub fn dump_dataset(path: &Path, dataset: &HostDataset) -> Result<(), FormatError> {
    info!(path = %path.display(), "dumping dataset");
    let file = File::create(path).map_err(|source| FormatError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    write_dataset(&mut writer, dataset)?;
    writer.flush()?;
    Ok(())
}

/// Reads a dataset from the file at `path`.
///
/// # Errors
/// Returns [`FormatError::Open`] when the file cannot be opened, or any
/// parse error from [`read_dataset`].
#[instrument(name = "format.load", fields(rows = field::Empty, cols = field::Empty), err)]
pub fn load_dataset(path: &Path) -> Result<HostDataset, FormatError> {
    info!(path = %path.display(), "loading dataset");
    let file = File::open(path).map_err(|source| FormatError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let dataset = read_dataset(BufReader::new(file))?;
    let span = Span::current();
    span.record("rows", dataset.rows());
    span.record("cols", dataset.cols());
    Ok(dataset)
}

/// Loads a text dataset and uploads it to `device`.
///
/// # Errors
/// Returns [`crate::DatasetError`] when loading, allocation or the upload
/// fails.
pub fn load_to_device<D: Device>(device: &D, path: &Path) -> Result<Dataset<D>> {
    let host = load_dataset(path)?;
    Dataset::from_host(device, &host)
}

/// Copies a device dataset to the host and writes it to `path`.
///
/// The device stream is synchronised before its memory is read.
///
/// # Errors
/// Returns [`crate::DatasetError`] when the download or the write fails.
pub fn dump_from_device<D: Device>(device: &D, dataset: &Dataset<D>, path: &Path) -> Result<()> {
    let host = dataset.to_host(device)?;
    dump_dataset(path, &host)?;
    Ok(())
}
