//! Isotropic Gaussian blob generator.
//!
//! Produces labeled datasets in the manner of scikit-learn's `make_blobs`:
//! cluster centers are drawn uniformly from a bounding box and every row is
//! its cluster's center plus isotropic Gaussian noise. Generation is seeded
//! so repeated runs yield identical datasets.

mod sampling;

use std::mem::size_of;

use rand::{SeedableRng, rngs::SmallRng, seq::SliceRandom};
use tracing::{info, instrument};

use crate::dataset::Dataset;
use crate::device::Device;
use crate::error::{BlobsError, Result};
use crate::host::{DatasetShape, HostDataset};
use sampling::{sample_centers, standard_normal_sample};

/// Default number of rows generated.
pub const DEFAULT_ROWS: usize = 10_001;
/// Default number of feature columns generated.
pub const DEFAULT_COLS: usize = 81;
/// Default number of clusters generated.
pub const DEFAULT_CLUSTERS: usize = 2;
/// Default cluster standard deviation.
pub const DEFAULT_CLUSTER_STD: f32 = 1.0;
/// Default lower bound of the center bounding box.
pub const DEFAULT_CENTER_BOX_MIN: f32 = -10.0;
/// Default upper bound of the center bounding box.
pub const DEFAULT_CENTER_BOX_MAX: f32 = 10.0;
/// Default RNG seed.
pub const DEFAULT_SEED: u64 = 1234;

/// Configuration for [`make_blobs`].
#[derive(Clone, Debug, PartialEq)]
pub struct BlobsConfig {
    /// Number of rows to generate.
    pub rows: usize,
    /// Number of feature columns per row.
    pub cols: usize,
    /// Number of clusters, which is also the class count.
    pub clusters: usize,
    /// Standard deviation of every cluster along every axis.
    pub cluster_std: f32,
    /// Lower bound of the box cluster centers are drawn from.
    pub center_box_min: f32,
    /// Upper bound of the box cluster centers are drawn from.
    pub center_box_max: f32,
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// Whether to permute rows after generation.
    pub shuffle: bool,
}

impl Default for BlobsConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            clusters: DEFAULT_CLUSTERS,
            cluster_std: DEFAULT_CLUSTER_STD,
            center_box_min: DEFAULT_CENTER_BOX_MIN,
            center_box_max: DEFAULT_CENTER_BOX_MAX,
            seed: DEFAULT_SEED,
            shuffle: false,
        }
    }
}

impl BlobsConfig {
    /// Checks the configuration without generating anything.
    ///
    /// # Errors
    /// Returns [`BlobsError`] describing the first invalid parameter.
    pub fn validate(&self) -> Result<(), BlobsError> {
        if self.rows == 0 {
            return Err(BlobsError::ZeroRows);
        }
        if self.cols == 0 {
            return Err(BlobsError::ZeroCols);
        }
        if self.clusters == 0 {
            return Err(BlobsError::ZeroClusters);
        }
        let addressable = self
            .rows
            .checked_mul(self.cols)
            .and_then(|len| len.checked_mul(size_of::<f32>()))
            .is_some_and(|bytes| isize::try_from(bytes).is_ok());
        if !addressable {
            return Err(BlobsError::SizeOverflow {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.clusters > self.rows {
            return Err(BlobsError::ClusterCountExceedsRowCount {
                clusters: self.clusters,
                rows: self.rows,
            });
        }
        if i32::try_from(self.clusters).is_err() {
            return Err(BlobsError::LabelOverflow {
                clusters: self.clusters,
            });
        }
        if !self.cluster_std.is_finite() || self.cluster_std < 0.0 {
            return Err(BlobsError::InvalidClusterStd {
                value: self.cluster_std,
            });
        }
        if !self.center_box_min.is_finite()
            || !self.center_box_max.is_finite()
            || self.center_box_min >= self.center_box_max
            || !self.center_box_span().is_finite()
        {
            return Err(BlobsError::InvalidCenterBox {
                min: self.center_box_min,
                max: self.center_box_max,
            });
        }
        Ok(())
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "the box width must be representable for uniform sampling"
    )]
    const fn center_box_span(&self) -> f32 {
        self.center_box_max - self.center_box_min
    }

    /// Returns the shape of the dataset this configuration generates.
    #[must_use]
    pub const fn shape(&self) -> DatasetShape {
        DatasetShape::new(self.rows, self.cols, self.clusters)
    }
}

/// Generates a labeled Gaussian-blob dataset in host memory.
///
/// Each cluster receives `rows / clusters` rows and the first
/// `rows % clusters` clusters one extra. Rows are grouped by label unless
/// `shuffle` is set.
///
/// # Errors
/// Returns [`BlobsError`] when the configuration is invalid or host memory
/// for the generated data cannot be reserved.
///
/// # Examples
/// ```
/// use tabbench_core::{BlobsConfig, make_blobs};
///
/// let config = BlobsConfig { rows: 7, cols: 3, clusters: 3, ..BlobsConfig::default() };
/// let dataset = make_blobs(&config)?;
/// assert_eq!(dataset.class_counts(), vec![3, 2, 2]);
/// # Ok::<(), tabbench_core::BlobsError>(())
/// ```
#[instrument(
    name = "blobs.generate",
    skip(config),
    fields(rows = config.rows, cols = config.cols, clusters = config.clusters, seed = config.seed),
    err
)]
#[expect(
    clippy::float_arithmetic,
    reason = "Gaussian data generation requires floating-point arithmetic"
)]
pub fn make_blobs(config: &BlobsConfig) -> Result<HostDataset, BlobsError> {
    config.validate()?;
    let shape = config.shape();
    let total = shape.feature_len()?;

    let mut rng = SmallRng::seed_from_u64(config.seed);
    let centers = sample_centers(config, &mut rng);
    let mut features = reserve::<f32>(total)?;
    let mut labels = reserve::<i32>(config.rows)?;

    let base = config.rows.div_euclid(config.clusters);
    let extra = config.rows.rem_euclid(config.clusters);
    for (cluster, center) in centers.chunks_exact(config.cols).enumerate() {
        let label = i32::try_from(cluster).map_err(|_| BlobsError::LabelOverflow {
            clusters: config.clusters,
        })?;
        let count = if cluster < extra {
            base.saturating_add(1)
        } else {
            base
        };
        for _ in 0..count {
            labels.push(label);
            for value in center {
                features.push(*value + config.cluster_std * standard_normal_sample(&mut rng));
            }
        }
    }

    if config.shuffle {
        shuffle_rows(&mut features, &mut labels, config.cols, &mut rng)?;
    }

    Ok(HostDataset::new(shape, features, labels)?)
}

fn reserve<T>(len: usize) -> Result<Vec<T>, BlobsError> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|_| BlobsError::HostAllocation {
            bytes: len.saturating_mul(size_of::<T>()),
        })?;
    Ok(values)
}

fn shuffle_rows(
    features: &mut Vec<f32>,
    labels: &mut Vec<i32>,
    cols: usize,
    rng: &mut SmallRng,
) -> Result<(), BlobsError> {
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.shuffle(rng);

    let mut shuffled_features = reserve::<f32>(features.len())?;
    let mut shuffled_labels = reserve::<i32>(labels.len())?;
    for row in order {
        let start = row.saturating_mul(cols);
        if let (Some(values), Some(label)) = (
            features.get(start..start.saturating_add(cols)),
            labels.get(row),
        ) {
            shuffled_features.extend_from_slice(values);
            shuffled_labels.push(*label);
        }
    }
    *features = shuffled_features;
    *labels = shuffled_labels;
    Ok(())
}

/// Allocates a dataset on `device`, generates blobs on the host and uploads
/// them into it.
///
/// Device memory is reserved before any data is generated, so a request the
/// device cannot hold fails without building the host copy. Every failure
/// after allocation releases the dataset.
///
/// # Errors
/// Returns [`crate::DatasetError`] when validation, allocation, generation
/// or the upload fails.
#[instrument(name = "blobs.generate_on_device", skip(device, config), fields(device = device.name()), err)]
pub fn generate_blobs<D: Device>(device: &D, config: &BlobsConfig) -> Result<Dataset<D>> {
    info!(
        rows = config.rows,
        cols = config.cols,
        center_box_min = f64::from(config.center_box_min),
        center_box_max = f64::from(config.center_box_max),
        cluster_std = f64::from(config.cluster_std),
        clusters = config.clusters,
        seed = config.seed,
        shuffle = config.shuffle,
        "generating blobs"
    );
    config.validate()?;
    let mut dataset = Dataset::allocate(device, config.shape())?;
    let host = match make_blobs(config) {
        Ok(host) => host,
        Err(error) => return Err(dataset.discard(device, error.into())),
    };
    if let Err(error) = dataset.upload(device, &host) {
        return Err(dataset.discard(device, error));
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests;
