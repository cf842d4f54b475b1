//! Device-resident labeled datasets.

use tracing::{Span, field, instrument, warn};

use crate::device::{Device, DeviceBuffer};
use crate::error::{DatasetError, DeviceError, Result};
use crate::host::{DatasetShape, HostDataset, count_labels};

/// A labeled dataset whose feature matrix and label vector live on a
/// [`Device`].
///
/// Both buffers are allocated and released together. The caller that
/// allocates a `Dataset` owns it and must hand it back with
/// [`Dataset::deallocate`] once benchmarking completes.
///
/// # Examples
/// ```
/// use tabbench_core::{Dataset, DatasetShape, HostDataset, HostDevice};
///
/// let device = HostDevice::new();
/// let host = HostDataset::new(DatasetShape::new(2, 2, 2), vec![0.0, 1.0, 2.0, 3.0], vec![0, 1])?;
/// let dataset = Dataset::from_host(&device, &host)?;
/// assert_eq!(dataset.to_host(&device)?, host);
/// dataset.deallocate(&device)?;
/// assert_eq!(device.memory_stats().live_allocations, 0);
/// # Ok::<(), tabbench_core::DatasetError>(())
/// ```
pub struct Dataset<D: Device> {
    shape: DatasetShape,
    features: D::Buffer<f32>,
    labels: D::Buffer<i32>,
}

impl<D: Device> Dataset<D> {
    /// Allocates the feature and label buffers for `shape` as a pair.
    ///
    /// The buffer contents are unspecified until populated.
    ///
    /// # Errors
    /// Returns [`DatasetError::Shape`] when `rows * cols` overflows, or
    /// [`DatasetError::Device`] when either allocation fails. A failed
    /// label allocation releases the feature buffer first and still reports
    /// the allocation failure.
    #[instrument(
        name = "dataset.allocate",
        skip(device, shape),
        fields(device = device.name(), rows = shape.rows, cols = shape.cols),
        err
    )]
    pub fn allocate(device: &D, shape: DatasetShape) -> Result<Self> {
        let feature_len = shape.feature_len()?;
        let features = device
            .allocate::<f32>(feature_len)
            .map_err(|error| DatasetError::device(device.name(), error))?;
        let labels = match device.allocate::<i32>(shape.rows) {
            Ok(labels) => labels,
            Err(error) => {
                if let Err(release) = device.deallocate(features) {
                    report_release_failure(device.name(), &release);
                }
                return Err(DatasetError::device(device.name(), error));
            }
        };
        Ok(Self {
            shape,
            features,
            labels,
        })
    }

    /// Allocates a dataset and fills it from host memory.
    ///
    /// Both copies are queued on the device stream, which is synchronised
    /// before returning.
    ///
    /// # Errors
    /// Returns [`DatasetError::Device`] when allocation, copying or
    /// synchronisation fails.
    #[instrument(
        name = "dataset.from_host",
        skip(device, host),
        fields(device = device.name(), rows = host.rows(), cols = host.cols()),
        err
    )]
    pub fn from_host(device: &D, host: &HostDataset) -> Result<Self> {
        let mut dataset = Self::allocate(device, host.shape())?;
        if let Err(error) = dataset.upload(device, host) {
            return Err(dataset.discard(device, error));
        }
        Ok(dataset)
    }

    /// Copies `host` into the already allocated buffers and synchronises.
    pub(crate) fn upload(&mut self, device: &D, host: &HostDataset) -> Result<()> {
        let wrap = |error| DatasetError::device(device.name(), error);
        device
            .copy_from_host(&mut self.features, host.features())
            .map_err(wrap)?;
        device
            .copy_from_host(&mut self.labels, host.labels())
            .map_err(wrap)?;
        device.synchronize().map_err(wrap)
    }

    /// Copies the dataset back to host memory.
    ///
    /// The stream is synchronised before any device memory is read and
    /// again before the host copies are used.
    ///
    /// # Errors
    /// Returns [`DatasetError::Device`] when copying fails, or
    /// [`DatasetError::Shape`] when the device held labels outside
    /// `[0, classes)`.
    #[instrument(
        name = "dataset.to_host",
        skip(self, device),
        fields(device = device.name(), rows = field::Empty),
        err
    )]
    pub fn to_host(&self, device: &D) -> Result<HostDataset> {
        Span::current().record("rows", self.shape.rows);
        let wrap = |error| DatasetError::device(device.name(), error);
        device.synchronize().map_err(wrap)?;
        let mut features = vec![0.0_f32; self.features.len()];
        let mut labels = vec![0_i32; self.labels.len()];
        device
            .copy_to_host(&self.features, &mut features)
            .map_err(wrap)?;
        device
            .copy_to_host(&self.labels, &mut labels)
            .map_err(wrap)?;
        device.synchronize().map_err(wrap)?;
        Ok(HostDataset::new(self.shape, features, labels)?)
    }

    /// Copies only the label vector back to host memory.
    ///
    /// # Errors
    /// Returns [`DatasetError::Device`] when copying fails.
    pub fn labels_to_host(&self, device: &D) -> Result<Vec<i32>> {
        let wrap = |error| DatasetError::device(device.name(), error);
        device.synchronize().map_err(wrap)?;
        let mut labels = vec![0_i32; self.labels.len()];
        device
            .copy_to_host(&self.labels, &mut labels)
            .map_err(wrap)?;
        device.synchronize().map_err(wrap)?;
        Ok(labels)
    }

    /// Downloads the labels and counts the rows of each class.
    ///
    /// # Errors
    /// Returns [`DatasetError::Device`] when copying fails.
    pub fn class_counts(&self, device: &D) -> Result<Vec<usize>> {
        let labels = self.labels_to_host(device)?;
        Ok(count_labels(&labels, self.shape.classes))
    }

    /// Returns both buffers to the device allocator.
    ///
    /// # Errors
    /// Returns [`DatasetError::Device`] when the allocator rejects either
    /// release. The label buffer is released even if the feature release
    /// fails.
    #[instrument(name = "dataset.deallocate", skip(self, device), fields(device = device.name()), err)]
    pub fn deallocate(self, device: &D) -> Result<()> {
        let features = device.deallocate(self.features);
        let labels = device.deallocate(self.labels);
        features
            .and(labels)
            .map_err(|error| DatasetError::device(device.name(), error))
    }

    /// Releases the dataset after `error` occurred and hands `error` back.
    ///
    /// A failed release is logged at `warn` level and never replaces
    /// `error`.
    #[must_use]
    pub fn discard<E>(self, device: &D, error: E) -> E {
        if let Err(release) = self.deallocate(device) {
            warn!(
                device = device.name(),
                error = %release,
                "failed to release dataset after an earlier failure"
            );
        }
        error
    }

    /// Returns the dataset shape.
    #[must_use]
    #[rustfmt::skip]
    pub const fn shape(&self) -> DatasetShape { self.shape }

    /// Returns the number of rows.
    #[must_use]
    #[rustfmt::skip]
    pub const fn rows(&self) -> usize { self.shape.rows }

    /// Returns the number of feature columns.
    #[must_use]
    #[rustfmt::skip]
    pub const fn cols(&self) -> usize { self.shape.cols }

    /// Returns the number of classes.
    #[must_use]
    #[rustfmt::skip]
    pub const fn classes(&self) -> usize { self.shape.classes }

    /// Returns the device feature buffer (`rows * cols` values, row-major).
    #[must_use]
    pub const fn features(&self) -> &D::Buffer<f32> {
        &self.features
    }

    /// Returns the device label buffer (`rows` values).
    #[must_use]
    pub const fn labels(&self) -> &D::Buffer<i32> {
        &self.labels
    }
}

fn report_release_failure(device: &str, release: &DeviceError) {
    warn!(device, error = %release, "failed to release buffer after an earlier failure");
}

impl<D: Device> std::fmt::Debug for Dataset<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("shape", &self.shape)
            .field("features", &self.features.len())
            .field("labels", &self.labels.len())
            .finish()
    }
}
