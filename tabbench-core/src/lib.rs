//! Tabbench core library.
//!
//! Prepares labeled tabular datasets for benchmark runs: Gaussian blobs are
//! generated from a seed or a text dataset is loaded from disk, and the
//! result is placed in the memory of a [`Device`].
#![cfg_attr(docsrs, feature(doc_cfg))]

mod blobs;
mod dataset;
mod device;
mod error;
mod format;
mod host;

#[cfg(feature = "cuda")]
pub use crate::device::CudaDevice;
pub use crate::{
    blobs::{
        BlobsConfig, DEFAULT_CENTER_BOX_MAX, DEFAULT_CENTER_BOX_MIN, DEFAULT_CLUSTER_STD,
        DEFAULT_CLUSTERS, DEFAULT_COLS, DEFAULT_ROWS, DEFAULT_SEED, generate_blobs, make_blobs,
    },
    dataset::Dataset,
    device::{
        Device, DeviceBuffer, DeviceElement, HostBuffer, HostDevice, MemoryStats, MemoryTracker,
    },
    error::{
        BlobsError, BlobsErrorCode, DatasetError, DatasetErrorCode, DeviceError, DeviceErrorCode,
        FormatError, FormatErrorCode, Result, ShapeError, ShapeErrorCode,
    },
    format::{
        dump_dataset, dump_from_device, load_dataset, load_to_device, read_dataset, write_dataset,
    },
    host::{DatasetShape, HostDataset},
};
