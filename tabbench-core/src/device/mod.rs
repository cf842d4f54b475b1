//! Device allocator and stream abstraction.
//!
//! A [`Device`] couples one allocator with one ordered execution stream.
//! Copies are enqueued on that stream; host code must call
//! [`Device::synchronize`] before it reads memory written by the device.
//! [`HostDevice`] keeps buffers in host memory and is always available;
//! `CudaDevice` is compiled in with the `cuda` feature.

#[cfg(feature = "cuda")]
mod cuda;
mod host;
mod tracker;

#[cfg(feature = "cuda")]
#[cfg_attr(docsrs, doc(cfg(feature = "cuda")))]
pub use cuda::CudaDevice;
pub use host::{HostBuffer, HostDevice};
pub use tracker::{MemoryStats, MemoryTracker};

use crate::error::DeviceError;

mod sealed {
    pub trait Sealed {}

    impl Sealed for f32 {}
    impl Sealed for i32 {}
}

/// Element types that may be stored in device buffers.
#[cfg(not(feature = "cuda"))]
pub trait DeviceElement: sealed::Sealed + Copy + Default + Send + Sync + 'static {}

/// Element types that may be stored in device buffers.
#[cfg(feature = "cuda")]
pub trait DeviceElement:
    sealed::Sealed
    + Copy
    + Default
    + Send
    + Sync
    + Unpin
    + 'static
    + cudarc::driver::DeviceRepr
    + cudarc::driver::ValidAsZeroBits
{
}

impl DeviceElement for f32 {}
impl DeviceElement for i32 {}

/// A typed region of device memory.
pub trait DeviceBuffer {
    /// Returns the number of elements held by the buffer.
    fn len(&self) -> usize;

    /// Returns whether the buffer holds no elements.
    #[must_use]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An allocator bound to an execution stream.
///
/// # Examples
/// ```
/// use tabbench_core::{Device, DeviceBuffer, HostDevice};
///
/// let device = HostDevice::new();
/// let mut buffer = device.allocate::<f32>(3)?;
/// device.copy_from_host(&mut buffer, &[1.0, 2.0, 3.0])?;
/// device.synchronize()?;
///
/// let mut out = vec![0.0_f32; buffer.len()];
/// device.copy_to_host(&buffer, &mut out)?;
/// device.synchronize()?;
/// assert_eq!(out, [1.0, 2.0, 3.0]);
/// device.deallocate(buffer)?;
/// # Ok::<(), tabbench_core::DeviceError>(())
/// ```
pub trait Device {
    /// Buffer type produced by this device's allocator.
    type Buffer<T: DeviceElement>: DeviceBuffer;

    /// Returns a human-readable device name.
    fn name(&self) -> &str;

    /// Allocates an uninitialised-by-contract buffer of `len` elements.
    ///
    /// # Errors
    /// Returns [`DeviceError`] when the allocator cannot satisfy the request.
    fn allocate<T: DeviceElement>(&self, len: usize) -> Result<Self::Buffer<T>, DeviceError>;

    /// Returns `buffer` to the allocator.
    ///
    /// # Errors
    /// Returns [`DeviceError`] when the allocator rejects the release.
    fn deallocate<T: DeviceElement>(&self, buffer: Self::Buffer<T>) -> Result<(), DeviceError>;

    /// Enqueues a host-to-device copy of `src` into `dst`.
    ///
    /// # Errors
    /// Returns [`DeviceError::LengthMismatch`] when the lengths differ, or a
    /// driver error when the copy cannot be enqueued.
    fn copy_from_host<T: DeviceElement>(
        &self,
        dst: &mut Self::Buffer<T>,
        src: &[T],
    ) -> Result<(), DeviceError>;

    /// Enqueues a device-to-host copy of `src` into `dst`.
    ///
    /// `dst` is only valid after the next [`Device::synchronize`].
    ///
    /// # Errors
    /// Returns [`DeviceError::LengthMismatch`] when the lengths differ, or a
    /// driver error when the copy cannot be enqueued.
    fn copy_to_host<T: DeviceElement>(
        &self,
        src: &Self::Buffer<T>,
        dst: &mut [T],
    ) -> Result<(), DeviceError>;

    /// Blocks until every operation queued on the stream has completed.
    ///
    /// # Errors
    /// Returns [`DeviceError`] when the stream reports a failure.
    fn synchronize(&self) -> Result<(), DeviceError>;
}

pub(crate) const fn check_copy_len(expected: usize, actual: usize) -> Result<(), DeviceError> {
    if expected == actual {
        Ok(())
    } else {
        Err(DeviceError::LengthMismatch { expected, actual })
    }
}
