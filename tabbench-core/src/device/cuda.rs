//! CUDA device backend built on `cudarc`.
//!
//! Buffers are allocated on the device's default stream. Copies use the
//! driver's synchronous entry points, so [`Device::synchronize`] only has to
//! drain work enqueued by other libraries sharing the stream.

use std::sync::Arc;

use cudarc::driver::{CudaSlice, DeviceSlice, DriverError};
use tracing::{debug, instrument};

use super::{Device, DeviceBuffer, DeviceElement, check_copy_len};
use crate::error::DeviceError;

impl<T: DeviceElement> DeviceBuffer for CudaSlice<T> {
    fn len(&self) -> usize {
        DeviceSlice::len(self)
    }
}

fn driver_error(error: &DriverError) -> DeviceError {
    DeviceError::Driver {
        message: error.to_string(),
    }
}

/// A CUDA accelerator addressed by ordinal.
#[derive(Debug, Clone)]
pub struct CudaDevice {
    inner: Arc<cudarc::driver::CudaDevice>,
    name: String,
}

impl CudaDevice {
    /// Opens the CUDA device with the given ordinal.
    ///
    /// # Errors
    /// Returns [`DeviceError::Driver`] when the driver cannot open the device.
    #[instrument(name = "device.cuda.open", err)]
    pub fn new(ordinal: usize) -> Result<Self, DeviceError> {
        let inner = cudarc::driver::CudaDevice::new(ordinal).map_err(|e| driver_error(&e))?;
        let name = format!("cuda:{ordinal}");
        debug!(device = name.as_str(), "CUDA device opened");
        Ok(Self { inner, name })
    }
}

impl Device for CudaDevice {
    type Buffer<T: DeviceElement> = CudaSlice<T>;

    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "device.cuda.allocate", level = "debug", skip(self), err)]
    fn allocate<T: DeviceElement>(&self, len: usize) -> Result<CudaSlice<T>, DeviceError> {
        self.inner
            .alloc_zeros::<T>(len)
            .map_err(|e| driver_error(&e))
    }

    fn deallocate<T: DeviceElement>(&self, buffer: CudaSlice<T>) -> Result<(), DeviceError> {
        // Dropping a slice frees it asynchronously on the owning stream.
        drop(buffer);
        Ok(())
    }

    fn copy_from_host<T: DeviceElement>(
        &self,
        dst: &mut CudaSlice<T>,
        src: &[T],
    ) -> Result<(), DeviceError> {
        check_copy_len(DeviceSlice::len(dst), src.len())?;
        self.inner
            .htod_sync_copy_into(src, dst)
            .map_err(|e| driver_error(&e))
    }

    fn copy_to_host<T: DeviceElement>(
        &self,
        src: &CudaSlice<T>,
        dst: &mut [T],
    ) -> Result<(), DeviceError> {
        check_copy_len(DeviceSlice::len(src), dst.len())?;
        self.inner
            .dtoh_sync_copy_into(src, dst)
            .map_err(|e| driver_error(&e))
    }

    fn synchronize(&self) -> Result<(), DeviceError> {
        self.inner.synchronize().map_err(|e| driver_error(&e))
    }
}
