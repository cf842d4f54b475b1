//! Host-memory device backend.

use std::mem::size_of;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument};

use super::{Device, DeviceBuffer, DeviceElement, MemoryStats, MemoryTracker, check_copy_len};
use crate::error::DeviceError;

/// A buffer allocated by [`HostDevice`].
#[derive(Clone, Debug, PartialEq)]
pub struct HostBuffer<T> {
    data: Vec<T>,
}

impl<T> HostBuffer<T> {
    /// Returns the buffer contents.
    ///
    /// Host buffers are directly addressable; device backends are not, so
    /// portable code goes through [`Device::copy_to_host`] instead.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T> DeviceBuffer for HostBuffer<T> {
    fn len(&self) -> usize {
        self.data.len()
    }
}

/// Device backend whose buffers live in host memory.
///
/// Copies complete immediately but are still counted as queued stream
/// operations until [`Device::synchronize`] is called, so callers exercise
/// the same synchronisation discipline they need on a real accelerator.
///
/// # Examples
/// ```
/// use tabbench_core::{Device, HostDevice};
///
/// let device = HostDevice::with_limit(64);
/// let buffer = device.allocate::<i32>(8)?;
/// assert_eq!(device.memory_stats().bytes_in_use, 32);
/// assert!(device.allocate::<f32>(9).is_err());
/// device.deallocate(buffer)?;
/// assert_eq!(device.memory_stats().live_allocations, 0);
/// # Ok::<(), tabbench_core::DeviceError>(())
/// ```
#[derive(Debug, Default)]
pub struct HostDevice {
    tracker: Mutex<MemoryTracker>,
    pending: AtomicUsize,
}

impl HostDevice {
    /// Creates a host device with no memory limit.
    #[must_use]
    pub const fn new() -> Self {
        Self::from_tracker(MemoryTracker::unlimited())
    }

    /// Creates a host device that refuses to hold more than `limit` bytes.
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self::from_tracker(MemoryTracker::with_limit(limit))
    }

    const fn from_tracker(tracker: MemoryTracker) -> Self {
        Self {
            tracker: Mutex::new(tracker),
            pending: AtomicUsize::new(0),
        }
    }

    /// Returns a snapshot of allocator usage.
    #[must_use]
    pub fn memory_stats(&self) -> MemoryStats {
        self.tracker().stats()
    }

    /// Returns the number of stream operations queued since the last
    /// [`Device::synchronize`].
    #[must_use]
    pub fn pending_operations(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn tracker(&self) -> MutexGuard<'_, MemoryTracker> {
        self.tracker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }
}

fn byte_size<T>(len: usize) -> Result<usize, DeviceError> {
    len.checked_mul(size_of::<T>())
        .ok_or(DeviceError::SizeOverflow { len })
}

impl Device for HostDevice {
    type Buffer<T: DeviceElement> = HostBuffer<T>;

    #[expect(
        clippy::unnecessary_literal_bound,
        reason = "Device trait constrains the return type to &str"
    )]
    fn name(&self) -> &str {
        "host"
    }

    #[instrument(name = "device.host.allocate", level = "debug", skip(self), err)]
    fn allocate<T: DeviceElement>(&self, len: usize) -> Result<HostBuffer<T>, DeviceError> {
        let bytes = byte_size::<T>(len)?;
        let mut tracker = self.tracker();
        let before = tracker.clone();
        tracker.allocate(bytes)?;
        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            *tracker = before;
            return Err(DeviceError::OutOfMemory {
                requested: bytes,
                in_use: tracker.stats().bytes_in_use,
                limit: tracker.limit().unwrap_or(usize::MAX),
            });
        }
        drop(tracker);
        data.resize(len, T::default());
        debug!(bytes, "host buffer allocated");
        Ok(HostBuffer { data })
    }

    #[instrument(
        name = "device.host.deallocate",
        level = "debug",
        skip(self, buffer),
        fields(len = buffer.len()),
        err
    )]
    fn deallocate<T: DeviceElement>(&self, buffer: HostBuffer<T>) -> Result<(), DeviceError> {
        let bytes = byte_size::<T>(buffer.len())?;
        self.tracker().deallocate(bytes);
        drop(buffer);
        Ok(())
    }

    fn copy_from_host<T: DeviceElement>(
        &self,
        dst: &mut HostBuffer<T>,
        src: &[T],
    ) -> Result<(), DeviceError> {
        check_copy_len(dst.len(), src.len())?;
        dst.data.copy_from_slice(src);
        self.enqueue();
        Ok(())
    }

    fn copy_to_host<T: DeviceElement>(
        &self,
        src: &HostBuffer<T>,
        dst: &mut [T],
    ) -> Result<(), DeviceError> {
        check_copy_len(src.len(), dst.len())?;
        dst.copy_from_slice(&src.data);
        self.enqueue();
        Ok(())
    }

    fn synchronize(&self) -> Result<(), DeviceError> {
        self.pending.store(0, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn allocation_is_tracked_in_bytes() {
        let device = HostDevice::new();
        let features = device.allocate::<f32>(10).expect("allocation must succeed");
        let labels = device.allocate::<i32>(5).expect("allocation must succeed");
        let stats = device.memory_stats();
        assert_eq!(stats.bytes_in_use, 60);
        assert_eq!(stats.live_allocations, 2);

        device.deallocate(features).expect("release must succeed");
        device.deallocate(labels).expect("release must succeed");
        let stats = device.memory_stats();
        assert_eq!(stats.bytes_in_use, 0);
        assert_eq!(stats.peak_bytes, 60);
    }

    #[rstest]
    fn copies_are_pending_until_synchronised() {
        let device = HostDevice::new();
        let mut buffer = device.allocate::<i32>(2).expect("allocation must succeed");
        device
            .copy_from_host(&mut buffer, &[4, 5])
            .expect("copy must succeed");
        assert_eq!(device.pending_operations(), 1);
        device.synchronize().expect("synchronize must succeed");
        assert_eq!(device.pending_operations(), 0);
        assert_eq!(buffer.as_slice(), &[4, 5]);
    }

    #[rstest]
    #[case::too_short(1)]
    #[case::too_long(3)]
    fn copy_rejects_length_mismatch(#[case] host_len: usize) {
        let device = HostDevice::new();
        let mut buffer = device.allocate::<f32>(2).expect("allocation must succeed");
        let host = vec![0.0_f32; host_len];
        let err = device
            .copy_from_host(&mut buffer, &host)
            .expect_err("mismatched copy must fail");
        assert_eq!(
            err,
            DeviceError::LengthMismatch {
                expected: 2,
                actual: host_len
            }
        );

        let mut out = vec![0.0_f32; host_len];
        let err = device
            .copy_to_host(&buffer, &mut out)
            .expect_err("mismatched copy must fail");
        assert!(matches!(err, DeviceError::LengthMismatch { .. }));
    }

    #[rstest]
    fn unreservable_allocation_is_out_of_memory() {
        let device = HostDevice::new();
        // Fits `usize` in bytes but exceeds `isize::MAX`, so no allocator
        // can hand it out.
        let err = device
            .allocate::<f32>(usize::MAX / 4)
            .expect_err("oversized allocation must fail");
        assert!(matches!(err, DeviceError::OutOfMemory { .. }));
        assert_eq!(device.memory_stats(), MemoryStats::default());
    }

    #[rstest]
    fn allocation_size_overflow_is_reported() {
        let device = HostDevice::new();
        let err = device
            .allocate::<f32>(usize::MAX)
            .expect_err("overflowing size must fail");
        assert_eq!(err, DeviceError::SizeOverflow { len: usize::MAX });
    }
}
