//! Byte accounting for device allocations.

use crate::error::DeviceError;

/// Snapshot of allocator usage.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MemoryStats {
    /// Bytes currently held by live allocations.
    pub bytes_in_use: usize,
    /// Highest value `bytes_in_use` has reached.
    pub peak_bytes: usize,
    /// Number of live allocations.
    pub live_allocations: usize,
}

/// Tracks allocated bytes against an optional limit.
///
/// All quantities are byte counts.
#[derive(Clone, Debug, Default)]
pub struct MemoryTracker {
    limit: Option<usize>,
    stats: MemoryStats,
}

impl MemoryTracker {
    /// Creates a tracker with no byte limit.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            limit: None,
            stats: MemoryStats {
                bytes_in_use: 0,
                peak_bytes: 0,
                live_allocations: 0,
            },
        }
    }

    /// Creates a tracker that rejects allocations past `limit` bytes.
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::unlimited()
        }
    }

    /// Records an allocation of `size` bytes.
    ///
    /// # Errors
    /// Returns [`DeviceError::OutOfMemory`] when the allocation would pass
    /// the limit or overflow the counter.
    pub fn allocate(&mut self, size: usize) -> Result<(), DeviceError> {
        let limit = self.limit.unwrap_or(usize::MAX);
        let out_of_memory = DeviceError::OutOfMemory {
            requested: size,
            in_use: self.stats.bytes_in_use,
            limit,
        };
        let new_usage = self
            .stats
            .bytes_in_use
            .checked_add(size)
            .ok_or_else(|| out_of_memory.clone())?;
        if new_usage > limit {
            return Err(out_of_memory);
        }
        self.stats.bytes_in_use = new_usage;
        self.stats.peak_bytes = self.stats.peak_bytes.max(new_usage);
        self.stats.live_allocations = self.stats.live_allocations.saturating_add(1);
        Ok(())
    }

    /// Records the release of an allocation of `size` bytes.
    pub const fn deallocate(&mut self, size: usize) {
        self.stats.bytes_in_use = self.stats.bytes_in_use.saturating_sub(size);
        self.stats.live_allocations = self.stats.live_allocations.saturating_sub(1);
    }

    /// Returns the configured byte limit, if any.
    #[must_use]
    #[rustfmt::skip]
    pub const fn limit(&self) -> Option<usize> { self.limit }

    /// Returns a snapshot of the current usage.
    #[must_use]
    #[rustfmt::skip]
    pub const fn stats(&self) -> MemoryStats { self.stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn tracks_usage_and_peak() {
        let mut tracker = MemoryTracker::unlimited();
        tracker.allocate(64).expect("allocation must succeed");
        tracker.allocate(32).expect("allocation must succeed");
        tracker.deallocate(64);
        assert_eq!(
            tracker.stats(),
            MemoryStats {
                bytes_in_use: 32,
                peak_bytes: 96,
                live_allocations: 1,
            }
        );
    }

    #[rstest]
    fn rejects_allocations_past_the_limit() {
        let mut tracker = MemoryTracker::with_limit(100);
        tracker.allocate(60).expect("allocation must succeed");
        let err = tracker.allocate(41).expect_err("limit must be enforced");
        assert_eq!(
            err,
            DeviceError::OutOfMemory {
                requested: 41,
                in_use: 60,
                limit: 100,
            }
        );
        assert_eq!(tracker.stats().live_allocations, 1);
    }

    #[rstest]
    fn exact_fit_is_accepted() {
        let mut tracker = MemoryTracker::with_limit(8);
        tracker.allocate(8).expect("exact fit must succeed");
        assert_eq!(tracker.limit(), Some(8));
    }
}
