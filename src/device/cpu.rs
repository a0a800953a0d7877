use std::sync::Arc;

use crate::foundation::error::{BatchAugError, BatchAugResult};

/// Device construction options.
#[derive(Clone, Debug, Default)]
pub struct DeviceOpts {
    /// Optional explicit worker thread count. `None` lets rayon pick.
    pub threads: Option<usize>,
}

/// Counters accumulated by a [`CpuDevice`] across batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Host-to-device transfers issued (one per uploaded unit, not per buffer).
    pub transfers: u64,
    /// Bytes moved host-to-device.
    pub transfer_bytes: u64,
    /// Kernel launches.
    pub launches: u64,
    /// Completed `synchronize` fences.
    pub syncs: u64,
}

/// CPU stand-in for an accelerator: a dedicated worker pool plus a command counter.
///
/// Work submitted through the device executes eagerly on its pool, so the queue is always
/// drained by the time a submit call returns. [`CpuDevice::synchronize`] is kept as the fence
/// downstream consumers call before reading results.
///
/// Not `Clone`: the pool and the stream counters have exactly one owner.
pub struct CpuDevice {
    pool: Arc<rayon::ThreadPool>,
    stats: DeviceStats,
}

impl std::fmt::Debug for CpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuDevice")
            .field("threads", &self.pool.current_num_threads())
            .field("stats", &self.stats)
            .finish()
    }
}

impl CpuDevice {
    /// Acquire a device with its own worker pool.
    pub fn new(opts: &DeviceOpts) -> BatchAugResult<Self> {
        Ok(Self {
            pool: Arc::new(build_thread_pool(opts.threads)?),
            stats: DeviceStats::default(),
        })
    }

    /// Shared handle to the worker pool, for host-side parallel setup.
    pub fn pool(&self) -> Arc<rayon::ThreadPool> {
        Arc::clone(&self.pool)
    }

    /// Counters so far.
    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    /// Record one host-to-device transfer unit of `bytes` bytes.
    pub(crate) fn record_transfer(&mut self, bytes: usize) {
        self.stats.transfers = self.stats.transfers.saturating_add(1);
        self.stats.transfer_bytes = self.stats.transfer_bytes.saturating_add(bytes as u64);
    }

    /// Run `kernel` on the device pool as one launch.
    pub(crate) fn launch<R: Send>(
        &mut self,
        kernel: impl FnOnce() -> BatchAugResult<R> + Send,
    ) -> BatchAugResult<R> {
        self.stats.launches = self.stats.launches.saturating_add(1);
        self.pool.install(kernel)
    }

    /// Wait for all submitted work. Work is eager on this device, so this only counts the fence.
    pub fn synchronize(&mut self) -> DeviceStats {
        self.stats.syncs = self.stats.syncs.saturating_add(1);
        self.stats
    }
}

/// Device-resident copy of a host buffer.
///
/// Sized once and refilled on every upload; the allocation is only grown, never shrunk.
#[derive(Debug, Default)]
pub struct DeviceBuffer<T> {
    data: Vec<T>,
}

impl<T: Copy> DeviceBuffer<T> {
    /// Create a buffer with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Overwrite the device contents with `host`.
    pub fn copy_from_host(&mut self, host: &[T]) {
        self.data.clear();
        self.data.extend_from_slice(host);
    }

    /// Byte size of the current contents.
    pub fn byte_len(&self) -> usize {
        std::mem::size_of_val(self.data.as_slice())
    }

    /// Element capacity of the allocation.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub(crate) fn as_slice(&self) -> &[T] {
        &self.data
    }
}

fn build_thread_pool(threads: Option<usize>) -> BatchAugResult<rayon::ThreadPool> {
    let builder = match threads {
        Some(0) => {
            return Err(BatchAugError::config(
                "'num_threads' must be >= 1; omit it to size the device pool automatically",
            ));
        }
        Some(n) => rayon::ThreadPoolBuilder::new().num_threads(n),
        None => rayon::ThreadPoolBuilder::new(),
    };
    builder
        .thread_name(|i| format!("batchaug-device-{i}"))
        .build()
        .map_err(|e| BatchAugError::device(format!("device worker pool unavailable: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/device/cpu.rs"]
mod tests;
