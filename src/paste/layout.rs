use crate::device::cpu::{CpuDevice, DeviceBuffer};
use crate::foundation::core::ImageShape;
use crate::foundation::error::{BatchAugError, BatchAugResult};
use crate::paste::geometry::{NUM_INDICES, PasteGeometry};

/// Host-side batch layout: three parallel flat buffers indexed by sample.
///
/// - `source_offsets[batch]`: byte offset of each input sample in the input arena
/// - `destination_offsets[batch]`: byte offset of each canvas in the output arena
/// - `geometry[batch * 6]`: [`PasteGeometry::to_indices`] per sample
///
/// Sized once for the fixed batch size. [`BatchLayout::reset`] only clears the written flags;
/// every slot is fully overwritten by the next batch and an unwritten slot is never uploaded.
#[derive(Clone, Debug)]
pub struct BatchLayout {
    source_offsets: Vec<u64>,
    destination_offsets: Vec<u64>,
    geometry: Vec<u32>,
    sample_written: Vec<bool>,
    destinations_written: bool,
}

impl BatchLayout {
    /// Allocate buffers for `batch_size` samples.
    pub fn new(batch_size: usize) -> Self {
        Self {
            source_offsets: vec![0; batch_size],
            destination_offsets: vec![0; batch_size],
            geometry: vec![0; batch_size * NUM_INDICES],
            sample_written: vec![false; batch_size],
            destinations_written: false,
        }
    }

    /// Number of slots.
    pub fn batch_size(&self) -> usize {
        self.sample_written.len()
    }

    /// Start a new batch: mark every slot stale.
    pub fn reset(&mut self) {
        self.sample_written.fill(false);
        self.destinations_written = false;
    }

    /// Overwrite slot `idx` with its geometry and source offset.
    pub fn write_sample(
        &mut self,
        idx: usize,
        geometry: PasteGeometry,
        source_offset: usize,
    ) -> BatchAugResult<()> {
        if idx >= self.batch_size() {
            return Err(BatchAugError::config(format!(
                "sample {idx} is outside the layout's batch size {}",
                self.batch_size()
            )));
        }
        self.geometry[idx * NUM_INDICES..(idx + 1) * NUM_INDICES]
            .copy_from_slice(&geometry.to_indices());
        self.source_offsets[idx] = source_offset as u64;
        self.sample_written[idx] = true;
        Ok(())
    }

    /// Overwrite every destination offset at once, in sample order.
    pub fn write_destinations(&mut self, offsets: &[usize]) -> BatchAugResult<()> {
        if offsets.len() != self.batch_size() {
            return Err(BatchAugError::config(format!(
                "expected {} destination offsets, got {}",
                self.batch_size(),
                offsets.len()
            )));
        }
        for (slot, &off) in self.destination_offsets.iter_mut().zip(offsets) {
            *slot = off as u64;
        }
        self.destinations_written = true;
        Ok(())
    }

    /// Fail if any per-sample slot is stale.
    pub fn ensure_samples_written(&self) -> BatchAugResult<()> {
        match self.sample_written.iter().position(|w| !w) {
            Some(idx) => Err(BatchAugError::device(format!(
                "layout slot {idx} was not written this batch"
            ))),
            None => Ok(()),
        }
    }

    /// Fail if any slot or the destination offsets are stale.
    pub fn ensure_complete(&self) -> BatchAugResult<()> {
        self.ensure_samples_written()?;
        if !self.destinations_written {
            return Err(BatchAugError::device(
                "destination offsets were not written this batch",
            ));
        }
        Ok(())
    }

    /// Geometry of slot `idx`.
    pub fn geometry(&self, idx: usize) -> Option<PasteGeometry> {
        let slot: &[u32; NUM_INDICES] = self
            .geometry
            .get(idx * NUM_INDICES..(idx + 1) * NUM_INDICES)?
            .try_into()
            .ok()?;
        Some(PasteGeometry::from_indices(slot))
    }

    /// Canvas shapes for all slots with `channels` channels.
    pub fn output_shapes(&self, channels: u32) -> Vec<ImageShape> {
        self.geometry
            .chunks_exact(NUM_INDICES)
            .map(|g| ImageShape::new(g[2], g[3], channels))
            .collect()
    }

    /// Flat geometry buffer.
    pub fn geometry_buffer(&self) -> &[u32] {
        &self.geometry
    }

    /// Source offsets in sample order.
    pub fn source_offsets(&self) -> &[u64] {
        &self.source_offsets
    }

    /// Destination offsets in sample order.
    pub fn destination_offsets(&self) -> &[u64] {
        &self.destination_offsets
    }
}

/// Device-resident mirror of a [`BatchLayout`].
#[derive(Debug)]
pub struct DeviceBatchLayout {
    pub(crate) source_offsets: DeviceBuffer<u64>,
    pub(crate) destination_offsets: DeviceBuffer<u64>,
    pub(crate) geometry: DeviceBuffer<u32>,
}

impl DeviceBatchLayout {
    /// Allocate device buffers for `batch_size` samples.
    pub fn new(batch_size: usize) -> Self {
        Self {
            source_offsets: DeviceBuffer::with_capacity(batch_size),
            destination_offsets: DeviceBuffer::with_capacity(batch_size),
            geometry: DeviceBuffer::with_capacity(batch_size * NUM_INDICES),
        }
    }

    /// Copy all three host buffers to the device as one transfer.
    pub fn upload(&mut self, host: &BatchLayout, device: &mut CpuDevice) -> BatchAugResult<()> {
        host.ensure_complete()?;
        self.source_offsets.copy_from_host(host.source_offsets());
        self.destination_offsets
            .copy_from_host(host.destination_offsets());
        self.geometry.copy_from_host(host.geometry_buffer());
        device.record_transfer(
            self.source_offsets.byte_len()
                + self.destination_offsets.byte_len()
                + self.geometry.byte_len(),
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/paste/layout.rs"]
mod tests;
