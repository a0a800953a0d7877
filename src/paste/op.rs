use std::sync::Arc;

use smallvec::SmallVec;

use crate::config::spec::OpSpec;
use crate::device::cpu::{CpuDevice, DeviceBuffer, DeviceOpts, DeviceStats};
use crate::foundation::error::{BatchAugError, BatchAugResult};
use crate::paste::geometry::{PasteGeometry, Placement};
use crate::paste::kernel::{PasteLaunch, paste_batch};
use crate::paste::layout::{BatchLayout, DeviceBatchLayout};
use crate::pipeline::operator::{Operator, run_operator};
use crate::pipeline::workspace::Workspace;

/// Upper bound on `n_channels`: the per-launch fill value must fit a fixed working buffer.
pub const MAX_CHANNELS: u32 = 1024;

/// Host parameters of one sample, produced by per-sample setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PasteSample {
    /// Validated placement geometry.
    pub geometry: PasteGeometry,
    /// Byte offset of the sample in the input arena.
    pub source_offset: usize,
}

/// Batched paste: places every source image on its own canvas in one device launch.
///
/// Arguments:
/// - `batch_size` (required, >= 1)
/// - `n_channels` (default 3, `1..=1024`)
/// - `fill_value` (one value or `n_channels` values, default 0)
/// - `ratio`, `paste_x`, `paste_y`, `min_canvas_size`: default [`Placement::Relative`] used for
///   samples without workspace placement metadata
/// - `num_threads`
///
/// The operator owns its device; it is not `Clone`.
#[derive(Debug)]
pub struct Paste {
    batch_size: usize,
    channels: u32,
    fill_value: SmallVec<[u8; 4]>,
    default_placement: Placement,

    layout: BatchLayout,
    device_layout: DeviceBatchLayout,
    fill_value_device: DeviceBuffer<u8>,
    device: CpuDevice,
}

impl Paste {
    /// Validate arguments and acquire the device.
    pub fn new(spec: &OpSpec) -> BatchAugResult<Self> {
        let batch_size: usize = spec
            .argument("batch_size")?
            .ok_or_else(|| BatchAugError::config("Paste requires 'batch_size'"))?;
        if batch_size == 0 {
            return Err(BatchAugError::config("'batch_size' must be >= 1"));
        }

        let channels: u32 = spec.argument_or("n_channels", 3)?;
        if channels > MAX_CHANNELS {
            return Err(BatchAugError::config(format!(
                "n_channels of more than {MAX_CHANNELS} is not supported (got {channels})"
            )));
        }
        if channels == 0 {
            return Err(BatchAugError::config("n_channels must be >= 1"));
        }

        let fill_value = spec.single_or_repeated::<u8>("fill_value", channels as usize, 0)?;
        let default_placement = Placement::Relative {
            ratio: spec.argument_or("ratio", 1.0)?,
            paste_x: spec.argument_or("paste_x", 0.5)?,
            paste_y: spec.argument_or("paste_y", 0.5)?,
            min_canvas_size: spec.argument_or("min_canvas_size", 0)?,
        };

        let mut device = CpuDevice::new(&DeviceOpts {
            threads: spec.argument("num_threads")?,
        })?;
        let mut fill_value_device = DeviceBuffer::with_capacity(fill_value.len());
        fill_value_device.copy_from_host(&fill_value);
        device.record_transfer(fill_value_device.byte_len());

        tracing::debug!(batch_size, channels, "paste operator ready");
        Ok(Self {
            batch_size,
            channels,
            fill_value,
            default_placement,
            layout: BatchLayout::new(batch_size),
            device_layout: DeviceBatchLayout::new(batch_size),
            fill_value_device,
            device,
        })
    }

    /// Fixed batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Channels per pixel.
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Fill value, one entry per channel.
    pub fn fill_value(&self) -> &[u8] {
        &self.fill_value
    }

    /// Placement for samples without workspace metadata.
    pub fn default_placement(&self) -> Placement {
        self.default_placement
    }

    /// Host layout of the last batch.
    pub fn layout(&self) -> &BatchLayout {
        &self.layout
    }

    /// Device counters.
    pub fn device_stats(&self) -> DeviceStats {
        self.device.stats()
    }

    /// Wait for the last launch before reading the output.
    pub fn synchronize(&mut self) -> DeviceStats {
        self.device.synchronize()
    }

    /// Run shared setup, per-sample setup and the launch for one batch.
    pub fn run_batch(&mut self, ws: &mut Workspace) -> BatchAugResult<()> {
        run_operator(self, ws)
    }
}

impl Operator for Paste {
    type SampleParams = PasteSample;

    fn name(&self) -> &str {
        "Paste"
    }

    fn worker_pool(&self) -> Arc<rayon::ThreadPool> {
        self.device.pool()
    }

    fn setup_shared(&mut self, ws: &Workspace) -> BatchAugResult<()> {
        if ws.batch_len() != self.batch_size {
            return Err(BatchAugError::config(format!(
                "Paste built for batch_size {}, got {} samples",
                self.batch_size,
                ws.batch_len()
            )));
        }
        if !ws.placements().is_empty() && ws.placements().len() != self.batch_size {
            return Err(BatchAugError::config(format!(
                "expected {} placements, got {}",
                self.batch_size,
                ws.placements().len()
            )));
        }
        self.layout.reset();
        Ok(())
    }

    fn setup_sample(&self, ws: &Workspace, idx: usize) -> BatchAugResult<PasteSample> {
        let shape = ws
            .input()
            .shape(idx)
            .ok_or_else(|| BatchAugError::geometry(idx, "sample missing from input"))?;
        if shape.channels != self.channels {
            return Err(BatchAugError::geometry(
                idx,
                format!(
                    "input has {} channels, Paste expects {}",
                    shape.channels, self.channels
                ),
            ));
        }
        let placement = ws.placement(idx).unwrap_or(self.default_placement);
        let geometry = placement.resolve(idx, shape.extent())?;
        let source_offset = ws
            .input()
            .offset(idx)
            .ok_or_else(|| BatchAugError::geometry(idx, "sample missing from input"))?;
        Ok(PasteSample {
            geometry,
            source_offset,
        })
    }

    fn commit_sample(&mut self, idx: usize, params: PasteSample) -> BatchAugResult<()> {
        self.layout
            .write_sample(idx, params.geometry, params.source_offset)
    }

    #[tracing::instrument(skip_all, fields(batch = self.batch_size))]
    fn run(&mut self, ws: &mut Workspace) -> BatchAugResult<()> {
        self.layout.ensure_samples_written()?;

        let shapes = self.layout.output_shapes(self.channels);
        ws.output_mut().resize(&shapes)?;
        let destinations = (0..self.batch_size)
            .map(|i| ws.output().offset(i))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| BatchAugError::device("output list has fewer samples than the batch"))?;
        self.layout.write_destinations(&destinations)?;

        self.device_layout.upload(&self.layout, &mut self.device)?;

        let launch = PasteLaunch {
            geometry: self.device_layout.geometry.as_slice(),
            source_offsets: self.device_layout.source_offsets.as_slice(),
            destination_offsets: self.device_layout.destination_offsets.as_slice(),
            channels: self.channels as usize,
            fill_value: self.fill_value_device.as_slice(),
        };
        let (input, output) = ws.io_mut();
        self.device
            .launch(|| paste_batch(&launch, input.as_bytes(), output.as_bytes_mut()))?;

        tracing::debug!(
            output_bytes = ws.output().as_bytes().len(),
            "paste batch launched"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/paste/op.rs"]
mod tests;
