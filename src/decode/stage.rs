use rayon::prelude::*;

use crate::config::spec::OpSpec;
use crate::crop::window::{CropWindow, CropWindowSource, FullImage, ImageGeometry};
use crate::decode::codec::{OutputColor, decode_region, parse_geometry};
use crate::device::cpu::{CpuDevice, DeviceOpts, DeviceStats};
use crate::foundation::core::ImageShape;
use crate::foundation::error::{BatchAugError, BatchAugResult};
use crate::tensor::list::TensorList;

/// Decode stage arguments, read from an [`OpSpec`].
#[derive(Clone, Debug)]
pub struct DecodeOpts {
    /// Samples per batch. Fixed for the stage's lifetime.
    pub batch_size: usize,
    /// Output pixel format (`output_type`).
    pub output_type: OutputColor,
    /// Worker threads (`num_threads`); `None` lets rayon pick.
    pub threads: Option<usize>,
}

impl DecodeOpts {
    /// Read `batch_size`, `output_type` and `num_threads`.
    pub fn from_spec(spec: &OpSpec) -> BatchAugResult<Self> {
        let batch_size: usize = spec
            .argument("batch_size")?
            .ok_or_else(|| BatchAugError::config("decode stage requires 'batch_size'"))?;
        if batch_size == 0 {
            return Err(BatchAugError::config("'batch_size' must be >= 1"));
        }
        Ok(Self {
            batch_size,
            output_type: spec.argument_or("output_type", OutputColor::default())?,
            threads: spec.argument("num_threads")?,
        })
    }
}

/// One sample's hand-off from host preparation to device decode.
///
/// Borrows the compressed bytes from the batch input; owns the window chosen for it.
#[derive(Clone, Copy, Debug)]
pub struct DecodeRequest<'a> {
    /// Sample index within the batch.
    pub sample: usize,
    /// Compressed bytes, borrowed from the batch input.
    pub bitstream: &'a [u8],
    /// Full image geometry parsed from the header.
    pub geometry: ImageGeometry,
    /// Region to produce. Already validated against `geometry`.
    pub window: CropWindow,
}

/// Pixels produced for one sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedImage {
    /// Sample index within the batch.
    pub sample: usize,
    /// Shape of `data`; its extent equals `window.extent`.
    pub shape: ImageShape,
    /// Region that was decoded.
    pub window: CropWindow,
    /// Interleaved HWC pixels.
    pub data: Vec<u8>,
}

/// Per-batch decode counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Samples submitted.
    pub samples_total: u64,
    /// Samples that produced pixels.
    pub samples_decoded: u64,
    /// Samples that failed (parse, window bounds, or decode).
    pub samples_failed: u64,
}

/// Result of one batch: a per-sample outcome in sample index order.
#[derive(Debug)]
pub struct DecodedBatch {
    samples: Vec<BatchAugResult<DecodedImage>>,
}

impl DecodedBatch {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Return `true` for an empty batch.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All per-sample outcomes.
    pub fn samples(&self) -> &[BatchAugResult<DecodedImage>] {
        &self.samples
    }

    /// Outcome of sample `idx`.
    pub fn get(&self, idx: usize) -> Option<&BatchAugResult<DecodedImage>> {
        self.samples.get(idx)
    }

    /// Failed samples with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &BatchAugError)> {
        self.samples
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
    }

    /// Return `true` when every sample decoded.
    pub fn is_complete(&self) -> bool {
        self.samples.iter().all(Result::is_ok)
    }

    /// Counters for this batch.
    pub fn stats(&self) -> DecodeStats {
        let failed = self.failures().count() as u64;
        let total = self.samples.len() as u64;
        DecodeStats {
            samples_total: total,
            samples_decoded: total - failed,
            samples_failed: failed,
        }
    }

    /// Pack all samples into a [`TensorList`] for the next stage.
    ///
    /// Fails with the lowest-index sample error when the batch is incomplete.
    pub fn into_tensor_list(self) -> BatchAugResult<TensorList> {
        let mut out = Vec::with_capacity(self.samples.len());
        for s in self.samples {
            let img = s?;
            out.push((img.shape, img.data));
        }
        TensorList::from_samples(out)
    }
}

/// Device half of the decode: turns validated requests into pixels.
///
/// Owns the device handle. Not `Clone`.
#[derive(Debug)]
pub struct DeviceDecodeStage {
    device: CpuDevice,
    output_type: OutputColor,
}

impl DeviceDecodeStage {
    /// Acquire the device.
    pub fn new(output_type: OutputColor, opts: &DeviceOpts) -> BatchAugResult<Self> {
        Ok(Self {
            device: CpuDevice::new(opts)?,
            output_type,
        })
    }

    /// Output pixel format.
    pub fn output_type(&self) -> OutputColor {
        self.output_type
    }

    /// Decode one request.
    ///
    /// Codec failures become [`BatchAugError::Decode`] for the request's sample; device
    /// failures pass through unchanged.
    pub fn decode(&self, req: &DecodeRequest<'_>) -> BatchAugResult<DecodedImage> {
        decode_request(req, self.output_type)
    }

    /// Decode all requests in one device launch.
    ///
    /// The outer error is a device failure for the whole batch; inner errors are per sample.
    pub fn decode_batch(
        &mut self,
        requests: &[DecodeRequest<'_>],
    ) -> BatchAugResult<Vec<BatchAugResult<DecodedImage>>> {
        let output_type = self.output_type;
        let results = self.device.launch(|| {
            Ok(requests
                .par_iter()
                .map(|r| decode_request(r, output_type))
                .collect::<Vec<_>>())
        })?;

        let mut out = Vec::with_capacity(results.len());
        for r in results {
            match r {
                Err(e @ BatchAugError::Device(_)) => return Err(e),
                other => out.push(other),
            }
        }
        Ok(out)
    }

    fn pool(&self) -> std::sync::Arc<rayon::ThreadPool> {
        self.device.pool()
    }

    fn stats(&self) -> DeviceStats {
        self.device.stats()
    }
}

fn decode_request(req: &DecodeRequest<'_>, color: OutputColor) -> BatchAugResult<DecodedImage> {
    match decode_region(req.bitstream, req.geometry, req.window, color) {
        Ok((shape, data)) => Ok(DecodedImage {
            sample: req.sample,
            shape,
            window: req.window,
            data,
        }),
        Err(e @ BatchAugError::Device(_)) => Err(e),
        Err(e) => Err(BatchAugError::decode(req.sample, format!("{e:#}"))),
    }
}

/// Decode stage with an injected crop-window source.
///
/// Host preparation parses each bitstream header, asks `C` for the sample's window, validates
/// it, and hands a [`DecodeRequest`] to the [`DeviceDecodeStage`]. The source is consulted
/// exactly once per sample and has no say in the stage's lifecycle. With [`FullImage`] the stage
/// behaves as a plain decoder.
///
/// The stage owns a device handle and is neither `Clone` nor `Copy`.
#[derive(Debug)]
pub struct DecodeStage<C: CropWindowSource = FullImage> {
    batch_size: usize,
    device: DeviceDecodeStage,
    crop: C,
}

impl DecodeStage<FullImage> {
    /// Decode stage without cropping.
    pub fn without_crop(spec: &OpSpec) -> BatchAugResult<Self> {
        Self::new(spec, FullImage)
    }
}

impl<C: CropWindowSource> DecodeStage<C> {
    /// Build the stage from `spec` with `crop` as the region source.
    pub fn new(spec: &OpSpec, crop: C) -> BatchAugResult<Self> {
        let opts = DecodeOpts::from_spec(spec)?;
        let device = DeviceDecodeStage::new(
            opts.output_type,
            &DeviceOpts {
                threads: opts.threads,
            },
        )?;
        Ok(Self {
            batch_size: opts.batch_size,
            device,
            crop,
        })
    }

    /// Fixed batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The injected crop source.
    pub fn crop_source(&self) -> &C {
        &self.crop
    }

    /// Device counters.
    pub fn device_stats(&self) -> DeviceStats {
        self.device.stats()
    }

    /// Host preparation for one sample: parse geometry, choose and validate the window.
    pub fn prepare<'a>(
        &self,
        sample: usize,
        bitstream: &'a [u8],
    ) -> BatchAugResult<DecodeRequest<'a>> {
        let geometry = parse_geometry(bitstream)
            .map_err(|e| BatchAugError::decode(sample, format!("{e:#}")))?;
        let window = self
            .crop
            .crop_window(sample, geometry)
            .unwrap_or_else(|| CropWindow::full(geometry));
        window.validate_within(sample, geometry)?;
        Ok(DecodeRequest {
            sample,
            bitstream,
            geometry,
            window,
        })
    }

    /// Decode one batch of compressed images.
    ///
    /// Per-sample failures are isolated in the returned [`DecodedBatch`]; the call itself only
    /// fails on a batch-size mismatch or a device error.
    #[tracing::instrument(skip_all, fields(batch = batch.len()))]
    pub fn run(&mut self, batch: &[&[u8]]) -> BatchAugResult<DecodedBatch> {
        if batch.len() != self.batch_size {
            return Err(BatchAugError::config(format!(
                "decode stage built for batch_size {}, got {} samples",
                self.batch_size,
                batch.len()
            )));
        }

        let this = &*self;
        let prepared: Vec<BatchAugResult<DecodeRequest<'_>>> = this.device.pool().install(|| {
            batch
                .par_iter()
                .enumerate()
                .map(|(i, bytes)| this.prepare(i, *bytes))
                .collect()
        });

        let mut slots: Vec<Option<BatchAugResult<DecodedImage>>> =
            (0..batch.len()).map(|_| None).collect();
        let mut requests = Vec::with_capacity(batch.len());
        for (i, p) in prepared.into_iter().enumerate() {
            match p {
                Ok(req) => requests.push(req),
                Err(e) => {
                    tracing::warn!(sample = i, error = %e, "decode preparation failed");
                    slots[i] = Some(Err(e));
                }
            }
        }

        let decoded = self.device.decode_batch(&requests)?;
        for (req, out) in requests.iter().zip(decoded) {
            if let Err(e) = &out {
                tracing::warn!(sample = req.sample, error = %e, "decode failed");
            }
            slots[req.sample] = Some(out);
        }

        let samples = slots
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                s.unwrap_or_else(|| {
                    Err(BatchAugError::device(format!(
                        "internal error: sample {i} produced no outcome"
                    )))
                })
            })
            .collect();
        let out = DecodedBatch { samples };
        let st = out.stats();
        tracing::debug!(
            decoded = st.samples_decoded,
            failed = st.samples_failed,
            "decode batch done"
        );
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/stage.rs"]
mod tests;
