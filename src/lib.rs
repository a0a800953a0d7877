//! batchaug is a batched image preprocessing engine for training pipelines.
//!
//! Two stages are provided, each working on a whole batch at a time:
//!
//! - [`DecodeStage`]: parse every bitstream on the host, ask a [`CropWindowSource`] for a region
//!   of interest, then decode only that region on the device
//! - [`Paste`]: place every image on its own larger canvas filled with a constant, in a single
//!   device launch per batch
//!
//! Both are configured from an [`OpSpec`] and run on a [`CpuDevice`] worker pool.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Operator construction arguments.
pub mod config;
/// Crop windows consulted by the decode stage.
pub mod crop;
/// Batched decode with an optional crop window per sample.
pub mod decode;
/// Execution device, its buffers and counters.
pub mod device;
/// Batched paste operator.
pub mod paste;
/// Operator lifecycle and per-batch workspace.
pub mod pipeline;
/// Contiguous batch storage.
pub mod tensor;

pub use crate::foundation::core::{Extent, ImageShape, Offset};
pub use crate::foundation::error::{BatchAugError, BatchAugResult};

pub use crate::config::spec::OpSpec;
pub use crate::crop::window::{
    CenterWindow, CropWindow, CropWindowSource, FixedWindow, FullImage, ImageGeometry,
    PerSampleWindows,
};
pub use crate::decode::codec::OutputColor;
pub use crate::decode::stage::{
    DecodeOpts, DecodeRequest, DecodeStage, DecodeStats, DecodedBatch, DecodedImage,
    DeviceDecodeStage,
};
pub use crate::device::cpu::{CpuDevice, DeviceBuffer, DeviceOpts, DeviceStats};
pub use crate::paste::geometry::{PasteGeometry, Placement};
pub use crate::paste::layout::{BatchLayout, DeviceBatchLayout};
pub use crate::paste::op::{MAX_CHANNELS, Paste, PasteSample};
pub use crate::pipeline::operator::{Operator, run_operator};
pub use crate::pipeline::workspace::Workspace;
pub use crate::tensor::list::TensorList;
