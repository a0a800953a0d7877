use crate::foundation::core::{Extent, Offset};
use crate::foundation::error::{BatchAugError, BatchAugResult};

/// Full-resolution geometry of a compressed image, known after header parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ImageGeometry {
    /// Rows of the full image.
    pub height: u32,
    /// Columns of the full image.
    pub width: u32,
}

impl ImageGeometry {
    /// Spatial extent of the full image.
    pub fn extent(self) -> Extent {
        Extent::new(self.height, self.width)
    }
}

/// Rectangular region of interest inside a source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CropWindow {
    /// Top-left corner of the region.
    pub offset: Offset,
    /// Size of the region.
    pub extent: Extent,
}

impl CropWindow {
    /// Create a window at `offset` with size `extent`.
    pub const fn new(offset: Offset, extent: Extent) -> Self {
        Self { offset, extent }
    }

    /// Window covering a whole image.
    pub fn full(geometry: ImageGeometry) -> Self {
        Self::new(Offset::default(), geometry.extent())
    }

    /// Check the window is non-empty and fully inside `geometry`.
    ///
    /// Out-of-bounds windows are rejected, never clamped.
    pub fn validate_within(self, sample: usize, geometry: ImageGeometry) -> BatchAugResult<()> {
        if self.extent.is_empty() {
            return Err(BatchAugError::geometry(
                sample,
                format!("crop window {self:?} has zero area"),
            ));
        }
        if !geometry.extent().contains(self.offset, self.extent) {
            return Err(BatchAugError::geometry(
                sample,
                format!(
                    "crop window {}x{} at ({}, {}) exceeds image bounds {}x{}",
                    self.extent.height,
                    self.extent.width,
                    self.offset.y,
                    self.offset.x,
                    geometry.height,
                    geometry.width
                ),
            ));
        }
        Ok(())
    }
}

/// Source of per-sample regions of interest for a decode stage.
///
/// The decode stage calls [`CropWindowSource::crop_window`] exactly once per sample, after the
/// bitstream header has been parsed and before pixels are produced. Implementations must be
/// `Sync`: samples are prepared in parallel.
pub trait CropWindowSource: Sync {
    /// Region to decode for `sample`, or `None` to decode the whole image.
    fn crop_window(&self, sample: usize, geometry: ImageGeometry) -> Option<CropWindow>;
}

impl<F> CropWindowSource for F
where
    F: Fn(usize, ImageGeometry) -> Option<CropWindow> + Sync,
{
    fn crop_window(&self, sample: usize, geometry: ImageGeometry) -> Option<CropWindow> {
        self(sample, geometry)
    }
}

/// No cropping: every sample decodes at full size.
#[derive(Clone, Copy, Debug, Default)]
pub struct FullImage;

impl CropWindowSource for FullImage {
    fn crop_window(&self, _sample: usize, _geometry: ImageGeometry) -> Option<CropWindow> {
        None
    }
}

/// The same window for every sample.
#[derive(Clone, Copy, Debug)]
pub struct FixedWindow(pub CropWindow);

impl CropWindowSource for FixedWindow {
    fn crop_window(&self, _sample: usize, _geometry: ImageGeometry) -> Option<CropWindow> {
        Some(self.0)
    }
}

/// A centered window of fixed extent.
///
/// Images smaller than the extent produce an out-of-bounds window, which the decode stage
/// reports for that sample.
#[derive(Clone, Copy, Debug)]
pub struct CenterWindow(pub Extent);

impl CropWindowSource for CenterWindow {
    fn crop_window(&self, _sample: usize, geometry: ImageGeometry) -> Option<CropWindow> {
        let y = geometry.height.saturating_sub(self.0.height) / 2;
        let x = geometry.width.saturating_sub(self.0.width) / 2;
        Some(CropWindow::new(Offset::new(y, x), self.0))
    }
}

/// Precomputed windows, one per sample index. Missing entries decode the whole image.
#[derive(Clone, Debug, Default)]
pub struct PerSampleWindows(pub Vec<Option<CropWindow>>);

impl CropWindowSource for PerSampleWindows {
    fn crop_window(&self, sample: usize, _geometry: ImageGeometry) -> Option<CropWindow> {
        self.0.get(sample).copied().flatten()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/crop/window.rs"]
mod tests;
