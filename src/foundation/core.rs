use crate::foundation::error::{BatchAugError, BatchAugResult};

/// Two-dimensional size in pixels.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Extent {
    /// Number of rows.
    pub height: u32,
    /// Number of columns.
    pub width: u32,
}

impl Extent {
    /// Create an extent from `(height, width)`.
    pub const fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// Number of pixels covered.
    pub fn area(self) -> u64 {
        u64::from(self.height) * u64::from(self.width)
    }

    /// Return `true` when either side is zero.
    pub fn is_empty(self) -> bool {
        self.height == 0 || self.width == 0
    }

    /// Return `true` when `inner` placed at `at` stays inside `self`.
    pub fn contains(self, at: Offset, inner: Extent) -> bool {
        u64::from(at.y) + u64::from(inner.height) <= u64::from(self.height)
            && u64::from(at.x) + u64::from(inner.width) <= u64::from(self.width)
    }
}

/// Top-left position `(y, x)` in pixels.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Offset {
    /// Row.
    pub y: u32,
    /// Column.
    pub x: u32,
}

impl Offset {
    /// Create an offset from `(y, x)`.
    pub const fn new(y: u32, x: u32) -> Self {
        Self { y, x }
    }
}

/// Shape of one interleaved HWC `u8` sample.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ImageShape {
    /// Rows.
    pub height: u32,
    /// Columns.
    pub width: u32,
    /// Interleaved channels per pixel.
    pub channels: u32,
}

impl ImageShape {
    /// Create a shape from `(height, width, channels)`.
    pub const fn new(height: u32, width: u32, channels: u32) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Spatial part of the shape.
    pub fn extent(self) -> Extent {
        Extent::new(self.height, self.width)
    }

    /// Bytes in one row.
    pub fn row_bytes(self) -> usize {
        self.width as usize * self.channels as usize
    }

    /// Total byte length, failing on overflow.
    pub fn byte_len(self) -> BatchAugResult<usize> {
        (self.height as usize)
            .checked_mul(self.width as usize)
            .and_then(|v| v.checked_mul(self.channels as usize))
            .ok_or_else(|| BatchAugError::device(format!("sample size overflow for {self:?}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
