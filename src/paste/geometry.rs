use crate::foundation::core::{Extent, Offset};
use crate::foundation::error::{BatchAugError, BatchAugResult};

/// Integers stored per sample in the geometry buffer:
/// `in_h, in_w, out_h, out_w, paste_y, paste_x`.
pub const NUM_INDICES: usize = 6;

/// Placement of one source image on its canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PasteGeometry {
    /// Source extent `(H_in, W_in)`.
    pub input: Extent,
    /// Canvas extent `(H_out, W_out)`.
    pub output: Extent,
    /// Top-left of the source on the canvas.
    pub paste: Offset,
}

impl PasteGeometry {
    /// Check the canvas covers the source and the source stays inside the canvas.
    pub fn validate(self, sample: usize) -> BatchAugResult<()> {
        if self.output.height < self.input.height || self.output.width < self.input.width {
            return Err(BatchAugError::geometry(
                sample,
                format!(
                    "canvas {}x{} is smaller than input {}x{}",
                    self.output.height, self.output.width, self.input.height, self.input.width
                ),
            ));
        }
        if !self.output.contains(self.paste, self.input) {
            return Err(BatchAugError::geometry(
                sample,
                format!(
                    "input {}x{} pasted at ({}, {}) overflows canvas {}x{}",
                    self.input.height,
                    self.input.width,
                    self.paste.y,
                    self.paste.x,
                    self.output.height,
                    self.output.width
                ),
            ));
        }
        Ok(())
    }

    /// Encode in geometry-buffer order.
    pub fn to_indices(self) -> [u32; NUM_INDICES] {
        [
            self.input.height,
            self.input.width,
            self.output.height,
            self.output.width,
            self.paste.y,
            self.paste.x,
        ]
    }

    /// Decode one geometry-buffer slot.
    pub fn from_indices(slot: &[u32; NUM_INDICES]) -> Self {
        let [in_h, in_w, out_h, out_w, y, x] = *slot;
        Self {
            input: Extent::new(in_h, in_w),
            output: Extent::new(out_h, out_w),
            paste: Offset::new(y, x),
        }
    }
}

/// How a sample's canvas and paste offset are chosen.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Placement {
    /// Explicit canvas size and offset in pixels.
    Absolute {
        /// Canvas extent.
        canvas: Extent,
        /// Top-left of the source on the canvas.
        offset: Offset,
    },
    /// Canvas scaled from the input; offset as a fraction of the free space.
    ///
    /// `H_out = max(floor(ratio * H_in), min_canvas_size)`, `Y = floor(paste_y * (H_out - H_in))`,
    /// and the same along the width.
    Relative {
        /// Canvas-to-input size ratio, `>= 1`.
        ratio: f32,
        /// Horizontal position in `[0, 1]`; 0 is flush left.
        paste_x: f32,
        /// Vertical position in `[0, 1]`; 0 is flush top.
        paste_y: f32,
        /// Lower bound for both canvas sides.
        min_canvas_size: u32,
    },
}

impl Default for Placement {
    fn default() -> Self {
        Self::Relative {
            ratio: 1.0,
            paste_x: 0.5,
            paste_y: 0.5,
            min_canvas_size: 0,
        }
    }
}

impl Placement {
    /// Compute and validate the geometry for a source of extent `input`.
    pub fn resolve(self, sample: usize, input: Extent) -> BatchAugResult<PasteGeometry> {
        let geometry = match self {
            Self::Absolute { canvas, offset } => PasteGeometry {
                input,
                output: canvas,
                paste: offset,
            },
            Self::Relative {
                ratio,
                paste_x,
                paste_y,
                min_canvas_size,
            } => {
                if !ratio.is_finite() || ratio < 1.0 {
                    return Err(BatchAugError::geometry(
                        sample,
                        format!("paste ratio must be finite and >= 1, got {ratio}"),
                    ));
                }
                for (name, v) in [("paste_x", paste_x), ("paste_y", paste_y)] {
                    if !(0.0..=1.0).contains(&v) {
                        return Err(BatchAugError::geometry(
                            sample,
                            format!("{name} must be in [0, 1], got {v}"),
                        ));
                    }
                }

                let out_h = scaled_side(sample, input.height, ratio)?.max(min_canvas_size);
                let out_w = scaled_side(sample, input.width, ratio)?.max(min_canvas_size);
                let y = (f64::from(paste_y) * f64::from(out_h - input.height)).floor() as u32;
                let x = (f64::from(paste_x) * f64::from(out_w - input.width)).floor() as u32;
                PasteGeometry {
                    input,
                    output: Extent::new(out_h, out_w),
                    paste: Offset::new(y, x),
                }
            }
        };
        geometry.validate(sample)?;
        Ok(geometry)
    }
}

fn scaled_side(sample: usize, side: u32, ratio: f32) -> BatchAugResult<u32> {
    let v = (f64::from(ratio) * f64::from(side)).floor();
    if v > f64::from(u32::MAX) {
        return Err(BatchAugError::geometry(
            sample,
            format!("canvas side {v} overflows u32"),
        ));
    }
    Ok(v as u32)
}

#[cfg(test)]
#[path = "../../tests/unit/paste/geometry.rs"]
mod tests;
