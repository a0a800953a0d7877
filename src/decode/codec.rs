use std::io::Cursor;

use anyhow::Context;

use crate::crop::window::{CropWindow, ImageGeometry};
use crate::foundation::core::ImageShape;
use crate::foundation::error::{BatchAugError, BatchAugResult};

/// Pixel format produced by the decoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputColor {
    /// 3 channels, R G B.
    #[default]
    Rgb,
    /// 3 channels, B G R.
    Bgr,
    /// 1 channel, luma.
    Gray,
    /// 4 channels, straight alpha.
    Rgba,
}

impl OutputColor {
    /// Interleaved channels per pixel.
    pub fn channels(self) -> u32 {
        match self {
            Self::Gray => 1,
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba => 4,
        }
    }
}

/// Read only the header of `bitstream` and report the full image geometry.
pub fn parse_geometry(bitstream: &[u8]) -> BatchAugResult<ImageGeometry> {
    let reader = image::ImageReader::new(Cursor::new(bitstream))
        .with_guessed_format()
        .context("sniff image format")?;
    let (width, height) = reader.into_dimensions().context("read image header")?;
    Ok(ImageGeometry { height, width })
}

/// Decode `bitstream` and return the pixels inside `region` as interleaved HWC `u8`.
pub fn decode_region(
    bitstream: &[u8],
    geometry: ImageGeometry,
    region: CropWindow,
    color: OutputColor,
) -> BatchAugResult<(ImageShape, Vec<u8>)> {
    let img = image::load_from_memory(bitstream).context("decode image from memory")?;
    if img.height() != geometry.height || img.width() != geometry.width {
        return Err(anyhow::anyhow!(
            "decoded size {}x{} disagrees with header {}x{}",
            img.height(),
            img.width(),
            geometry.height,
            geometry.width
        )
        .into());
    }

    let roi = img.crop_imm(
        region.offset.x,
        region.offset.y,
        region.extent.width,
        region.extent.height,
    );
    let data = match color {
        OutputColor::Rgb => roi.to_rgb8().into_raw(),
        OutputColor::Bgr => {
            let mut px = roi.to_rgb8().into_raw();
            for p in px.chunks_exact_mut(3) {
                p.swap(0, 2);
            }
            px
        }
        OutputColor::Gray => roi.to_luma8().into_raw(),
        OutputColor::Rgba => roi.to_rgba8().into_raw(),
    };

    let shape = ImageShape::new(region.extent.height, region.extent.width, color.channels());
    if data.len() != shape.byte_len()? {
        return Err(BatchAugError::device(format!(
            "decoder produced {} bytes for {shape:?}",
            data.len()
        )));
    }
    Ok((shape, data))
}

#[cfg(test)]
#[path = "../../tests/unit/decode/codec.rs"]
mod tests;
