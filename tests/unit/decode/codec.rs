use std::io::Cursor;

use super::*;
use crate::foundation::core::{Extent, Offset};

/// 4x3 RGB image where pixel (y, x) = [y, x, 100].
fn png_4x3() -> Vec<u8> {
    let img = image::RgbImage::from_fn(3, 4, |x, y| image::Rgb([y as u8, x as u8, 100]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn parse_geometry_reads_header() {
    let g = parse_geometry(&png_4x3()).unwrap();
    assert_eq!(g, ImageGeometry { height: 4, width: 3 });
}

#[test]
fn parse_geometry_rejects_garbage() {
    assert!(parse_geometry(b"definitely not an image").is_err());
    assert!(parse_geometry(&[]).is_err());
}

#[test]
fn decode_region_returns_exact_window() {
    let bytes = png_4x3();
    let g = parse_geometry(&bytes).unwrap();
    let w = CropWindow::new(Offset::new(1, 1), Extent::new(2, 2));
    let (shape, px) = decode_region(&bytes, g, w, OutputColor::Rgb).unwrap();
    assert_eq!(shape, ImageShape::new(2, 2, 3));
    assert_eq!(
        px,
        vec![1, 1, 100, 1, 2, 100, 2, 1, 100, 2, 2, 100]
    );
}

#[test]
fn decode_region_output_colors() {
    let bytes = png_4x3();
    let g = parse_geometry(&bytes).unwrap();
    let w = CropWindow::new(Offset::new(3, 2), Extent::new(1, 1));

    let (_, bgr) = decode_region(&bytes, g, w, OutputColor::Bgr).unwrap();
    assert_eq!(bgr, vec![100, 2, 3]);

    let (shape, rgba) = decode_region(&bytes, g, w, OutputColor::Rgba).unwrap();
    assert_eq!(shape.channels, 4);
    assert_eq!(rgba, vec![3, 2, 100, 255]);

    let (shape, gray) = decode_region(&bytes, g, w, OutputColor::Gray).unwrap();
    assert_eq!(shape.channels, 1);
    assert_eq!(gray.len(), 1);
}

#[test]
fn output_color_parses_lowercase() {
    let c: OutputColor = serde_json::from_str("\"gray\"").unwrap();
    assert_eq!(c, OutputColor::Gray);
    assert_eq!(OutputColor::default(), OutputColor::Rgb);
}
