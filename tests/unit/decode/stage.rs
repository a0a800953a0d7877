use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::crop::window::{FixedWindow, PerSampleWindows};
use crate::foundation::core::{Extent, Offset};

fn png(h: u32, w: u32, seed: u8) -> Vec<u8> {
    let img = image::RgbImage::from_fn(w, h, |x, y| {
        image::Rgb([seed, y as u8, x as u8])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn spec(batch_size: usize) -> OpSpec {
    OpSpec::new("DecoderRandomCrop")
        .arg("batch_size", batch_size)
        .arg("num_threads", 2)
}

#[test]
fn opts_require_batch_size() {
    assert!(DecodeOpts::from_spec(&OpSpec::new("Decoder")).is_err());
    assert!(DecodeOpts::from_spec(&OpSpec::new("Decoder").arg("batch_size", 0)).is_err());

    let opts = DecodeOpts::from_spec(&spec(4).arg("output_type", "gray")).unwrap();
    assert_eq!(opts.batch_size, 4);
    assert_eq!(opts.output_type, OutputColor::Gray);
    assert_eq!(opts.threads, Some(2));
}

#[test]
fn prepare_uses_window_from_source() {
    let window = CropWindow::new(Offset::new(1, 2), Extent::new(3, 4));
    let stage = DecodeStage::new(&spec(1), FixedWindow(window)).unwrap();
    let bytes = png(6, 8, 0);
    let req = stage.prepare(0, &bytes).unwrap();
    assert_eq!(req.geometry, ImageGeometry { height: 6, width: 8 });
    assert_eq!(req.window, window);
}

#[test]
fn prepare_defaults_to_full_image() {
    let stage = DecodeStage::without_crop(&spec(1)).unwrap();
    let bytes = png(5, 7, 0);
    let req = stage.prepare(0, &bytes).unwrap();
    assert_eq!(req.window.extent, Extent::new(5, 7));
    assert_eq!(req.window.offset, Offset::new(0, 0));
}

#[test]
fn crop_source_is_called_once_per_sample() {
    let calls = AtomicUsize::new(0);
    let source = |_sample: usize, g: ImageGeometry| {
        calls.fetch_add(1, Ordering::SeqCst);
        Some(CropWindow::new(Offset::new(0, 0), Extent::new(g.height, 1)))
    };
    let mut stage = DecodeStage::new(&spec(3), source).unwrap();
    let imgs = [png(4, 4, 0), png(5, 3, 1), png(2, 9, 2)];
    let batch: Vec<&[u8]> = imgs.iter().map(Vec::as_slice).collect();
    let out = stage.run(&batch).unwrap();
    assert!(out.is_complete());
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let heights: Vec<u32> = out
        .samples()
        .iter()
        .map(|s| s.as_ref().unwrap().shape.height)
        .collect();
    assert_eq!(heights, vec![4, 5, 2]);
}

#[test]
fn output_extent_equals_window_extent() {
    let windows = PerSampleWindows(vec![
        Some(CropWindow::new(Offset::new(0, 0), Extent::new(1, 1))),
        Some(CropWindow::new(Offset::new(2, 1), Extent::new(3, 5))),
        None,
    ]);
    let mut stage = DecodeStage::new(&spec(3), windows).unwrap();
    let imgs = [png(4, 4, 0), png(5, 6, 1), png(3, 2, 2)];
    let batch: Vec<&[u8]> = imgs.iter().map(Vec::as_slice).collect();
    let out = stage.run(&batch).unwrap();

    let shapes: Vec<ImageShape> = out
        .samples()
        .iter()
        .map(|s| s.as_ref().unwrap().shape)
        .collect();
    assert_eq!(
        shapes,
        vec![
            ImageShape::new(1, 1, 3),
            ImageShape::new(3, 5, 3),
            ImageShape::new(3, 2, 3),
        ]
    );

    // Sample 1 pixel (0, 0) of the window is source pixel (2, 1): [seed, y, x].
    let s1 = out.get(1).unwrap().as_ref().unwrap();
    assert_eq!(&s1.data[..3], &[1, 2, 1]);
    assert_eq!(s1.sample, 1);
}

#[test]
fn failures_are_isolated_per_sample() {
    let windows = PerSampleWindows(vec![
        None,
        Some(CropWindow::new(Offset::new(3, 3), Extent::new(4, 4))),
        None,
    ]);
    let mut stage = DecodeStage::new(&spec(3), windows).unwrap();
    let good = png(4, 4, 0);
    let batch: Vec<&[u8]> = vec![good.as_slice(), good.as_slice(), &b"garbage"[..]];
    let out = stage.run(&batch).unwrap();

    assert!(!out.is_complete());
    assert!(out.get(0).unwrap().is_ok());
    assert!(matches!(
        out.get(1).unwrap(),
        Err(BatchAugError::Geometry { sample: 1, .. })
    ));
    assert!(matches!(
        out.get(2).unwrap(),
        Err(BatchAugError::Decode { sample: 2, .. })
    ));

    let failed: Vec<usize> = out.failures().map(|(i, _)| i).collect();
    assert_eq!(failed, vec![1, 2]);
    assert_eq!(
        out.stats(),
        DecodeStats {
            samples_total: 3,
            samples_decoded: 1,
            samples_failed: 2,
        }
    );

    let err = out.into_tensor_list().unwrap_err();
    assert_eq!(err.sample(), Some(1));
}

#[test]
fn batch_size_is_fixed() {
    let mut stage = DecodeStage::without_crop(&spec(2)).unwrap();
    let img = png(2, 2, 0);
    let err = stage.run(&[img.as_slice()]).unwrap_err();
    assert!(matches!(err, BatchAugError::Config(_)));
}

#[test]
fn one_launch_per_batch() {
    let mut stage = DecodeStage::without_crop(&spec(2)).unwrap();
    let img = png(2, 2, 0);
    stage.run(&[img.as_slice(), img.as_slice()]).unwrap();
    stage.run(&[img.as_slice(), img.as_slice()]).unwrap();
    assert_eq!(stage.device_stats().launches, 2);
}

#[test]
fn complete_batch_packs_into_tensor_list() {
    let mut stage = DecodeStage::without_crop(&spec(2)).unwrap();
    let a = png(2, 3, 7);
    let b = png(1, 1, 9);
    let list = stage.run(&[a.as_slice(), b.as_slice()]).unwrap().into_tensor_list().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.shape(0), Some(ImageShape::new(2, 3, 3)));
    assert_eq!(list.sample(1).unwrap(), &[9, 0, 0]);
}
