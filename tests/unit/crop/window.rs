use super::*;

const GEOM: ImageGeometry = ImageGeometry {
    height: 10,
    width: 8,
};

#[test]
fn window_inside_is_valid() {
    let w = CropWindow::new(Offset::new(2, 3), Extent::new(8, 5));
    w.validate_within(0, GEOM).unwrap();
    CropWindow::full(GEOM).validate_within(0, GEOM).unwrap();
}

#[test]
fn window_past_edge_is_geometry_error() {
    let w = CropWindow::new(Offset::new(3, 0), Extent::new(8, 8));
    let err = w.validate_within(5, GEOM).unwrap_err();
    assert_eq!(err.sample(), Some(5));
    assert!(err.to_string().contains("exceeds image bounds 10x8"));
}

#[test]
fn empty_window_is_rejected() {
    let w = CropWindow::new(Offset::new(0, 0), Extent::new(0, 4));
    assert!(w.validate_within(0, GEOM).is_err());
}

#[test]
fn stock_sources() {
    assert_eq!(FullImage.crop_window(0, GEOM), None);

    let fixed = CropWindow::new(Offset::new(1, 1), Extent::new(2, 2));
    assert_eq!(FixedWindow(fixed).crop_window(9, GEOM), Some(fixed));

    let centered = CenterWindow(Extent::new(4, 4)).crop_window(0, GEOM).unwrap();
    assert_eq!(centered.offset, Offset::new(3, 2));
    assert_eq!(centered.extent, Extent::new(4, 4));

    let per = PerSampleWindows(vec![None, Some(fixed)]);
    assert_eq!(per.crop_window(0, GEOM), None);
    assert_eq!(per.crop_window(1, GEOM), Some(fixed));
    assert_eq!(per.crop_window(2, GEOM), None);
}

#[test]
fn closures_are_sources() {
    let src = |sample: usize, g: ImageGeometry| {
        Some(CropWindow::new(
            Offset::new(0, 0),
            Extent::new(g.height / 2, (sample as u32) + 1),
        ))
    };
    let w = src.crop_window(2, GEOM).unwrap();
    assert_eq!(w.extent, Extent::new(5, 3));
}
