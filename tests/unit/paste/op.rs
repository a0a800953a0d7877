use serde_json::json;

use super::*;
use crate::foundation::core::{Extent, ImageShape, Offset};
use crate::tensor::list::TensorList;

fn spec(batch_size: usize) -> OpSpec {
    OpSpec::new("Paste")
        .arg("batch_size", batch_size)
        .arg("num_threads", 2)
}

fn gradient(h: u32, w: u32, c: u32) -> (ImageShape, Vec<u8>) {
    let shape = ImageShape::new(h, w, c);
    let data = (0..shape.byte_len().unwrap())
        .map(|i| (i % 251) as u8 + 1)
        .collect();
    (shape, data)
}

fn at(canvas: (u32, u32), offset: (u32, u32)) -> Option<Placement> {
    Some(Placement::Absolute {
        canvas: Extent::new(canvas.0, canvas.1),
        offset: Offset::new(offset.0, offset.1),
    })
}

#[test]
fn channel_bound_is_inclusive_1024() {
    let ok = Paste::new(&spec(1).arg("n_channels", 1024)).unwrap();
    assert_eq!(ok.channels(), 1024);
    assert_eq!(ok.fill_value().len(), 1024);

    let err = Paste::new(&spec(1).arg("n_channels", 1025)).unwrap_err();
    assert!(matches!(err, BatchAugError::Config(_)));
    assert!(err.to_string().contains("1024"));

    assert!(Paste::new(&spec(1).arg("n_channels", 0)).is_err());
}

#[test]
fn construction_requires_batch_size() {
    assert!(Paste::new(&OpSpec::new("Paste")).is_err());
    assert!(Paste::new(&spec(0)).is_err());
}

#[test]
fn fill_value_broadcast_and_repeat() {
    let single = Paste::new(&spec(1).arg("fill_value", 7)).unwrap();
    assert_eq!(single.fill_value(), &[7, 7, 7]);

    let repeated = Paste::new(&spec(1).arg("fill_value", json!([1, 2, 3]))).unwrap();
    assert_eq!(repeated.fill_value(), &[1, 2, 3]);

    assert!(Paste::new(&spec(1).arg("fill_value", json!([1, 2]))).is_err());
}

#[test]
fn default_placement_comes_from_spec() {
    let op = Paste::new(
        &spec(1)
            .arg("ratio", 2.0)
            .arg("paste_x", 0.0)
            .arg("min_canvas_size", 5),
    )
    .unwrap();
    assert_eq!(
        op.default_placement(),
        Placement::Relative {
            ratio: 2.0,
            paste_x: 0.0,
            paste_y: 0.5,
            min_canvas_size: 5,
        }
    );
}

#[test]
fn setup_sample_reads_input_shape_and_offset() {
    let op = Paste::new(&spec(2)).unwrap();
    let input = TensorList::from_samples([gradient(2, 2, 3), gradient(1, 3, 3)]).unwrap();
    let ws = Workspace::new(input).with_placements(vec![None, at((3, 4), (2, 1))]);

    let s1 = op.setup_sample(&ws, 1).unwrap();
    assert_eq!(s1.source_offset, 12);
    assert_eq!(s1.geometry.output, Extent::new(3, 4));
    assert_eq!(s1.geometry.paste, Offset::new(2, 1));

    // ratio 1 by default: canvas equals input.
    let s0 = op.setup_sample(&ws, 0).unwrap();
    assert_eq!(s0.geometry.output, Extent::new(2, 2));
}

#[test]
fn channel_mismatch_is_sample_error() {
    let op = Paste::new(&spec(1)).unwrap();
    let ws = Workspace::new(TensorList::from_samples([gradient(2, 2, 1)]).unwrap());
    let err = op.setup_sample(&ws, 0).unwrap_err();
    assert_eq!(err.sample(), Some(0));
}

#[test]
fn geometry_slots_follow_sample_order() {
    let mut op = Paste::new(&spec(3)).unwrap();
    let input =
        TensorList::from_samples([gradient(1, 1, 3), gradient(2, 2, 3), gradient(3, 1, 3)])
            .unwrap();
    let mut ws = Workspace::new(input).with_placements(vec![
        at((2, 2), (1, 1)),
        at((4, 5), (0, 3)),
        at((3, 1), (0, 0)),
    ]);
    op.run_batch(&mut ws).unwrap();

    assert_eq!(
        op.layout().geometry_buffer(),
        &[1, 1, 2, 2, 1, 1, 2, 2, 4, 5, 0, 3, 3, 1, 3, 1, 0, 0]
    );
    assert_eq!(op.layout().source_offsets(), &[0, 3, 15]);
    assert_eq!(op.layout().destination_offsets(), &[0, 12, 72]);
}

#[test]
fn invalid_sample_rejects_whole_batch() {
    let mut op = Paste::new(&spec(2)).unwrap();
    let input = TensorList::from_samples([gradient(2, 2, 3), gradient(2, 2, 3)]).unwrap();
    let mut ws = Workspace::new(input).with_placements(vec![at((2, 2), (0, 0)), at((3, 3), (2, 0))]);
    let launches_before = op.device_stats().launches;

    let err = op.run_batch(&mut ws).unwrap_err();
    assert!(matches!(err, BatchAugError::Geometry { sample: 1, .. }));
    assert_eq!(op.device_stats().launches, launches_before);
    assert!(ws.output().is_empty());
}

#[test]
fn batch_size_and_placement_count_are_checked() {
    let mut op = Paste::new(&spec(2)).unwrap();
    let mut ws = Workspace::new(TensorList::from_samples([gradient(1, 1, 3)]).unwrap());
    assert!(matches!(
        op.run_batch(&mut ws).unwrap_err(),
        BatchAugError::Config(_)
    ));

    let input = TensorList::from_samples([gradient(1, 1, 3), gradient(1, 1, 3)]).unwrap();
    let mut ws = Workspace::new(input).with_placements(vec![None]);
    assert!(matches!(
        op.run_batch(&mut ws).unwrap_err(),
        BatchAugError::Config(_)
    ));
}

#[test]
fn one_transfer_and_one_launch_per_batch() {
    let mut op = Paste::new(&spec(2)).unwrap();
    // The fill value upload at construction counts as the first transfer.
    assert_eq!(op.device_stats().transfers, 1);

    let input = TensorList::from_samples([gradient(2, 2, 3), gradient(1, 1, 3)]).unwrap();
    let mut ws = Workspace::new(input);
    op.run_batch(&mut ws).unwrap();
    let cap = op.device_layout.geometry.capacity();
    assert!(cap >= 2 * crate::paste::geometry::NUM_INDICES);
    op.run_batch(&mut ws).unwrap();
    assert_eq!(op.device_layout.geometry.capacity(), cap);

    let st = op.synchronize();
    assert_eq!(st.transfers, 3);
    assert_eq!(st.launches, 2);
    assert_eq!(st.syncs, 1);
}

#[test]
fn broadcast_and_repeated_fill_produce_identical_output() {
    let input = TensorList::from_samples([gradient(2, 3, 3), gradient(1, 1, 3)]).unwrap();
    let placements = vec![at((4, 5), (1, 1)), at((3, 3), (2, 0))];

    let mut outputs = Vec::new();
    for fill in [json!(5), json!([5, 5, 5])] {
        let mut op = Paste::new(&spec(2).arg("fill_value", fill)).unwrap();
        let mut ws = Workspace::new(input.clone()).with_placements(placements.clone());
        op.run_batch(&mut ws).unwrap();
        outputs.push(ws.output().fingerprint());
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn oversized_canvas_is_device_error() {
    let mut op = Paste::new(&spec(1).arg("ratio", 2.0e9)).unwrap();
    let mut ws = Workspace::new(TensorList::from_samples([gradient(1, 1, 3)]).unwrap());

    let err = op.run_batch(&mut ws).unwrap_err();
    assert!(matches!(err, BatchAugError::Device(_)));
    assert_eq!(op.device_stats().launches, 0);
    assert!(ws.output().is_empty());
}
