use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        BatchAugError::config("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        BatchAugError::geometry(3, "x")
            .to_string()
            .contains("geometry error (sample 3):")
    );
    assert!(
        BatchAugError::decode(1, "x")
            .to_string()
            .contains("decode error (sample 1):")
    );
    assert!(BatchAugError::device("x").to_string().contains("device error:"));
}

#[test]
fn sample_index_only_on_per_sample_errors() {
    assert_eq!(BatchAugError::geometry(4, "x").sample(), Some(4));
    assert_eq!(BatchAugError::decode(0, "x").sample(), Some(0));
    assert_eq!(BatchAugError::config("x").sample(), None);
    assert_eq!(BatchAugError::device("x").sample(), None);
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = BatchAugError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
