use crate::foundation::core::ImageShape;
use crate::foundation::error::{BatchAugError, BatchAugResult};

/// A batch of HWC `u8` samples stored back to back in one contiguous arena.
///
/// Samples are addressed by index. Each sample's base address is its byte offset into the
/// arena; layouts built over a list store those offsets instead of pointers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TensorList {
    shapes: Vec<ImageShape>,
    offsets: Vec<usize>,
    data: Vec<u8>,
}

impl TensorList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from owned per-sample buffers.
    ///
    /// Each buffer must be exactly `shape.byte_len()` long.
    pub fn from_samples(
        samples: impl IntoIterator<Item = (ImageShape, Vec<u8>)>,
    ) -> BatchAugResult<Self> {
        let mut out = Self::new();
        for (idx, (shape, bytes)) in samples.into_iter().enumerate() {
            let expected = shape.byte_len()?;
            if bytes.len() != expected {
                return Err(BatchAugError::geometry(
                    idx,
                    format!(
                        "sample buffer has {} bytes, shape {shape:?} needs {expected}",
                        bytes.len()
                    ),
                ));
            }
            out.offsets.push(out.data.len());
            out.shapes.push(shape);
            out.data.extend_from_slice(&bytes);
        }
        Ok(out)
    }

    /// Reshape the list to `shapes`, reusing the existing allocation when large enough.
    ///
    /// Contents after a resize are unspecified (old bytes may remain); writers must overwrite
    /// every byte they expose. An allocation failure is a [`BatchAugError::Device`] and leaves
    /// the list unchanged.
    pub fn resize(&mut self, shapes: &[ImageShape]) -> BatchAugResult<()> {
        let mut total = 0usize;
        for &shape in shapes {
            total = total
                .checked_add(shape.byte_len()?)
                .ok_or_else(|| BatchAugError::device("tensor list size overflow"))?;
        }
        self.data
            .try_reserve(total.saturating_sub(self.data.len()))
            .map_err(|e| {
                BatchAugError::device(format!("cannot allocate {total} bytes for batch: {e}"))
            })?;

        self.data.resize(total, 0);
        self.shapes.clear();
        self.shapes.extend_from_slice(shapes);
        self.offsets.clear();
        let mut at = 0usize;
        for shape in shapes {
            self.offsets.push(at);
            at += shape.byte_len()?;
        }
        Ok(())
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Return `true` when the list holds no samples.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Shape of sample `idx`.
    pub fn shape(&self, idx: usize) -> Option<ImageShape> {
        self.shapes.get(idx).copied()
    }

    /// All shapes in sample order.
    pub fn shapes(&self) -> &[ImageShape] {
        &self.shapes
    }

    /// Byte offset of sample `idx` inside [`TensorList::as_bytes`].
    pub fn offset(&self, idx: usize) -> Option<usize> {
        self.offsets.get(idx).copied()
    }

    /// Borrow the pixels of sample `idx`.
    pub fn sample(&self, idx: usize) -> Option<&[u8]> {
        let (start, len) = self.span(idx)?;
        self.data.get(start..start + len)
    }

    /// Mutably borrow the pixels of sample `idx`.
    pub fn sample_mut(&mut self, idx: usize) -> Option<&mut [u8]> {
        let (start, len) = self.span(idx)?;
        self.data.get_mut(start..start + len)
    }

    /// The whole arena.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The whole arena, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Allocated arena capacity in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.data.capacity()
    }

    /// Stable 64-bit content hash over shapes and pixels.
    pub fn fingerprint(&self) -> u64 {
        let mut h = xxhash_rust::xxh3::Xxh3::new();
        h.update(&(self.shapes.len() as u64).to_le_bytes());
        for s in &self.shapes {
            h.update(&s.height.to_le_bytes());
            h.update(&s.width.to_le_bytes());
            h.update(&s.channels.to_le_bytes());
        }
        h.update(&self.data);
        h.digest()
    }

    fn span(&self, idx: usize) -> Option<(usize, usize)> {
        let start = *self.offsets.get(idx)?;
        let len = self.shapes.get(idx)?.byte_len().ok()?;
        Some((start, len))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/tensor/list.rs"]
mod tests;
