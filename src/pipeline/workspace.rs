use crate::paste::geometry::Placement;
use crate::tensor::list::TensorList;

/// Per-batch inputs, outputs and sample metadata handed to an operator.
///
/// The output list is owned by the workspace and kept across batches so operators can reuse
/// its allocation.
#[derive(Clone, Debug, Default)]
pub struct Workspace {
    input: TensorList,
    output: TensorList,
    placements: Vec<Option<Placement>>,
}

impl Workspace {
    /// Workspace over one input batch.
    pub fn new(input: TensorList) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    /// Attach per-sample placements. `None` entries fall back to the operator's default.
    pub fn with_placements(mut self, placements: Vec<Option<Placement>>) -> Self {
        self.placements = placements;
        self
    }

    /// Replace the input for the next batch; the output allocation is kept.
    pub fn set_input(&mut self, input: TensorList) {
        self.input = input;
    }

    /// Replace the per-sample placements for the next batch.
    pub fn set_placements(&mut self, placements: Vec<Option<Placement>>) {
        self.placements = placements;
    }

    /// Samples in the current batch.
    pub fn batch_len(&self) -> usize {
        self.input.len()
    }

    /// Input batch.
    pub fn input(&self) -> &TensorList {
        &self.input
    }

    /// Output batch.
    pub fn output(&self) -> &TensorList {
        &self.output
    }

    /// Per-sample placements as supplied (may be empty).
    pub fn placements(&self) -> &[Option<Placement>] {
        &self.placements
    }

    /// Placement metadata for sample `idx`, if any was supplied.
    pub fn placement(&self, idx: usize) -> Option<Placement> {
        self.placements.get(idx).copied().flatten()
    }

    /// Take the output, leaving an empty list behind.
    pub fn take_output(&mut self) -> TensorList {
        std::mem::take(&mut self.output)
    }

    pub(crate) fn output_mut(&mut self) -> &mut TensorList {
        &mut self.output
    }

    pub(crate) fn io_mut(&mut self) -> (&TensorList, &mut TensorList) {
        (&self.input, &mut self.output)
    }
}
