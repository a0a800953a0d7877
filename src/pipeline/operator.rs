use std::sync::Arc;

use rayon::prelude::*;

use crate::foundation::error::BatchAugResult;
use crate::pipeline::workspace::Workspace;

/// Lifecycle contract of a batch operator.
///
/// The driver ([`run_operator`]) calls the hooks in a fixed order every batch:
///
/// 1. [`Operator::setup_shared`] once
/// 2. [`Operator::setup_sample`] once per sample index, in parallel and in no particular order
/// 3. [`Operator::commit_sample`] once per sample index, in index order
/// 4. [`Operator::run`] once
///
/// `setup_sample` is pure host work: it must not touch the device or block on it.
pub trait Operator: Sync {
    /// Host-side parameters computed for one sample.
    type SampleParams: Send;

    /// Operator name, for diagnostics.
    fn name(&self) -> &str;

    /// Pool used for per-sample setup.
    fn worker_pool(&self) -> Arc<rayon::ThreadPool>;

    /// Batch-wide preparation.
    fn setup_shared(&mut self, ws: &Workspace) -> BatchAugResult<()>;

    /// Compute the parameters of sample `idx`.
    fn setup_sample(&self, ws: &Workspace, idx: usize) -> BatchAugResult<Self::SampleParams>;

    /// Store the parameters of sample `idx` in the operator's batch state.
    fn commit_sample(&mut self, idx: usize, params: Self::SampleParams) -> BatchAugResult<()>;

    /// Produce the batch output.
    fn run(&mut self, ws: &mut Workspace) -> BatchAugResult<()>;
}

/// Drive one batch through `op`.
///
/// If any sample's setup fails the batch is rejected with the lowest-index error and
/// [`Operator::run`] is not called.
#[tracing::instrument(skip_all, fields(op = op.name(), batch = ws.batch_len()))]
pub fn run_operator<O: Operator>(op: &mut O, ws: &mut Workspace) -> BatchAugResult<()> {
    op.setup_shared(ws)?;

    let params = {
        let (op, ws) = (&*op, &*ws);
        op.worker_pool().install(|| {
            (0..ws.batch_len())
                .into_par_iter()
                .map(|idx| op.setup_sample(ws, idx))
                .collect::<Vec<_>>()
        })
    };

    for (idx, p) in params.into_iter().enumerate() {
        let p = p.inspect_err(|e| {
            tracing::warn!(sample = idx, error = %e, "sample setup failed; rejecting batch");
        })?;
        op.commit_sample(idx, p)?;
    }

    op.run(ws)
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/operator.rs"]
mod tests;
