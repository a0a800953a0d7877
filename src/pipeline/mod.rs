/// Operator contract and batch driver.
pub mod operator;
/// Batch inputs, outputs and sample metadata.
pub mod workspace;
