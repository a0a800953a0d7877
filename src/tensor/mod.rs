/// Contiguous per-batch sample storage.
pub mod list;
