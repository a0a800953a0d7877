/// Named-argument operator spec.
pub mod spec;
