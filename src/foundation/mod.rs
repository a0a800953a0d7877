/// Geometry value types shared by the decode and paste stages.
pub mod core;
/// Error taxonomy.
pub mod error;
