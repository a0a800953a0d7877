/// Placement geometry and how it is chosen.
pub mod geometry;
pub(crate) mod kernel;
/// Host and device batch layouts.
pub mod layout;
/// The paste operator.
pub mod op;
