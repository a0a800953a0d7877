/// Bitstream geometry parsing and region decode.
pub mod codec;
/// Host and device decode stages and their composition with a crop source.
pub mod stage;
