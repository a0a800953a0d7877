/// Crop windows and their sources.
pub mod window;
