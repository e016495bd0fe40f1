pub mod encoder;
pub mod format;
