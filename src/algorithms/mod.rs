pub mod common;
pub mod kernel;
pub mod piecewise;
pub mod tiled_join;
