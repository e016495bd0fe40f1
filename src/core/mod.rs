pub mod config;
pub mod exclusion;
pub mod matrix_profile;
pub mod neighbors;
pub mod packed_entry;
