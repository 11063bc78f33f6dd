pub mod constants;
pub mod hash;
pub mod names;
