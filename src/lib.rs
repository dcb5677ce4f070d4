pub mod binning;
mod processes;

pub use crate::processes::*;
