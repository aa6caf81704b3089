pub mod common;
pub mod generation;
pub mod image;

pub use common::*;
pub use generation::*;
pub use image::*;
