//! On-screen overlay

mod overlay;

pub use overlay::*;
