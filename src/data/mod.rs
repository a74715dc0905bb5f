//! Catalog data: binary formats, streaming loader, background reader and
//! offline packing

mod catalog;
mod loader;
pub mod pack;
mod worker;

pub use catalog::*;
pub use loader::*;
pub use worker::*;
