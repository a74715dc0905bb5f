//! Sky rendering with wgpu
//!
//! Projection and shading math on the CPU side, the GPU passes, and the
//! starfield renderer that ties them to egui.

mod camera;
mod instances;
mod pipeline;
mod projection;
mod quality;
mod shaders;
mod shading;
mod starfield;
mod textures;
mod uniforms;
mod wgpu_callback;

pub use camera::*;
pub use projection::*;
pub use quality::*;
pub use starfield::*;
pub use wgpu_callback::*;
