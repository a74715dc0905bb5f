//! egui_wgpu integration for sky rendering
//!
//! The starfield renderer lives in egui_wgpu's callback resources. `prepare`
//! records the offscreen scene and bloom passes into egui's encoder; `paint`
//! composites into egui's render pass inside the callback rectangle.

use super::StarfieldRenderer;

/// The callback that egui_wgpu will invoke
pub struct SkyCallback {
    /// Physical pixel size of the sky rectangle
    pub viewport_size: (u32, u32),
}

impl egui_wgpu::CallbackTrait for SkyCallback {
    fn prepare(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        _screen_descriptor: &egui_wgpu::ScreenDescriptor,
        egui_encoder: &mut wgpu::CommandEncoder,
        callback_resources: &mut egui_wgpu::CallbackResources,
    ) -> Vec<wgpu::CommandBuffer> {
        if let Some(renderer) = callback_resources.get_mut::<StarfieldRenderer>() {
            renderer.prepare(device, queue, egui_encoder, self.viewport_size);
        }
        Vec::new()
    }

    fn paint(
        &self,
        _info: egui::PaintCallbackInfo,
        render_pass: &mut wgpu::RenderPass<'static>,
        callback_resources: &egui_wgpu::CallbackResources,
    ) {
        if let Some(renderer) = callback_resources.get::<StarfieldRenderer>() {
            renderer.paint(render_pass);
        }
    }
}

/// Physical pixel size of a logical rectangle, rounded to whole pixels.
pub fn viewport_pixels(rect: egui::Rect, pixels_per_point: f32) -> (u32, u32) {
    let width = (rect.width() * pixels_per_point).round().max(0.0);
    let height = (rect.height() * pixels_per_point).round().max(0.0);
    (width as u32, height as u32)
}

/// Run `f` against the renderer stored in the host's callback resources.
pub fn with_renderer<R>(
    render_state: &egui_wgpu::RenderState,
    f: impl FnOnce(&mut StarfieldRenderer) -> R,
) -> Option<R> {
    let mut renderer = render_state.renderer.write();
    renderer
        .callback_resources
        .get_mut::<StarfieldRenderer>()
        .map(f)
}
