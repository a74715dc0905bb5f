//! Starfield renderer
//!
//! Owns every GPU resource of the sky and records the frame:
//!
//! 1. background, constellation lines and stars into the scene target
//! 2. bright pass into `bloom[0]`
//! 3. `bloom_iterations` rounds of horizontal then vertical blur, ending in
//!    `bloom[0]`
//! 4. composite with tone mapping, then the skyline silhouette, drawn into
//!    the host's render pass
//!
//! The renderer moves from uninitialized to ready to disposed. Disposal is
//! idempotent and also runs on drop.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use wgpu::util::DeviceExt;

use crate::astronomy::{local_sidereal_time, OBSERVER};
use crate::data::{ConstellationSegment, LoadProgress, StreamingLoader};
use crate::error::{RenderError, RenderResult};
use crate::skyline::{layers_for_count, SkylineProfile};

use super::instances::{buffer_size, GpuRecordSink, QUAD_VERTICES};
use super::pipeline::{supports_offscreen, supports_target, BindGroupLayouts, Pipelines};
use super::quality::{needs_manual_srgb, QualityProfile, ToneMapping};
use super::textures::{
    create_linear_sampler, create_skyline_texture, needs_rebuild, RenderTexture, RenderTextures,
};
use super::uniforms::{BlurUniform, PostUniform, SkyUniform, SkylineUniform};
use super::Camera;

/// Scene format used when the quality tier's own format is unavailable
const FALLBACK_SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Per-frame inputs, written by the UI thread
#[derive(Debug, Clone)]
pub struct SkyRenderData {
    pub camera: Camera,
    pub time: DateTime<Utc>,
    pub show_constellations: bool,
}

impl Default for SkyRenderData {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            time: Utc::now(),
            show_constellations: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RendererOptions {
    pub quality: QualityProfile,
    /// `None` picks from the target format
    pub tone_mapping: Option<ToneMapping>,
    /// Star instance slots to allocate
    pub star_capacity: u32,
}

impl RendererOptions {
    /// Options for a catalog of `star_count` stars, capped by the tier.
    pub fn new(quality: QualityProfile, tone_mapping: Option<ToneMapping>, star_count: u32) -> Self {
        Self {
            quality,
            tone_mapping,
            star_capacity: star_count.min(quality.max_stars),
        }
    }
}

/// Scene, bloom and composite bind groups tied to one set of render targets
struct FrameTargets {
    textures: RenderTextures,
    bright: wgpu::BindGroup,
    /// [horizontal: bloom[0] → bloom[1], vertical: bloom[1] → bloom[0]]
    blur: [wgpu::BindGroup; 2],
    composite: wgpu::BindGroup,
}

pub struct GpuResources {
    layouts: BindGroupLayouts,
    pipelines: Pipelines,
    sampler: wgpu::Sampler,
    target_format: wgpu::TextureFormat,
    quality: QualityProfile,
    /// The adapter cannot use tier scene formats; always render to the fallback
    scene_fallback: bool,
    tone_mapping: ToneMapping,

    sky_buffer: wgpu::Buffer,
    sky_bind_group: wgpu::BindGroup,
    post_buffer: wgpu::Buffer,
    blur_buffers: [wgpu::Buffer; 2],

    skyline: RenderTexture,
    skyline_buffer: wgpu::Buffer,
    skyline_bind_group: wgpu::BindGroup,

    star_buffer: wgpu::Buffer,
    star_capacity: u32,
    loaded_stars: u32,

    segment_buffer: wgpu::Buffer,
    segment_count: u32,

    targets: Option<FrameTargets>,
    frame_ready: bool,
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: size as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn instance_buffer(device: &wgpu::Device, label: &str, records: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: buffer_size(records),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        ..Default::default()
    })
}

impl GpuResources {
    fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target_format: wgpu::TextureFormat,
        quality: QualityProfile,
        tone_mapping: ToneMapping,
        star_capacity: u32,
    ) -> Self {
        let layouts = BindGroupLayouts::new(device);
        let pipelines = Pipelines::new(device, &layouts, quality.scene_format, target_format);
        let sampler = create_linear_sampler(device);

        let sky_buffer = uniform_buffer(device, "Sky Uniform Buffer", std::mem::size_of::<SkyUniform>());
        let sky_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Bind Group"),
            layout: &layouts.sky,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: sky_buffer.as_entire_binding(),
            }],
        });

        let post_buffer = uniform_buffer(device, "Post Uniform Buffer", std::mem::size_of::<PostUniform>());
        let post = PostUniform::new(tone_mapping, needs_manual_srgb(target_format));
        queue.write_buffer(&post_buffer, 0, bytemuck::bytes_of(&post));

        let blur_size = std::mem::size_of::<BlurUniform>();
        let blur_buffers = [
            uniform_buffer(device, "Horizontal Blur Buffer", blur_size),
            uniform_buffer(device, "Vertical Blur Buffer", blur_size),
        ];

        let skyline_buffer = uniform_buffer(
            device,
            "Skyline Uniform Buffer",
            std::mem::size_of::<SkylineUniform>(),
        );
        let (skyline, skyline_bind_group) =
            Self::build_skyline(device, queue, &layouts, &skyline_buffer, &quality, target_format);

        let star_buffer = instance_buffer(device, "Star Instance Buffer", star_capacity);
        let segment_buffer = instance_buffer(device, "Constellation Instance Buffer", 0);

        Self {
            layouts,
            pipelines,
            sampler,
            target_format,
            quality,
            scene_fallback: false,
            tone_mapping,
            sky_buffer,
            sky_bind_group,
            post_buffer,
            blur_buffers,
            skyline,
            skyline_buffer,
            skyline_bind_group,
            star_buffer,
            star_capacity,
            loaded_stars: 0,
            segment_buffer,
            segment_count: 0,
            targets: None,
            frame_ready: false,
        }
    }

    fn build_skyline(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &BindGroupLayouts,
        uniform: &wgpu::Buffer,
        quality: &QualityProfile,
        target_format: wgpu::TextureFormat,
    ) -> (RenderTexture, wgpu::BindGroup) {
        let profile = SkylineProfile::generate(
            quality.skyline_width,
            layers_for_count(quality.skyline_layers),
        );
        let texture = create_skyline_texture(device, queue, &profile);
        let data = SkylineUniform::new(&profile, needs_manual_srgb(target_format));
        queue.write_buffer(uniform, 0, bytemuck::bytes_of(&data));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skyline Bind Group"),
            layout: &layouts.skyline,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });
        (texture, bind_group)
    }

    fn filter_bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        source: &wgpu::TextureView,
        uniform: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.layouts.filter,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        })
    }

    fn create_targets(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: (u32, u32),
    ) -> Option<FrameTargets> {
        let textures = RenderTextures::new(device, size, &self.quality)?;

        let horizontal = BlurUniform::new(true, textures.bloom_size, self.quality.blur_taps);
        let vertical = BlurUniform::new(false, textures.bloom_size, self.quality.blur_taps);
        queue.write_buffer(&self.blur_buffers[0], 0, bytemuck::bytes_of(&horizontal));
        queue.write_buffer(&self.blur_buffers[1], 0, bytemuck::bytes_of(&vertical));

        let bright = self.filter_bind_group(
            device,
            "Bright Pass Bind Group",
            &textures.scene.view,
            &self.post_buffer,
        );
        let blur = [
            self.filter_bind_group(
                device,
                "Horizontal Blur Bind Group",
                &textures.bloom[0].view,
                &self.blur_buffers[0],
            ),
            self.filter_bind_group(
                device,
                "Vertical Blur Bind Group",
                &textures.bloom[1].view,
                &self.blur_buffers[1],
            ),
        ];
        let composite = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout: &self.layouts.composite,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&textures.scene.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.post_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&textures.bloom[0].view),
                },
            ],
        });

        Some(FrameTargets {
            textures,
            bright,
            blur,
            composite,
        })
    }

    fn release_targets(&mut self) {
        if let Some(old) = self.targets.take() {
            old.textures.destroy();
        }
    }

    fn set_constellations(
        &mut self,
        device: &wgpu::Device,
        segments: &[ConstellationSegment],
    ) {
        let buffer = if segments.is_empty() {
            instance_buffer(device, "Constellation Instance Buffer", 0)
        } else {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Constellation Instance Buffer"),
                contents: bytemuck::cast_slice(segments),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
        };
        let old = std::mem::replace(&mut self.segment_buffer, buffer);
        old.destroy();
        self.segment_count = segments.len() as u32;
    }

    fn set_quality(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, quality: QualityProfile) {
        let previous = self.quality;
        self.quality = quality;

        if previous.scene_format != quality.scene_format {
            self.pipelines = Pipelines::new(device, &self.layouts, quality.scene_format, self.target_format);
        }
        if (previous.skyline_layers, previous.skyline_width)
            != (quality.skyline_layers, quality.skyline_width)
        {
            let (skyline, bind_group) = Self::build_skyline(
                device,
                queue,
                &self.layouts,
                &self.skyline_buffer,
                &quality,
                self.target_format,
            );
            std::mem::replace(&mut self.skyline, skyline).texture.destroy();
            self.skyline_bind_group = bind_group;
        }
        // Bloom size, format and blur kernel all follow the tier
        self.release_targets();
        self.frame_ready = false;
    }

    fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        size: (u32, u32),
        data: &SkyRenderData,
    ) -> bool {
        self.frame_ready = false;
        if size.0 == 0 || size.1 == 0 {
            return false;
        }

        if needs_rebuild(self.targets.as_ref().map(|t| &t.textures), size, &self.quality) {
            self.release_targets();
            self.targets = self.create_targets(device, queue, size);
        }
        let Some(targets) = &self.targets else {
            return false;
        };

        let lst = local_sidereal_time(data.time, OBSERVER.longitude_deg);
        let sky = SkyUniform::new(
            &data.camera,
            size,
            lst,
            OBSERVER.latitude_rad(),
            self.quality.max_magnitude,
        );
        queue.write_buffer(&self.sky_buffer, 0, bytemuck::bytes_of(&sky));

        self.record_scene(encoder, targets, data.show_constellations);
        self.record_bloom(encoder, targets);

        self.frame_ready = true;
        true
    }

    fn record_scene(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &FrameTargets,
        show_constellations: bool,
    ) {
        let scene = &targets.textures.scene.view;
        {
            let mut pass = begin_pass(
                encoder,
                "Background Pass",
                scene,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            );
            pass.set_pipeline(&self.pipelines.background);
            pass.set_bind_group(0, &self.sky_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        if show_constellations && self.segment_count > 0 {
            let mut pass = begin_pass(encoder, "Constellation Pass", scene, wgpu::LoadOp::Load);
            pass.set_pipeline(&self.pipelines.constellations);
            pass.set_bind_group(0, &self.sky_bind_group, &[]);
            pass.set_vertex_buffer(0, self.segment_buffer.slice(..));
            pass.draw(0..QUAD_VERTICES, 0..self.segment_count);
        }

        if self.loaded_stars > 0 {
            let mut pass = begin_pass(encoder, "Star Pass", scene, wgpu::LoadOp::Load);
            pass.set_pipeline(&self.pipelines.stars);
            pass.set_bind_group(0, &self.sky_bind_group, &[]);
            pass.set_vertex_buffer(0, self.star_buffer.slice(..));
            pass.draw(0..QUAD_VERTICES, 0..self.loaded_stars);
        }
    }

    fn record_bloom(&self, encoder: &mut wgpu::CommandEncoder, targets: &FrameTargets) {
        let [bloom_a, bloom_b] = &targets.textures.bloom;
        let clear = wgpu::LoadOp::Clear(wgpu::Color::BLACK);
        {
            let mut pass = begin_pass(encoder, "Bright Pass", &bloom_a.view, clear);
            pass.set_pipeline(&self.pipelines.bright);
            pass.set_bind_group(0, &targets.bright, &[]);
            pass.draw(0..3, 0..1);
        }

        for _ in 0..self.quality.bloom_iterations {
            {
                let mut pass = begin_pass(encoder, "Horizontal Blur Pass", &bloom_b.view, clear);
                pass.set_pipeline(&self.pipelines.blur);
                pass.set_bind_group(0, &targets.blur[0], &[]);
                pass.draw(0..3, 0..1);
            }
            {
                let mut pass = begin_pass(encoder, "Vertical Blur Pass", &bloom_a.view, clear);
                pass.set_pipeline(&self.pipelines.blur);
                pass.set_bind_group(0, &targets.blur[1], &[]);
                pass.draw(0..3, 0..1);
            }
        }
    }

    fn paint(&self, render_pass: &mut wgpu::RenderPass<'static>) {
        if !self.frame_ready {
            return;
        }
        let Some(targets) = &self.targets else {
            return;
        };

        render_pass.set_pipeline(&self.pipelines.composite);
        render_pass.set_bind_group(0, &targets.composite, &[]);
        render_pass.draw(0..3, 0..1);

        render_pass.set_pipeline(&self.pipelines.silhouette);
        render_pass.set_bind_group(0, &self.sky_bind_group, &[]);
        render_pass.set_bind_group(1, &self.skyline_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }

    fn destroy(&mut self) {
        self.release_targets();
        self.sky_buffer.destroy();
        self.post_buffer.destroy();
        for buffer in &self.blur_buffers {
            buffer.destroy();
        }
        self.skyline.texture.destroy();
        self.skyline_buffer.destroy();
        self.star_buffer.destroy();
        self.segment_buffer.destroy();
        self.loaded_stars = 0;
        self.segment_count = 0;
        self.frame_ready = false;
    }
}

pub enum RendererState {
    Uninitialized,
    Ready(Box<GpuResources>),
    Disposed,
}

/// The sky renderer, stored in egui_wgpu's callback resources
pub struct StarfieldRenderer {
    state: RendererState,
    render_data: RwLock<SkyRenderData>,
}

impl Default for StarfieldRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StarfieldRenderer {
    pub fn new() -> Self {
        Self {
            state: RendererState::Uninitialized,
            render_data: RwLock::new(SkyRenderData::default()),
        }
    }

    /// Create every GPU resource for rendering into `target_format`.
    ///
    /// Fails with `ContextUnavailable` when the target cannot be rendered to,
    /// or when neither the tier's scene format nor the fallback can be
    /// rendered and sampled.
    pub fn initialize(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        adapter: &wgpu::Adapter,
        target_format: wgpu::TextureFormat,
        options: RendererOptions,
    ) -> RenderResult<()> {
        match self.state {
            RendererState::Disposed => {
                return Err(RenderError::ContextUnavailable(
                    "renderer has already been disposed".into(),
                ))
            }
            RendererState::Ready(_) => {
                log::warn!("Starfield renderer initialized twice; rebuilding resources");
                self.release();
            }
            RendererState::Uninitialized => {}
        }

        if !supports_target(adapter, target_format) {
            return Err(RenderError::ContextUnavailable(format!(
                "surface format {:?} cannot be rendered to",
                target_format
            )));
        }

        let mut quality = options.quality;
        let scene_fallback = !supports_offscreen(adapter, quality.scene_format);
        if scene_fallback {
            log::warn!(
                "Scene format {:?} unsupported; falling back to {:?}",
                quality.scene_format,
                FALLBACK_SCENE_FORMAT
            );
            quality.scene_format = FALLBACK_SCENE_FORMAT;
            if !supports_offscreen(adapter, quality.scene_format) {
                return Err(RenderError::ContextUnavailable(format!(
                    "no renderable offscreen format (tried {:?})",
                    quality.scene_format
                )));
            }
        }

        let tone_mapping = options
            .tone_mapping
            .unwrap_or_else(|| ToneMapping::for_target(target_format));

        log::info!(
            "Initializing starfield renderer: {} quality, {:?} tone mapping, target {:?}, {} star slots",
            quality.tier,
            tone_mapping,
            target_format,
            options.star_capacity
        );

        let mut gpu = GpuResources::new(
            device,
            queue,
            target_format,
            quality,
            tone_mapping,
            options.star_capacity,
        );
        gpu.scene_fallback = scene_fallback;
        self.state = RendererState::Ready(Box::new(gpu));
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RendererState::Ready(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.state, RendererState::Disposed)
    }

    /// Update render data (called from the app each frame)
    pub fn set_render_data(&self, data: SkyRenderData) {
        *self.render_data.write() = data;
    }

    pub fn render_data(&self) -> SkyRenderData {
        self.render_data.read().clone()
    }

    fn gpu(&self) -> Option<&GpuResources> {
        match &self.state {
            RendererState::Ready(gpu) => Some(gpu),
            _ => None,
        }
    }

    fn gpu_mut(&mut self) -> Option<&mut GpuResources> {
        match &mut self.state {
            RendererState::Ready(gpu) => Some(gpu.as_mut()),
            _ => None,
        }
    }

    /// Feed one chunk of `stars.bin` through `loader` into the star buffer.
    /// `None` when the renderer is not ready; the chunk is dropped.
    pub fn upload_stars(
        &mut self,
        queue: &wgpu::Queue,
        loader: &mut StreamingLoader,
        chunk: &[u8],
    ) -> Option<LoadProgress> {
        let gpu = self.gpu_mut()?;
        let mut sink = GpuRecordSink::new(queue, &gpu.star_buffer, &mut gpu.loaded_stars);
        Some(loader.push_chunk(chunk, &mut sink))
    }

    /// Replace the constellation segments. An empty slice disables the line
    /// pass.
    pub fn set_constellations(&mut self, device: &wgpu::Device, segments: &[ConstellationSegment]) {
        if let Some(gpu) = self.gpu_mut() {
            gpu.set_constellations(device, segments);
            log::info!("Uploaded {} constellation segments", segments.len());
        }
    }

    /// Switch quality tier. The star buffer keeps its original capacity;
    /// render targets are rebuilt on the next frame.
    pub fn set_quality(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, quality: QualityProfile) {
        if let Some(gpu) = self.gpu_mut() {
            let mut quality = quality;
            if gpu.scene_fallback {
                quality.scene_format = FALLBACK_SCENE_FORMAT;
            }
            if gpu.quality == quality {
                return;
            }
            log::info!("Switching to {} quality", quality.tier);
            gpu.set_quality(device, queue, quality);
        }
    }

    /// Record the offscreen passes for a frame of `size` pixels. Returns
    /// whether `paint` has anything to draw.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        size: (u32, u32),
    ) -> bool {
        let data = self.render_data.read().clone();
        match self.gpu_mut() {
            Some(gpu) => gpu.prepare(device, queue, encoder, size, &data),
            None => false,
        }
    }

    /// Draw the composited sky and skyline into the host's pass.
    pub fn paint(&self, render_pass: &mut wgpu::RenderPass<'static>) {
        if let Some(gpu) = self.gpu() {
            gpu.paint(render_pass);
        }
    }

    pub fn quality(&self) -> Option<QualityProfile> {
        self.gpu().map(|gpu| gpu.quality)
    }

    pub fn tone_mapping(&self) -> Option<ToneMapping> {
        self.gpu().map(|gpu| gpu.tone_mapping)
    }

    pub fn star_capacity(&self) -> u32 {
        self.gpu().map_or(0, |gpu| gpu.star_capacity)
    }

    pub fn loaded_star_count(&self) -> u32 {
        self.gpu().map_or(0, |gpu| gpu.loaded_stars)
    }

    pub fn segment_count(&self) -> u32 {
        self.gpu().map_or(0, |gpu| gpu.segment_count)
    }

    fn release(&mut self) {
        if let RendererState::Ready(mut gpu) =
            std::mem::replace(&mut self.state, RendererState::Uninitialized)
        {
            gpu.destroy();
        }
    }

    /// Release every GPU resource. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        let was_ready = self.is_ready();
        self.release();
        self.state = RendererState::Disposed;
        if was_ready {
            log::info!("Starfield renderer disposed");
        }
    }
}

impl Drop for StarfieldRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::QualityTier;

    #[test]
    fn test_new_renderer_is_not_ready() {
        let renderer = StarfieldRenderer::new();
        assert!(!renderer.is_ready());
        assert!(!renderer.is_disposed());
        assert_eq!(renderer.loaded_star_count(), 0);
        assert_eq!(renderer.segment_count(), 0);
        assert!(renderer.quality().is_none());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut renderer = StarfieldRenderer::new();
        renderer.dispose();
        assert!(renderer.is_disposed());
        renderer.dispose();
        assert!(renderer.is_disposed());
        assert!(!renderer.is_ready());
    }

    #[test]
    fn test_render_data_round_trips_through_lock() {
        let renderer = StarfieldRenderer::new();
        let data = SkyRenderData {
            camera: Camera::new(1.0, 0.5, 1.0),
            time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            show_constellations: false,
        };
        renderer.set_render_data(data.clone());
        let read = renderer.render_data();
        assert_eq!(read.camera, data.camera);
        assert_eq!(read.time, data.time);
        assert!(!read.show_constellations);
    }

    #[test]
    fn test_star_capacity_capped_by_tier() {
        let low = QualityProfile::for_tier(QualityTier::Low);
        let options = RendererOptions::new(low, None, 120_000);
        assert_eq!(options.star_capacity, low.max_stars);

        let options = RendererOptions::new(low, Some(ToneMapping::Reinhard), 500);
        assert_eq!(options.star_capacity, 500);
    }
}
