//! Render pipelines and bind group layouts
//!
//! Stateless construction only; the starfield renderer owns the results and
//! rebuilds them when the scene format changes.

use std::borrow::Cow;

use crate::data::{ConstellationSegment, StarRecord};

use super::shaders;

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, filterable: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

pub struct BindGroupLayouts {
    /// Sky uniform, shared by the scene passes and the silhouette
    pub sky: wgpu::BindGroupLayout,
    /// Source texture, sampler, uniform: bright pass and blur
    pub filter: wgpu::BindGroupLayout,
    /// Filter layout plus the bloom texture
    pub composite: wgpu::BindGroupLayout,
    /// Skyline height texture and palette
    pub skyline: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let sky = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sky Bind Group Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });

        let filter = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Filter Bind Group Layout"),
            entries: &[
                texture_entry(0, true),
                sampler_entry(1),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let composite = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[
                texture_entry(0, true),
                sampler_entry(1),
                uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
                texture_entry(3, true),
            ],
        });

        // R32Float is not filterable without an optional feature
        let skyline = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Skyline Bind Group Layout"),
            entries: &[
                texture_entry(0, false),
                uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        Self {
            sky,
            filter,
            composite,
            skyline,
        }
    }
}

/// Additive blending for star glows
const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

struct PipelineDesc<'a> {
    label: &'a str,
    source: String,
    vs_entry: &'a str,
    fs_entry: &'a str,
    layouts: &'a [&'a wgpu::BindGroupLayout],
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
}

fn build(device: &wgpu::Device, desc: PipelineDesc<'_>) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(desc.label),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(desc.source)),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: desc.layouts,
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some(desc.vs_entry),
            buffers: desc.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(desc.fs_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.format,
                blend: Some(desc.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Every pipeline of the frame, in pass order
pub struct Pipelines {
    pub background: wgpu::RenderPipeline,
    pub constellations: wgpu::RenderPipeline,
    pub stars: wgpu::RenderPipeline,
    pub bright: wgpu::RenderPipeline,
    pub blur: wgpu::RenderPipeline,
    /// Drawn into the host's render pass
    pub composite: wgpu::RenderPipeline,
    pub silhouette: wgpu::RenderPipeline,
}

impl Pipelines {
    /// Scene and bloom passes render to `scene_format`; composite and
    /// silhouette render to the host's `target_format`.
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        scene_format: wgpu::TextureFormat,
        target_format: wgpu::TextureFormat,
    ) -> Self {
        log::debug!(
            "Building pipelines: scene {:?}, target {:?}",
            scene_format,
            target_format
        );

        let background = build(
            device,
            PipelineDesc {
                label: "Background Pipeline",
                source: shaders::background(),
                vs_entry: "vs_fullscreen",
                fs_entry: "fs_background",
                layouts: &[&layouts.sky],
                buffers: &[],
                format: scene_format,
                blend: wgpu::BlendState::REPLACE,
            },
        );

        let constellations = build(
            device,
            PipelineDesc {
                label: "Constellation Pipeline",
                source: shaders::constellations(),
                vs_entry: "vs_line",
                fs_entry: "fs_line",
                layouts: &[&layouts.sky],
                buffers: &[ConstellationSegment::desc()],
                format: scene_format,
                blend: wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
            },
        );

        let stars = build(
            device,
            PipelineDesc {
                label: "Star Pipeline",
                source: shaders::stars(),
                vs_entry: "vs_star",
                fs_entry: "fs_star",
                layouts: &[&layouts.sky],
                buffers: &[StarRecord::desc()],
                format: scene_format,
                blend: ADDITIVE,
            },
        );

        let bright = build(
            device,
            PipelineDesc {
                label: "Bright Pass Pipeline",
                source: shaders::bright(),
                vs_entry: "vs_fullscreen",
                fs_entry: "fs_bright",
                layouts: &[&layouts.filter],
                buffers: &[],
                format: scene_format,
                blend: wgpu::BlendState::REPLACE,
            },
        );

        let blur = build(
            device,
            PipelineDesc {
                label: "Blur Pipeline",
                source: shaders::blur(),
                vs_entry: "vs_fullscreen",
                fs_entry: "fs_blur",
                layouts: &[&layouts.filter],
                buffers: &[],
                format: scene_format,
                blend: wgpu::BlendState::REPLACE,
            },
        );

        let composite = build(
            device,
            PipelineDesc {
                label: "Composite Pipeline",
                source: shaders::composite(),
                vs_entry: "vs_fullscreen",
                fs_entry: "fs_composite",
                layouts: &[&layouts.composite],
                buffers: &[],
                format: target_format,
                blend: wgpu::BlendState::REPLACE,
            },
        );

        let silhouette = build(
            device,
            PipelineDesc {
                label: "Silhouette Pipeline",
                source: shaders::silhouette(),
                vs_entry: "vs_fullscreen",
                fs_entry: "fs_silhouette",
                layouts: &[&layouts.sky, &layouts.skyline],
                buffers: &[],
                format: target_format,
                blend: wgpu::BlendState::ALPHA_BLENDING,
            },
        );

        Self {
            background,
            constellations,
            stars,
            bright,
            blur,
            composite,
            silhouette,
        }
    }
}

/// Whether the host surface format accepts our render passes.
pub fn supports_target(adapter: &wgpu::Adapter, format: wgpu::TextureFormat) -> bool {
    adapter
        .get_texture_format_features(format)
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
}

/// Whether `format` can be rendered to and then sampled with filtering, as
/// the scene and bloom targets are.
pub fn supports_offscreen(adapter: &wgpu::Adapter, format: wgpu::TextureFormat) -> bool {
    let features = adapter.get_texture_format_features(format);
    features
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING)
        && features
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
}
