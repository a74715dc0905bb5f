//! Offscreen render targets and the skyline lookup texture

use crate::skyline::SkylineProfile;

use super::quality::QualityProfile;

/// Texture plus its default view
pub struct RenderTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTexture {
    fn new(
        device: &wgpu::Device,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Sizes and format a set of render targets is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSpec {
    pub size: (u32, u32),
    pub bloom_size: (u32, u32),
    pub format: wgpu::TextureFormat,
}

impl TargetSpec {
    /// Targets a frame of `size` needs at `quality`.
    pub fn for_frame(size: (u32, u32), quality: &QualityProfile) -> Self {
        Self {
            size,
            bloom_size: quality.bloom_size(size.0, size.1),
            format: quality.scene_format,
        }
    }
}

/// Full-resolution scene target and the two reduced-size bloom targets
pub struct RenderTextures {
    pub scene: RenderTexture,
    /// Bloom ping-pong pair; the blurred result always ends in `bloom[0]`
    pub bloom: [RenderTexture; 2],
    pub size: (u32, u32),
    pub bloom_size: (u32, u32),
    pub format: wgpu::TextureFormat,
}

impl RenderTextures {
    /// `None` for a zero-sized viewport.
    pub fn new(device: &wgpu::Device, size: (u32, u32), quality: &QualityProfile) -> Option<Self> {
        if size.0 == 0 || size.1 == 0 {
            return None;
        }
        let TargetSpec {
            size,
            bloom_size,
            format,
        } = TargetSpec::for_frame(size, quality);
        log::debug!(
            "Creating render targets: scene {}x{}, bloom {}x{}, {:?}",
            size.0,
            size.1,
            bloom_size.0,
            bloom_size.1,
            format
        );

        Some(Self {
            scene: RenderTexture::new(device, "Scene Texture", size, format),
            bloom: [
                RenderTexture::new(device, "Bloom Texture A", bloom_size, format),
                RenderTexture::new(device, "Bloom Texture B", bloom_size, format),
            ],
            size,
            bloom_size,
            format,
        })
    }

    pub fn spec(&self) -> TargetSpec {
        TargetSpec {
            size: self.size,
            bloom_size: self.bloom_size,
            format: self.format,
        }
    }

    pub fn destroy(&self) {
        self.scene.texture.destroy();
        for target in &self.bloom {
            target.texture.destroy();
        }
    }
}

/// Whether targets built for `current` must be rebuilt for a frame of `size`.
/// Any change of viewport size, scene format or bloom size invalidates them.
pub fn targets_stale(current: Option<TargetSpec>, size: (u32, u32), quality: &QualityProfile) -> bool {
    size.0 > 0 && size.1 > 0 && current != Some(TargetSpec::for_frame(size, quality))
}

/// Whether targets must be (re)built for a frame of `size`.
pub fn needs_rebuild(
    current: Option<&RenderTextures>,
    size: (u32, u32),
    quality: &QualityProfile,
) -> bool {
    targets_stale(current.map(RenderTextures::spec), size, quality)
}

/// Upload the baked skyline heights as an `R32Float` texture, one row per
/// layer.
pub fn create_skyline_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    profile: &SkylineProfile,
) -> RenderTexture {
    let width = profile.width() as u32;
    let rows = profile.layer_count().max(1) as u32;
    let mut texels = profile.texels().to_vec();
    texels.resize((width * rows) as usize, 0.0);

    let size = wgpu::Extent3d {
        width,
        height: rows,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Skyline Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(&texels),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(rows),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    RenderTexture { texture, view }
}

pub fn create_linear_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Linear Clamp Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::QualityTier;

    #[test]
    fn test_needs_rebuild_without_targets() {
        let quality = QualityProfile::for_tier(QualityTier::Medium);
        assert!(needs_rebuild(None, (800, 600), &quality));
        // Zero-sized viewports never build targets
        assert!(!needs_rebuild(None, (0, 600), &quality));
        assert!(!needs_rebuild(None, (800, 0), &quality));
    }

    fn built_for(size: (u32, u32), tier: QualityTier) -> Option<TargetSpec> {
        Some(TargetSpec::for_frame(size, &QualityProfile::for_tier(tier)))
    }

    #[test]
    fn test_same_frame_keeps_targets() {
        let quality = QualityProfile::for_tier(QualityTier::Medium);
        let current = built_for((800, 600), QualityTier::Medium);
        assert!(!targets_stale(current, (800, 600), &quality));
    }

    #[test]
    fn test_resize_rebuilds_targets() {
        let quality = QualityProfile::for_tier(QualityTier::Medium);
        let current = built_for((800, 600), QualityTier::Medium);
        assert!(targets_stale(current, (801, 600), &quality));
        assert!(targets_stale(current, (800, 599), &quality));
        // Shrinking to nothing skips the frame instead of rebuilding
        assert!(!targets_stale(current, (0, 600), &quality));
    }

    #[test]
    fn test_format_change_rebuilds_targets() {
        let low = QualityProfile::for_tier(QualityTier::Low);
        let medium = QualityProfile::for_tier(QualityTier::Medium);
        assert_ne!(low.scene_format, medium.scene_format);
        assert_eq!(low.bloom_divisor, medium.bloom_divisor);

        assert!(targets_stale(built_for((800, 600), QualityTier::Low), (800, 600), &medium));
        assert!(targets_stale(built_for((800, 600), QualityTier::Medium), (800, 600), &low));
    }

    #[test]
    fn test_bloom_divisor_change_rebuilds_targets() {
        let medium = QualityProfile::for_tier(QualityTier::Medium);
        let high = QualityProfile::for_tier(QualityTier::High);
        assert_eq!(medium.scene_format, high.scene_format);
        assert_ne!(medium.bloom_divisor, high.bloom_divisor);

        assert!(targets_stale(built_for((800, 600), QualityTier::Medium), (800, 600), &high));
        assert!(targets_stale(built_for((800, 600), QualityTier::High), (800, 600), &medium));
    }

    #[test]
    fn test_spec_for_frame() {
        let spec = TargetSpec::for_frame((801, 600), &QualityProfile::for_tier(QualityTier::High));
        assert_eq!(spec.size, (801, 600));
        assert_eq!(spec.bloom_size, (400, 300));
        assert_eq!(spec.format, wgpu::TextureFormat::Rgba16Float);
    }
}
