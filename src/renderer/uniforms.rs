//! Uniform blocks shared with the WGSL passes
//!
//! Every field is a `vec4<f32>` on the shader side so the Rust and WGSL
//! layouts agree without padding rules.

use bytemuck::{Pod, Zeroable};

use super::projection::{SkyView, DEFAULT_MARGIN};
use super::quality::{BlurTaps, ToneMapping};
use super::shading::{
    gaussian_kernel, BLOOM_KNEE, BLOOM_STRENGTH, BLOOM_THRESHOLD, EXPOSURE, GLOW_COLOR,
    GLOW_STRENGTH, LINE_COLOR, LINE_FADE_ALTITUDE, LINE_HALF_WIDTH_PX, LINE_OPACITY,
    REFERENCE_MAGNITUDE, SKY_BASE_COLOR, SOFT_CLIP_KNEE, SOFT_CLIP_MAX, STAR_BRIGHTNESS_SCALE,
    STAR_MAX_SIZE_PX, STAR_MIN_SIZE_PX, TONE_WHITE_POINT,
};
use super::Camera;
use crate::skyline::SkylineProfile;

/// Most skyline layers the silhouette shader knows about
pub const MAX_SKYLINE_LAYERS: usize = 3;

fn vec4(xyz: [f32; 3], w: f32) -> [f32; 4] {
    [xyz[0], xyz[1], xyz[2], w]
}

/// Camera, sky and styling state for the background, line, star and
/// silhouette passes
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SkyUniform {
    /// View direction, w = tan(fov / 2)
    pub view: [f32; 4],
    /// Right vector, w = aspect
    pub right: [f32; 4],
    /// Up vector, w = dolly distance
    pub up: [f32; 4],
    /// Camera position inside the sphere, w = projection margin
    pub camera_pos: [f32; 4],
    /// Local sidereal time, latitude (radians), faintest magnitude drawn
    pub sky: [f32; 4],
    /// Width, height, 1/width, 1/height in pixels
    pub viewport: [f32; 4],
    /// Reference magnitude, brightness scale, min and max quad size
    pub star: [f32; 4],
    /// Half-width in pixels, opacity, fade altitude
    pub lines: [f32; 4],
    pub line_color: [f32; 4],
    /// Glow colour, w = strength
    pub glow: [f32; 4],
    pub base: [f32; 4],
}

impl SkyUniform {
    pub fn new(
        camera: &Camera,
        viewport: (u32, u32),
        lst: f64,
        latitude: f64,
        max_magnitude: f32,
    ) -> Self {
        let width = viewport.0.max(1) as f32;
        let height = viewport.1.max(1) as f32;
        let view = SkyView::new(camera, width / height);

        Self {
            view: vec4(view.basis.view.into(), view.tan_half_fov),
            right: vec4(view.basis.right.into(), view.aspect),
            up: vec4(view.basis.up.into(), view.dolly()),
            camera_pos: vec4(view.position.into(), DEFAULT_MARGIN),
            sky: [lst as f32, latitude as f32, max_magnitude, 0.0],
            viewport: [width, height, 1.0 / width, 1.0 / height],
            star: [
                REFERENCE_MAGNITUDE,
                STAR_BRIGHTNESS_SCALE,
                STAR_MIN_SIZE_PX,
                STAR_MAX_SIZE_PX,
            ],
            lines: [LINE_HALF_WIDTH_PX, LINE_OPACITY, LINE_FADE_ALTITUDE, 0.0],
            line_color: vec4(LINE_COLOR, 1.0),
            glow: vec4(GLOW_COLOR, GLOW_STRENGTH),
            base: vec4(SKY_BASE_COLOR, 1.0),
        }
    }
}

/// Bright-pass and composite parameters
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PostUniform {
    /// Threshold, knee, bloom strength, exposure
    pub bloom: [f32; 4],
    /// Operator, white point, soft-clip knee, soft-clip ceiling
    pub tone: [f32; 4],
    /// x > 0.5 applies the sRGB transfer in the shader
    pub output: [f32; 4],
}

impl PostUniform {
    pub fn new(tone_mapping: ToneMapping, encode_srgb: bool) -> Self {
        Self {
            bloom: [BLOOM_THRESHOLD, BLOOM_KNEE, BLOOM_STRENGTH, EXPOSURE],
            tone: [
                tone_mapping.shader_mode(),
                TONE_WHITE_POINT,
                SOFT_CLIP_KNEE,
                SOFT_CLIP_MAX,
            ],
            output: [if encode_srgb { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

/// One direction of the separable Gaussian blur
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct BlurUniform {
    /// Texel step (x, y), tap radius
    pub direction: [f32; 4],
    /// One-sided weights, index i applies at offset ±i
    pub weights: [[f32; 4]; 2],
}

impl BlurUniform {
    /// Blur along x when `horizontal`, along y otherwise, over a target of
    /// `size` texels.
    pub fn new(horizontal: bool, size: (u32, u32), taps: BlurTaps) -> Self {
        let texel = [1.0 / size.0.max(1) as f32, 1.0 / size.1.max(1) as f32];
        let step = if horizontal {
            [texel[0], 0.0]
        } else {
            [0.0, texel[1]]
        };
        let w = gaussian_kernel(taps);
        Self {
            direction: [step[0], step[1], taps.radius() as f32, 0.0],
            weights: [[w[0], w[1], w[2], w[3]], [w[4], w[5], w[6], w[7]]],
        }
    }
}

/// Skyline layer count, texture width and palette for the silhouette pass
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SkylineUniform {
    /// Layer count, texture width, sRGB encode flag
    pub info: [f32; 4],
    pub colors: [[f32; 4]; MAX_SKYLINE_LAYERS],
}

impl SkylineUniform {
    pub fn new(profile: &SkylineProfile, encode_srgb: bool) -> Self {
        let mut colors = [[0.0; 4]; MAX_SKYLINE_LAYERS];
        for (slot, layer) in colors.iter_mut().zip(profile.layers()) {
            *slot = vec4(layer.color, 1.0);
        }
        let layers = profile.layer_count().min(MAX_SKYLINE_LAYERS);
        Self {
            info: [
                layers as f32,
                profile.width() as f32,
                if encode_srgb { 1.0 } else { 0.0 },
                0.0,
            ],
            colors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skyline::layers_for_count;
    use approx::assert_abs_diff_eq;
    use glam::Vec3;

    #[test]
    fn test_layouts_are_vec4_aligned() {
        assert_eq!(std::mem::size_of::<SkyUniform>(), 11 * 16);
        assert_eq!(std::mem::size_of::<PostUniform>(), 3 * 16);
        assert_eq!(std::mem::size_of::<BlurUniform>(), 3 * 16);
        assert_eq!(std::mem::size_of::<SkylineUniform>(), 4 * 16);
    }

    #[test]
    fn test_sky_uniform_basis() {
        let camera = Camera::new(0.0, 0.0, 50f32.to_radians());
        let u = SkyUniform::new(&camera, (800, 400), 1.5, 0.6, 6.5);

        // Looking north along +z, east is to the right
        assert!(Vec3::from_slice(&u.view[..3]).abs_diff_eq(Vec3::Z, 1e-6));
        assert!(Vec3::from_slice(&u.right[..3]).abs_diff_eq(Vec3::X, 1e-6));
        assert_abs_diff_eq!(u.right[3], 2.0);
        // No dolly below 60°
        assert_abs_diff_eq!(u.up[3], 0.0);
        assert_eq!(u.sky, [1.5, 0.6, 6.5, 0.0]);
        assert_eq!(u.viewport, [800.0, 400.0, 1.0 / 800.0, 1.0 / 400.0]);
    }

    #[test]
    fn test_sky_uniform_zero_viewport() {
        let u = SkyUniform::new(&Camera::default(), (0, 0), 0.0, 0.0, 6.0);
        assert!(u.viewport.iter().all(|v| v.is_finite()));
        assert!(u.right[3].is_finite());
    }

    #[test]
    fn test_blur_direction() {
        let h = BlurUniform::new(true, (200, 100), BlurTaps::Nine);
        assert_eq!(h.direction, [0.005, 0.0, 4.0, 0.0]);
        let v = BlurUniform::new(false, (200, 100), BlurTaps::Five);
        assert_eq!(v.direction, [0.0, 0.01, 2.0, 0.0]);
        assert_eq!(v.weights[1], [0.0; 4]);
    }

    #[test]
    fn test_post_uniform_flags() {
        let sdr = PostUniform::new(ToneMapping::Reinhard, true);
        assert_eq!(sdr.tone[0], 0.0);
        assert_eq!(sdr.output[0], 1.0);
        let hdr = PostUniform::new(ToneMapping::SoftClip, false);
        assert_eq!(hdr.tone[0], 1.0);
        assert_eq!(hdr.output[0], 0.0);
    }

    #[test]
    fn test_skyline_uniform_palette() {
        let profile = SkylineProfile::generate(64, layers_for_count(3));
        let u = SkylineUniform::new(&profile, false);
        assert_eq!(u.info[0], 3.0);
        assert_eq!(u.info[1], 64.0);
        for (slot, layer) in u.colors.iter().zip(profile.layers()) {
            assert_eq!(&slot[..3], &layer.color);
        }
    }
}
