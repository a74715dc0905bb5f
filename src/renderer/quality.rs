//! Quality tiers and tone-mapping selection

use std::fmt;
use std::str::FromStr;

/// Performance tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// Pick a tier from the adapter class.
    pub fn from_device_type(device_type: wgpu::DeviceType) -> Self {
        match device_type {
            wgpu::DeviceType::DiscreteGpu => QualityTier::High,
            wgpu::DeviceType::IntegratedGpu => QualityTier::Medium,
            _ => QualityTier::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            other => Err(format!("unknown quality tier '{other}'")),
        }
    }
}

/// Gaussian blur kernel width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurTaps {
    Five,
    Nine,
}

impl BlurTaps {
    pub fn count(&self) -> usize {
        match self {
            BlurTaps::Five => 5,
            BlurTaps::Nine => 9,
        }
    }

    /// Taps on each side of the centre sample
    pub fn radius(&self) -> usize {
        self.count() / 2
    }
}

/// Everything that varies between quality tiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityProfile {
    pub tier: QualityTier,
    /// Star buffer capacity; the brightest stars win
    pub max_stars: u32,
    /// Fainter stars are culled in the vertex stage
    pub max_magnitude: f32,
    pub bloom_iterations: u32,
    pub blur_taps: BlurTaps,
    /// Bloom buffers are this many times smaller than the scene buffer
    pub bloom_divisor: u32,
    pub scene_format: wgpu::TextureFormat,
    pub skyline_layers: u32,
    pub skyline_width: u32,
}

impl QualityProfile {
    pub fn for_tier(tier: QualityTier) -> Self {
        match tier {
            QualityTier::Low => Self {
                tier,
                max_stars: 20_000,
                max_magnitude: 5.5,
                bloom_iterations: 1,
                blur_taps: BlurTaps::Five,
                bloom_divisor: 4,
                scene_format: wgpu::TextureFormat::Rgba8Unorm,
                skyline_layers: 2,
                skyline_width: 1024,
            },
            QualityTier::Medium => Self {
                tier,
                max_stars: 60_000,
                max_magnitude: 6.5,
                bloom_iterations: 2,
                blur_taps: BlurTaps::Five,
                bloom_divisor: 4,
                scene_format: wgpu::TextureFormat::Rgba16Float,
                skyline_layers: 3,
                skyline_width: 2048,
            },
            QualityTier::High => Self {
                tier,
                max_stars: 120_000,
                max_magnitude: 7.5,
                bloom_iterations: 3,
                blur_taps: BlurTaps::Nine,
                bloom_divisor: 2,
                scene_format: wgpu::TextureFormat::Rgba16Float,
                skyline_layers: 3,
                skyline_width: 2048,
            },
        }
    }

    /// Bloom buffer size for a scene of the given size (never zero).
    pub fn bloom_size(&self, width: u32, height: u32) -> (u32, u32) {
        let divisor = self.bloom_divisor.max(1);
        ((width / divisor).max(1), (height / divisor).max(1))
    }
}

impl Default for QualityProfile {
    fn default() -> Self {
        Self::for_tier(QualityTier::Medium)
    }
}

/// Tone-mapping operator for the composite pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneMapping {
    /// Reinhard-extended, for standard dynamic range targets
    Reinhard,
    /// Identity up to a knee then a soft shoulder, for HDR targets
    SoftClip,
}

impl ToneMapping {
    /// Soft clip on float (HDR-capable) targets, Reinhard otherwise.
    pub fn for_target(format: wgpu::TextureFormat) -> Self {
        if is_float_format(format) {
            ToneMapping::SoftClip
        } else {
            ToneMapping::Reinhard
        }
    }

    pub fn shader_mode(&self) -> f32 {
        match self {
            ToneMapping::Reinhard => 0.0,
            ToneMapping::SoftClip => 1.0,
        }
    }
}

impl FromStr for ToneMapping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reinhard" => Ok(ToneMapping::Reinhard),
            "soft-clip" | "softclip" => Ok(ToneMapping::SoftClip),
            other => Err(format!("unknown tone mapping '{other}'")),
        }
    }
}

pub fn is_float_format(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::Rgba16Float
            | wgpu::TextureFormat::Rgba32Float
            | wgpu::TextureFormat::Rg11b10Ufloat
    )
}

/// Whether the composite shader must apply the sRGB transfer itself
pub fn needs_manual_srgb(format: wgpu::TextureFormat) -> bool {
    !format.is_srgb() && !is_float_format(format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_scale_up() {
        let low = QualityProfile::for_tier(QualityTier::Low);
        let medium = QualityProfile::for_tier(QualityTier::Medium);
        let high = QualityProfile::for_tier(QualityTier::High);

        assert!(low.max_stars < medium.max_stars && medium.max_stars < high.max_stars);
        assert!(low.bloom_iterations <= medium.bloom_iterations);
        assert!(medium.bloom_iterations <= high.bloom_iterations);
        assert!(low.max_magnitude < high.max_magnitude);
        assert_eq!(high.blur_taps.count(), 9);
        assert_eq!(low.blur_taps.count(), 5);
    }

    #[test]
    fn test_device_type_selection() {
        assert_eq!(
            QualityTier::from_device_type(wgpu::DeviceType::DiscreteGpu),
            QualityTier::High
        );
        assert_eq!(
            QualityTier::from_device_type(wgpu::DeviceType::IntegratedGpu),
            QualityTier::Medium
        );
        assert_eq!(
            QualityTier::from_device_type(wgpu::DeviceType::Cpu),
            QualityTier::Low
        );
    }

    #[test]
    fn test_bloom_size_never_zero() {
        let profile = QualityProfile::for_tier(QualityTier::Low);
        assert_eq!(profile.bloom_size(1920, 1080), (480, 270));
        assert_eq!(profile.bloom_size(3, 1), (1, 1));
    }

    #[test]
    fn test_tone_mapping_follows_target() {
        assert_eq!(
            ToneMapping::for_target(wgpu::TextureFormat::Rgba16Float),
            ToneMapping::SoftClip
        );
        assert_eq!(
            ToneMapping::for_target(wgpu::TextureFormat::Bgra8UnormSrgb),
            ToneMapping::Reinhard
        );
        assert!(needs_manual_srgb(wgpu::TextureFormat::Bgra8Unorm));
        assert!(!needs_manual_srgb(wgpu::TextureFormat::Bgra8UnormSrgb));
    }

    #[test]
    fn test_parse_from_cli_strings() {
        assert_eq!("HIGH".parse::<QualityTier>(), Ok(QualityTier::High));
        assert_eq!("soft-clip".parse::<ToneMapping>(), Ok(ToneMapping::SoftClip));
        assert!("ultra".parse::<QualityTier>().is_err());
    }
}
