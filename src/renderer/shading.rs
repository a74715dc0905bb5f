//! Shading constants and their CPU twins
//!
//! The WGSL in `shaders.rs` evaluates these curves per vertex or per pixel.
//! The functions here use the same constants and are what the overlay and the
//! tests reason about.

use glam::Vec3;

use super::quality::BlurTaps;

// Stars
/// Magnitude whose relative flux is 1 (the knee of the brightness curve)
pub const REFERENCE_MAGNITUDE: f32 = 3.0;
/// Peak linear brightness of the brightest stars (HDR, feeds bloom)
pub const STAR_BRIGHTNESS_SCALE: f32 = 2.5;
pub const STAR_MIN_SIZE_PX: f32 = 1.5;
pub const STAR_MAX_SIZE_PX: f32 = 9.0;

// Constellation lines
/// Perpendicular half-width of a line quad
pub const LINE_HALF_WIDTH_PX: f32 = 1.0;
pub const LINE_OPACITY: f32 = 0.35;
pub const LINE_COLOR: [f32; 3] = [0.45, 0.60, 0.90];
/// Segments fade out over this altitude band above the horizon (radians)
pub const LINE_FADE_ALTITUDE: f32 = 0.15;

// Background
pub const SKY_BASE_COLOR: [f32; 3] = [0.004, 0.006, 0.016];
pub const GLOW_COLOR: [f32; 3] = [0.42, 0.50, 0.72];
pub const GLOW_STRENGTH: f32 = 0.35;

// Bloom and tone mapping
pub const BLOOM_THRESHOLD: f32 = 0.55;
pub const BLOOM_KNEE: f32 = 0.25;
pub const BLOOM_STRENGTH: f32 = 0.8;
pub const EXPOSURE: f32 = 1.0;
/// Reinhard-extended white point: linear values at this level map to 1.0
pub const TONE_WHITE_POINT: f32 = 4.0;
pub const SOFT_CLIP_KNEE: f32 = 1.0;
pub const SOFT_CLIP_MAX: f32 = 4.0;

const LUMA: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// B−V keypoints (colour index, linear RGB), hot to cool
const BV_KEYS: [(f32, [f32; 3]); 6] = [
    (-0.4, [0.60, 0.70, 1.00]),
    (0.0, [0.80, 0.86, 1.00]),
    (0.3, [1.00, 0.98, 0.96]),
    (0.6, [1.00, 0.95, 0.82]),
    (1.0, [1.00, 0.82, 0.60]),
    (1.5, [1.00, 0.66, 0.42]),
];

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Flux relative to the reference magnitude: 10^(−0.4·(m − m_ref))
pub fn relative_flux(magnitude: f32) -> f32 {
    10f32.powf(-0.4 * (magnitude - REFERENCE_MAGNITUDE))
}

/// Linear brightness of a star, compressed so it never clips.
pub fn star_brightness(magnitude: f32) -> f32 {
    let flux = relative_flux(magnitude);
    STAR_BRIGHTNESS_SCALE * flux / (flux + 1.0)
}

/// Quad size in pixels.
pub fn star_size_px(magnitude: f32) -> f32 {
    let root = relative_flux(magnitude).sqrt();
    mix(STAR_MIN_SIZE_PX, STAR_MAX_SIZE_PX, root / (root + 1.0))
}

/// Whether the star pass draws a star. Stars on or below the horizon and
/// stars fainter than the quality limit are dropped.
pub fn star_drawn(altitude: f32, magnitude: f32, max_magnitude: f32) -> bool {
    altitude > 0.0 && magnitude <= max_magnitude
}

/// Black-body approximation of a B−V colour index, piecewise linear.
pub fn bv_to_rgb(bv: f32) -> [f32; 3] {
    let first = BV_KEYS[0];
    if bv.is_nan() || bv <= first.0 {
        return first.1;
    }
    for pair in BV_KEYS.windows(2) {
        let (b0, c0) = pair[0];
        let (b1, c1) = pair[1];
        if bv <= b1 {
            let t = (bv - b0) / (b1 - b0);
            return [
                mix(c0[0], c1[0], t),
                mix(c0[1], c1[1], t),
                mix(c0[2], c1[2], t),
            ];
        }
    }
    BV_KEYS[BV_KEYS.len() - 1].1
}

/// Light-pollution glow intensity (0..1) at an altitude in radians: rises
/// through the horizon, peaks a few degrees up, falls away overhead.
pub fn light_pollution(altitude: f32) -> f32 {
    let rise = smoothstep(-0.10, 0.02, altitude);
    let fall = 1.0 - 0.7 * smoothstep(0.05, 0.6, altitude);
    let overhead = 1.0 - 0.9 * smoothstep(0.6, 1.5, altitude);
    rise * fall * overhead
}

/// Opacity multiplier of a constellation segment given its lower endpoint.
pub fn line_fade(min_altitude: f32) -> f32 {
    smoothstep(0.0, LINE_FADE_ALTITUDE, min_altitude)
}

pub fn luminance(color: Vec3) -> f32 {
    color.dot(LUMA)
}

/// Fraction of a pixel passed to bloom by the bright pass.
pub fn bright_pass_weight(color: Vec3) -> f32 {
    let l = luminance(color).max(0.0);
    let compressed = l / (1.0 + l);
    smoothstep(BLOOM_THRESHOLD, BLOOM_THRESHOLD + BLOOM_KNEE, compressed)
}

pub fn reinhard_extended(x: f32, white: f32) -> f32 {
    let x = x.max(0.0);
    x * (1.0 + x / (white * white)) / (1.0 + x)
}

/// Identity up to `knee`, then an exponential shoulder approaching `max`.
pub fn soft_clip(x: f32, knee: f32, max: f32) -> f32 {
    let x = x.max(0.0);
    if x <= knee {
        return x;
    }
    let range = max - knee;
    knee + range * (1.0 - (-(x - knee) / range).exp())
}

pub fn linear_to_srgb(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    if x <= 0.003_130_8 {
        x * 12.92
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

/// Normalized one-sided Gaussian weights: index i is the weight at offset ±i.
/// Unused slots are zero. `w[0] + 2·Σ w[i>0] == 1`.
pub fn gaussian_kernel(taps: BlurTaps) -> [f32; 8] {
    let radius = taps.radius();
    let sigma = match taps {
        BlurTaps::Five => 1.0,
        BlurTaps::Nine => 2.0,
    };

    let mut weights = [0.0f32; 8];
    for (i, w) in weights.iter_mut().enumerate().take(radius + 1) {
        let x = i as f32;
        *w = (-(x * x) / (2.0 * sigma * sigma)).exp();
    }
    let total = weights[0] + 2.0 * weights[1..=radius].iter().sum::<f32>();
    for w in weights.iter_mut() {
        *w /= total;
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_brighter_stars_are_brighter_and_larger() {
        let mut previous = (f32::INFINITY, f32::INFINITY);
        for step in 0..40 {
            let mag = -1.5 + step as f32 * 0.25;
            let b = star_brightness(mag);
            let s = star_size_px(mag);
            assert!(b < previous.0 && s < previous.1, "mag {mag}");
            assert!(b > 0.0 && b < STAR_BRIGHTNESS_SCALE);
            assert!((STAR_MIN_SIZE_PX..=STAR_MAX_SIZE_PX).contains(&s));
            previous = (b, s);
        }
    }

    #[test]
    fn test_reference_magnitude_is_half_scale() {
        assert_relative_eq!(relative_flux(REFERENCE_MAGNITUDE), 1.0);
        assert_relative_eq!(
            star_brightness(REFERENCE_MAGNITUDE),
            STAR_BRIGHTNESS_SCALE * 0.5
        );
        // Five magnitudes is a factor of 100 in flux
        assert_relative_eq!(
            relative_flux(REFERENCE_MAGNITUDE - 5.0),
            100.0,
            max_relative = 1e-4
        );
    }

    #[test]
    fn test_horizon_cutoff() {
        assert!(!star_drawn(0.0, 1.0, 6.5));
        assert!(!star_drawn(-0.2, 1.0, 6.5));
        assert!(star_drawn(0.01, 1.0, 6.5));
        assert!(!star_drawn(0.5, 7.0, 6.5));
    }

    #[test]
    fn test_bv_colors() {
        let blue = bv_to_rgb(-0.6);
        let red = bv_to_rgb(2.5);
        assert_eq!(blue, [0.60, 0.70, 1.00]);
        assert_eq!(red, [1.00, 0.66, 0.42]);
        assert!(blue[2] > blue[0]);
        assert!(red[0] > red[2]);

        let mid = bv_to_rgb(0.15);
        assert_abs_diff_eq!(mid[0], 0.9, epsilon = 1e-5);

        let nan = bv_to_rgb(f32::NAN);
        assert!(nan.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_light_pollution_profile() {
        assert_abs_diff_eq!(light_pollution(-0.3), 0.0);
        let peak = light_pollution(0.05);
        assert!(peak > light_pollution(-0.05));
        assert!(peak > light_pollution(0.5));
        assert!(light_pollution(0.5) > light_pollution(1.4));
        assert!(light_pollution(std::f32::consts::FRAC_PI_2) < 0.1);
    }

    #[test]
    fn test_tone_curves() {
        assert_abs_diff_eq!(reinhard_extended(0.0, TONE_WHITE_POINT), 0.0);
        assert_abs_diff_eq!(
            reinhard_extended(TONE_WHITE_POINT, TONE_WHITE_POINT),
            1.0,
            epsilon = 1e-6
        );
        assert!(reinhard_extended(0.5, TONE_WHITE_POINT) < 0.5);

        assert_eq!(soft_clip(0.5, SOFT_CLIP_KNEE, SOFT_CLIP_MAX), 0.5);
        let hot = soft_clip(8.0, SOFT_CLIP_KNEE, SOFT_CLIP_MAX);
        assert!(hot < SOFT_CLIP_MAX && hot > 3.5);
        // Continuous at the knee
        let just_above = soft_clip(SOFT_CLIP_KNEE + 1e-4, SOFT_CLIP_KNEE, SOFT_CLIP_MAX);
        assert_abs_diff_eq!(just_above, SOFT_CLIP_KNEE, epsilon = 1e-3);
    }

    #[test]
    fn test_bright_pass_ignores_dim_sky() {
        assert_eq!(bright_pass_weight(Vec3::from(SKY_BASE_COLOR)), 0.0);
        assert_eq!(bright_pass_weight(Vec3::splat(20.0)), 1.0);
    }

    #[test]
    fn test_gaussian_kernels_are_normalized() {
        for taps in [BlurTaps::Five, BlurTaps::Nine] {
            let w = gaussian_kernel(taps);
            let r = taps.radius();
            let total = w[0] + 2.0 * w[1..=r].iter().sum::<f32>();
            assert_relative_eq!(total, 1.0, max_relative = 1e-6);
            assert!(w[r + 1..].iter().all(|&x| x == 0.0));
            assert!(w.windows(2).take(r).all(|p| p[0] > p[1]));
        }
    }

    #[test]
    fn test_line_fade() {
        assert_eq!(line_fade(0.0), 0.0);
        assert_eq!(line_fade(LINE_FADE_ALTITUDE), 1.0);
        assert!(line_fade(LINE_FADE_ALTITUDE * 0.5) > 0.0);
    }
}
