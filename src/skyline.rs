//! Procedural city skyline
//!
//! Building heights (degrees above the horizon) over the full azimuth circle,
//! for up to three depth layers ordered far to near. Generated once on the CPU
//! and baked into an `R32Float` texture (one row per layer) that the silhouette
//! pass samples with nearest-neighbour lookups.

use std::f64::consts::TAU;

/// Upper bound on buildings walked per lookup
const MAX_BUILDINGS: usize = 512;

/// One depth layer of buildings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkylineLayer {
    pub name: &'static str,
    /// Decorrelates layers that share the same hash sequence (radians)
    pub azimuth_offset: f64,
    pub min_width_deg: f64,
    pub max_width_deg: f64,
    /// Buildings per unit width; higher packs them tighter
    pub density: f64,
    pub base_height_deg: f64,
    pub amplitude_deg: f64,
    /// Existence probability in an average district
    pub existence_base: f64,
    /// How far the district level moves the existence probability
    pub district_bias: f64,
    /// District noise frequency (cycles per degree)
    pub district_frequency: f64,
    pub floor_height_deg: f64,
    /// Nearer layers are scaled down
    pub height_scale: f64,
    /// Linear RGB, atmospheric perspective from hazy far to black near
    pub color: [f32; 3],
}

pub const FAR_LAYER: SkylineLayer = SkylineLayer {
    name: "far",
    azimuth_offset: 0.0,
    min_width_deg: 0.9,
    max_width_deg: 2.8,
    density: 1.2,
    base_height_deg: 2.0,
    amplitude_deg: 6.0,
    existence_base: 0.75,
    district_bias: 0.35,
    district_frequency: 1.0 / 40.0,
    floor_height_deg: 0.35,
    height_scale: 1.0,
    color: [0.16, 0.19, 0.26],
};

pub const MID_LAYER: SkylineLayer = SkylineLayer {
    name: "mid",
    azimuth_offset: 1.7,
    min_width_deg: 1.5,
    max_width_deg: 4.5,
    density: 1.0,
    base_height_deg: 1.5,
    amplitude_deg: 5.0,
    existence_base: 0.6,
    district_bias: 0.4,
    district_frequency: 1.0 / 55.0,
    floor_height_deg: 0.4,
    height_scale: 0.8,
    color: [0.07, 0.08, 0.11],
};

pub const NEAR_LAYER: SkylineLayer = SkylineLayer {
    name: "near",
    azimuth_offset: 3.9,
    min_width_deg: 2.5,
    max_width_deg: 7.0,
    density: 0.9,
    base_height_deg: 1.0,
    amplitude_deg: 4.0,
    existence_base: 0.45,
    district_bias: 0.45,
    district_frequency: 1.0 / 70.0,
    floor_height_deg: 0.5,
    height_scale: 0.6,
    color: [0.012, 0.012, 0.018],
};

/// Layers used for a given layer count, ordered far to near.
pub fn layers_for_count(count: u32) -> Vec<SkylineLayer> {
    match count {
        0 => Vec::new(),
        1 => vec![NEAR_LAYER],
        2 => vec![FAR_LAYER, NEAR_LAYER],
        _ => vec![FAR_LAYER, MID_LAYER, NEAR_LAYER],
    }
}

/// Sine hash in [0, 1)
pub fn hash(n: f64) -> f64 {
    let v = (n * 127.1).sin() * 43_758.545_3;
    v - v.floor()
}

/// Smoothed 1-D value noise in [0, 1]
pub fn value_noise(x: f64) -> f64 {
    let i = x.floor();
    let f = x - i;
    let u = f * f * (3.0 - 2.0 * f);
    let a = hash(i);
    let b = hash(i + 1.0);
    a + (b - a) * u
}

impl SkylineLayer {
    /// Per-layer seed so layers draw distinct building sequences
    fn seed(&self) -> f64 {
        self.azimuth_offset * 31.0
    }

    /// Building height in degrees at `azimuth` (radians, any range).
    /// Gaps between buildings are 0.
    pub fn height_at(&self, azimuth: f64) -> f64 {
        let shifted = (azimuth + self.azimuth_offset).rem_euclid(TAU);
        let target_deg = shifted.to_degrees();
        let seed = self.seed();

        let mut start = 0.0;
        for index in 0..MAX_BUILDINGS {
            let i = index as f64;
            let t = hash(i + seed);
            let width =
                (self.min_width_deg + (self.max_width_deg - self.min_width_deg) * t) / self.density;
            let end = start + width;

            if target_deg < end {
                return self.building_height(i, (start + end) * 0.5);
            }
            start = end;
        }
        0.0
    }

    fn building_height(&self, index: f64, center_deg: f64) -> f64 {
        let seed = self.seed();
        let district = value_noise(center_deg * self.district_frequency + seed * 13.0);

        let probability =
            (self.existence_base + self.district_bias * (district - 0.5) * 2.0).clamp(0.0, 1.0);
        if hash(index * 7.31 + seed + 0.5) >= probability {
            return 0.0;
        }

        let detail = hash(index * 3.17 + seed * 1.3 + 11.0);
        let blend = 0.6 * district + 0.4 * detail;
        let raw = self.base_height_deg + self.amplitude_deg * blend;
        let floors = (raw / self.floor_height_deg).floor().max(1.0);
        floors * self.floor_height_deg * self.height_scale
    }
}

/// Baked height table, one row of `width` texels per layer
#[derive(Debug, Clone, PartialEq)]
pub struct SkylineProfile {
    width: usize,
    layers: Vec<SkylineLayer>,
    heights: Vec<f32>,
}

impl SkylineProfile {
    /// Sample every layer at texel centres.
    pub fn generate(width: u32, layers: Vec<SkylineLayer>) -> Self {
        let width = width.max(1) as usize;
        let mut heights = Vec::with_capacity(width * layers.len());
        for layer in &layers {
            for texel in 0..width {
                let azimuth = (texel as f64 + 0.5) / width as f64 * TAU;
                heights.push(layer.height_at(azimuth) as f32);
            }
        }
        log::debug!(
            "Generated skyline: {} layers x {} texels",
            layers.len(),
            width
        );
        Self {
            width,
            layers,
            heights,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[SkylineLayer] {
        &self.layers
    }

    /// Row-major texel data for the lookup texture
    pub fn texels(&self) -> &[f32] {
        &self.heights
    }

    fn texel_index(&self, azimuth: f32) -> usize {
        let turns = (azimuth / std::f32::consts::TAU).rem_euclid(1.0);
        ((turns * self.width as f32) as usize).min(self.width - 1)
    }

    /// Nearest-texel height in degrees.
    pub fn height(&self, layer: usize, azimuth: f32) -> f32 {
        if layer >= self.layers.len() {
            return 0.0;
        }
        self.heights[layer * self.width + self.texel_index(azimuth)]
    }

    /// Layer drawn at a pixel, compositing far to near: each layer whose
    /// height exceeds the altitude overwrites the farther ones. `None` means
    /// the sky shows through.
    pub fn silhouette_layer(&self, azimuth: f32, altitude_deg: f32) -> Option<usize> {
        let column = self.texel_index(azimuth);
        let heights = (0..self.layers.len()).map(|layer| self.heights[layer * self.width + column]);
        composite_silhouette(heights, altitude_deg)
    }

    pub fn silhouette_color(&self, azimuth: f32, altitude_deg: f32) -> Option<[f32; 3]> {
        self.silhouette_layer(azimuth, altitude_deg)
            .map(|layer| self.layers[layer].color)
    }
}

/// Far-to-near overwrite: the last layer taller than `altitude_deg` wins.
pub fn composite_silhouette(
    heights: impl IntoIterator<Item = f32>,
    altitude_deg: f32,
) -> Option<usize> {
    let mut winner = None;
    for (layer, height) in heights.into_iter().enumerate() {
        if height > altitude_deg {
            winner = Some(layer);
        }
    }
    winner
}
