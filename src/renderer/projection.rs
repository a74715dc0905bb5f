//! Sky-dome projection
//!
//! The observer sits at the centre of a unit celestial sphere. World axes:
//! x = east, y = up (zenith), z = north. Wide fields of view pull the camera
//! back along its view axis (the "dolly"), which widens the frame edges like a
//! fisheye while keeping the centre of view fixed. The same math runs in WGSL
//! (`shaders::SKY_COMMON`); keep the two in sync.

use glam::{Vec2, Vec3};

use super::camera::Camera;

/// Below this field of view the camera stays at the sphere centre
pub const DOLLY_FOV_START: f32 = 60.0 * (std::f32::consts::PI / 180.0);
/// Field of view at which the dolly reaches its maximum
pub const DOLLY_FOV_END: f32 = 120.0 * (std::f32::consts::PI / 180.0);
/// Maximum pull-back distance (unit-sphere radii)
pub const DOLLY_MAX_OFFSET: f32 = 0.6;

/// Out-of-frame tolerance as a fraction of the screen
pub const DEFAULT_MARGIN: f32 = 0.1;

/// Unit direction for horizontal coordinates (radians).
pub fn direction_from_horizontal(azimuth: f32, altitude: f32) -> Vec3 {
    let (sin_az, cos_az) = azimuth.sin_cos();
    let (sin_alt, cos_alt) = altitude.sin_cos();
    Vec3::new(cos_alt * sin_az, sin_alt, cos_alt * cos_az)
}

/// Horizontal coordinates (azimuth in [0, 2π), altitude) of a direction.
pub fn horizontal_from_direction(dir: Vec3) -> (f32, f32) {
    let dir = dir.normalize_or_zero();
    let mut azimuth = dir.x.atan2(dir.z).rem_euclid(std::f32::consts::TAU);
    if azimuth >= std::f32::consts::TAU {
        azimuth = 0.0;
    }
    let altitude = dir.y.clamp(-1.0, 1.0).asin();
    (azimuth, altitude)
}

/// Camera pull-back for a field of view: zero up to `DOLLY_FOV_START`, then
/// linear up to `DOLLY_MAX_OFFSET` at `DOLLY_FOV_END`.
pub fn dolly_offset(fov: f32) -> f32 {
    let t = ((fov - DOLLY_FOV_START) / (DOLLY_FOV_END - DOLLY_FOV_START)).clamp(0.0, 1.0);
    t * DOLLY_MAX_OFFSET
}

/// Orthonormal view basis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub view: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl CameraBasis {
    pub fn from_angles(azimuth: f32, altitude: f32) -> Self {
        let view = direction_from_horizontal(azimuth, altitude);
        let cross = Vec3::Y.cross(view);
        let right = if cross.length_squared() < 1e-12 {
            // Straight up or down: keep the horizontal right vector of the azimuth
            Vec3::new(azimuth.cos(), 0.0, -azimuth.sin())
        } else {
            cross.normalize()
        };
        let up = view.cross(right);
        Self { view, right, up }
    }
}

/// Result of projecting a sky position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    /// Screen fraction, 0 = left edge, 1 = right edge
    pub x: f32,
    /// Screen fraction, 0 = top edge, 1 = bottom edge
    pub y: f32,
    pub visible: bool,
}

impl ScreenPoint {
    const HIDDEN: Self = Self {
        x: -1.0,
        y: -1.0,
        visible: false,
    };

    /// Pixel position inside a rectangle of the given size.
    pub fn to_pixels(self, width: f32, height: f32) -> Vec2 {
        Vec2::new(self.x * width, self.y * height)
    }
}

/// Everything needed to go between directions and normalized device coordinates
#[derive(Debug, Clone, Copy)]
pub struct SkyView {
    pub basis: CameraBasis,
    /// Camera position inside the unit sphere
    pub position: Vec3,
    pub tan_half_fov: f32,
    pub aspect: f32,
}

impl SkyView {
    pub fn new(camera: &Camera, aspect: f32) -> Self {
        let basis = CameraBasis::from_angles(camera.azimuth, camera.altitude);
        let offset = dolly_offset(camera.fov);
        Self {
            basis,
            position: -basis.view * offset,
            tan_half_fov: (camera.fov * 0.5).tan(),
            aspect: if aspect > 0.0 { aspect } else { 1.0 },
        }
    }

    pub fn dolly(&self) -> f32 {
        -self.position.dot(self.basis.view)
    }

    /// NDC (x right, y up) of a unit direction, or `None` when it lies behind
    /// the camera.
    pub fn ndc_from_direction(&self, dir: Vec3) -> Option<Vec2> {
        if self.basis.view.dot(dir) <= 0.0 {
            return None;
        }
        let d = dir - self.position;
        let depth = d.dot(self.basis.view);
        if depth <= f32::EPSILON {
            return None;
        }
        let x = d.dot(self.basis.right) / depth / (self.tan_half_fov * self.aspect);
        let y = d.dot(self.basis.up) / depth / self.tan_half_fov;
        Some(Vec2::new(x, y))
    }

    /// World-space ray direction through an NDC position.
    pub fn ray_direction(&self, ndc: Vec2) -> Vec3 {
        (self.basis.view
            + self.basis.right * (ndc.x * self.tan_half_fov * self.aspect)
            + self.basis.up * (ndc.y * self.tan_half_fov))
            .normalize()
    }

    /// Point on the unit sphere seen through an NDC position.
    ///
    /// The camera is always inside the sphere, so the positive root of the
    /// ray/sphere quadratic exists.
    pub fn sphere_point(&self, ndc: Vec2) -> Vec3 {
        let ray = self.ray_direction(ndc);
        let b = self.position.dot(ray);
        let c = self.position.length_squared() - 1.0;
        let discriminant = (b * b - c).max(0.0);
        let s = -b + discriminant.sqrt();
        (self.position + ray * s).normalize()
    }

    /// Horizontal coordinates (azimuth, altitude) seen through an NDC position.
    pub fn unproject(&self, ndc: Vec2) -> (f32, f32) {
        horizontal_from_direction(self.sphere_point(ndc))
    }
}

/// Project horizontal coordinates to screen fractions with the default margin.
pub fn project_to_screen(azimuth: f32, altitude: f32, camera: &Camera, aspect: f32) -> ScreenPoint {
    project_to_screen_with_margin(azimuth, altitude, camera, aspect, DEFAULT_MARGIN)
}

/// Project horizontal coordinates to screen fractions.
///
/// `visible` is false behind the camera, and when the point falls more than
/// `margin` (fraction of the screen) outside the frame.
pub fn project_to_screen_with_margin(
    azimuth: f32,
    altitude: f32,
    camera: &Camera,
    aspect: f32,
    margin: f32,
) -> ScreenPoint {
    let view = SkyView::new(camera, aspect);
    let dir = direction_from_horizontal(azimuth, altitude);

    let Some(ndc) = view.ndc_from_direction(dir) else {
        return ScreenPoint::HIDDEN;
    };

    let x = (ndc.x + 1.0) * 0.5;
    let y = (1.0 - ndc.y) * 0.5;
    let range = -margin..=1.0 + margin;
    ScreenPoint {
        x,
        y,
        visible: range.contains(&x) && range.contains(&y),
    }
}
