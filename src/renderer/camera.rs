//! Sky camera: view direction and field of view for a fixed observer

use std::f32::consts::{FRAC_PI_2, TAU};

/// Narrowest field of view (zoomed in)
pub const FOV_MIN: f32 = 20.0 * (std::f32::consts::PI / 180.0);
/// Widest field of view (zoomed out)
pub const FOV_MAX: f32 = 120.0 * (std::f32::consts::PI / 180.0);
/// Distance kept from the zenith and nadir so the view basis stays well defined
pub const ALTITUDE_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// Seconds without input before the sky starts to drift
pub const AUTO_ROTATE_DELAY: f32 = 8.0;
/// Idle azimuth drift (radians per second)
pub const AUTO_ROTATE_RATE: f32 = 0.01;

/// Camera looking out from the centre of the celestial sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Radians from north, increasing eastward, [0, 2π)
    pub azimuth: f32,
    /// Radians above the horizon
    pub altitude: f32,
    /// Vertical field of view in radians
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        // Facing south, a little above the rooftops
        Self {
            azimuth: std::f32::consts::PI,
            altitude: 20.0_f32.to_radians(),
            fov: 75.0_f32.to_radians(),
        }
    }
}

impl Camera {
    pub fn new(azimuth: f32, altitude: f32, fov: f32) -> Self {
        let mut camera = Self {
            azimuth,
            altitude,
            fov,
        };
        camera.normalize();
        camera
    }

    /// Re-apply the wrap and clamp rules after direct field writes.
    pub fn normalize(&mut self) {
        self.azimuth = wrap_azimuth(self.azimuth);
        self.altitude = self.altitude.clamp(-ALTITUDE_LIMIT, ALTITUDE_LIMIT);
        self.fov = self.fov.clamp(FOV_MIN, FOV_MAX);
    }

    /// Drag the sky by a pixel delta. One viewport height of drag moves the
    /// view by one field of view, so the sky tracks the pointer at any zoom.
    pub fn drag(&mut self, delta_x: f32, delta_y: f32, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let radians_per_pixel = self.fov / viewport_height;
        self.azimuth = wrap_azimuth(self.azimuth - delta_x * radians_per_pixel);
        self.altitude =
            (self.altitude + delta_y * radians_per_pixel).clamp(-ALTITUDE_LIMIT, ALTITUDE_LIMIT);
    }

    /// Scale the field of view (factor < 1 zooms in).
    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.fov = (self.fov * factor).clamp(FOV_MIN, FOV_MAX);
        }
    }

    /// Zoom from a scroll-wheel delta in points
    pub fn scroll(&mut self, delta: f32) {
        self.zoom((-delta * 0.002).exp());
    }

    pub fn rotate_azimuth(&mut self, radians: f32) {
        self.azimuth = wrap_azimuth(self.azimuth + radians);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Wrap into [0, 2π)
pub fn wrap_azimuth(azimuth: f32) -> f32 {
    let wrapped = azimuth.rem_euclid(TAU);
    if wrapped >= TAU || !wrapped.is_finite() {
        0.0
    } else {
        wrapped
    }
}

/// Idle auto-rotation policy
#[derive(Debug, Clone, Default)]
pub struct IdleRotation {
    idle_seconds: f32,
}

impl IdleRotation {
    /// Any user input restarts the idle timer.
    pub fn touch(&mut self) {
        self.idle_seconds = 0.0;
    }

    pub fn is_rotating(&self) -> bool {
        self.idle_seconds >= AUTO_ROTATE_DELAY
    }

    /// Advance by `dt` seconds, drifting the camera once idle long enough.
    /// Returns true when the camera moved.
    pub fn tick(&mut self, dt: f32, camera: &mut Camera) -> bool {
        self.idle_seconds += dt.max(0.0);
        if self.is_rotating() {
            camera.rotate_azimuth(AUTO_ROTATE_RATE * dt);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_new_clamps_and_wraps() {
        let cam = Camera::new(-0.5, 3.0, 4.0);
        assert_abs_diff_eq!(cam.azimuth, TAU - 0.5, epsilon = 1e-5);
        assert_eq!(cam.altitude, ALTITUDE_LIMIT);
        assert_eq!(cam.fov, FOV_MAX);

        let cam = Camera::new(7.0, -3.0, 0.01);
        assert_abs_diff_eq!(cam.azimuth, 7.0 - TAU, epsilon = 1e-5);
        assert_eq!(cam.altitude, -ALTITUDE_LIMIT);
        assert_eq!(cam.fov, FOV_MIN);
    }

    #[test]
    fn test_drag_scales_with_fov() {
        let mut wide = Camera::new(1.0, 0.0, FOV_MAX);
        let mut narrow = Camera::new(1.0, 0.0, FOV_MIN);
        wide.drag(-100.0, 0.0, 1000.0);
        narrow.drag(-100.0, 0.0, 1000.0);
        assert_abs_diff_eq!(wide.azimuth - 1.0, FOV_MAX * 0.1, epsilon = 1e-5);
        assert_abs_diff_eq!(narrow.azimuth - 1.0, FOV_MIN * 0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_drag_never_passes_the_zenith() {
        let mut cam = Camera::default();
        cam.drag(0.0, 1e6, 500.0);
        assert_eq!(cam.altitude, ALTITUDE_LIMIT);
        cam.drag(0.0, 0.0, 0.0);
        assert_eq!(cam.altitude, ALTITUDE_LIMIT);
    }

    #[test]
    fn test_zoom_limits() {
        let mut cam = Camera::default();
        for _ in 0..100 {
            cam.scroll(500.0);
        }
        assert_eq!(cam.fov, FOV_MIN);
        for _ in 0..100 {
            cam.scroll(-500.0);
        }
        assert_eq!(cam.fov, FOV_MAX);
        cam.zoom(f32::NAN);
        assert_eq!(cam.fov, FOV_MAX);
    }

    #[test]
    fn test_idle_rotation() {
        let mut cam = Camera::default();
        let start = cam.azimuth;
        let mut idle = IdleRotation::default();

        assert!(!idle.tick(AUTO_ROTATE_DELAY * 0.5, &mut cam));
        assert_eq!(cam.azimuth, start);

        assert!(idle.tick(AUTO_ROTATE_DELAY, &mut cam));
        assert!(cam.azimuth > start);

        idle.touch();
        let moved = cam.azimuth;
        assert!(!idle.tick(0.1, &mut cam));
        assert_eq!(cam.azimuth, moved);
    }

    #[test]
    fn test_wrap_azimuth() {
        assert_eq!(wrap_azimuth(0.0), 0.0);
        assert_eq!(wrap_azimuth(TAU), 0.0);
        assert_eq!(wrap_azimuth(f32::NAN), 0.0);
        assert!(wrap_azimuth(-1e-9) < TAU);
    }
}
