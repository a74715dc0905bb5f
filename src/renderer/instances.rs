//! Instance buffers for stars and constellation segments
//!
//! Both record types are drawn as one quad (6 vertices) per instance, with
//! the whole 16-byte record bound as a single `vec4<f32>` attribute.

use crate::astronomy::{equatorial_to_horizontal, Horizontal};
use crate::data::{ConstellationSegment, RecordSink, StarRecord, RECORD_SIZE};

use super::projection::{project_to_screen, ScreenPoint};
use super::shading::{line_fade, star_drawn, LINE_OPACITY};
use super::Camera;

/// Vertices per instanced quad
pub const QUAD_VERTICES: u32 = 6;

const RECORD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    offset: 0,
    shader_location: 0,
    format: wgpu::VertexFormat::Float32x4,
}];

impl StarRecord {
    /// (ra, dec, magnitude, B−V) at location 0
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StarRecord>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &RECORD_ATTRIBUTES,
        }
    }
}

impl ConstellationSegment {
    /// (ra1, dec1, ra2, dec2) at location 0
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ConstellationSegment>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &RECORD_ATTRIBUTES,
        }
    }
}

/// Byte size of a buffer holding `records` records. wgpu rejects zero-sized
/// vertex buffers, so an empty catalog still gets one record.
pub fn buffer_size(records: u32) -> wgpu::BufferAddress {
    records.max(1) as wgpu::BufferAddress * RECORD_SIZE as wgpu::BufferAddress
}

/// Streams whole star records straight into the instance buffer.
pub struct GpuRecordSink<'a> {
    queue: &'a wgpu::Queue,
    buffer: &'a wgpu::Buffer,
    loaded: &'a mut u32,
}

impl<'a> GpuRecordSink<'a> {
    pub fn new(queue: &'a wgpu::Queue, buffer: &'a wgpu::Buffer, loaded: &'a mut u32) -> Self {
        Self {
            queue,
            buffer,
            loaded,
        }
    }
}

impl RecordSink for GpuRecordSink<'_> {
    fn write_records(&mut self, byte_offset: u64, bytes: &[u8]) {
        let end = byte_offset + bytes.len() as u64;
        if end > self.buffer.size() {
            log::warn!(
                "Dropping star write at {}..{} beyond buffer size {}",
                byte_offset,
                end,
                self.buffer.size()
            );
            return;
        }
        self.queue.write_buffer(self.buffer, byte_offset, bytes);
        *self.loaded = (*self.loaded).max((end / RECORD_SIZE as u64) as u32);
    }
}

/// Where the star pass places a star with the given horizontal position, or
/// `None` when it is culled.
pub fn project_star_horizontal(
    position: Horizontal,
    magnitude: f32,
    max_magnitude: f32,
    camera: &Camera,
    aspect: f32,
) -> Option<ScreenPoint> {
    let altitude = position.altitude as f32;
    if !star_drawn(altitude, magnitude, max_magnitude) {
        return None;
    }
    let point = project_to_screen(position.azimuth as f32, altitude, camera, aspect);
    point.visible.then_some(point)
}

/// CPU counterpart of the star vertex stage.
pub fn project_star(
    star: &StarRecord,
    latitude: f64,
    lst: f64,
    max_magnitude: f32,
    camera: &Camera,
    aspect: f32,
) -> Option<ScreenPoint> {
    let position = equatorial_to_horizontal(star.ra as f64, star.dec as f64, latitude, lst);
    project_star_horizontal(position, star.magnitude, max_magnitude, camera, aspect)
}

/// Screen placement of a constellation segment and its line alpha, or `None`
/// when the line pass drops it.
///
/// Segments are never clipped: if either endpoint is at or below the horizon,
/// behind the camera or outside the frame margin, the whole segment goes.
pub fn project_segment_horizontal(
    start: Horizontal,
    end: Horizontal,
    camera: &Camera,
    aspect: f32,
) -> Option<(ScreenPoint, ScreenPoint, f32)> {
    let (start_alt, end_alt) = (start.altitude as f32, end.altitude as f32);
    if start_alt <= 0.0 || end_alt <= 0.0 {
        return None;
    }
    let a = project_to_screen(start.azimuth as f32, start_alt, camera, aspect);
    let b = project_to_screen(end.azimuth as f32, end_alt, camera, aspect);
    if !a.visible || !b.visible {
        return None;
    }
    let alpha = LINE_OPACITY * line_fade(start_alt.min(end_alt));
    Some((a, b, alpha))
}

/// CPU counterpart of the constellation line vertex stage.
pub fn project_segment(
    segment: &ConstellationSegment,
    latitude: f64,
    lst: f64,
    camera: &Camera,
    aspect: f32,
) -> Option<(ScreenPoint, ScreenPoint, f32)> {
    let start = equatorial_to_horizontal(segment.ra1 as f64, segment.dec1 as f64, latitude, lst);
    let end = equatorial_to_horizontal(segment.ra2 as f64, segment.dec2 as f64, latitude, lst);
    project_segment_horizontal(start, end, camera, aspect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::project_to_screen;
    use crate::renderer::shading::LINE_FADE_ALTITUDE;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn camera() -> Camera {
        Camera::new(0.0, FRAC_PI_4, FRAC_PI_2)
    }

    #[test]
    fn test_layouts_cover_record() {
        let star = StarRecord::desc();
        assert_eq!(star.array_stride, RECORD_SIZE as u64);
        assert_eq!(star.step_mode, wgpu::VertexStepMode::Instance);
        assert_eq!(star.attributes.len(), 1);
        assert_eq!(
            star.attributes[0].format.size(),
            RECORD_SIZE as u64
        );
        assert_eq!(ConstellationSegment::desc().array_stride, RECORD_SIZE as u64);
    }

    #[test]
    fn test_buffer_size_never_zero() {
        assert_eq!(buffer_size(0), 16);
        assert_eq!(buffer_size(60_000), 960_000);
    }

    #[test]
    fn test_horizon_cutoff() {
        let on_horizon = Horizontal {
            azimuth: 0.0,
            altitude: 0.0,
        };
        let above = Horizontal {
            azimuth: 0.0,
            altitude: 0.01,
        };
        assert!(project_star_horizontal(on_horizon, 1.0, 6.5, &camera(), 1.0).is_none());

        let point = project_star_horizontal(above, 1.0, 6.5, &camera(), 1.0).unwrap();
        assert!(point.visible);
        // Low in the frame, horizontally centred
        assert!(point.y > 0.5);
        assert!((point.x - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_faint_stars_culled() {
        let above = Horizontal {
            azimuth: 0.0,
            altitude: 0.5,
        };
        assert!(project_star_horizontal(above, 6.4, 6.5, &camera(), 1.0).is_some());
        assert!(project_star_horizontal(above, 6.6, 6.5, &camera(), 1.0).is_none());
    }

    #[test]
    fn test_project_star_on_meridian() {
        // On the meridian (ha = 0) with dec above the equator seen from the
        // equator: due north at altitude π/2 − dec
        let star = StarRecord {
            ra: 1.0,
            dec: 0.9,
            magnitude: 2.0,
            bv: 0.0,
        };
        let point = project_star(&star, 0.0, 1.0, 6.5, &camera(), 1.0).unwrap();
        assert!((point.x - 0.5).abs() < 1e-3);

        // Twelve hours later it is below the horizon
        let lst = 1.0 + std::f64::consts::PI;
        assert!(project_star(&star, 0.0, lst, 6.5, &camera(), 1.0).is_none());
    }

    fn horizontal(azimuth: f64, altitude: f64) -> Horizontal {
        Horizontal { azimuth, altitude }
    }

    fn low_camera() -> Camera {
        Camera::new(0.0, 0.3, FRAC_PI_2)
    }

    #[test]
    fn test_segment_touching_horizon_dropped() {
        let upper = horizontal(0.1, 0.4);
        assert!(project_segment_horizontal(horizontal(0.0, 0.0), upper, &low_camera(), 1.0).is_none());
        assert!(project_segment_horizontal(upper, horizontal(0.0, -0.05), &low_camera(), 1.0).is_none());
        assert!(project_segment_horizontal(horizontal(0.0, 0.01), upper, &low_camera(), 1.0).is_some());
    }

    #[test]
    fn test_segment_leaving_frame_dropped_whole() {
        let camera = low_camera();
        let inside = horizontal(0.0, 0.3);

        // First azimuth east of centre that falls past the frame margin
        let outside = (1..400)
            .map(|step| step as f32 * 0.005)
            .find(|&az| !project_to_screen(az, 0.3, &camera, 1.0).visible)
            .unwrap();
        let point = project_to_screen(outside, 0.3, &camera, 1.0);
        // Still in front of the camera, just beyond the margin
        assert!(point.x > 1.0);
        assert!(project_to_screen(outside - 0.005, 0.3, &camera, 1.0).visible);

        let end = horizontal(outside as f64, 0.3);
        assert!(project_segment_horizontal(inside, end, &camera, 1.0).is_none());
        assert!(project_segment_horizontal(end, inside, &camera, 1.0).is_none());
    }

    #[test]
    fn test_segment_behind_camera_dropped() {
        let camera = low_camera();
        let behind = horizontal(PI as f64, 0.3);
        assert!(!project_to_screen(PI, 0.3, &camera, 1.0).visible);
        assert!(project_segment_horizontal(horizontal(0.0, 0.3), behind, &camera, 1.0).is_none());
    }

    #[test]
    fn test_segment_in_view_fades_from_lower_end() {
        let camera = low_camera();
        let low = horizontal(0.0, (LINE_FADE_ALTITUDE * 0.5) as f64);
        let high = horizontal(0.1, 0.6);

        let (a, b, alpha) = project_segment_horizontal(low, high, &camera, 1.0).unwrap();
        assert!(a.visible && b.visible);
        // The lower endpoint sits lower on screen
        assert!(a.y > b.y);
        assert!((alpha - LINE_OPACITY * line_fade(LINE_FADE_ALTITUDE * 0.5)).abs() < 1e-6);
        assert!(alpha > 0.0 && alpha < LINE_OPACITY);

        // Endpoint order does not matter
        let (_, _, swapped) = project_segment_horizontal(high, low, &camera, 1.0).unwrap();
        assert_eq!(alpha, swapped);

        // Well clear of the fade band the line is fully opaque
        let (_, _, full) =
            project_segment_horizontal(horizontal(0.0, 0.3), high, &camera, 1.0).unwrap();
        assert!((full - LINE_OPACITY).abs() < 1e-6);
    }

    #[test]
    fn test_project_segment_follows_sky_rotation() {
        // Two points on the meridian seen from the equator, due north
        let segment = ConstellationSegment {
            ra1: 1.0,
            dec1: 1.2,
            ra2: 1.0,
            dec2: 1.0,
        };
        let camera = Camera::new(0.0, 0.45, FRAC_PI_2);
        assert!(project_segment(&segment, 0.0, 1.0, &camera, 1.0).is_some());
        // Twelve hours later both are below the horizon
        assert!(project_segment(&segment, 0.0, 1.0 + std::f64::consts::PI, &camera, 1.0).is_none());
    }
}
