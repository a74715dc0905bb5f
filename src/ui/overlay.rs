//! Text overlay drawn over the sky: compass labels on the horizon, a status
//! line, and the message shown when the session cannot start

use egui::{Align2, Color32, FontId, Painter, Rect};

use crate::astronomy::direction_name;
use crate::data::LoadProgress;
use crate::renderer::{project_to_screen, Camera};

/// Labels sit slightly above the true horizon so the skyline doesn't hide them
const LABEL_ALTITUDE: f32 = 0.02;

/// Azimuth step between compass labels (16 sectors)
const LABEL_STEP: f32 = std::f32::consts::TAU / 16.0;

const LABEL_COLOR: Color32 = Color32::from_rgb(170, 180, 205);
const STATUS_COLOR: Color32 = Color32::from_rgb(150, 150, 150);

/// A compass label and its position in screen fractions
#[derive(Debug, Clone, PartialEq)]
pub struct CompassLabel {
    pub text: &'static str,
    pub x: f32,
    pub y: f32,
}

/// Visible compass labels for the current camera.
pub fn compass_labels(camera: &Camera, aspect: f32) -> Vec<CompassLabel> {
    (0..16)
        .filter_map(|sector| {
            let azimuth = sector as f32 * LABEL_STEP;
            let point = project_to_screen(azimuth, LABEL_ALTITUDE, camera, aspect);
            point.visible.then(|| CompassLabel {
                text: direction_name(azimuth as f64),
                x: point.x,
                y: point.y,
            })
        })
        .collect()
}

pub fn draw_compass(painter: &Painter, rect: Rect, camera: &Camera) {
    let aspect = rect.width() / rect.height().max(1.0);
    for label in compass_labels(camera, aspect) {
        let pos = rect.min + egui::vec2(label.x * rect.width(), label.y * rect.height());
        let size = if label.text.len() == 1 { 14.0 } else { 11.0 };
        painter.text(
            pos,
            Align2::CENTER_BOTTOM,
            label.text,
            FontId::proportional(size),
            LABEL_COLOR,
        );
    }
}

/// Everything the status line reports
#[derive(Debug, Clone, Copy)]
pub struct StatusInfo {
    pub camera: Camera,
    /// Local sidereal time in radians
    pub lst: f64,
    pub progress: Option<LoadProgress>,
    pub stars: u32,
    pub segments: u32,
}

fn format_hours(radians: f64) -> String {
    let hours = radians.rem_euclid(std::f64::consts::TAU) / std::f64::consts::TAU * 24.0;
    let total_minutes = (hours * 60.0).floor() as u32;
    format!("{:02}h{:02}m", (total_minutes / 60) % 24, total_minutes % 60)
}

pub fn status_text(info: &StatusInfo) -> String {
    let camera = &info.camera;
    let mut text = format!(
        "{} az {:.1}° alt {:.1}° | fov {:.0}° | LST {} | {} stars, {} lines",
        direction_name(camera.azimuth as f64),
        camera.azimuth.to_degrees(),
        camera.altitude.to_degrees(),
        camera.fov.to_degrees(),
        format_hours(info.lst),
        info.stars,
        info.segments,
    );
    if let Some(progress) = info.progress {
        if progress.percent < 100 {
            text.push_str(&format!(" | loading {}%", progress.percent));
        }
    }
    text
}

pub fn draw_status(painter: &Painter, rect: Rect, info: &StatusInfo) {
    painter.text(
        rect.left_bottom() + egui::vec2(10.0, -10.0),
        Align2::LEFT_BOTTOM,
        status_text(info),
        FontId::monospace(12.0),
        STATUS_COLOR,
    );
}

/// Centered message for the fatal error state
pub fn draw_error(painter: &Painter, rect: Rect, message: &str) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(5, 5, 12));
    painter.text(
        rect.center(),
        Align2::CENTER_CENTER,
        message,
        FontId::proportional(16.0),
        Color32::from_rgb(220, 140, 140),
    );
}
