//! Motion metrics for a single movement step.
//!
//! Headings use `atan2(dx, dy)` (x first). With that convention, comparing a
//! step against a stroke's initial direction is a plain rotation by the
//! reference heading, and the deviation comes out continuous in `[0, π]`
//! without quadrant corrections.

use crate::display::units::{points_to_millimeters, points_to_pixels};
use crate::display::Display;

/// Steps shorter than this (in points) are timed but never batched.
pub const MIN_SAMPLE_DISTANCE_POINTS: f64 = 5.0;

/// Conversion factor from millimetres per millisecond to km/h.
const MM_PER_MS_TO_KPH: f64 = 3.6;

/// Distance, direction and speed of one movement step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub distance_points: f64,
    pub distance_px: f64,
    pub distance_mm: f64,
    /// `atan2(dx, dy)` of the raw delta
    pub raw_heading: f64,
    /// Deviation from the reference heading; 0 for a reference step
    pub deviation: f64,
    pub velocity_kph: f64,
}

impl Motion {
    /// Whether the step is long enough to be part of a stroke.
    pub fn qualifies(&self, min_distance_points: f64) -> bool {
        self.distance_points >= min_distance_points
    }
}

/// Measure a step of `(dx, dy)` points taken over `elapsed_ms` on `display`.
///
/// `reference` is the heading of the current stroke's first step, or `None`
/// if this step would start a stroke. Returns `None` when `elapsed_ms` is
/// zero, since no velocity can be derived.
pub fn measure(
    dx: f64,
    dy: f64,
    elapsed_ms: u64,
    display: &Display,
    reference: Option<f64>,
) -> Option<Motion> {
    if elapsed_ms == 0 {
        return None;
    }

    let distance_points = dx.hypot(dy).round();
    let distance_px = points_to_pixels(distance_points, display);
    let distance_mm = points_to_millimeters(distance_points, display);
    let raw_heading = dx.atan2(dy);
    let deviation = match reference {
        Some(reference) => deviation_from(dx, dy, reference),
        None => 0.0,
    };

    Some(Motion {
        distance_points,
        distance_px,
        distance_mm,
        raw_heading,
        deviation,
        velocity_kph: distance_mm / elapsed_ms as f64 * MM_PER_MS_TO_KPH,
    })
}

/// Absolute angle between `(dx, dy)` and the direction `reference`.
pub fn deviation_from(dx: f64, dy: f64, reference: f64) -> f64 {
    let (sin, cos) = reference.sin_cos();
    let rotated_dx = dx * cos - dy * sin;
    let rotated_dy = dx * sin + dy * cos;
    rotated_dx.atan2(rotated_dy).abs()
}

/// Eight-point compass label for a screen-space delta (y grows downwards).
pub fn compass(dx: f64, dy: f64) -> &'static str {
    const POINTS: [&str; 8] = ["E", "NE", "N", "NW", "W", "SW", "S", "SE"];
    let degrees = (-dy).atan2(dx).to_degrees().rem_euclid(360.0);
    POINTS[((degrees / 45.0).round() as usize) % 8]
}
