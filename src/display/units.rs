//! Point-space distance conversion.
//!
//! Both conversions scale by the width axis only. Displays are treated as
//! having the same point/pixel and point/millimetre ratio on both axes.

use super::registry::Display;

/// Convert a point-space distance to physical pixels on `display`.
pub fn points_to_pixels(points: f64, display: &Display) -> f64 {
    scale(points, display.physical_px.width, display.bounds.size.width)
}

/// Convert a point-space distance to millimetres on `display`.
pub fn points_to_millimeters(points: f64, display: &Display) -> f64 {
    scale(points, display.size_mm.width, display.bounds.size.width)
}

fn scale(points: f64, target_width: f64, points_width: f64) -> f64 {
    if points_width <= 0.0 {
        return 0.0;
    }
    points * target_width / points_width
}
