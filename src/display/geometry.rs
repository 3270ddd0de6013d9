//! Point-space geometry primitives

use serde::{Deserialize, Serialize};

/// A point in the OS's logical (point) coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// A width/height pair. Units depend on context (points, millimetres, pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// An origin plus a size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Containment test, inclusive on all four edges.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.origin.x + self.size.width
            && point.y >= self.origin.y
            && point.y <= self.origin.y + self.size.height
    }

    /// Translate a global point into this rectangle's local coordinates.
    pub fn to_local(&self, point: Point) -> Point {
        Point::new(point.x - self.origin.x, point.y - self.origin.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_edge_inclusive() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert!(rect.contains(Point::new(0.0, 0.0)));
        assert!(rect.contains(Point::new(100.0, 50.0)));
        assert!(rect.contains(Point::new(100.0, 0.0)));
        assert!(!rect.contains(Point::new(100.01, 10.0)));
        assert!(!rect.contains(Point::new(-0.5, 10.0)));
        assert!(!rect.contains(Point::new(10.0, 50.5)));
    }

    #[test]
    fn test_negative_origin() {
        // Secondary display to the left of the main one
        let rect = Rect::new(-1920.0, 0.0, 1920.0, 1080.0);
        assert!(rect.contains(Point::new(-1.0, 500.0)));
        assert_eq!(
            rect.to_local(Point::new(-1920.0, 20.0)),
            Point::new(0.0, 20.0)
        );
    }

    #[test]
    fn test_size_is_empty() {
        assert!(Size::new(0.0, 10.0).is_empty());
        assert!(!Size::new(1.0, 1.0).is_empty());
    }
}
