//! Display snapshots and the registry that swaps them.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use super::geometry::{Point, Rect, Size};
use super::source::{DisplayDescriptor, DisplaySource, DisplaySourceError};

/// One active monitor, as of the snapshot it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Display {
    /// OS display identifier
    pub id: u32,
    /// Bounds in global point space
    pub bounds: Rect,
    /// Physical size in millimetres
    pub size_mm: Size,
    /// Physical resolution in pixels
    pub physical_px: Size,
    pub is_main: bool,
    pub is_builtin: bool,
}

impl Display {
    /// Build a display from an enumeration descriptor.
    ///
    /// The physical resolution comes from the native display mode when one
    /// is present with non-zero dimensions, otherwise from the generic pixel
    /// query.
    pub fn from_descriptor(descriptor: &DisplayDescriptor) -> Self {
        let physical_px = descriptor
            .modes
            .iter()
            .find(|mode| mode.native && mode.pixel_width > 0 && mode.pixel_height > 0)
            .map(|mode| Size::new(mode.pixel_width as f64, mode.pixel_height as f64))
            .unwrap_or(descriptor.fallback_px);

        Display {
            id: descriptor.id,
            bounds: descriptor.bounds,
            size_mm: descriptor.size_mm,
            physical_px,
            is_main: descriptor.is_main,
            is_builtin: descriptor.is_builtin,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        self.bounds.contains(point)
    }

    /// Translate a global point into this display's local coordinates.
    pub fn to_local(&self, point: Point) -> Point {
        self.bounds.to_local(point)
    }

    /// Local point scaled to `0..=1` on each axis.
    pub fn normalise(&self, local: Point) -> Option<Point> {
        if self.bounds.size.is_empty() {
            return None;
        }
        Some(Point::new(
            local.x / self.bounds.size.width,
            local.y / self.bounds.size.height,
        ))
    }
}

/// Returned when a point lies outside every known display.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("Couldn't find display for point x: {x}, y: {y}")]
pub struct DisplayNotFound {
    pub x: f64,
    pub y: f64,
}

/// Immutable, ordered set of displays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    displays: Vec<Display>,
}

impl DisplaySnapshot {
    pub fn new(displays: Vec<Display>) -> Self {
        DisplaySnapshot { displays }
    }

    pub fn from_descriptors(descriptors: &[DisplayDescriptor]) -> Self {
        Self::new(descriptors.iter().map(Display::from_descriptor).collect())
    }

    /// First display whose bounds contain `point`.
    pub fn resolve(&self, point: Point) -> Option<&Display> {
        self.displays.iter().find(|d| d.contains(point))
    }

    pub fn displays(&self) -> &[Display] {
        &self.displays
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }
}

/// Shared handle to the current [`DisplaySnapshot`].
///
/// Clones share the same underlying slot. Replacement swaps a fully built
/// snapshot in one write, so readers see either the old or the new set.
#[derive(Debug, Clone, Default)]
pub struct DisplayRegistry {
    current: Arc<RwLock<Arc<DisplaySnapshot>>>,
}

impl DisplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: DisplaySnapshot) -> Self {
        DisplayRegistry {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// The snapshot in effect right now.
    pub fn snapshot(&self) -> Arc<DisplaySnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Find the display containing `point`.
    pub fn resolve(&self, point: Point) -> Result<Display, DisplayNotFound> {
        self.snapshot()
            .resolve(point)
            .copied()
            .ok_or(DisplayNotFound {
                x: point.x,
                y: point.y,
            })
    }

    /// Install `snapshot`, discarding the previous one.
    pub fn replace(&self, snapshot: DisplaySnapshot) {
        *self.current.write() = Arc::new(snapshot);
    }

    /// Re-enumerate displays from `source` and install the result.
    ///
    /// An empty display list is installed as-is; later resolutions will fail.
    pub fn rebuild(&self, source: &dyn DisplaySource) -> Result<usize, DisplaySourceError> {
        let descriptors = source.active_displays()?;
        let snapshot = DisplaySnapshot::from_descriptors(&descriptors);
        let count = snapshot.len();

        if count == 0 {
            log::warn!("Display enumeration returned no displays");
        } else {
            for display in snapshot.displays() {
                log::debug!(
                    "Display {}: bounds {:?}, {}x{} px, {}x{} mm, main={}, builtin={}",
                    display.id,
                    display.bounds,
                    display.physical_px.width,
                    display.physical_px.height,
                    display.size_mm.width,
                    display.size_mm.height,
                    display.is_main,
                    display.is_builtin
                );
            }
        }

        self.replace(snapshot);
        Ok(count)
    }
}
