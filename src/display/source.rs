//! Display enumeration backends

use super::geometry::{Rect, Size};

/// Millimetres per inch.
const MM_PER_INCH: f64 = 25.4;

/// A display mode offered by the OS for one display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMode {
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Whether this mode maps one point to one physical pixel
    pub native: bool,
}

/// Raw per-display data as reported by a [`DisplaySource`].
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayDescriptor {
    pub id: u32,
    pub bounds: Rect,
    pub size_mm: Size,
    /// All modes the display supports, if the backend can list them
    pub modes: Vec<DisplayMode>,
    /// Result of the generic pixel width/height query
    pub fallback_px: Size,
    pub is_main: bool,
    pub is_builtin: bool,
}

/// Errors from enumerating displays.
#[derive(Debug, thiserror::Error)]
pub enum DisplaySourceError {
    #[error("failed to query the active display list: {0}")]
    QueryFailed(String),
}

/// Something that can list the currently active displays.
pub trait DisplaySource {
    fn active_displays(&self) -> Result<Vec<DisplayDescriptor>, DisplaySourceError>;
}

/// A fixed display list, typically declared in the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticDisplaySource {
    descriptors: Vec<DisplayDescriptor>,
}

impl StaticDisplaySource {
    pub fn new(descriptors: Vec<DisplayDescriptor>) -> Self {
        StaticDisplaySource { descriptors }
    }
}

impl DisplaySource for StaticDisplaySource {
    fn active_displays(&self) -> Result<Vec<DisplayDescriptor>, DisplaySourceError> {
        Ok(self.descriptors.clone())
    }
}

/// Main display as reported by rdev.
///
/// rdev exposes only the main display's size, with no mode list, so the
/// physical resolution always comes from the generic query and the
/// millimetre size is derived from an assumed pixel density.
#[derive(Debug, Clone, Copy)]
pub struct RdevDisplaySource {
    dpi: f64,
}

impl RdevDisplaySource {
    pub fn new(dpi: f64) -> Self {
        RdevDisplaySource { dpi }
    }
}

impl DisplaySource for RdevDisplaySource {
    fn active_displays(&self) -> Result<Vec<DisplayDescriptor>, DisplaySourceError> {
        let (width, height) = rdev::display_size()
            .map_err(|e| DisplaySourceError::QueryFailed(format!("{:?}", e)))?;
        Ok(vec![main_display_descriptor(
            width as f64,
            height as f64,
            self.dpi,
        )])
    }
}

fn main_display_descriptor(width: f64, height: f64, dpi: f64) -> DisplayDescriptor {
    let mm_per_px = if dpi > 0.0 { MM_PER_INCH / dpi } else { 0.0 };
    DisplayDescriptor {
        id: 0,
        bounds: Rect::new(0.0, 0.0, width, height),
        size_mm: Size::new(width * mm_per_px, height * mm_per_px),
        modes: Vec::new(),
        fallback_px: Size::new(width, height),
        is_main: true,
        is_builtin: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_source_returns_declared_displays() {
        let d = main_display_descriptor(1920.0, 1080.0, 96.0);
        let source = StaticDisplaySource::new(vec![d.clone()]);
        assert_eq!(source.active_displays().unwrap(), vec![d]);
    }

    #[test]
    fn test_main_display_descriptor_mm_from_dpi() {
        let d = main_display_descriptor(960.0, 480.0, 96.0);
        assert!((d.size_mm.width - 254.0).abs() < 1e-9);
        assert!((d.size_mm.height - 127.0).abs() < 1e-9);
        assert!(d.modes.is_empty());
        assert_eq!(d.fallback_px, Size::new(960.0, 480.0));
        assert!(d.is_main);
    }

    #[test]
    fn test_main_display_descriptor_zero_dpi() {
        let d = main_display_descriptor(960.0, 480.0, 0.0);
        assert_eq!(d.size_mm, Size::new(0.0, 0.0));
    }
}
