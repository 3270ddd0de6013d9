//! Display enumeration through CoreGraphics.
//!
//! On macOS every active display is listed with its point bounds, the
//! physical size the OS reports and the full mode list, so the native mode
//! decides the physical resolution. Reading the OS is macOS-only; turning
//! the raw values into a [`DisplayDescriptor`] is not.

use super::geometry::{Rect, Size};
use super::source::{DisplayDescriptor, DisplayMode};

#[cfg(target_os = "macos")]
pub use macos::CoreGraphicsDisplaySource;

/// `kDisplayModeNativeFlag` from IOKit's IOGraphicsTypes.h
const DISPLAY_MODE_NATIVE_FLAG: u32 = 0x0200_0000;

/// Values read from one `CGDisplay`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) struct RawDisplay {
    pub id: u32,
    pub bounds: Rect,
    pub size_mm: Size,
    /// `(pixel_width, pixel_height, io_flags)` for every mode
    pub modes: Vec<(u64, u64, u32)>,
    /// `CGDisplayPixelsWide` / `CGDisplayPixelsHigh`
    pub pixels_wide: u64,
    pub pixels_high: u64,
    pub is_main: bool,
    pub is_builtin: bool,
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
impl RawDisplay {
    pub fn into_descriptor(self) -> DisplayDescriptor {
        DisplayDescriptor {
            id: self.id,
            bounds: self.bounds,
            size_mm: self.size_mm,
            modes: self
                .modes
                .iter()
                .map(|&(width, height, flags)| display_mode(width, height, flags))
                .collect(),
            fallback_px: Size::new(self.pixels_wide as f64, self.pixels_high as f64),
            is_main: self.is_main,
            is_builtin: self.is_builtin,
        }
    }
}

fn display_mode(pixel_width: u64, pixel_height: u64, io_flags: u32) -> DisplayMode {
    // Out-of-range sizes become 0, which the registry treats as unusable
    DisplayMode {
        pixel_width: u32::try_from(pixel_width).unwrap_or(0),
        pixel_height: u32::try_from(pixel_height).unwrap_or(0),
        native: io_flags & DISPLAY_MODE_NATIVE_FLAG != 0,
    }
}

#[cfg(target_os = "macos")]
mod macos {
    use core_graphics::display::{CGDisplay, CGDisplayMode};

    use super::RawDisplay;
    use crate::display::geometry::{Rect, Size};
    use crate::display::source::{DisplayDescriptor, DisplaySource, DisplaySourceError};

    /// Every active display as reported by CoreGraphics.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct CoreGraphicsDisplaySource;

    impl DisplaySource for CoreGraphicsDisplaySource {
        fn active_displays(&self) -> Result<Vec<DisplayDescriptor>, DisplaySourceError> {
            let ids = CGDisplay::active_displays().map_err(|e| {
                DisplaySourceError::QueryFailed(format!("CGGetActiveDisplayList returned {}", e))
            })?;
            Ok(ids
                .into_iter()
                .map(|id| read_display(CGDisplay::new(id)).into_descriptor())
                .collect())
        }
    }

    fn read_display(display: CGDisplay) -> RawDisplay {
        let bounds = display.bounds();
        let size_mm = display.screen_size();
        let modes = CGDisplayMode::all_display_modes(display.id, std::ptr::null())
            .unwrap_or_default()
            .iter()
            .map(|mode| (mode.pixel_width(), mode.pixel_height(), mode.io_flags()))
            .collect();

        RawDisplay {
            id: display.id,
            bounds: Rect::new(
                bounds.origin.x,
                bounds.origin.y,
                bounds.size.width,
                bounds.size.height,
            ),
            size_mm: Size::new(size_mm.width, size_mm.height),
            modes,
            pixels_wide: display.pixels_wide(),
            pixels_high: display.pixels_high(),
            is_main: display.is_main(),
            is_builtin: display.is_builtin(),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_active_displays_include_main() {
            let descriptors = CoreGraphicsDisplaySource.active_displays().unwrap();
            // Headless CI machines may report no display at all
            if !descriptors.is_empty() {
                assert_eq!(descriptors.iter().filter(|d| d.is_main).count(), 1);
            }
        }
    }
}
