//! Display geometry: the registry of active monitors, point resolution,
//! and point-space unit conversion.
//!
//! # Structure
//!
//! - [`geometry`] - Points, sizes and rectangles in point space
//! - [`coregraphics`] - Display enumeration through CoreGraphics
//! - [`registry`] - Immutable display snapshots and the swappable registry
//! - [`source`] - Display enumeration backends
//! - [`units`] - Point to pixel / millimetre conversion

mod coregraphics;
mod geometry;
mod registry;
mod source;
pub mod units;

#[cfg(target_os = "macos")]
pub use coregraphics::CoreGraphicsDisplaySource;
pub use geometry::{Point, Rect, Size};
pub use registry::{Display, DisplayNotFound, DisplayRegistry, DisplaySnapshot};
pub use source::{
    DisplayDescriptor, DisplayMode, DisplaySource, DisplaySourceError, RdevDisplaySource,
    StaticDisplaySource,
};
