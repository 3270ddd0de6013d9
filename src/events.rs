//! Records emitted to the delegate.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::channel::Channel;
use crate::display::Point;

/// Identity of the process that received an input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessIdentity {
    pub pid: Option<i32>,
    pub name: Option<String>,
    pub path: Option<String>,
}

impl ProcessIdentity {
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// One qualifying step of mouse movement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionSample {
    pub distance_points: f64,
    pub distance_px: f64,
    pub distance_mm: f64,
    /// Deviation from the stroke's initial direction, in `[0, π]` radians
    pub heading: f64,
    pub velocity_kph: f64,
    pub is_builtin_display: bool,
    pub is_main_display: bool,
    pub process: ProcessIdentity,
}

/// What kind of discrete input an [`ActionEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Key,
    Click,
    Scroll,
}

/// Movement of the pointer between a button press and its release.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DragMetrics {
    pub distance_points: f64,
    pub distance_px: f64,
    pub distance_mm: f64,
    /// `atan2(dy, dx)` of the drag, `None` when the pointer did not move
    pub angle: Option<f64>,
    pub velocity_kph: Option<f64>,
}

/// One scroll-wheel tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollMetrics {
    pub delta_x: i64,
    pub delta_y: i64,
    pub distance_mm: f64,
    /// `atan2(dy, dx)` of the scroll, `None` for a zero delta
    pub angle: Option<f64>,
    /// Speed since the previous tick, `None` for the first tick
    pub velocity_kph: Option<f64>,
}

/// A completed discrete input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionEvent {
    pub channel: Channel,
    pub kind: ActionKind,
    /// Time between the channel's last actuation and this event
    #[serde(rename = "dwell_ms", serialize_with = "serialize_millis")]
    pub dwell: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drag: Option<DragMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll: Option<ScrollMetrics>,
    /// Release point scaled to `0..=1` within its display (clicks only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalised_point: Option<Point>,
    pub is_builtin_display: bool,
    pub is_main_display: bool,
    pub process: ProcessIdentity,
    pub keyboard_layout: Option<String>,
}

fn serialize_millis<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => s.serialize_some(&(d.as_millis() as u64)),
        None => s.serialize_none(),
    }
}
