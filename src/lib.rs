//! tapmeter library crate.
//!
//! Turns a raw stream of global input notifications into per-action records
//! (dwell, drag, scroll) and batched mouse-move strokes measured in physical
//! units. The binary wires this up to rdev; everything here is usable and
//! testable without a live input hook.

pub mod batch;
pub mod channel;
pub mod config;
pub mod delegate;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod events;
pub mod listener;
pub mod motion;
pub mod process;
pub mod timing;

pub use batch::{BatchAggregator, BatchPolicy, FlushReason, Stroke};
pub use channel::{Channel, KeyCode, MouseButton};
pub use delegate::{Delegate, JsonLinesDelegate};
pub use dispatch::{Engine, NotificationKind, RawNotification};
pub use error::{exit_code, FatalError, TapDisabledCause};
pub use events::{ActionEvent, ActionKind, MotionSample, ProcessIdentity};
