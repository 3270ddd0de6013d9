//! Input channels and their dense indices.
//!
//! A channel is one logical input source: a physical key or one of the
//! synthetic mouse/scroll/movement sources. Timing state is indexed by
//! [`Channel::index`], so the full set of channels is known at start-up.

use serde::Serialize;

/// Number of distinct key codes a [`KeyCode`] may take.
pub const KEY_CODE_COUNT: usize = 256;

/// Number of synthetic (non-keyboard) channels.
const SYNTHETIC_CHANNEL_COUNT: usize = 5;

/// Total number of channels, keys first.
pub const CHANNEL_COUNT: usize = KEY_CODE_COUNT + SYNTHETIC_CHANNEL_COUNT;

/// A physical key code in `0..KEY_CODE_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct KeyCode(u16);

impl KeyCode {
    /// Create a key code, or `None` if it falls outside the supported range.
    pub fn new(code: u16) -> Option<Self> {
        if (code as usize) < KEY_CODE_COUNT {
            Some(KeyCode(code))
        } else {
            None
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

/// Mouse buttons that map to click channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
    Other,
}

/// One logical input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "code")]
pub enum Channel {
    Key(KeyCode),
    LeftMouse,
    RightMouse,
    OtherMouse,
    ScrollWheel,
    MouseMove,
}

impl Channel {
    /// Dense index in `0..CHANNEL_COUNT`.
    pub fn index(self) -> usize {
        match self {
            Channel::Key(code) => code.0 as usize,
            Channel::LeftMouse => KEY_CODE_COUNT,
            Channel::RightMouse => KEY_CODE_COUNT + 1,
            Channel::OtherMouse => KEY_CODE_COUNT + 2,
            Channel::ScrollWheel => KEY_CODE_COUNT + 3,
            Channel::MouseMove => KEY_CODE_COUNT + 4,
        }
    }

    /// Whether this channel is a mouse button with a click point.
    pub fn is_click(self) -> bool {
        matches!(
            self,
            Channel::LeftMouse | Channel::RightMouse | Channel::OtherMouse
        )
    }
}

impl From<MouseButton> for Channel {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Channel::LeftMouse,
            MouseButton::Right => Channel::RightMouse,
            MouseButton::Other => Channel::OtherMouse,
        }
    }
}
