//! Glue between rdev's global input hook and the engine.
//!
//! rdev reports absolute pointer positions, named keys and no autorepeat
//! flag. [`RdevTranslator`] turns that into [`RawNotification`]s: movement
//! deltas come from consecutive positions, keys are interned into dense key
//! codes, and a press of a key that is already held counts as autorepeat
//! when it follows the previous press within [`KEY_REPEAT_WINDOW`].
//!
//! [`DisplayWatcher`] polls a display source on a background thread and
//! swaps the registry snapshot when the layout changes.

use rdev::{Button, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::channel::{KeyCode, MouseButton, KEY_CODE_COUNT};
use crate::dispatch::{NotificationKind, RawNotification};
use crate::display::{DisplayDescriptor, DisplayRegistry, DisplaySnapshot, DisplaySource, Point};

/// Longest gap between presses of a held key that still counts as autorepeat.
///
/// Covers the slowest initial repeat delay macOS and X11 offer. A held key
/// whose release was never delivered stops suppressing presses after this.
pub const KEY_REPEAT_WINDOW: Duration = Duration::from_secs(2);

/// Converts rdev events into engine notifications.
#[derive(Debug, Default)]
pub struct RdevTranslator {
    /// Keys in the order they were first seen; the index is the key code
    codes: Vec<Key>,
    /// Keys currently down, with the time of their latest press or repeat
    held: Vec<(Key, Instant)>,
    position: Option<Point>,
}

impl RdevTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known pointer location.
    pub fn position(&self) -> Option<Point> {
        self.position
    }

    /// Translate one rdev event. Returns `None` for events that carry
    /// nothing the engine can use.
    pub fn translate(&mut self, event: &Event) -> Option<RawNotification> {
        self.translate_at(event, Instant::now())
    }

    /// [`translate`](Self::translate) with an explicit monotonic timestamp.
    pub fn translate_at(&mut self, event: &Event, at: Instant) -> Option<RawNotification> {
        let kind = match event.event_type {
            EventType::KeyPress(key) => {
                let code = self.key_code(key)?;
                let autorepeat = self.press(key, at);
                NotificationKind::KeyDown { code, autorepeat }
            }
            EventType::KeyRelease(key) => {
                self.held.retain(|(k, _)| *k != key);
                NotificationKind::KeyUp {
                    code: self.key_code(key)?,
                }
            }
            EventType::ButtonPress(button) => NotificationKind::ButtonDown(mouse_button(button)),
            EventType::ButtonRelease(button) => {
                NotificationKind::ButtonUp(mouse_button(button))
            }
            EventType::MouseMove { x, y } => {
                let current = Point::new(x, y);
                let (delta_x, delta_y) = match self.position {
                    Some(previous) => (
                        (current.x - previous.x).round(),
                        (current.y - previous.y).round(),
                    ),
                    None => (0.0, 0.0),
                };
                self.position = Some(current);
                NotificationKind::MouseMoved { delta_x, delta_y }
            }
            EventType::Wheel { delta_x, delta_y } => NotificationKind::Scroll { delta_x, delta_y },
        };

        Some(RawNotification {
            kind,
            location: self.position.unwrap_or_default(),
            pid: None,
            at,
            wall: event.time,
        })
    }

    /// Record a press and report whether it is an autorepeat.
    fn press(&mut self, key: Key, at: Instant) -> bool {
        match self.held.iter_mut().find(|(k, _)| *k == key) {
            Some((_, last)) => {
                let repeat = at.saturating_duration_since(*last) <= KEY_REPEAT_WINDOW;
                if !repeat {
                    log::debug!("Release of {:?} was never seen; treating press as new", key);
                }
                *last = at;
                repeat
            }
            None => {
                self.held.push((key, at));
                false
            }
        }
    }

    fn key_code(&mut self, key: Key) -> Option<KeyCode> {
        let index = match self.codes.iter().position(|k| *k == key) {
            Some(index) => index,
            None => {
                if self.codes.len() >= KEY_CODE_COUNT {
                    log::warn!("Key code table full; ignoring {:?}", key);
                    return None;
                }
                self.codes.push(key);
                self.codes.len() - 1
            }
        };
        KeyCode::new(index as u16)
    }
}

fn mouse_button(button: Button) -> MouseButton {
    match button {
        Button::Left => MouseButton::Left,
        Button::Right => MouseButton::Right,
        Button::Middle | Button::Unknown(_) => MouseButton::Other,
    }
}

/// Polls a display source and rebuilds the registry on change.
pub struct DisplayWatcher {
    stop_flag: Arc<AtomicBool>,
    watcher_thread: Option<JoinHandle<()>>,
}

impl DisplayWatcher {
    /// Start watching. `initial` is the descriptor list the registry was
    /// last built from.
    pub fn spawn(
        source: Box<dyn DisplaySource + Send>,
        registry: DisplayRegistry,
        initial: Vec<DisplayDescriptor>,
        interval: Duration,
    ) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop = stop_flag.clone();

        let handle = thread::spawn(move || {
            let mut last = initial;
            while !stop.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                last = poll_once(source.as_ref(), &registry, last);
            }
        });

        DisplayWatcher {
            stop_flag,
            watcher_thread: Some(handle),
        }
    }

    /// Stop the watcher thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.watcher_thread.take() {
            if handle.join().is_err() {
                log::warn!("Display watcher thread panicked");
            }
        }
    }
}

impl Drop for DisplayWatcher {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

/// Query `source` once and swap the registry snapshot if the layout changed.
///
/// Query failures keep the current snapshot.
pub fn poll_once(
    source: &dyn DisplaySource,
    registry: &DisplayRegistry,
    last: Vec<DisplayDescriptor>,
) -> Vec<DisplayDescriptor> {
    match source.active_displays() {
        Ok(descriptors) if descriptors != last => {
            log::info!(
                "Display configuration changed ({} -> {} display(s))",
                last.len(),
                descriptors.len()
            );
            registry.replace(DisplaySnapshot::from_descriptors(&descriptors));
            if descriptors.is_empty() {
                log::warn!("Display enumeration returned no displays");
            }
            descriptors
        }
        Ok(_) => last,
        Err(e) => {
            log::warn!("Failed to poll displays: {}", e);
            last
        }
    }
}
