//! The per-notification entry point.
//!
//! [`Engine::handle`] is called once for every raw input notification, in
//! order, on a single thread. It never blocks: display resolution, metric
//! computation and batch bookkeeping are all in-memory operations, and
//! records go straight to the [`Delegate`].

use std::time::{Duration, Instant, SystemTime};

use crate::batch::{BatchAggregator, BatchPolicy, FlushReason, SampleStamp, Stroke};
use crate::channel::{Channel, KeyCode, MouseButton};
use crate::delegate::Delegate;
use crate::display::units::{points_to_millimeters, points_to_pixels};
use crate::display::{Display, DisplayRegistry, DisplaySource, Point};
use crate::error::{FatalError, TapDisabledCause};
use crate::events::{ActionEvent, ActionKind, DragMetrics, ProcessIdentity, ScrollMetrics};
use crate::motion;
use crate::process::{FixedLayout, KeyboardLayoutSource, ProcessLookup, SystemProcessLookup};
use crate::timing::ActuationTimingStore;

const MM_PER_MS_TO_KPH: f64 = 3.6;

/// How long a process lookup is reused for the same pid.
pub const PROCESS_CACHE_TTL: Duration = Duration::from_secs(1);

/// What a raw notification reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotificationKind {
    KeyDown { code: KeyCode, autorepeat: bool },
    KeyUp { code: KeyCode },
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
    /// One scroll-wheel tick, in points per axis
    Scroll { delta_x: i64, delta_y: i64 },
    /// Pointer movement since the previous movement notification, in points
    MouseMoved { delta_x: f64, delta_y: f64 },
    /// The OS stopped delivering input to us
    TapDisabled(TapDisabledCause),
}

/// One input notification from the OS collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNotification {
    pub kind: NotificationKind,
    /// Pointer location in global point space
    pub location: Point,
    /// Process the input was delivered to, if known
    pub pid: Option<i32>,
    /// Monotonic time of the notification
    pub at: Instant,
    /// Wall-clock time of the notification
    pub wall: SystemTime,
}

impl RawNotification {
    /// A notification stamped with the current time.
    pub fn now(kind: NotificationKind, location: Point) -> Self {
        RawNotification {
            kind,
            location,
            pid: None,
            at: Instant::now(),
            wall: SystemTime::now(),
        }
    }

    pub fn with_pid(mut self, pid: i32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_time(mut self, at: Instant, wall: SystemTime) -> Self {
        self.at = at;
        self.wall = wall;
        self
    }
}

/// Classifies notifications, keeps timing state and drives batching.
///
/// Process identity is looked up per notification pid and cached for
/// [`PROCESS_CACHE_TTL`], so a pid reused by the OS inside that window can
/// report the previous owner. Notifications without a pid (everything the
/// rdev front end produces) carry an unknown process.
pub struct Engine<D: Delegate> {
    displays: DisplayRegistry,
    timing: ActuationTimingStore,
    batches: BatchAggregator,
    delegate: D,
    processes: Box<dyn ProcessLookup + Send>,
    layouts: Box<dyn KeyboardLayoutSource + Send>,
    last_process: Option<(ProcessIdentity, Instant)>,
}

impl<D: Delegate> Engine<D> {
    pub fn new(displays: DisplayRegistry, delegate: D) -> Self {
        Engine {
            displays,
            timing: ActuationTimingStore::new(),
            batches: BatchAggregator::default(),
            delegate,
            processes: Box::new(SystemProcessLookup),
            layouts: Box::new(FixedLayout::default()),
            last_process: None,
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.batches = BatchAggregator::new(policy);
        self
    }

    pub fn with_process_lookup(mut self, lookup: impl ProcessLookup + Send + 'static) -> Self {
        self.processes = Box::new(lookup);
        self
    }

    pub fn with_keyboard_layout(
        mut self,
        layouts: impl KeyboardLayoutSource + Send + 'static,
    ) -> Self {
        self.layouts = Box::new(layouts);
        self
    }

    pub fn displays(&self) -> &DisplayRegistry {
        &self.displays
    }

    pub fn timing(&self) -> &ActuationTimingStore {
        &self.timing
    }

    pub fn batches(&self) -> &BatchAggregator {
        &self.batches
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    pub fn into_delegate(self) -> D {
        self.delegate
    }

    /// Re-enumerate displays after a configuration change.
    pub fn refresh_displays(&self, source: &dyn DisplaySource) -> Result<usize, FatalError> {
        Ok(self.displays.rebuild(source)?)
    }

    /// Process one notification.
    ///
    /// Errors are fatal: the caller is expected to log them and exit with
    /// [`FatalError::exit_code`].
    pub fn handle(&mut self, notification: RawNotification) -> Result<(), FatalError> {
        let started = Instant::now();

        match notification.kind {
            NotificationKind::TapDisabled(cause) => return Err(FatalError::tap_disabled(cause)),
            NotificationKind::KeyDown {
                autorepeat: true, ..
            } => return Ok(()),
            _ => {}
        }

        let display = self.displays.resolve(notification.location)?;
        let process = self.process(notification.pid, notification.at);

        match notification.kind {
            NotificationKind::MouseMoved { delta_x, delta_y } => {
                self.handle_move(delta_x, delta_y, &notification, &display, process);
            }
            kind => {
                self.flush(FlushReason::FocusChange);
                self.handle_discrete(kind, &notification, &display, process);
            }
        }

        log::trace!(
            "Handled {:?} in {}us",
            notification.kind,
            started.elapsed().as_micros()
        );
        Ok(())
    }

    /// Hand the open stroke, if any, to the delegate.
    ///
    /// Returns whether a stroke was emitted.
    pub fn flush(&mut self, reason: FlushReason) -> bool {
        match self.batches.flush(reason) {
            Some(stroke) => {
                self.emit_stroke(stroke);
                true
            }
            None => false,
        }
    }

    fn handle_move(
        &mut self,
        delta_x: f64,
        delta_y: f64,
        notification: &RawNotification,
        display: &Display,
        process: ProcessIdentity,
    ) {
        let elapsed = self.timing.since_last(Channel::MouseMove, notification.at);
        self.timing.actuate(Channel::MouseMove, notification.at);

        let Some(elapsed) = elapsed else {
            log::debug!("First mouse move; skipping");
            return;
        };
        let elapsed_ms = elapsed.as_millis() as u64;

        let Some(motion) = motion::measure(
            delta_x,
            delta_y,
            elapsed_ms,
            display,
            self.batches.reference_heading(),
        ) else {
            return;
        };

        log::trace!(
            "Mouse move {} {}pt raw: {:.3} diff: {:.3} {:.2}km/h",
            motion::compass(delta_x, delta_y),
            motion.distance_points,
            motion.raw_heading,
            motion.deviation,
            motion.velocity_kph
        );

        let stamp = SampleStamp {
            is_builtin_display: display.is_builtin,
            is_main_display: display.is_main,
            process,
        };
        // Velocity uses whole milliseconds; the pause check sees the full gap
        if let Some(stroke) = self.batches.offer(
            &motion,
            elapsed,
            notification.wall,
            stamp,
        ) {
            self.emit_stroke(stroke);
        }
    }

    fn handle_discrete(
        &mut self,
        kind: NotificationKind,
        notification: &RawNotification,
        display: &Display,
        process: ProcessIdentity,
    ) {
        let at = notification.at;
        match kind {
            NotificationKind::KeyDown { code, .. } => {
                self.timing.actuate(Channel::Key(code), at);
            }
            NotificationKind::ButtonDown(button) => {
                let channel = Channel::from(button);
                self.timing.actuate(channel, at);
                self.timing
                    .set_click_point(channel, display.to_local(notification.location));
            }
            NotificationKind::KeyUp { code } => {
                let channel = Channel::Key(code);
                let event = self.action(channel, ActionKind::Key, at, display, process);
                self.delegate.on_action(&event);
            }
            NotificationKind::ButtonUp(button) => {
                let channel = Channel::from(button);
                let release = display.to_local(notification.location);
                let mut event = self.action(channel, ActionKind::Click, at, display, process);
                event.drag = self
                    .timing
                    .record(channel)
                    .last_click_point
                    .map(|press| drag_metrics(press, release, event.dwell, display));
                event.normalised_point = display.normalise(release);
                self.delegate.on_action(&event);
            }
            NotificationKind::Scroll { delta_x, delta_y } => {
                let channel = Channel::ScrollWheel;
                let mut event = self.action(channel, ActionKind::Scroll, at, display, process);
                event.scroll = Some(scroll_metrics(delta_x, delta_y, event.dwell, display));
                self.timing.actuate(channel, at);
                self.delegate.on_action(&event);
            }
            NotificationKind::MouseMoved { .. } | NotificationKind::TapDisabled(_) => {}
        }
    }

    fn action(
        &self,
        channel: Channel,
        kind: ActionKind,
        at: Instant,
        display: &Display,
        process: ProcessIdentity,
    ) -> ActionEvent {
        ActionEvent {
            channel,
            kind,
            dwell: self.timing.since_last(channel, at),
            drag: None,
            scroll: None,
            normalised_point: None,
            is_builtin_display: display.is_builtin,
            is_main_display: display.is_main,
            process,
            keyboard_layout: self.layouts.current_layout(),
        }
    }

    fn process(&mut self, pid: Option<i32>, at: Instant) -> ProcessIdentity {
        let Some(pid) = pid else {
            return ProcessIdentity::unknown();
        };
        if let Some((last, looked_up)) = &self.last_process {
            let fresh = at.saturating_duration_since(*looked_up) < PROCESS_CACHE_TTL;
            if last.pid == Some(pid) && fresh {
                return last.clone();
            }
        }
        let identity = self.processes.lookup(pid);
        self.last_process = Some((identity.clone(), at));
        identity
    }

    fn emit_stroke(&mut self, stroke: Stroke) {
        self.delegate
            .on_mouse_move_batch(&stroke.samples, stroke.started_at);
    }
}

fn velocity_kph(distance_mm: f64, elapsed: Option<Duration>) -> Option<f64> {
    let ms = elapsed?.as_millis();
    if ms == 0 {
        return None;
    }
    Some(distance_mm / ms as f64 * MM_PER_MS_TO_KPH)
}

fn drag_metrics(
    press: Point,
    release: Point,
    dwell: Option<Duration>,
    display: &Display,
) -> DragMetrics {
    let dx = release.x - press.x;
    let dy = release.y - press.y;
    let distance_points = dx.hypot(dy).round();
    let distance_mm = points_to_millimeters(distance_points, display);
    DragMetrics {
        distance_points,
        distance_px: points_to_pixels(distance_points, display),
        distance_mm,
        angle: (distance_points > 0.0).then(|| dy.atan2(dx)),
        velocity_kph: velocity_kph(distance_mm, dwell),
    }
}

fn scroll_metrics(
    delta_x: i64,
    delta_y: i64,
    since_previous: Option<Duration>,
    display: &Display,
) -> ScrollMetrics {
    let (dx, dy) = (delta_x as f64, delta_y as f64);
    let distance_mm = points_to_millimeters(dx.hypot(dy).round(), display);
    ScrollMetrics {
        delta_x,
        delta_y,
        distance_mm,
        angle: (delta_x != 0 || delta_y != 0).then(|| dy.atan2(dx)),
        velocity_kph: velocity_kph(distance_mm, since_previous),
    }
}
