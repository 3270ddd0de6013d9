//! End-to-end tests for the engine: raw notifications in, records out.
//!
//! These drive `Engine::handle` with synthetic notifications on a fake clock
//! and check what reaches the delegate.

use std::f64::consts::FRAC_PI_2;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tapmeter::display::{DisplayDescriptor, DisplayRegistry, Point, Rect, Size, StaticDisplaySource};
use tapmeter::{
    exit_code, ActionEvent, ActionKind, BatchPolicy, Channel, Delegate, Engine, FatalError,
    FlushReason, JsonLinesDelegate, KeyCode, MotionSample, MouseButton, NotificationKind,
    RawNotification, TapDisabledCause,
};

// ==================== Helpers ====================

#[derive(Default)]
struct Recorder {
    actions: Vec<ActionEvent>,
    strokes: Vec<(Vec<MotionSample>, SystemTime)>,
}

impl Delegate for Recorder {
    fn on_action(&mut self, event: &ActionEvent) {
        self.actions.push(event.clone());
    }

    fn on_mouse_move_batch(&mut self, samples: &[MotionSample], batch_start: SystemTime) {
        self.strokes.push((samples.to_vec(), batch_start));
    }
}

fn square_display(id: u32, x: f64) -> DisplayDescriptor {
    DisplayDescriptor {
        id,
        bounds: Rect::new(x, 0.0, 1000.0, 1000.0),
        size_mm: Size::new(250.0, 250.0),
        modes: Vec::new(),
        fallback_px: Size::new(2000.0, 2000.0),
        is_main: id == 1,
        is_builtin: id == 1,
    }
}

fn registry(descriptors: Vec<DisplayDescriptor>) -> DisplayRegistry {
    let registry = DisplayRegistry::new();
    registry
        .rebuild(&StaticDisplaySource::new(descriptors))
        .unwrap();
    registry
}

fn engine() -> Engine<Recorder> {
    Engine::new(registry(vec![square_display(1, 0.0)]), Recorder::default())
}

/// Fake clock: notifications are stamped `ms` after a fixed start.
struct Clock {
    start: Instant,
}

impl Clock {
    fn new() -> Self {
        Clock {
            start: Instant::now(),
        }
    }

    fn instant(&self, ms: u64) -> Instant {
        self.start + Duration::from_millis(ms)
    }

    fn wall(&self, ms: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(ms)
    }

    fn at(&self, ms: u64, kind: NotificationKind) -> RawNotification {
        self.at_point(ms, kind, 500.0, 500.0)
    }

    fn at_micros(&self, us: u64, kind: NotificationKind) -> RawNotification {
        let offset = Duration::from_micros(us);
        RawNotification::now(kind, Point::new(500.0, 500.0))
            .with_time(self.start + offset, UNIX_EPOCH + offset)
    }

    fn at_point(&self, ms: u64, kind: NotificationKind, x: f64, y: f64) -> RawNotification {
        RawNotification::now(kind, Point::new(x, y)).with_time(self.instant(ms), self.wall(ms))
    }
}

fn key(code: u16) -> KeyCode {
    KeyCode::new(code).unwrap()
}

fn key_down(code: u16) -> NotificationKind {
    NotificationKind::KeyDown {
        code: key(code),
        autorepeat: false,
    }
}

fn key_up(code: u16) -> NotificationKind {
    NotificationKind::KeyUp { code: key(code) }
}

fn moved(dx: f64, dy: f64) -> NotificationKind {
    NotificationKind::MouseMoved {
        delta_x: dx,
        delta_y: dy,
    }
}

/// Feed movement notifications at the given times.
fn drive_moves(engine: &mut Engine<Recorder>, clock: &Clock, moves: &[(u64, f64, f64)]) {
    for &(ms, dx, dy) in moves {
        engine.handle(clock.at(ms, moved(dx, dy))).unwrap();
    }
}

fn stroke_lengths(engine: &Engine<Recorder>) -> Vec<usize> {
    engine
        .delegate()
        .strokes
        .iter()
        .map(|(samples, _)| samples.len())
        .collect()
}

// ==================== Dwell Tests ====================

#[test]
fn test_dwell_matches_notification_delta() {
    let clock = Clock::new();
    let mut engine = engine();

    for (down, up) in [(0, 95), (200, 201), (1000, 3500)] {
        engine.handle(clock.at(down, key_down(30))).unwrap();
        engine.handle(clock.at(up, key_up(30))).unwrap();
    }

    let dwells: Vec<_> = engine.delegate().actions.iter().map(|a| a.dwell).collect();
    assert_eq!(
        dwells,
        vec![
            Some(Duration::from_millis(95)),
            Some(Duration::from_millis(1)),
            Some(Duration::from_millis(2500)),
        ]
    );
}

#[test]
fn test_autorepeat_does_not_move_actuation_time() {
    let clock = Clock::new();
    let mut with_repeats = engine();
    let mut without_repeats = engine();

    with_repeats.handle(clock.at(0, key_down(12))).unwrap();
    without_repeats.handle(clock.at(0, key_down(12))).unwrap();
    for t in (500..900).step_by(33) {
        let repeat = NotificationKind::KeyDown {
            code: key(12),
            autorepeat: true,
        };
        with_repeats.handle(clock.at(t, repeat)).unwrap();
    }
    with_repeats.handle(clock.at(1000, key_up(12))).unwrap();
    without_repeats.handle(clock.at(1000, key_up(12))).unwrap();

    assert_eq!(with_repeats.delegate().actions.len(), 1);
    assert_eq!(
        with_repeats.delegate().actions[0].dwell,
        without_repeats.delegate().actions[0].dwell
    );
}

#[test]
fn test_up_without_down_has_no_dwell() {
    let clock = Clock::new();
    let mut engine = engine();
    engine.handle(clock.at(10, key_up(40))).unwrap();
    engine
        .handle(clock.at(20, NotificationKind::ButtonUp(MouseButton::Right)))
        .unwrap();

    let actions = &engine.delegate().actions;
    assert_eq!(actions.len(), 2);
    assert!(actions.iter().all(|a| a.dwell.is_none()));
    assert!(actions[1].drag.is_none());
    assert_eq!(actions[1].channel, Channel::RightMouse);
}

// ==================== Click Tests ====================

#[test]
fn test_click_drag_example() {
    let clock = Clock::new();
    let mut engine = engine();
    engine
        .handle(clock.at_point(
            0,
            NotificationKind::ButtonDown(MouseButton::Left),
            100.0,
            100.0,
        ))
        .unwrap();
    engine
        .handle(clock.at_point(
            250,
            NotificationKind::ButtonUp(MouseButton::Left),
            300.0,
            400.0,
        ))
        .unwrap();

    let event = &engine.delegate().actions[0];
    assert_eq!(event.kind, ActionKind::Click);
    assert_eq!(event.channel, Channel::LeftMouse);
    assert_eq!(event.dwell, Some(Duration::from_millis(250)));
    assert_eq!(event.drag.unwrap().distance_points, 361.0);
    assert!(event.is_main_display);
    assert!(event.is_builtin_display);
}

#[test]
fn test_click_on_secondary_display_uses_local_points() {
    let clock = Clock::new();
    let mut engine = Engine::new(
        registry(vec![square_display(1, 0.0), square_display(2, 1000.0)]),
        Recorder::default(),
    );
    engine
        .handle(clock.at_point(
            0,
            NotificationKind::ButtonDown(MouseButton::Other),
            1250.0,
            500.0,
        ))
        .unwrap();
    engine
        .handle(clock.at_point(
            40,
            NotificationKind::ButtonUp(MouseButton::Other),
            1250.0,
            500.0,
        ))
        .unwrap();

    let event = &engine.delegate().actions[0];
    assert_eq!(event.channel, Channel::OtherMouse);
    assert_eq!(event.normalised_point, Some(Point::new(0.25, 0.5)));
    assert_eq!(event.drag.unwrap().distance_points, 0.0);
    assert!(!event.is_main_display);
}

// ==================== Scroll Tests ====================

#[test]
fn test_scroll_dwell_is_time_since_previous_tick() {
    let clock = Clock::new();
    let mut engine = engine();
    let tick = NotificationKind::Scroll {
        delta_x: 0,
        delta_y: -4,
    };
    engine.handle(clock.at(0, tick)).unwrap();
    engine.handle(clock.at(16, tick)).unwrap();

    let actions = &engine.delegate().actions;
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].kind, ActionKind::Scroll);
    assert!(actions[0].dwell.is_none());
    assert!(actions[0].scroll.unwrap().velocity_kph.is_none());
    assert_eq!(actions[1].dwell, Some(Duration::from_millis(16)));

    let scroll = actions[1].scroll.unwrap();
    assert_eq!(scroll.delta_y, -4);
    assert!((scroll.distance_mm - 1.0).abs() < 1e-9);
    assert!((scroll.angle.unwrap() + FRAC_PI_2).abs() < 1e-9);
    assert!(scroll.velocity_kph.is_some());
}

// ==================== Mouse Move Tests ====================

#[test]
fn test_first_move_only_seeds_timing() {
    let clock = Clock::new();
    let mut engine = engine();
    engine.handle(clock.at(5, moved(50.0, 0.0))).unwrap();

    assert!(engine.batches().batch().is_empty());
    assert_eq!(
        engine.timing().record(Channel::MouseMove).last_actuation,
        Some(clock.instant(5))
    );
}

#[test]
fn test_tiny_moves_are_timed_but_not_batched() {
    let clock = Clock::new();
    let mut engine = engine();
    drive_moves(
        &mut engine,
        &clock,
        &[(0, 0.0, 0.0), (100, 10.0, 0.0), (200, 2.0, 1.0)],
    );
    assert_eq!(engine.batches().batch().len(), 1);
    assert_eq!(
        engine.timing().record(Channel::MouseMove).last_actuation,
        Some(clock.instant(200))
    );

    drive_moves(&mut engine, &clock, &[(300, 10.0, 0.0)]);
    engine.handle(clock.at(310, key_down(1))).unwrap();

    let strokes = &engine.delegate().strokes;
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].0.len(), 2);
    assert!(strokes[0]
        .0
        .iter()
        .all(|sample| sample.distance_points >= 5.0));
    // Velocity of the last sample is measured from the tiny step, not the
    // previous qualifying one
    let expected_kph = 2.5 / 100.0 * 3.6;
    assert!((strokes[0].0[1].velocity_kph - expected_kph).abs() < 1e-9);
}

#[test]
fn test_capacity_flushes_before_overflow() {
    let clock = Clock::new();
    let mut engine = engine().with_policy(BatchPolicy {
        capacity: 3,
        ..BatchPolicy::default()
    });
    let moves: Vec<(u64, f64, f64)> = (0..=5).map(|i| (i * 50, 10.0, 0.0)).collect();
    drive_moves(&mut engine, &clock, &moves);

    // Fourth sample flushed the first three and started a new stroke
    assert_eq!(stroke_lengths(&engine), vec![3]);
    assert_eq!(engine.batches().batch().len(), 2);

    assert!(engine.flush(FlushReason::Shutdown));
    assert_eq!(stroke_lengths(&engine), vec![3, 2]);
    assert!(!engine.flush(FlushReason::Shutdown));
}

#[test]
fn test_heading_below_right_angle_extends_stroke() {
    let clock = Clock::new();
    let mut engine = engine();
    drive_moves(
        &mut engine,
        &clock,
        &[(0, 0.0, 0.0), (100, 10.0, 0.0), (200, 10.0, 10.0)],
    );

    assert!(engine.delegate().strokes.is_empty());
    let samples = engine.batches().batch().samples();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].heading, 0.0);
    assert!((samples[1].heading - FRAC_PI_2 / 2.0).abs() < 1e-9);
}

#[test]
fn test_right_angle_turn_starts_new_stroke() {
    let clock = Clock::new();
    let mut engine = engine();
    drive_moves(
        &mut engine,
        &clock,
        &[(0, 0.0, 0.0), (100, 10.0, 0.0), (200, 0.0, 10.0)],
    );

    assert_eq!(stroke_lengths(&engine), vec![1]);
    assert_eq!(engine.batches().batch().len(), 1);
    let reference = engine.batches().reference_heading().unwrap();
    assert!((reference - 0.0f64.atan2(10.0)).abs() < 1e-12);
}

#[test]
fn test_reversal_starts_new_stroke() {
    let clock = Clock::new();
    let mut engine = engine();
    drive_moves(
        &mut engine,
        &clock,
        &[
            (0, 0.0, 0.0),
            (100, 10.0, 0.0),
            (150, 12.0, 1.0),
            (200, -10.0, 0.0),
        ],
    );
    assert_eq!(stroke_lengths(&engine), vec![2]);
}

#[test]
fn test_pause_starts_new_stroke() {
    let clock = Clock::new();
    let mut engine = engine();
    drive_moves(
        &mut engine,
        &clock,
        &[
            (0, 0.0, 0.0),
            (100, 10.0, 0.0),
            (200, 10.0, 0.0),
            (300, 10.0, 0.0),
            (900, 10.0, 0.0),
        ],
    );

    assert_eq!(stroke_lengths(&engine), vec![3]);
    assert_eq!(engine.batches().batch().len(), 1);
}

#[test]
fn test_pause_of_exactly_limit_does_not_flush() {
    let clock = Clock::new();
    let mut engine = engine();
    drive_moves(
        &mut engine,
        &clock,
        &[(0, 0.0, 0.0), (100, 10.0, 0.0), (600, 10.0, 0.0)],
    );
    assert!(engine.delegate().strokes.is_empty());
    assert_eq!(engine.batches().batch().len(), 2);
}

#[test]
fn test_pause_just_over_limit_flushes() {
    let clock = Clock::new();
    let mut engine = engine();
    for us in [0, 10_000, 20_000, 520_900] {
        engine.handle(clock.at_micros(us, moved(10.0, 0.0))).unwrap();
    }
    assert_eq!(stroke_lengths(&engine), vec![2]);
    assert_eq!(engine.batches().batch().len(), 1);
}

#[test]
fn test_tiny_move_after_pause_closes_stroke() {
    let clock = Clock::new();
    let mut engine = engine();
    drive_moves(
        &mut engine,
        &clock,
        &[(0, 0.0, 0.0), (100, 10.0, 0.0), (700, 1.0, 0.0)],
    );
    assert_eq!(stroke_lengths(&engine), vec![1]);
    assert!(engine.batches().batch().is_empty());
}

#[test]
fn test_stroke_start_time_is_first_sample_wall_clock() {
    let clock = Clock::new();
    let mut engine = engine();
    drive_moves(
        &mut engine,
        &clock,
        &[(0, 0.0, 0.0), (120, 10.0, 0.0), (180, 10.0, 0.0)],
    );
    engine.flush(FlushReason::Shutdown);
    assert_eq!(engine.delegate().strokes[0].1, clock.wall(120));
}

#[test]
fn test_discrete_input_flushes_open_stroke_first() {
    let clock = Clock::new();
    let mut engine = engine();
    drive_moves(&mut engine, &clock, &[(0, 0.0, 0.0), (100, 10.0, 0.0)]);
    engine.handle(clock.at(150, key_down(3))).unwrap();

    assert_eq!(stroke_lengths(&engine), vec![1]);
    assert!(engine.delegate().actions.is_empty());
    assert!(engine.batches().batch().is_empty());
}

#[test]
fn test_autorepeat_does_not_flush_stroke() {
    let clock = Clock::new();
    let mut engine = engine();
    drive_moves(&mut engine, &clock, &[(0, 0.0, 0.0), (100, 10.0, 0.0)]);
    let repeat = NotificationKind::KeyDown {
        code: key(3),
        autorepeat: true,
    };
    engine.handle(clock.at(150, repeat)).unwrap();

    assert!(engine.delegate().strokes.is_empty());
    assert_eq!(engine.batches().batch().len(), 1);
}

// ==================== Fatal Condition Tests ====================

#[test]
fn test_point_outside_displays_is_fatal() {
    let clock = Clock::new();
    let mut engine = engine();

    // Bounds are inclusive on every edge
    engine
        .handle(clock.at_point(0, key_down(9), 1000.0, 1000.0))
        .unwrap();

    let err = engine
        .handle(clock.at_point(10, key_up(9), 1000.5, 10.0))
        .unwrap_err();
    assert!(matches!(err, FatalError::DisplayNotFound(_)));
    assert_eq!(err.exit_code(), exit_code::DISPLAY_NOT_FOUND);
    assert!(engine.delegate().actions.is_empty());
}

#[test]
fn test_tap_disabled_is_fatal() {
    let clock = Clock::new();
    let mut engine = engine();
    let by_user = engine
        .handle(clock.at(
            0,
            NotificationKind::TapDisabled(TapDisabledCause::UserInput),
        ))
        .unwrap_err();
    let by_timeout = engine
        .handle(clock.at(
            1,
            NotificationKind::TapDisabled(TapDisabledCause::Timeout),
        ))
        .unwrap_err();
    assert_eq!(by_user.exit_code(), exit_code::TAP_DISABLED_BY_USER_INPUT);
    assert_eq!(by_timeout.exit_code(), exit_code::TAP_DISABLED_BY_TIMEOUT);
}

#[test]
fn test_refresh_displays_changes_resolution() {
    let clock = Clock::new();
    let mut engine = engine();
    assert!(engine
        .handle(clock.at_point(0, key_down(2), 1500.0, 10.0))
        .is_err());

    let count = engine
        .refresh_displays(&StaticDisplaySource::new(vec![
            square_display(1, 0.0),
            square_display(2, 1000.0),
        ]))
        .unwrap();
    assert_eq!(count, 2);
    engine
        .handle(clock.at_point(10, key_down(2), 1500.0, 10.0))
        .unwrap();
}

// ==================== JSON Lines Sink Tests ====================

#[test]
fn test_json_lines_output() {
    let clock = Clock::new();
    let mut engine = Engine::new(
        registry(vec![square_display(1, 0.0)]),
        JsonLinesDelegate::new(Vec::new()),
    );
    for (ms, dx, dy) in [(0, 0.0, 0.0), (100, 10.0, 0.0), (200, 10.0, 0.0)] {
        engine.handle(clock.at(ms, moved(dx, dy))).unwrap();
    }
    engine.handle(clock.at(300, key_down(17))).unwrap();
    engine.handle(clock.at(380, key_up(17))).unwrap();

    let out = String::from_utf8(engine.into_delegate().into_inner()).unwrap();
    let lines: Vec<serde_json::Value> = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);

    assert_eq!(lines[0]["type"], "stroke");
    assert_eq!(lines[0]["start_ms"], 100);
    assert_eq!(lines[0]["samples"].as_array().unwrap().len(), 2);

    assert_eq!(lines[1]["type"], "action");
    assert_eq!(lines[1]["kind"], "key");
    assert_eq!(lines[1]["dwell_ms"], 80);
}
