//! Mouse-move batching.
//!
//! Qualifying movement steps accumulate into a [`MouseMoveBatch`] until a
//! flush condition closes the stroke. The aggregator never talks to the
//! delegate itself; it hands closed strokes back to the caller.

use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::time::{Duration, SystemTime};

use crate::events::{MotionSample, ProcessIdentity};
use crate::motion::{Motion, MIN_SAMPLE_DISTANCE_POINTS};

/// Default maximum number of samples in one batch.
pub const DEFAULT_CAPACITY: usize = 512;

/// Default pause after which a stroke is considered finished.
///
/// Compared against the full-resolution gap, so 500.9 ms counts as a pause.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(500);

/// Tolerance on the deviation limit: a step flushes when its deviation is
/// at least `max_deviation - HEADING_EPSILON`.
///
/// Rotating by the reference heading leaves rounding error around 1e-16, so
/// a true right angle can come out a hair under π/2. Any deviation within
/// 1e-9 rad of the limit counts as reaching it.
pub const HEADING_EPSILON: f64 = 1e-9;

/// Thresholds that decide when a stroke ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchPolicy {
    pub capacity: usize,
    pub min_distance_points: f64,
    /// Deviation (radians) at or above which a stroke ends
    pub max_deviation: f64,
    /// Gaps strictly longer than this end a stroke
    pub pause: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        BatchPolicy {
            capacity: DEFAULT_CAPACITY,
            min_distance_points: MIN_SAMPLE_DISTANCE_POINTS,
            max_deviation: FRAC_PI_2,
            pause: DEFAULT_PAUSE,
        }
    }
}

/// Why a batch was flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// The batch was full
    Capacity,
    /// The pointer turned too far from the stroke's initial direction
    Heading,
    /// Too long since the previous movement step
    Pause,
    /// Input moved to a non-movement channel
    FocusChange,
    /// The engine is stopping
    Shutdown,
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlushReason::Capacity => "capacity",
            FlushReason::Heading => "heading",
            FlushReason::Pause => "pause",
            FlushReason::FocusChange => "focus change",
            FlushReason::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Per-sample context that does not come from the motion itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleStamp {
    pub is_builtin_display: bool,
    pub is_main_display: bool,
    pub process: ProcessIdentity,
}

/// A closed batch, ready for the delegate.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub samples: Vec<MotionSample>,
    pub started_at: SystemTime,
    pub reason: FlushReason,
}

/// The open sequence of samples, if any.
#[derive(Debug, Clone)]
pub struct MouseMoveBatch {
    samples: Vec<MotionSample>,
    started_at: Option<SystemTime>,
    reference_heading: Option<f64>,
}

impl MouseMoveBatch {
    fn with_capacity(capacity: usize) -> Self {
        MouseMoveBatch {
            samples: Vec::with_capacity(capacity),
            started_at: None,
            reference_heading: None,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[MotionSample] {
        &self.samples
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn reference_heading(&self) -> Option<f64> {
        self.reference_heading
    }

    fn open(&mut self, sample: MotionSample, heading: f64, at: SystemTime) {
        self.samples.push(sample);
        self.started_at = Some(at);
        self.reference_heading = Some(heading);
    }

    fn push(&mut self, sample: MotionSample) {
        self.samples.push(sample);
    }

    fn take(&mut self, reason: FlushReason) -> Option<Stroke> {
        let started_at = self.started_at.take()?;
        self.reference_heading = None;
        let capacity = self.samples.capacity();
        let samples = std::mem::replace(&mut self.samples, Vec::with_capacity(capacity));
        Some(Stroke {
            samples,
            started_at,
            reason,
        })
    }
}

/// Two-state (empty / open) stroke builder.
#[derive(Debug, Clone)]
pub struct BatchAggregator {
    policy: BatchPolicy,
    batch: MouseMoveBatch,
}

impl Default for BatchAggregator {
    fn default() -> Self {
        Self::new(BatchPolicy::default())
    }
}

impl BatchAggregator {
    pub fn new(policy: BatchPolicy) -> Self {
        BatchAggregator {
            batch: MouseMoveBatch::with_capacity(policy.capacity),
            policy,
        }
    }

    pub fn policy(&self) -> &BatchPolicy {
        &self.policy
    }

    pub fn batch(&self) -> &MouseMoveBatch {
        &self.batch
    }

    /// Heading that new steps must be measured against.
    pub fn reference_heading(&self) -> Option<f64> {
        self.batch.reference_heading()
    }

    /// Offer a measured step taken `elapsed` after the previous one.
    ///
    /// `motion.deviation` must have been measured against
    /// [`reference_heading`](Self::reference_heading). Returns the stroke
    /// closed by this step, if any. When a qualifying step closes a stroke
    /// it becomes the first sample of the next one.
    pub fn offer(
        &mut self,
        motion: &Motion,
        elapsed: Duration,
        at: SystemTime,
        stamp: SampleStamp,
    ) -> Option<Stroke> {
        let paused = elapsed > self.policy.pause;

        if !motion.qualifies(self.policy.min_distance_points) {
            return if paused {
                self.flush(FlushReason::Pause)
            } else {
                None
            };
        }

        if !self.batch.is_open() {
            self.start(motion, at, stamp);
            return None;
        }

        let reason = if self.batch.len() >= self.policy.capacity {
            Some(FlushReason::Capacity)
        } else if motion.deviation + HEADING_EPSILON >= self.policy.max_deviation {
            Some(FlushReason::Heading)
        } else if paused {
            Some(FlushReason::Pause)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                let stroke = self.flush(reason);
                self.start(motion, at, stamp);
                stroke
            }
            None => {
                self.batch.push(sample(motion, motion.deviation, stamp));
                None
            }
        }
    }

    /// Close the open batch, if there is one.
    pub fn flush(&mut self, reason: FlushReason) -> Option<Stroke> {
        let stroke = self.batch.take(reason)?;
        log::debug!(
            "Flushing {} mouse move sample(s) ({})",
            stroke.samples.len(),
            reason
        );
        Some(stroke)
    }

    fn start(&mut self, motion: &Motion, at: SystemTime, stamp: SampleStamp) {
        self.batch
            .open(sample(motion, 0.0, stamp), motion.raw_heading, at);
    }
}

fn sample(motion: &Motion, heading: f64, stamp: SampleStamp) -> MotionSample {
    MotionSample {
        distance_points: motion.distance_points,
        distance_px: motion.distance_px,
        distance_mm: motion.distance_mm,
        heading,
        velocity_kph: motion.velocity_kph,
        is_builtin_display: stamp.is_builtin_display,
        is_main_display: stamp.is_main_display,
        process: stamp.process,
    }
}
