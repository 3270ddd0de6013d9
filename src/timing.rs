//! Per-channel actuation timing ledger.

use std::time::{Duration, Instant};

use crate::channel::{Channel, CHANNEL_COUNT};
use crate::display::Point;

/// Timing state for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActuationRecord {
    /// Time of the most recent actuation, unset until the channel is first used.
    pub last_actuation: Option<Instant>,
    /// Press point in display-local coordinates (click channels only).
    pub last_click_point: Option<Point>,
}

/// Fixed-size ledger of [`ActuationRecord`]s, one per channel.
///
/// Records are never removed, only overwritten.
#[derive(Debug, Clone)]
pub struct ActuationTimingStore {
    records: Vec<ActuationRecord>,
}

impl Default for ActuationTimingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuationTimingStore {
    pub fn new() -> Self {
        ActuationTimingStore {
            records: vec![ActuationRecord::default(); CHANNEL_COUNT],
        }
    }

    pub fn record(&self, channel: Channel) -> &ActuationRecord {
        &self.records[channel.index()]
    }

    /// Mark `channel` as actuated at `at`.
    pub fn actuate(&mut self, channel: Channel, at: Instant) {
        self.records[channel.index()].last_actuation = Some(at);
    }

    pub fn set_click_point(&mut self, channel: Channel, point: Point) {
        self.records[channel.index()].last_click_point = Some(point);
    }

    /// Whether the channel has never been actuated.
    pub fn is_first(&self, channel: Channel) -> bool {
        self.record(channel).last_actuation.is_none()
    }

    /// Time elapsed between the channel's last actuation and `now`.
    ///
    /// Returns `None` if the channel was never actuated. A `now` earlier than
    /// the recorded actuation saturates to zero.
    pub fn since_last(&self, channel: Channel, now: Instant) -> Option<Duration> {
        self.record(channel)
            .last_actuation
            .map(|last| now.saturating_duration_since(last))
    }
}
