//! The delegate boundary: where emitted records leave the engine.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::events::{ActionEvent, MotionSample};

/// Receives records produced by the engine.
///
/// Both callbacks run synchronously inside input dispatch and must not block.
pub trait Delegate {
    /// One completed discrete input.
    fn on_action(&mut self, event: &ActionEvent);

    /// One flushed mouse-move stroke, with the wall-clock time of its first sample.
    fn on_mouse_move_batch(&mut self, samples: &[MotionSample], batch_start: SystemTime);
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record<'a> {
    Action(&'a ActionEvent),
    Stroke {
        start_ms: u64,
        samples: &'a [MotionSample],
    },
}

/// Writes each record as one JSON object per line.
///
/// Write errors are logged and the record is dropped.
pub struct JsonLinesDelegate<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesDelegate<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesDelegate { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, record: &Record<'_>) {
        let result = serde_json::to_writer(&mut self.writer, record)
            .map_err(std::io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            log::warn!("Failed to write record: {}", e);
        }
    }
}

impl<W: Write> Delegate for JsonLinesDelegate<W> {
    fn on_action(&mut self, event: &ActionEvent) {
        self.write(&Record::Action(event));
    }

    fn on_mouse_move_batch(&mut self, samples: &[MotionSample], batch_start: SystemTime) {
        let start_ms = batch_start
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.write(&Record::Stroke { start_ms, samples });
    }
}
