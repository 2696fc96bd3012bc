//! Timestamped lane inputs delivered by the keyboard layer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Press,
    Release,
}

/// A key press or release on a lane.
///
/// Timestamps are taken at capture time in chart milliseconds, not at
/// delivery, so processing delays don't shift judgments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub lane: usize,
    pub kind: InputKind,
    pub timestamp_ms: f64,
}

impl InputEvent {
    pub fn press(lane: usize, timestamp_ms: f64) -> Self {
        Self {
            lane,
            kind: InputKind::Press,
            timestamp_ms,
        }
    }

    pub fn release(lane: usize, timestamp_ms: f64) -> Self {
        Self {
            lane,
            kind: InputKind::Release,
            timestamp_ms,
        }
    }

    pub fn is_press(&self) -> bool {
        self.kind == InputKind::Press
    }
}
