//! Frozen record handed to the result screen and persistence layer.

use crate::models::replay::ReplayData;
use crate::models::score::ScoreState;
use crate::models::stats::{Grade, Judgment};
use serde::{Deserialize, Serialize};

/// Lifecycle of a play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Running,
    /// Every note reached a terminal state.
    Completed,
    /// Health reached zero with fail-on-zero enabled.
    Failed,
    /// The player left before the end.
    Quit,
}

impl SessionStatus {
    pub fn is_over(self) -> bool {
        self != SessionStatus::Running
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResultData {
    pub chart_hash: String,
    pub rate: f64,
    /// Hit window label, e.g. "OD 8.0".
    pub judge_text: String,
    pub score: ScoreState,
    pub accuracy: f64,
    pub grade: Grade,
    /// Full judgment sequence in emission order.
    pub judgments: Vec<Judgment>,
    pub ghost_taps: u32,
    pub status: SessionStatus,
    pub replay: ReplayData,
}

impl GameResultData {
    pub fn is_failed(&self) -> bool {
        self.status == SessionStatus::Failed
    }

    /// Serializes to JSON for export.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
