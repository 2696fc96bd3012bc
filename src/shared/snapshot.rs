//! Render snapshots for inter-thread communication.
//!
//! Snapshots are immutable captures of session state sent from the logic
//! thread to whatever draws the playfield.

use crate::models::engine::{Note, NoteState};
use crate::models::result::SessionStatus;
use crate::models::stats::{Judgment, JudgmentCounts};
use std::time::Instant;

/// Snapshot of gameplay state for rendering.
#[derive(Clone, Debug)]
pub struct GameplaySnapshot {
    /// Clock time in chart milliseconds.
    pub time_ms: f64,
    /// Wall-clock time when snapshot was created (for interpolation).
    pub timestamp: Instant,
    pub rate: f64,
    pub status: SessionStatus,

    /// Notes still in play within the look-ahead horizon.
    pub visible_notes: Vec<(Note, NoteState)>,
    /// Per-lane key held state.
    pub keys_held: Vec<bool>,

    pub score: u64,
    pub accuracy: f64,
    pub combo: u32,
    pub health: f64,
    pub judgment_counts: JudgmentCounts,
    pub remaining_notes: usize,
    pub ghost_taps: u32,

    /// Last applied judgment (for flash display).
    pub last_judgment: Option<Judgment>,

    /// Presses in the last second.
    pub nps: f64,

    pub practice_mode: bool,
    /// Timestamps of placed checkpoints.
    pub checkpoints: Vec<f64>,
    /// Total chart duration (for progress display).
    pub chart_duration_ms: f64,
}
