//! Running score, accuracy, combo and health.
//!
//! [`ScoreAccumulator`] is the only writer of [`ScoreState`]. Head judgments
//! drive every counter; release judgments of long notes only feed the
//! release-timing statistic.

use crate::models::settings::HealthMode;
use crate::models::stats::{
    JudgmentCounts, Judgment, JudgmentKind, OffsetStats, ReleaseStats,
};
use serde::{Deserialize, Serialize};

pub const MAX_HEALTH: f64 = 100.0;
pub const MIN_HEALTH: f64 = 0.0;

/// Points awarded per judgment kind.
pub fn score_points(kind: JudgmentKind) -> u64 {
    match kind {
        JudgmentKind::Marvelous => 320,
        JudgmentKind::Perfect => 300,
        JudgmentKind::Great => 200,
        JudgmentKind::Good => 100,
        JudgmentKind::Okay => 50,
        JudgmentKind::Miss => 0,
    }
}

/// Accuracy weight per judgment kind, out of [`ACCURACY_WEIGHT_MAX`].
pub fn accuracy_weight(kind: JudgmentKind) -> u64 {
    match kind {
        JudgmentKind::Marvelous | JudgmentKind::Perfect => 300,
        JudgmentKind::Great => 200,
        JudgmentKind::Good => 100,
        JudgmentKind::Okay => 50,
        JudgmentKind::Miss => 0,
    }
}

pub const ACCURACY_WEIGHT_MAX: u64 = 300;

/// Health change per judgment kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthTable {
    deltas: [f64; 6],
}

impl HealthTable {
    pub fn for_mode(mode: HealthMode) -> Self {
        let standard = [0.5, 0.4, 0.2, -3.0, -4.5, -6.0];
        match mode {
            HealthMode::Standard => Self { deltas: standard },
            HealthMode::Hard => Self {
                deltas: standard.map(|d| if d > 0.0 { d * 0.5 } else { d * 2.0 }),
            },
        }
    }

    pub fn delta(&self, kind: JudgmentKind) -> f64 {
        self.deltas[kind.index()]
    }
}

/// Single mutable score aggregate of a play session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    pub total_score: u64,
    pub accuracy_numerator: u64,
    pub accuracy_denominator: u64,
    pub current_combo: u32,
    pub max_combo: u32,
    /// Bounded to [0, 100].
    pub health: f64,
    /// Head judgments per kind. Sums to the note count once every note is
    /// terminal.
    pub judgment_counts: JudgmentCounts,
    /// Timing offsets of non-miss head judgments.
    pub hit_offsets: OffsetStats,
    pub release: ReleaseStats,
    /// Set once health reached zero in fail-on-zero mode. Terminal.
    pub failed: bool,
}

impl ScoreState {
    pub fn new() -> Self {
        Self {
            total_score: 0,
            accuracy_numerator: 0,
            accuracy_denominator: 0,
            current_combo: 0,
            max_combo: 0,
            health: MAX_HEALTH,
            judgment_counts: JudgmentCounts::new(),
            hit_offsets: OffsetStats::default(),
            release: ReleaseStats::default(),
            failed: false,
        }
    }

    /// Accuracy percentage (0-100), `0.0` before any judgment.
    pub fn accuracy(&self) -> f64 {
        if self.accuracy_denominator == 0 {
            return 0.0;
        }
        self.accuracy_numerator as f64 / self.accuracy_denominator as f64 * 100.0
    }
}

impl Default for ScoreState {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumes judgments and maintains the [`ScoreState`].
#[derive(Debug, Clone)]
pub struct ScoreAccumulator {
    state: ScoreState,
    judgments: Vec<Judgment>,
    health_table: HealthTable,
    fail_on_zero: bool,
}

impl ScoreAccumulator {
    pub fn new(health_mode: HealthMode, fail_on_zero: bool) -> Self {
        Self {
            state: ScoreState::new(),
            judgments: Vec::new(),
            health_table: HealthTable::for_mode(health_mode),
            fail_on_zero,
        }
    }

    pub fn state(&self) -> &ScoreState {
        &self.state
    }

    /// Every judgment applied so far, in order.
    pub fn judgments(&self) -> &[Judgment] {
        &self.judgments
    }

    pub fn is_failed(&self) -> bool {
        self.state.failed
    }

    /// Clears everything back to the session start.
    pub fn reset(&mut self) {
        self.state = ScoreState::new();
        self.judgments.clear();
    }

    /// Applies one judgment.
    ///
    /// Returns `false` without touching anything once the session failed.
    /// Callers must check [`is_failed`](Self::is_failed) after every call and
    /// stop feeding input once it is set.
    pub fn apply_judgment(&mut self, j: &Judgment) -> bool {
        if self.state.failed {
            log::trace!("SCORE: Ignoring judgment for note {} after fail", j.note_id);
            return false;
        }

        self.judgments.push(*j);

        if j.is_release() {
            self.state.release.counts.increment(j.kind);
            if !j.kind.is_miss() {
                self.state.release.offsets.push(j.offset_ms);
            }
            return true;
        }

        let state = &mut self.state;
        state.judgment_counts.increment(j.kind);
        state.total_score += score_points(j.kind);
        state.accuracy_numerator += accuracy_weight(j.kind);
        state.accuracy_denominator += ACCURACY_WEIGHT_MAX;

        if j.kind.is_miss() {
            state.current_combo = 0;
        } else {
            state.current_combo += 1;
            state.max_combo = state.max_combo.max(state.current_combo);
            state.hit_offsets.push(j.offset_ms);
        }

        state.health =
            (state.health + self.health_table.delta(j.kind)).clamp(MIN_HEALTH, MAX_HEALTH);

        if self.fail_on_zero && state.health <= MIN_HEALTH {
            state.failed = true;
            log::info!(
                "SCORE: Health depleted at {:.0}ms, session failed",
                j.timestamp_ms
            );
        }

        true
    }

    /// Freezes the accumulator into its final state and judgment sequence.
    pub fn finalize(self) -> (ScoreState, Vec<Judgment>) {
        (self.state, self.judgments)
    }
}
