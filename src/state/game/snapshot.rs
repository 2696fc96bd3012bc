//! Snapshot creation for GameSession - snapshot

use super::GameSession;
use crate::models::engine::TimingProvider;
use crate::shared::snapshot::GameplaySnapshot;

impl<C: TimingProvider> GameSession<C> {
    /// Creates a snapshot of the current session for rendering.
    ///
    /// `horizon_ms` is how far ahead of the clock notes are visible.
    pub fn snapshot(&self, horizon_ms: f64) -> GameplaySnapshot {
        let now = self.last_time_ms;
        let queue = self.engine.queue();
        let widest = self.engine.widest_ms();

        let mut visible: Vec<usize> = (0..queue.lane_count())
            .flat_map(|lane| queue.visible(lane, now, horizon_ms, widest))
            .collect();
        // Chart indices are in start, lane, id order.
        visible.sort_unstable();
        let visible_notes = visible
            .into_iter()
            .map(|idx| (queue.note(idx).clone(), queue.state(idx)))
            .collect();

        let state = self.score.state();

        GameplaySnapshot {
            time_ms: now,
            timestamp: std::time::Instant::now(),
            rate: self.config.rate,
            status: self.status,
            visible_notes,
            keys_held: self.keys_held.clone(),
            score: state.total_score,
            accuracy: state.accuracy(),
            combo: state.current_combo,
            health: state.health,
            judgment_counts: state.judgment_counts.clone(),
            remaining_notes: queue.remaining(),
            ghost_taps: self.engine.ghost_taps(),
            last_judgment: self.last_judgment,
            nps: self.nps(),
            practice_mode: self.practice_mode,
            checkpoints: self.replay.checkpoints.clone(),
            chart_duration_ms: self.chart_duration_ms,
        }
    }
}
