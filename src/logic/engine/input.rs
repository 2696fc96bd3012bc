//! Input handling for JudgmentEngine - on_input, press, release

use super::JudgmentEngine;
use crate::error::EngineError;
use crate::input::events::{InputEvent, InputKind};
use crate::models::engine::NoteState;
use crate::models::stats::{HitPhase, Judgment, JudgmentKind};

impl JudgmentEngine {
    /// Consumes one input event and returns the judgment it produced, if any.
    ///
    /// Presses that match no note are ghost taps: no judgment, no penalty.
    /// Inputs on lanes outside the chart, or with a NaN/infinite timestamp,
    /// are rejected without side effects.
    pub fn on_input(&mut self, event: &InputEvent) -> Result<Option<Judgment>, EngineError> {
        let lane_count = self.lane_count();
        if event.lane >= lane_count {
            log::warn!(
                "ENGINE: Input on lane {} rejected ({} lanes)",
                event.lane,
                lane_count
            );
            return Err(EngineError::InputOutOfRange {
                lane: event.lane,
                lane_count,
            });
        }

        if !event.timestamp_ms.is_finite() {
            log::warn!("ENGINE: Input on lane {} has no usable timestamp", event.lane);
            return Err(EngineError::InvalidTimestamp(event.lane));
        }

        let last = self.last_input_ms[event.lane];
        if event.timestamp_ms < last {
            log::warn!(
                "ENGINE: Lane {} input at {:.1}ms arrived after {:.1}ms",
                event.lane,
                event.timestamp_ms,
                last
            );
        } else {
            self.last_input_ms[event.lane] = event.timestamp_ms;
        }

        let judgment = match event.kind {
            InputKind::Press => self.process_press(event.lane, event.timestamp_ms),
            InputKind::Release => self.process_release(event.lane, event.timestamp_ms),
        };
        Ok(judgment)
    }

    /// Finds the closest pending note within the widest window and judges
    /// its head.
    fn process_press(&mut self, lane: usize, time_ms: f64) -> Option<Judgment> {
        // A key can't go down twice without a release in between.
        if self.queue.held(lane).is_some() {
            self.ghost_taps += 1;
            return None;
        }

        let widest_ms = self.widest_ms();
        let Some(idx) = self.queue.best_press_candidate(lane, time_ms, widest_ms) else {
            log::trace!("ENGINE: Ghost tap on lane {} at {:.1}ms", lane, time_ms);
            self.ghost_taps += 1;
            return None;
        };

        let note = self.queue.note(idx);
        let offset_ms = time_ms - note.start_ms;
        let note_id = note.id;
        let is_hold = note.is_hold();

        let kind = self.hit_window.judge(offset_ms)?;
        let next = if kind.is_miss() {
            NoteState::Missed
        } else if is_hold {
            NoteState::Held
        } else {
            NoteState::Judged
        };

        if !self.queue.transition(idx, next) {
            return None;
        }

        log::trace!(
            "ENGINE: {} on note {} (lane {}, {:+.1}ms)",
            kind.label(),
            note_id,
            lane,
            offset_ms
        );

        Some(Judgment {
            note_id,
            lane,
            kind,
            offset_ms,
            timestamp_ms: time_ms,
            phase: HitPhase::Head,
        })
    }

    /// Judges the release of the long note currently held in `lane`.
    ///
    /// Releasing outside the widest window (too early) is a Miss.
    fn process_release(&mut self, lane: usize, time_ms: f64) -> Option<Judgment> {
        let idx = self.queue.held(lane)?;

        let note = self.queue.note(idx);
        let offset_ms = time_ms - note.end_time_ms();
        let note_id = note.id;

        let kind = self.hit_window.judge(offset_ms).unwrap_or(JudgmentKind::Miss);
        let next = if kind.is_miss() {
            NoteState::Missed
        } else {
            NoteState::Judged
        };

        if !self.queue.transition(idx, next) {
            return None;
        }

        Some(Judgment {
            note_id,
            lane,
            kind,
            offset_ms,
            timestamp_ms: time_ms,
            phase: HitPhase::Release,
        })
    }
}
