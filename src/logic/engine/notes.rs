//! Note expiry - on_tick

use super::JudgmentEngine;
use crate::models::engine::NoteState;
use crate::models::stats::{HitPhase, Judgment, JudgmentKind};

impl JudgmentEngine {
    /// Expires every note whose window closed before `current_time_ms`.
    ///
    /// Pending notes past `start + widest` and held notes past
    /// `end + widest` become `Missed`. Misses are returned in nondecreasing
    /// start-time order (then lane, then id). Their timestamp is the exact
    /// deadline, so the result doesn't depend on the tick cadence.
    ///
    /// A tick at or before the previous one changes nothing, and so does a
    /// non-finite time.
    pub fn on_tick(&mut self, current_time_ms: f64) -> Vec<Judgment> {
        if !current_time_ms.is_finite() || current_time_ms <= self.last_tick_ms {
            return Vec::new();
        }
        self.last_tick_ms = current_time_ms;

        let widest_ms = self.widest_ms();
        let expired = self.queue.expired(current_time_ms, widest_ms);
        let mut misses = Vec::with_capacity(expired.len());

        for idx in expired {
            let state = self.queue.state(idx);
            let note = self.queue.note(idx);

            let (phase, deadline_ms) = match state {
                NoteState::Pending => (HitPhase::Head, note.start_ms + widest_ms),
                NoteState::Held => (HitPhase::Release, note.end_time_ms() + widest_ms),
                NoteState::Judged | NoteState::Missed => continue,
            };

            let judgment = Judgment {
                note_id: note.id,
                lane: note.lane,
                kind: JudgmentKind::Miss,
                offset_ms: widest_ms,
                timestamp_ms: deadline_ms,
                phase,
            };

            if self.queue.transition(idx, NoteState::Missed) {
                log::trace!(
                    "ENGINE: Miss on note {} (lane {}, {:?})",
                    judgment.note_id,
                    judgment.lane,
                    phase
                );
                misses.push(judgment);
            }
        }

        misses
    }
}

#[cfg(test)]
mod tests {
    use crate::input::events::InputEvent;
    use crate::logic::engine::JudgmentEngine;
    use crate::models::engine::{Chart, HitWindow, Note, NoteState, WindowBand};
    use crate::models::stats::{HitPhase, JudgmentKind};

    fn engine(notes: Vec<Note>) -> JudgmentEngine {
        let window = HitWindow::from_custom(vec![
            WindowBand::new(JudgmentKind::Perfect, 20.0),
            WindowBand::new(JudgmentKind::Great, 50.0),
        ])
        .unwrap();
        JudgmentEngine::new(&Chart::new(4, notes).unwrap(), window, 1.0)
    }

    #[test]
    fn test_tick_misses_expired_note() {
        let mut engine = engine(vec![Note::tap(0, 0, 1000.0)]);

        assert!(engine.on_tick(1050.0).is_empty());
        let misses = engine.on_tick(1050.1);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].kind, JudgmentKind::Miss);
        assert_eq!(misses[0].timestamp_ms, 1050.0);
        assert_eq!(misses[0].offset_ms, 50.0);
        assert_eq!(engine.queue().state(0), NoteState::Missed);

        // Already missed: a late press is a ghost tap, not a second judgment.
        assert!(engine.on_input(&InputEvent::press(0, 1040.0)).unwrap().is_none());
    }

    #[test]
    fn test_tick_is_idempotent() {
        let mut engine = engine(vec![Note::tap(0, 0, 1000.0), Note::tap(1, 1, 2000.0)]);

        assert_eq!(engine.on_tick(1500.0).len(), 1);
        let states = engine.queue().states().to_vec();

        assert!(engine.on_tick(1500.0).is_empty());
        assert!(engine.on_tick(900.0).is_empty());
        assert_eq!(engine.queue().states(), states.as_slice());
        assert_eq!(engine.last_tick_ms(), 1500.0);
    }

    #[test]
    fn test_tick_ignores_non_finite_time() {
        let mut engine = engine(vec![Note::tap(0, 0, 1000.0), Note::tap(1, 1, 2000.0)]);
        engine.on_tick(100.0);

        assert!(engine.on_tick(f64::NAN).is_empty());
        assert!(engine.on_tick(f64::INFINITY).is_empty());
        assert_eq!(engine.last_tick_ms(), 100.0);
        assert_eq!(engine.queue().remaining(), 2);
    }

    #[test]
    fn test_tick_orders_misses_by_start_time() {
        let mut engine = engine(vec![
            Note::tap(0, 3, 300.0),
            Note::tap(1, 0, 100.0),
            Note::tap(2, 2, 200.0),
            Note::tap(3, 1, 200.0),
        ]);

        let ids: Vec<u32> = engine.on_tick(10_000.0).iter().map(|j| j.note_id).collect();
        assert_eq!(ids, vec![1, 3, 2, 0]);
        assert!(engine.is_complete());
    }

    #[test]
    fn test_dropped_hold_is_missed() {
        let mut engine = engine(vec![Note::hold(0, 0, 1000.0, 2000.0)]);

        engine.on_input(&InputEvent::press(0, 1000.0)).unwrap();
        assert!(engine.on_tick(2050.0).is_empty());
        assert_eq!(engine.queue().state(0), NoteState::Held);

        let misses = engine.on_tick(2051.0);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].phase, HitPhase::Release);
        assert_eq!(misses[0].timestamp_ms, 2050.0);
        assert_eq!(engine.queue().state(0), NoteState::Missed);

        // Late release after the drop is ignored.
        assert!(engine.on_input(&InputEvent::release(0, 2060.0)).unwrap().is_none());
    }

    #[test]
    fn test_unpressed_hold_misses_once() {
        let mut engine = engine(vec![Note::hold(0, 0, 1000.0, 2000.0)]);

        let misses = engine.on_tick(5000.0);
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].phase, HitPhase::Head);
        assert!(engine.on_tick(6000.0).is_empty());
    }

    #[test]
    fn test_reset_restores_pending() {
        let mut engine = engine(vec![Note::tap(0, 0, 1000.0)]);
        engine.on_tick(5000.0);
        engine.reset();

        assert_eq!(engine.queue().state(0), NoteState::Pending);
        assert_eq!(engine.on_tick(5000.0).len(), 1);
    }

    #[test]
    fn test_empty_chart_is_complete() {
        let engine = engine(vec![]);
        assert!(engine.is_complete());
    }
}
