//! Input handling for GameSession - handle_input

use super::GameSession;
use crate::input::events::InputEvent;
use crate::models::engine::TimingProvider;
use crate::models::replay::ReplayRecorder;
use crate::models::stats::Judgment;

impl<C: TimingProvider> GameSession<C> {
    /// Handles a timestamped lane input.
    ///
    /// Notes whose window closed before the input are expired first. Returns
    /// the judgment the input produced, if any. Inputs on lanes outside the
    /// key mode are logged and dropped.
    pub fn handle_input(&mut self, event: InputEvent) -> Option<Judgment> {
        if self.status.is_over() {
            return None;
        }

        self.advance_to(event.timestamp_ms);
        if self.status.is_over() {
            return None;
        }

        let judgment = match self.engine.on_input(&event) {
            Ok(judgment) => judgment,
            Err(e) => {
                log::warn!("SESSION: Dropping input: {}", e);
                return None;
            }
        };

        if let Some(held) = self.keys_held.get_mut(event.lane) {
            *held = event.is_press();
        }
        if event.is_press() {
            self.press_timestamps.push_back(event.timestamp_ms);
            // Remove timestamps older than 1 second
            while self
                .press_timestamps
                .front()
                .is_some_and(|&t| t < event.timestamp_ms - 1000.0)
            {
                self.press_timestamps.pop_front();
            }
        }

        self.record_input(&event, judgment.as_ref());

        if let Some(j) = &judgment {
            self.apply(j);
        }
        self.check_completion();
        judgment
    }

    /// Presses per second over the last second of input.
    pub fn nps(&self) -> f64 {
        let window_start = self.last_time_ms - 1000.0;
        self.press_timestamps
            .iter()
            .filter(|&&t| t >= window_start)
            .count() as f64
    }

    fn record_input(&mut self, event: &InputEvent, judgment: Option<&Judgment>) {
        self.replay.record_input(event, judgment);
        if self.rebuilding {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.record_input(event, judgment);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::input::events::InputEvent;
    use crate::models::engine::{Chart, ManualClock, Note};
    use crate::models::replay::{ChannelRecorder, ReplayData, ReplayFrame, simulate_replay};
    use crate::models::result::SessionStatus;
    use crate::models::settings::GameplayConfig;
    use crate::models::stats::{HitPhase, JudgmentKind};
    use crate::state::game::GameSession;

    fn chart() -> Chart {
        Chart::new(
            4,
            vec![
                Note::tap(0, 0, 1000.0),
                Note::hold(1, 1, 1000.0, 1500.0),
                Note::tap(2, 0, 1200.0),
            ],
        )
        .unwrap()
    }

    fn session() -> GameSession<ManualClock> {
        GameSession::new(&chart(), GameplayConfig::default(), ManualClock::default()).unwrap()
    }

    #[test]
    fn test_press_judges_and_scores() {
        let mut session = session();
        let j = session.handle_input(InputEvent::press(0, 1030.0)).unwrap();
        assert_eq!(j.kind, JudgmentKind::Perfect);
        assert_eq!(j.offset_ms, 30.0);

        let state = session.score().state();
        assert_eq!(state.total_score, 300);
        assert_eq!(state.current_combo, 1);
        assert_eq!(session.replay().frames.len(), 1);
    }

    #[test]
    fn test_out_of_range_lane_is_dropped() {
        let mut session = session();
        assert_eq!(session.handle_input(InputEvent::press(9, 1000.0)), None);
        assert!(session.replay().frames.is_empty());
        assert_eq!(session.status(), SessionStatus::Running);
    }

    #[test]
    fn test_input_expires_earlier_notes_first() {
        let mut session = session();
        // Note 0 closed at 1164ms; the press goes to note 2.
        let j = session.handle_input(InputEvent::press(0, 1190.0)).unwrap();
        assert_eq!(j.note_id, 2);

        let counts = &session.score().state().judgment_counts;
        assert_eq!(counts.get(JudgmentKind::Miss), 2);
        assert!(matches!(session.replay().frames[0], ReplayFrame::Tick { .. }));
    }

    #[test]
    fn test_hold_release_and_keys_held() {
        let mut session = session();
        session.handle_input(InputEvent::press(1, 1000.0));
        session.handle_input(InputEvent::press(0, 1000.0));
        assert_eq!(session.snapshot(500.0).keys_held, vec![true, true, false, false]);

        let j = session.handle_input(InputEvent::release(1, 1490.0)).unwrap();
        assert_eq!(j.phase, HitPhase::Release);
        assert_eq!(j.kind, JudgmentKind::Marvelous);
        assert!(!session.snapshot(500.0).keys_held[1]);

        session.handle_input(InputEvent::press(0, 1200.0));
        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.score().state().judgment_counts.total(), 3);
    }

    #[test]
    fn test_non_finite_time_changes_nothing() {
        let mut session = session();
        session.clock_mut().set(100.0);
        session.update();

        assert_eq!(session.handle_input(InputEvent::press(0, f64::NAN)), None);
        session.clock_mut().set(f64::NAN);
        assert_eq!(session.update(), SessionStatus::Running);
        session.seek(f64::INFINITY);

        assert_eq!(session.engine().queue().remaining(), 3);
        assert_eq!(session.score().state().judgment_counts.total(), 0);
        assert!(session.replay().frames.is_empty());
        assert_eq!(session.time_ms(), 100.0);
    }

    #[test]
    fn test_frame_inputs_are_judged_at_capture_time() {
        let mut session = session();
        session.clock_mut().set(1190.0);

        // Captured at 1003ms but only delivered once the clock reads 1190ms,
        // after note 0's window closed at 1164ms.
        let status = session.process_frame([
            InputEvent::release(0, 1050.0),
            InputEvent::press(0, 1003.0),
        ]);
        assert_eq!(status, SessionStatus::Running);

        let counts = &session.score().state().judgment_counts;
        assert_eq!(counts.get(JudgmentKind::Marvelous), 1);
        // The untouched hold head still misses.
        assert_eq!(counts.get(JudgmentKind::Miss), 1);
        assert_eq!(session.engine().ghost_taps(), 0);
    }

    #[test]
    fn test_sink_stream_reproduces_session_after_seek() {
        let chart = Chart::new(
            4,
            vec![
                Note::tap(0, 0, 1000.0),
                Note::tap(1, 1, 5000.0),
                Note::tap(2, 2, 9000.0),
            ],
        )
        .unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut session = GameSession::new(&chart, GameplayConfig::default(), ManualClock::default())
            .unwrap()
            .with_recorder(Box::new(ChannelRecorder::new(tx)));
        session.enable_practice_mode();

        session.handle_input(InputEvent::press(0, 1000.0));
        session.handle_input(InputEvent::press(1, 5000.0));
        session.seek(4000.0);
        session.handle_input(InputEvent::press(1, 5100.0));
        session.handle_input(InputEvent::press(2, 9000.0));
        assert_eq!(session.status(), SessionStatus::Completed);

        let live = session.finalize();
        let frames: Vec<ReplayFrame> = rx.try_iter().collect();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[2], ReplayFrame::Seek { time_ms: 4000.0 });
        // The session's own log only keeps what survived the seek.
        assert_eq!(live.replay.frames.len(), 3);

        let streamed = ReplayData {
            frames,
            ..live.replay.clone()
        };
        let simulated = simulate_replay(&streamed, &chart).unwrap();
        assert_eq!(simulated.score, live.score);
        assert_eq!(simulated.judgments, live.judgments);
        assert_eq!(simulated.ghost_taps, live.ghost_taps);
        let offsets: Vec<f64> = live.judgments.iter().map(|j| j.offset_ms).collect();
        assert_eq!(offsets, vec![0.0, 100.0, 0.0]);
    }
}
