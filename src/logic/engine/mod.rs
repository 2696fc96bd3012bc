//! Gameplay judgment engine.
//!
//! The `JudgmentEngine` maps timestamped lane inputs and the playback clock
//! onto chart notes and emits [`Judgment`]s:
//! - presses and releases are matched in `input.rs`
//! - notes whose window closed are expired in `notes.rs`
//!
//! Between calls it keeps no state besides the [`NoteQueue`] it owns.

mod input;
mod notes;

use crate::error::EngineError;
use crate::models::engine::{Chart, HitWindow, NoteQueue, WindowBand};
use crate::models::settings::GameplayConfig;

/// Real-time judgment state machine.
#[derive(Debug, Clone)]
pub struct JudgmentEngine {
    queue: NoteQueue,
    hit_window: HitWindow,
    rate: f64,
    /// Latest time passed to `on_tick`.
    last_tick_ms: f64,
    /// Latest input timestamp per lane, for ordering diagnostics.
    last_input_ms: Vec<f64>,
    /// Presses that matched no note.
    ghost_taps: u32,
}

impl JudgmentEngine {
    pub fn new(chart: &Chart, hit_window: HitWindow, rate: f64) -> Self {
        if chart.is_empty() {
            log::info!("ENGINE: Empty chart, nothing to judge");
        } else {
            log::info!(
                "ENGINE: {} notes on {} lanes, widest window {:.1}ms at {:.2}x",
                chart.len(),
                chart.lane_count(),
                hit_window.widest_ms(),
                rate
            );
        }

        Self {
            queue: NoteQueue::new(chart),
            hit_window,
            rate,
            last_tick_ms: f64::NEG_INFINITY,
            last_input_ms: vec![f64::NEG_INFINITY; chart.lane_count()],
            ghost_taps: 0,
        }
    }

    /// Builds an engine after validating `config` against `chart`.
    pub fn from_config(chart: &Chart, config: &GameplayConfig) -> Result<Self, EngineError> {
        config.validate()?;
        if chart.lane_count() != config.lane_count {
            return Err(EngineError::LaneCountMismatch {
                chart: chart.lane_count(),
                config: config.lane_count,
            });
        }
        let hit_window = config.hit_window.build()?;
        Ok(Self::new(chart, hit_window, config.rate))
    }

    /// Discards all progress; every note is `Pending` again.
    pub fn reset(&mut self) {
        self.queue.reset();
        self.last_tick_ms = f64::NEG_INFINITY;
        self.last_input_ms.fill(f64::NEG_INFINITY);
        self.ghost_taps = 0;
    }

    pub fn queue(&self) -> &NoteQueue {
        &self.queue
    }

    pub fn lane_count(&self) -> usize {
        self.queue.lane_count()
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Bands in effect for this session.
    pub fn windows(&self) -> &[WindowBand] {
        self.hit_window.windows_for(self.rate)
    }

    /// Outermost tolerance; also the look-ahead horizon for candidates.
    pub fn widest_ms(&self) -> f64 {
        self.windows().last().map_or(0.0, |b| b.max_abs_ms)
    }

    pub fn last_tick_ms(&self) -> f64 {
        self.last_tick_ms
    }

    pub fn ghost_taps(&self) -> u32 {
        self.ghost_taps
    }

    /// Every note is Judged or Missed.
    pub fn is_complete(&self) -> bool {
        self.queue.is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::events::InputEvent;
    use crate::models::engine::{Note, NoteState};
    use crate::models::settings::HitWindowConfig;
    use crate::models::stats::HitPhase;
    use proptest::prelude::*;

    /// Charts with non-overlapping notes per lane.
    fn chart_strategy() -> impl Strategy<Value = Chart> {
        prop::collection::vec((0usize..4, 1u32..400, prop::option::of(1u32..300)), 0..60).prop_map(
            |specs| {
                let mut cursor = [0.0f64; 4];
                let notes = specs
                    .into_iter()
                    .enumerate()
                    .map(|(id, (lane, gap, hold))| {
                        let start = cursor[lane] + gap as f64;
                        let note = match hold {
                            Some(len) => Note::hold(id as u32, lane, start, start + len as f64),
                            None => Note::tap(id as u32, lane, start),
                        };
                        cursor[lane] = note.end_time_ms();
                        note
                    })
                    .collect();
                Chart::new(4, notes).unwrap()
            },
        )
    }

    #[test]
    fn test_from_config_checks_lane_count() {
        let chart = Chart::new(7, vec![Note::tap(0, 6, 100.0)]).unwrap();
        let err = JudgmentEngine::from_config(&chart, &GameplayConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::LaneCountMismatch {
                chart: 7,
                config: 4
            }
        ));

        let config = GameplayConfig {
            lane_count: 7,
            hit_window: HitWindowConfig {
                mode: crate::models::settings::HitWindowMode::OsuOD,
                value: 8.0,
                custom: Vec::new(),
            },
            ..Default::default()
        };
        let engine = JudgmentEngine::from_config(&chart, &config).unwrap();
        assert_eq!(engine.widest_ms(), 164.0);
    }

    proptest! {
        #[test]
        fn prop_no_input_misses_every_note(chart in chart_strategy()) {
            let mut engine = JudgmentEngine::new(&chart, HitWindow::new(), 1.0);
            let end = chart.duration_ms() + engine.widest_ms() + 1.0;

            let misses = engine.on_tick(end);
            prop_assert_eq!(misses.len(), chart.len());
            prop_assert!(misses.iter().all(|j| j.kind.is_miss() && j.phase == HitPhase::Head));
            prop_assert!(engine.is_complete());
            prop_assert!(engine.queue().states().iter().all(|s| *s == NoteState::Missed));
        }

        #[test]
        fn prop_exact_press_is_best_kind(chart in chart_strategy(), pick in any::<prop::sample::Index>()) {
            prop_assume!(!chart.is_empty());
            let note = &chart.notes()[pick.index(chart.len())];
            let mut engine = JudgmentEngine::new(&chart, HitWindow::new(), 1.0);

            let j = engine.on_input(&InputEvent::press(note.lane, note.start_ms)).unwrap();
            let j = j.expect("a press on the note start always matches");
            prop_assert_eq!(j.note_id, note.id);
            prop_assert_eq!(j.kind, engine.windows()[0].kind);
            prop_assert_eq!(j.offset_ms, 0.0);
        }

        #[test]
        fn prop_tick_is_idempotent(chart in chart_strategy(), t in 0.0f64..30_000.0, back in 0.0f64..5_000.0) {
            let mut engine = JudgmentEngine::new(&chart, HitWindow::new(), 1.0);
            engine.on_tick(t);
            let states = engine.queue().states().to_vec();

            prop_assert!(engine.on_tick(t).is_empty());
            prop_assert!(engine.on_tick(t - back).is_empty());
            prop_assert_eq!(engine.queue().states(), states.as_slice());
        }

        #[test]
        fn prop_tick_misses_are_time_ordered(chart in chart_strategy(), t in 0.0f64..30_000.0) {
            let mut engine = JudgmentEngine::new(&chart, HitWindow::new(), 1.0);
            let misses = engine.on_tick(t);
            let starts: Vec<f64> = misses
                .iter()
                .map(|j| chart.notes().iter().find(|n| n.id == j.note_id).unwrap().start_ms)
                .collect();
            prop_assert!(starts.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
