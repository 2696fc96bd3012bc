//! Play session driving the judgment engine.
//!
//! The `GameSession` glues the pieces of a play together:
//! - reads the [`TimingProvider`] once per frame and expires notes
//! - routes inputs to the [`JudgmentEngine`]
//! - feeds every judgment to the [`ScoreAccumulator`]
//! - records the replay log
//! - practice mode with checkpoints
//!
//! Inputs are processed after ticking the engine to their own timestamp, so
//! the same log of inputs and ticks always yields the same judgments.

mod input;
mod practice;
mod snapshot;

use crate::error::EngineError;
use crate::input::events::InputEvent;
use crate::logic::engine::JudgmentEngine;
use crate::models::engine::{Chart, TimingProvider};
use crate::models::replay::{ReplayData, ReplayEnd, ReplayFrame, ReplayRecorder};
use crate::models::result::{GameResultData, SessionStatus};
use crate::models::score::ScoreAccumulator;
use crate::models::settings::GameplayConfig;
use crate::models::stats::{Grade, Judgment};
use std::collections::VecDeque;

/// Offset applied when retrying from a checkpoint (in ms).
/// The player starts 1 second before the checkpoint to prepare.
pub(crate) const CHECKPOINT_RETRY_OFFSET_MS: f64 = 1000.0;

/// One play of one chart.
pub struct GameSession<C: TimingProvider> {
    clock: C,
    config: GameplayConfig,
    chart_hash: String,
    chart_duration_ms: f64,

    engine: JudgmentEngine,
    score: ScoreAccumulator,
    status: SessionStatus,

    /// Replay log, always recorded.
    replay: ReplayData,
    /// Optional second sink, e.g. a [`ChannelRecorder`](crate::models::replay::ChannelRecorder).
    sink: Option<Box<dyn ReplayRecorder + Send>>,
    /// Set while frames are re-fed after a backward seek.
    rebuilding: bool,

    /// Latest clock time observed.
    last_time_ms: f64,
    /// Currently held keys per lane.
    keys_held: Vec<bool>,
    last_judgment: Option<Judgment>,
    /// Press timestamps of the last second, for NPS.
    press_timestamps: VecDeque<f64>,

    practice_mode: bool,
    checkpoint_ms: Option<f64>,
    /// Timestamp of the last checkpoint (for cooldown enforcement).
    last_checkpoint_time: f64,
}

impl<C: TimingProvider> GameSession<C> {
    /// Starts a session on `chart`.
    ///
    /// Fails if `config` is invalid or doesn't match the chart's key mode.
    pub fn new(chart: &Chart, config: GameplayConfig, clock: C) -> Result<Self, EngineError> {
        let engine = JudgmentEngine::from_config(chart, &config)?;
        let chart_hash = chart.hash();

        let status = if chart.is_empty() {
            SessionStatus::Completed
        } else {
            SessionStatus::Running
        };

        log::info!(
            "SESSION: Start {} ({} notes, {}K) at {:.1}x, windows {}",
            chart_hash,
            chart.len(),
            chart.lane_count(),
            config.rate,
            config.hit_window.label()
        );

        let mut replay = ReplayData::new(chart_hash.clone(), config.clone());
        if status == SessionStatus::Completed {
            replay.end = Some(ReplayEnd {
                status,
                time_ms: None,
            });
        }

        Ok(Self {
            clock,
            score: ScoreAccumulator::new(config.health_mode, config.fail_on_zero_health),
            keys_held: vec![false; chart.lane_count()],
            chart_hash,
            chart_duration_ms: chart.duration_ms(),
            engine,
            status,
            replay,
            sink: None,
            rebuilding: false,
            last_time_ms: f64::NEG_INFINITY,
            last_judgment: None,
            press_timestamps: VecDeque::new(),
            practice_mode: false,
            checkpoint_ms: None,
            last_checkpoint_time: f64::NEG_INFINITY,
            config,
        })
    }

    /// Forwards every recorded frame to `sink` as well.
    pub fn with_recorder(mut self, sink: Box<dyn ReplayRecorder + Send>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Reads the clock and expires every note whose window closed.
    ///
    /// A clock that jumped backward by more than the configured tolerance is
    /// treated as a seek to the new position. NaN or infinite readings are
    /// skipped.
    ///
    /// Inputs captured before this frame must be handled first, otherwise a
    /// press that landed inside a window but is delivered after its deadline
    /// finds the note already missed. [`process_frame`](Self::process_frame)
    /// does both in the right order.
    pub fn update(&mut self) -> SessionStatus {
        if self.status.is_over() {
            return self.status;
        }

        let now = self.clock.current_time_ms();
        if !now.is_finite() {
            log::warn!("SESSION: Clock returned {}, skipping frame", now);
            return self.status;
        }
        if now + self.config.clock_regression_tolerance_ms < self.last_time_ms {
            log::warn!(
                "SESSION: Clock went back from {:.1}ms to {:.1}ms, rebuilding",
                self.last_time_ms,
                now
            );
            self.seek(now);
        } else {
            self.advance_to(now);
        }
        self.status
    }

    /// Handles the inputs captured since the last frame, in capture order,
    /// then reads the clock.
    pub fn process_frame(
        &mut self,
        inputs: impl IntoIterator<Item = InputEvent>,
    ) -> SessionStatus {
        let mut inputs: Vec<InputEvent> = inputs.into_iter().collect();
        inputs.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
        for event in inputs {
            self.handle_input(event);
        }
        self.update()
    }

    /// Moves play to `target_ms`.
    ///
    /// Forward seeks expire everything skipped over. Backward seeks rebuild
    /// note and score state from the replay frames recorded before the
    /// target; later frames are discarded and the recorder is told so. The
    /// caller seeks the clock itself.
    pub fn seek(&mut self, target_ms: f64) {
        if !target_ms.is_finite() {
            log::warn!("SESSION: Ignoring seek to {}", target_ms);
            return;
        }
        let allowed = match self.status {
            SessionStatus::Running => true,
            SessionStatus::Completed | SessionStatus::Failed => self.practice_mode,
            SessionStatus::Quit => false,
        };
        if !allowed {
            log::debug!("SESSION: Ignoring seek in state {:?}", self.status);
            return;
        }

        if target_ms >= self.engine.last_tick_ms() {
            self.advance_to(target_ms);
            return;
        }

        let frames = self.replay.take_frames_before(target_ms);
        log::info!(
            "SESSION: Rebuilding from {} frames before {:.1}ms",
            frames.len(),
            target_ms
        );
        self.record_seek(target_ms);

        self.engine.reset();
        self.score.reset();
        self.status = SessionStatus::Running;
        self.replay.end = None;
        self.last_judgment = None;
        self.keys_held.fill(false);
        self.press_timestamps.clear();
        self.last_time_ms = f64::NEG_INFINITY;

        self.rebuilding = true;
        for frame in &frames {
            if self.status.is_over() {
                break;
            }
            self.apply_frame(frame);
        }
        self.rebuilding = false;

        self.advance_to(target_ms);
    }

    /// Feeds one recorded frame back into the session.
    pub fn apply_frame(&mut self, frame: &ReplayFrame) {
        match frame {
            ReplayFrame::Input { input, .. } => {
                self.handle_input(input.to_event());
            }
            ReplayFrame::Tick { time_ms } => self.advance_to(*time_ms),
            ReplayFrame::Seek { time_ms } => self.seek(*time_ms),
        }
    }

    /// Expires notes up to `time_ms` without reading the clock.
    pub fn advance_to(&mut self, time_ms: f64) {
        if self.status.is_over() || !time_ms.is_finite() {
            return;
        }
        self.last_time_ms = self.last_time_ms.max(time_ms);

        let misses = self.engine.on_tick(time_ms);
        if !misses.is_empty() {
            self.record_tick(time_ms, &misses);
            for j in &misses {
                if !self.apply(j) {
                    break;
                }
            }
        }
        self.check_completion();
    }

    /// Ends the session early.
    pub fn quit(&mut self) {
        if self.status.is_over() {
            return;
        }
        log::info!("SESSION: Quit at {:.1}ms", self.last_time_ms);
        self.end(SessionStatus::Quit);
    }

    /// Freezes the session into its result. A running session counts as quit.
    pub fn finalize(mut self) -> GameResultData {
        self.quit();

        let ghost_taps = self.engine.ghost_taps();
        let (score, judgments) = self.score.finalize();
        let accuracy = score.accuracy();
        let grade = Grade::from_accuracy(accuracy, score.failed);

        log::info!(
            "SESSION: {:?} with {} points, {:.2}% ({:?})",
            self.status,
            score.total_score,
            accuracy,
            grade
        );

        GameResultData {
            chart_hash: self.chart_hash,
            rate: self.config.rate,
            judge_text: self.config.hit_window.label(),
            score,
            accuracy,
            grade,
            judgments,
            ghost_taps,
            status: self.status,
            replay: self.replay,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn engine(&self) -> &JudgmentEngine {
        &self.engine
    }

    pub fn score(&self) -> &ScoreAccumulator {
        &self.score
    }

    pub fn replay(&self) -> &ReplayData {
        &self.replay
    }

    pub fn config(&self) -> &GameplayConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Latest clock time observed, `NEG_INFINITY` before the first update.
    pub fn time_ms(&self) -> f64 {
        self.last_time_ms
    }

    /// Applies a judgment to the score. Returns `false` once failed.
    fn apply(&mut self, j: &Judgment) -> bool {
        if !self.score.apply_judgment(j) {
            return false;
        }
        self.last_judgment = Some(*j);

        if self.score.is_failed() {
            log::info!("SESSION: Failed at {:.1}ms", j.timestamp_ms);
            self.end(SessionStatus::Failed);
            return false;
        }
        true
    }

    fn check_completion(&mut self) {
        if self.status == SessionStatus::Running && self.engine.is_complete() {
            log::info!("SESSION: All notes judged");
            self.end(SessionStatus::Completed);
        }
    }

    fn end(&mut self, status: SessionStatus) {
        self.status = status;
        self.replay.end = Some(ReplayEnd {
            status,
            time_ms: self.last_time_ms.is_finite().then_some(self.last_time_ms),
        });
    }

    fn record_tick(&mut self, time_ms: f64, misses: &[Judgment]) {
        self.replay.record_tick(time_ms, misses);
        if self.rebuilding {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.record_tick(time_ms, misses);
        }
    }

    fn record_seek(&mut self, target_ms: f64) {
        if self.rebuilding {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.record_seek(target_ms);
        }
    }
}
