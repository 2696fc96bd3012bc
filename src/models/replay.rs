//! Serializable replay structures and replay simulation.
//!
//! A replay is the ordered log of everything that changed note state during
//! a session: every accepted input (with the judgment it produced) and every
//! tick that expired notes. Feeding the same log back into a session over
//! the same chart and configuration reproduces the score exactly.

use crate::error::EngineError;
use crate::input::events::{InputEvent, InputKind};
use crate::models::engine::{Chart, ManualClock};
use crate::models::result::{GameResultData, SessionStatus};
use crate::models::settings::GameplayConfig;
use crate::models::stats::Judgment;
use crate::state::game::GameSession;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

/// Current replay format version for compatibility.
pub const REPLAY_FORMAT_VERSION: u8 = 1;

/// Minimum interval between practice checkpoints (ms of chart time).
pub const CHECKPOINT_MIN_INTERVAL_MS: f64 = 15_000.0;

/// A single user input (press or release).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayInput {
    /// Capture time in chart ms.
    pub time_ms: f64,
    /// Packed data: (lane << 1) | is_press
    /// Bit 0: is_press (1 = press, 0 = release)
    /// Bits 1-7: lane index
    pub payload: u8,
}

impl ReplayInput {
    pub fn pack(event: &InputEvent) -> Self {
        let payload = ((event.lane as u8) << 1) | (event.is_press() as u8);
        Self {
            time_ms: event.timestamp_ms,
            payload,
        }
    }

    /// Unpack lane and is_press from payload.
    #[inline]
    pub fn unpack(&self) -> (usize, bool) {
        let is_press = (self.payload & 1) != 0;
        let lane = (self.payload >> 1) as usize;
        (lane, is_press)
    }

    pub fn to_event(&self) -> InputEvent {
        let (lane, is_press) = self.unpack();
        InputEvent {
            lane,
            kind: if is_press {
                InputKind::Press
            } else {
                InputKind::Release
            },
            timestamp_ms: self.time_ms,
        }
    }
}

/// One entry of the replay log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayFrame {
    /// An input and the judgment it produced, if any.
    Input {
        input: ReplayInput,
        judgment: Option<Judgment>,
    },
    /// A clock tick that expired at least one note.
    Tick { time_ms: f64 },
    /// A backward seek: frames at or after `time_ms` before this one no
    /// longer count.
    Seek { time_ms: f64 },
}

impl ReplayFrame {
    pub fn time_ms(&self) -> f64 {
        match self {
            ReplayFrame::Input { input, .. } => input.time_ms,
            ReplayFrame::Tick { time_ms } | ReplayFrame::Seek { time_ms } => *time_ms,
        }
    }
}

/// How and when the recorded session ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayEnd {
    pub status: SessionStatus,
    /// Last clock time observed, if the clock ever ticked.
    pub time_ms: Option<f64>,
}

/// Sink for the ordered (input, judgment) stream of a session.
pub trait ReplayRecorder {
    fn record_input(&mut self, event: &InputEvent, judgment: Option<&Judgment>);

    /// Called for ticks that expired notes. Ignored by default.
    fn record_tick(&mut self, _time_ms: f64, _misses: &[Judgment]) {}

    /// Called when a backward seek discards everything from `target_ms` on.
    fn record_seek(&mut self, target_ms: f64);
}

/// Full replay of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayData {
    /// Format version for future compatibility.
    pub version: u8,
    /// Md5 of the chart the replay was recorded on.
    pub chart_hash: String,
    /// Settings the session ran with.
    pub config: GameplayConfig,
    /// All frames in the order they were processed.
    pub frames: Vec<ReplayFrame>,
    /// Whether practice mode was enabled (scores labeled differently).
    pub is_practice_mode: bool,
    /// Checkpoints placed by the user (chart ms).
    pub checkpoints: Vec<f64>,
    pub end: Option<ReplayEnd>,
}

impl ReplayData {
    pub fn new(chart_hash: String, config: GameplayConfig) -> Self {
        Self {
            version: REPLAY_FORMAT_VERSION,
            chart_hash,
            config,
            frames: Vec::new(),
            is_practice_mode: false,
            checkpoints: Vec::new(),
            end: None,
        }
    }

    /// Adds a checkpoint if the minimum interval is respected.
    ///
    /// Returns `true` if the checkpoint was added.
    pub fn add_checkpoint(&mut self, time_ms: f64) -> bool {
        if let Some(&last) = self.checkpoints.last() {
            if (time_ms - last).abs() < CHECKPOINT_MIN_INTERVAL_MS {
                return false;
            }
        }
        self.checkpoints.push(time_ms);
        true
    }

    /// Returns the last checkpoint timestamp, if any.
    pub fn last_checkpoint(&self) -> Option<f64> {
        self.checkpoints.last().copied()
    }

    /// Empties the log, returning the frames recorded before `time_ms`.
    ///
    /// Used when seeking backward: the returned frames are fed again and
    /// re-recorded, frames at or after the target are dropped.
    pub fn take_frames_before(&mut self, time_ms: f64) -> Vec<ReplayFrame> {
        std::mem::take(&mut self.frames)
            .into_iter()
            .filter(|f| f.time_ms() < time_ms)
            .collect()
    }

    /// Recorded input events, in order.
    pub fn inputs(&self) -> impl Iterator<Item = InputEvent> + '_ {
        self.frames.iter().filter_map(|f| match f {
            ReplayFrame::Input { input, .. } => Some(input.to_event()),
            ReplayFrame::Tick { .. } | ReplayFrame::Seek { .. } => None,
        })
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ReplayRecorder for ReplayData {
    fn record_input(&mut self, event: &InputEvent, judgment: Option<&Judgment>) {
        self.frames.push(ReplayFrame::Input {
            input: ReplayInput::pack(event),
            judgment: judgment.copied(),
        });
    }

    fn record_tick(&mut self, time_ms: f64, misses: &[Judgment]) {
        if !misses.is_empty() {
            self.frames.push(ReplayFrame::Tick { time_ms });
        }
    }

    fn record_seek(&mut self, target_ms: f64) {
        self.frames.retain(|f| f.time_ms() < target_ms);
    }
}

/// Forwards frames to another thread (e.g. a replay writer).
pub struct ChannelRecorder {
    tx: Sender<ReplayFrame>,
    disconnected: bool,
}

impl ChannelRecorder {
    pub fn new(tx: Sender<ReplayFrame>) -> Self {
        Self {
            tx,
            disconnected: false,
        }
    }

    fn send(&mut self, frame: ReplayFrame) {
        if self.tx.send(frame).is_err() && !self.disconnected {
            log::warn!("REPLAY: Receiver dropped, frames are no longer forwarded");
            self.disconnected = true;
        }
    }
}

impl ReplayRecorder for ChannelRecorder {
    fn record_input(&mut self, event: &InputEvent, judgment: Option<&Judgment>) {
        self.send(ReplayFrame::Input {
            input: ReplayInput::pack(event),
            judgment: judgment.copied(),
        });
    }

    fn record_tick(&mut self, time_ms: f64, misses: &[Judgment]) {
        if !misses.is_empty() {
            self.send(ReplayFrame::Tick { time_ms });
        }
    }

    fn record_seek(&mut self, target_ms: f64) {
        self.send(ReplayFrame::Seek { time_ms: target_ms });
    }
}

/// Re-runs a replay on `chart` with the settings it was recorded with.
///
/// The chart must be the one the replay was recorded on.
pub fn simulate_replay(replay: &ReplayData, chart: &Chart) -> Result<GameResultData, EngineError> {
    simulate_replay_with(replay, chart, replay.config.clone())
}

/// Re-runs a replay with different settings, e.g. another hit window.
pub fn simulate_replay_with(
    replay: &ReplayData,
    chart: &Chart,
    config: GameplayConfig,
) -> Result<GameResultData, EngineError> {
    let actual = chart.hash();
    if actual != replay.chart_hash {
        return Err(EngineError::ChartMismatch {
            expected: replay.chart_hash.clone(),
            actual,
        });
    }

    let mut session = GameSession::new(chart, config, ManualClock::default())?;
    if replay.is_practice_mode {
        session.enable_practice_mode();
    }

    // Frames after the end are no-ops, except seeks in practice mode.
    for frame in &replay.frames {
        session.apply_frame(frame);
    }

    match replay.end {
        Some(ReplayEnd {
            status: SessionStatus::Quit,
            time_ms,
        }) => {
            if let Some(t) = time_ms {
                session.advance_to(t);
            }
            session.quit();
        }
        _ => {
            let end = chart.duration_ms() + session.engine().widest_ms() + 1.0;
            session.advance_to(end);
        }
    }

    log::debug!(
        "REPLAY: Simulated {} frames, status {:?}",
        replay.frames.len(),
        session.status()
    );
    Ok(session.finalize())
}

/// Plays `chart` perfectly: every note is pressed on its start and released
/// on its end.
pub fn autoplay(chart: &Chart, config: GameplayConfig) -> Result<GameResultData, EngineError> {
    // Hold releases sort before presses at the same time, tap releases after.
    let mut events: Vec<(f64, u8, InputEvent)> = Vec::with_capacity(chart.len() * 2);
    for note in chart.notes() {
        events.push((note.start_ms, 1, InputEvent::press(note.lane, note.start_ms)));
        match note.end_ms {
            Some(end) => events.push((end, 0, InputEvent::release(note.lane, end))),
            None => events.push((note.start_ms, 2, InputEvent::release(note.lane, note.start_ms))),
        }
    }
    events.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut session = GameSession::new(chart, config, ManualClock::default())?;
    for (time_ms, _, event) in events {
        session.clock_mut().set(time_ms);
        session.update();
        session.handle_input(event);
    }
    session.advance_to(chart.duration_ms() + session.engine().widest_ms() + 1.0);

    log::info!("REPLAY: Autoplay finished with {:?}", session.status());
    Ok(session.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::engine::Note;
    use crate::models::stats::{Grade, HitPhase, JudgmentKind};

    #[test]
    fn test_pack_unpack() {
        for event in [
            InputEvent::press(0, 12.5),
            InputEvent::release(6, 300.0),
            InputEvent::press(9, -4.0),
        ] {
            let input = ReplayInput::pack(&event);
            assert_eq!(input.to_event(), event);
        }
        assert_eq!(ReplayInput::pack(&InputEvent::press(3, 0.0)).payload, 0b111);
    }

    #[test]
    fn test_checkpoint_interval() {
        let mut replay = ReplayData::new("hash".into(), GameplayConfig::default());
        assert!(replay.add_checkpoint(1000.0));
        assert!(!replay.add_checkpoint(10_000.0));
        assert!(replay.add_checkpoint(16_000.0));
        assert_eq!(replay.last_checkpoint(), Some(16_000.0));
    }

    #[test]
    fn test_take_frames_before() {
        let mut replay = ReplayData::new("hash".into(), GameplayConfig::default());
        replay.record_input(&InputEvent::press(0, 100.0), None);
        replay.record_tick(200.0, &[]);
        replay.record_tick(
            300.0,
            &[Judgment {
                note_id: 0,
                lane: 0,
                kind: JudgmentKind::Miss,
                offset_ms: 164.0,
                timestamp_ms: 264.0,
                phase: HitPhase::Head,
            }],
        );
        replay.record_input(&InputEvent::release(0, 400.0), None);

        // Empty ticks are not recorded.
        assert_eq!(replay.frames.len(), 3);

        let kept = replay.take_frames_before(300.0);
        assert_eq!(kept.len(), 1);
        assert!(replay.frames.is_empty());
    }

    #[test]
    fn test_record_seek_drops_later_frames() {
        let mut replay = ReplayData::new("hash".into(), GameplayConfig::default());
        replay.record_input(&InputEvent::press(0, 100.0), None);
        replay.record_input(&InputEvent::press(1, 500.0), None);
        replay.record_seek(300.0);
        replay.record_input(&InputEvent::press(1, 520.0), None);

        let times: Vec<f64> = replay.frames.iter().map(|f| f.time_ms()).collect();
        assert_eq!(times, vec![100.0, 520.0]);
    }

    #[test]
    fn test_channel_recorder_forwards_frames() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut recorder = ChannelRecorder::new(tx);

        recorder.record_input(&InputEvent::press(1, 50.0), None);
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.time_ms(), 50.0);

        drop(rx);
        recorder.record_input(&InputEvent::press(1, 60.0), None);
        assert!(recorder.disconnected);
    }

    #[test]
    fn test_autoplay_is_perfect_and_replays() {
        let chart = Chart::new(
            4,
            vec![
                Note::tap(0, 0, 500.0),
                Note::hold(1, 1, 500.0, 900.0),
                Note::tap(2, 1, 900.0),
                Note::tap(3, 0, 510.0),
            ],
        )
        .unwrap();

        let result = autoplay(&chart, GameplayConfig::default()).unwrap();
        assert_eq!(result.status, SessionStatus::Completed);
        assert_eq!(result.grade, Grade::X);
        assert_eq!(
            result.score.judgment_counts.get(JudgmentKind::Marvelous) as usize,
            chart.len()
        );
        assert_eq!(result.score.release.counts.get(JudgmentKind::Marvelous), 1);
        assert_eq!(result.ghost_taps, 0);

        let simulated = simulate_replay(&result.replay, &chart).unwrap();
        assert_eq!(simulated.score, result.score);
    }

    #[test]
    fn test_simulate_with_other_windows() {
        let chart = Chart::new(4, vec![Note::tap(0, 0, 1000.0)]).unwrap();
        let mut replay = ReplayData::new(chart.hash(), GameplayConfig::default());
        replay.record_input(&InputEvent::press(0, 1030.0), None);

        let standard = simulate_replay(&replay, &chart).unwrap();
        assert_eq!(standard.judgments[0].kind, JudgmentKind::Perfect);

        let config = GameplayConfig {
            hit_window: crate::models::settings::HitWindowConfig {
                mode: crate::models::settings::HitWindowMode::EtternaJudge,
                value: 1.0,
                custom: Vec::new(),
            },
            ..Default::default()
        };
        let judge1 = simulate_replay_with(&replay, &chart, config).unwrap();
        assert_eq!(judge1.judgments[0].kind, JudgmentKind::Marvelous);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut replay = ReplayData::new("abc".into(), GameplayConfig::default());
        replay.record_input(&InputEvent::press(2, 1000.0), None);
        let json = replay.to_json().unwrap();
        assert_eq!(ReplayData::from_json(&json).unwrap(), replay);
    }
}
