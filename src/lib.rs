//! Gameplay judgment core of the rVsrg client.
//!
//! Maps timestamped key presses and a playback clock onto chart notes,
//! producing judgments, score, combo and health, and records replays that
//! reproduce a play exactly.

pub mod database;
pub mod error;
pub mod input;
pub mod logic;
pub mod models;
pub mod shared;
pub mod state;

pub use error::{ChartError, ConfigError, EngineError, ReplayError};
pub use input::{InputEvent, InputKind};
pub use logic::JudgmentEngine;
pub use models::engine::{
    AudioClock, Chart, HitWindow, ManualClock, Note, NoteState, SmoothedClock, TimingProvider,
};
pub use models::replay::{ChannelRecorder, ReplayData, ReplayRecorder, autoplay, simulate_replay};
pub use models::result::{GameResultData, SessionStatus};
pub use models::score::{ScoreAccumulator, ScoreState};
pub use models::settings::GameplayConfig;
pub use models::stats::{Grade, Judgment, JudgmentKind};
pub use state::GameSession;
