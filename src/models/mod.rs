//! Data model of the judgment core: charts, windows, judgments, score,
//! settings, replays and results.

pub mod engine;
pub mod replay;
pub mod result;
pub mod score;
pub mod settings;
pub mod stats;
