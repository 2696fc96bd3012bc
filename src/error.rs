//! Error types for chart loading, configuration, gameplay and replays.

use std::path::PathBuf;
use thiserror::Error;

/// Problems found while building a [`Chart`](crate::models::engine::Chart).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("invalid lane count {0}")]
    InvalidLaneCount(usize),

    #[error("note {id} uses lane {lane} but the chart has {lane_count} lanes")]
    LaneOutOfRange { id: u32, lane: usize, lane_count: usize },

    #[error("note id {0} appears more than once")]
    DuplicateNoteId(u32),

    #[error("note {0} has a non-finite timestamp")]
    InvalidTime(u32),

    #[error("hold note {id} ends at {end_ms}ms, before its start at {start_ms}ms")]
    InvalidHold { id: u32, start_ms: f64, end_ms: f64 },

    #[error("failed to parse chart: {0}")]
    Parse(String),
}

/// Rejected gameplay configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("rate {0} is outside the supported range")]
    InvalidRate(f64),

    #[error("lane count {0} is outside the supported range")]
    InvalidLaneCount(usize),

    #[error("invalid judgment windows: {0}")]
    InvalidWindows(String),

    #[error("failed to read config file: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Errors surfaced by the judgment engine and the gameplay session.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("input on lane {lane} rejected, chart has {lane_count} lanes")]
    InputOutOfRange { lane: usize, lane_count: usize },

    #[error("input on lane {0} has a non-finite timestamp")]
    InvalidTimestamp(usize),

    #[error("chart has {chart} lanes but the configuration expects {config}")]
    LaneCountMismatch { chart: usize, config: usize },

    #[error("replay was recorded on chart {expected}, got {actual}")]
    ChartMismatch { expected: String, actual: String },

    #[error("failed to read chart file: {path}")]
    ChartIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while persisting or loading replays.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("deserialization error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported replay format version {0}")]
    UnsupportedVersion(u8),
}

pub type Result<T> = std::result::Result<T, EngineError>;
