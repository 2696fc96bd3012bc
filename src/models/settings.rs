//! Gameplay configuration consumed by the judgment core.
//!
//! Stored as TOML. A missing file yields defaults; a malformed one is an
//! error the caller decides how to surface.

use crate::error::ConfigError;
use crate::models::engine::{HitWindow, MAX_LANES, WindowBand};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MIN_RATE: f64 = 0.5;
pub const MAX_RATE: f64 = 2.0;
/// Rate change per `step_rate` call.
pub const RATE_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HitWindowMode {
    #[default]
    Standard,
    OsuOD,
    EtternaJudge,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitWindowConfig {
    pub mode: HitWindowMode,
    /// OD (0.0-10.0) or judge level (1-9), ignored by other modes.
    pub value: f64,
    /// Bands used by [`HitWindowMode::Custom`].
    pub custom: Vec<WindowBand>,
}

impl Default for HitWindowConfig {
    fn default() -> Self {
        Self {
            mode: HitWindowMode::Standard,
            value: 5.0,
            custom: Vec::new(),
        }
    }
}

impl HitWindowConfig {
    pub fn custom(bands: Vec<WindowBand>) -> Self {
        Self {
            mode: HitWindowMode::Custom,
            value: 0.0,
            custom: bands,
        }
    }

    /// Builds the bands for this configuration.
    pub fn build(&self) -> Result<HitWindow, ConfigError> {
        match self.mode {
            HitWindowMode::Standard => Ok(HitWindow::new()),
            HitWindowMode::OsuOD => {
                if !(0.0..=10.0).contains(&self.value) {
                    return Err(ConfigError::InvalidWindows(format!(
                        "OD {} outside 0-10",
                        self.value
                    )));
                }
                Ok(HitWindow::from_osu_od(self.value))
            }
            HitWindowMode::EtternaJudge => {
                if !(1.0..=9.0).contains(&self.value) || self.value.fract() != 0.0 {
                    return Err(ConfigError::InvalidWindows(format!(
                        "judge {} is not a level from 1 to 9",
                        self.value
                    )));
                }
                Ok(HitWindow::from_etterna_judge(self.value as u8))
            }
            HitWindowMode::Custom => HitWindow::from_custom(self.custom.clone()),
        }
    }

    /// Display string for result screens.
    pub fn label(&self) -> String {
        match self.mode {
            HitWindowMode::Standard => "Standard".to_string(),
            HitWindowMode::OsuOD => format!("OD {:.1}", self.value),
            HitWindowMode::EtternaJudge => format!("Judge {:.0}", self.value),
            HitWindowMode::Custom => "Custom".to_string(),
        }
    }
}

/// How hard health swings with each judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HealthMode {
    #[default]
    Standard,
    /// Double damage, half recovery.
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplayConfig {
    /// Playback speed multiplier.
    pub rate: f64,
    /// Whether rate changes shift pitch. Audio only.
    pub pitched: bool,
    pub lane_count: usize,
    pub fail_on_zero_health: bool,
    pub health_mode: HealthMode,
    /// Backward clock jumps smaller than this are treated as jitter.
    pub clock_regression_tolerance_ms: f64,
    // Kept last: TOML tables must follow plain values.
    pub hit_window: HitWindowConfig,
}

impl Default for GameplayConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitched: true,
            lane_count: 4,
            fail_on_zero_health: true,
            health_mode: HealthMode::Standard,
            clock_regression_tolerance_ms: 10.0,
            hit_window: HitWindowConfig::default(),
        }
    }
}

impl GameplayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rate.is_finite() || !(MIN_RATE..=MAX_RATE).contains(&self.rate) {
            return Err(ConfigError::InvalidRate(self.rate));
        }
        if self.lane_count == 0 || self.lane_count > MAX_LANES {
            return Err(ConfigError::InvalidLaneCount(self.lane_count));
        }
        self.hit_window.build()?;
        Ok(())
    }

    /// Raises or lowers the rate by one step, rounded to one decimal.
    pub fn step_rate(&mut self, steps: i32) {
        let stepped = self.rate + RATE_STEP * steps as f64;
        self.rate = ((stepped * 10.0).round() / 10.0).clamp(MIN_RATE, MAX_RATE);
        log::debug!("CONFIG: Rate set to {:.1}x", self.rate);
    }
}

/// Loads a configuration from TOML, or defaults if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<GameplayConfig, ConfigError> {
    if !path.exists() {
        log::info!("CONFIG: {:?} not found, using defaults", path);
        return Ok(GameplayConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: GameplayConfig = toml::from_str(&content)?;
    config.validate()?;

    log::info!("CONFIG: Loaded gameplay config from {:?}", path);
    Ok(config)
}

/// Writes a configuration as pretty TOML.
pub fn save_config(config: &GameplayConfig, path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
