//! Definitions and constructors for hit window timing thresholds.
//!
//! Windows are defined in real elapsed time. A rate modifier changes how fast
//! the chart plays, not how precise the player has to be, so
//! [`HitWindow::windows_for`] returns the same bands for every rate.

use crate::error::ConfigError;
use crate::models::stats::JudgmentKind;
use serde::{Deserialize, Serialize};

/// A symmetric tolerance band: `|offset| <= max_abs_ms` earns `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowBand {
    pub kind: JudgmentKind,
    pub max_abs_ms: f64,
}

impl WindowBand {
    pub const fn new(kind: JudgmentKind, max_abs_ms: f64) -> Self {
        Self { kind, max_abs_ms }
    }
}

/// Ordered judgment bands, narrowest first.
#[derive(Debug, Clone, PartialEq)]
pub struct HitWindow {
    bands: Vec<WindowBand>,
}

impl HitWindow {
    /// Default bands used when no mode is selected.
    pub fn new() -> Self {
        Self {
            bands: vec![
                WindowBand::new(JudgmentKind::Marvelous, 16.0),
                WindowBand::new(JudgmentKind::Perfect, 43.0),
                WindowBand::new(JudgmentKind::Great, 76.0),
                WindowBand::new(JudgmentKind::Good, 106.0),
                WindowBand::new(JudgmentKind::Okay, 126.0),
                WindowBand::new(JudgmentKind::Miss, 164.0),
            ],
        }
    }

    /// Creates a window based on osu! Overall Difficulty (0-10).
    pub fn from_osu_od(od: f64) -> Self {
        let od = od.clamp(0.0, 10.0);
        Self {
            bands: vec![
                WindowBand::new(JudgmentKind::Marvelous, 16.0),
                WindowBand::new(JudgmentKind::Perfect, 64.0 - 3.0 * od),
                WindowBand::new(JudgmentKind::Great, 97.0 - 3.0 * od),
                WindowBand::new(JudgmentKind::Good, 127.0 - 3.0 * od),
                WindowBand::new(JudgmentKind::Okay, 151.0 - 3.0 * od),
                WindowBand::new(JudgmentKind::Miss, 188.0 - 3.0 * od),
            ],
        }
    }

    /// Creates a window based on the Etterna judge level (J4 = standard).
    pub fn from_etterna_judge(judge_level: u8) -> Self {
        let judge_level = judge_level.clamp(1, 9);
        let scale = if judge_level == 9 {
            0.2
        } else {
            1.0 - ((judge_level as f64 - 4.0) / 6.0)
        };

        // Etterna rule: Bad never drops below 180ms.
        let okay = (180.0 * scale).max(180.0);

        Self {
            bands: vec![
                WindowBand::new(JudgmentKind::Marvelous, 22.5 * scale),
                WindowBand::new(JudgmentKind::Perfect, 45.0 * scale),
                WindowBand::new(JudgmentKind::Great, 90.0 * scale),
                WindowBand::new(JudgmentKind::Good, 135.0 * scale),
                WindowBand::new(JudgmentKind::Okay, okay),
                WindowBand::new(JudgmentKind::Miss, 500.0),
            ],
        }
    }

    /// Fully custom bands. They must be narrowest first, strictly widening,
    /// with strictly worsening kinds and `Miss` (if present) last.
    pub fn from_custom(bands: Vec<WindowBand>) -> Result<Self, ConfigError> {
        if bands.iter().all(|b| b.kind.is_miss()) {
            return Err(ConfigError::InvalidWindows(
                "at least one non-miss band is required".into(),
            ));
        }

        for band in &bands {
            if !band.max_abs_ms.is_finite() || band.max_abs_ms <= 0.0 {
                return Err(ConfigError::InvalidWindows(format!(
                    "{:?} band has invalid width {}",
                    band.kind, band.max_abs_ms
                )));
            }
        }

        for pair in bands.windows(2) {
            if pair[1].max_abs_ms <= pair[0].max_abs_ms || pair[1].kind <= pair[0].kind {
                return Err(ConfigError::InvalidWindows(format!(
                    "{:?} ({}ms) must be narrower and better than {:?} ({}ms)",
                    pair[0].kind, pair[0].max_abs_ms, pair[1].kind, pair[1].max_abs_ms
                )));
            }
        }

        Ok(Self { bands })
    }

    /// Bands in effect at `rate`. Rate does not scale real-time tolerances.
    pub fn windows_for(&self, _rate: f64) -> &[WindowBand] {
        &self.bands
    }

    /// Width of the outermost band. Presses farther than this are ghost taps.
    pub fn widest_ms(&self) -> f64 {
        self.bands.last().map_or(0.0, |b| b.max_abs_ms)
    }

    /// Classifies a signed offset into the narrowest band it fits.
    ///
    /// Boundaries are inclusive. Returns `None` outside the widest band.
    pub fn judge(&self, offset_ms: f64) -> Option<JudgmentKind> {
        let abs_diff = offset_ms.abs();
        self.bands
            .iter()
            .find(|b| abs_diff <= b.max_abs_ms)
            .map(|b| b.kind)
    }
}

impl Default for HitWindow {
    fn default() -> Self {
        Self::new()
    }
}
