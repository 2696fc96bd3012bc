//! Playback clocks consumed by the gameplay session.
//!
//! The judgment core never talks to an audio device. It reads a
//! [`TimingProvider`], which reports the current chart position in
//! milliseconds. Rate modifiers are already folded into that position: at
//! 1.5x the clock advances 1.5 chart-ms per real ms.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the current playback position.
pub trait TimingProvider {
    /// Current chart time in milliseconds.
    ///
    /// Monotonic within a play session except across explicit seeks.
    fn current_time_ms(&self) -> f64;
}

/// Clock driven by the host (or a test) rather than by audio.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time_ms: f64,
}

impl ManualClock {
    pub fn new(time_ms: f64) -> Self {
        Self { time_ms }
    }

    pub fn set(&mut self, time_ms: f64) {
        self.time_ms = time_ms;
    }

    pub fn advance(&mut self, delta_ms: f64) {
        self.time_ms += delta_ms;
    }
}

impl TimingProvider for ManualClock {
    fn current_time_ms(&self) -> f64 {
        self.time_ms
    }
}

/// Reads the sample position published by the audio thread.
///
/// The audio thread stores the number of source frames consumed so far into
/// a shared atomic; reading it is the only cross-thread access the judgment
/// core performs.
#[derive(Debug, Clone)]
pub struct AudioClock {
    position: Arc<AtomicU64>,
    sample_rate: Arc<AtomicU64>,
}

impl AudioClock {
    pub fn new(position: Arc<AtomicU64>, sample_rate: Arc<AtomicU64>) -> Self {
        Self {
            position,
            sample_rate,
        }
    }

    /// Position in seconds of source audio.
    pub fn position_seconds(&self) -> f64 {
        let frames = self.position.load(Ordering::Acquire);
        let rate = self.sample_rate.load(Ordering::Relaxed).max(1);
        frames as f64 / rate as f64
    }
}

impl TimingProvider for AudioClock {
    fn current_time_ms(&self) -> f64 {
        self.position_seconds() * 1000.0
    }
}

/// Frame-interpolated clock that follows a coarse audio source.
///
/// Audio devices report their position in buffer-sized steps. This clock
/// advances with frame time scaled by the rate and only corrects itself
/// toward the source when they drift apart.
#[derive(Debug, Clone)]
pub struct SmoothedClock<P> {
    source: P,
    clock_ms: f64,
    rate: f64,
}

impl<P: TimingProvider> SmoothedClock<P> {
    /// Lead-in before the first note (ms).
    pub const PRE_ROLL_MS: f64 = 3000.0;
    /// Drift beyond which the clock snaps to the source.
    const HARD_RESYNC_MS: f64 = 80.0;
    /// Drift below which no correction is applied.
    const DRIFT_TOLERANCE_MS: f64 = 5.0;
    /// Fraction of the drift corrected per frame.
    const DRIFT_CORRECTION: f64 = 0.05;

    pub fn new(source: P, rate: f64) -> Self {
        Self {
            source,
            clock_ms: -Self::PRE_ROLL_MS,
            rate,
        }
    }

    /// Advances by one frame of `dt_seconds` real time.
    pub fn advance(&mut self, dt_seconds: f64) {
        self.clock_ms += dt_seconds * 1000.0 * self.rate;

        // The source only starts moving once playback begins at 0.
        if self.clock_ms < 0.0 {
            return;
        }

        let drift = self.source.current_time_ms() - self.clock_ms;
        if drift.abs() > Self::HARD_RESYNC_MS {
            log::debug!("CLOCK: Hard resync ({:.1}ms drift)", drift);
            self.clock_ms += drift;
        } else if drift.abs() > Self::DRIFT_TOLERANCE_MS {
            // Small nudges avoid visible sawtooth scrolling
            self.clock_ms += drift * Self::DRIFT_CORRECTION;
        }
    }

    /// Jumps to `time_ms`; the host is responsible for seeking the audio.
    pub fn seek(&mut self, time_ms: f64) {
        self.clock_ms = time_ms;
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut P {
        &mut self.source
    }
}

impl<P: TimingProvider> TimingProvider for SmoothedClock<P> {
    fn current_time_ms(&self) -> f64 {
        self.clock_ms
    }
}

impl<T: TimingProvider + ?Sized> TimingProvider for &T {
    fn current_time_ms(&self) -> f64 {
        (**self).current_time_ms()
    }
}

impl<T: TimingProvider + ?Sized> TimingProvider for Box<T> {
    fn current_time_ms(&self) -> f64 {
        (**self).current_time_ms()
    }
}
