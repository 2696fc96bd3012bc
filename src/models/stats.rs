//! Judgment types and hit statistics.
//!
//! This module defines the judgment labels produced by the engine, the
//! immutable [`Judgment`] record, and the counters used to summarise a play
//! session.

use serde::{Deserialize, Serialize};

/// Judgment labels from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JudgmentKind {
    /// Best timing.
    Marvelous,
    /// Excellent timing.
    Perfect,
    /// Good timing.
    Great,
    /// Acceptable timing.
    Good,
    /// Poor timing.
    Okay,
    /// Missed note.
    Miss,
}

impl JudgmentKind {
    /// All kinds, best first.
    pub const ALL: [JudgmentKind; 6] = [
        JudgmentKind::Marvelous,
        JudgmentKind::Perfect,
        JudgmentKind::Great,
        JudgmentKind::Good,
        JudgmentKind::Okay,
        JudgmentKind::Miss,
    ];

    /// Position in [`JudgmentKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_miss(self) -> bool {
        self == JudgmentKind::Miss
    }

    /// Short label used by the CLI and logs.
    pub fn label(self) -> &'static str {
        match self {
            JudgmentKind::Marvelous => "MARV",
            JudgmentKind::Perfect => "PERF",
            JudgmentKind::Great => "GREAT",
            JudgmentKind::Good => "GOOD",
            JudgmentKind::Okay => "OKAY",
            JudgmentKind::Miss => "MISS",
        }
    }
}

/// Which action of a note a judgment refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitPhase {
    /// The press on a tap note or on the head of a long note.
    Head,
    /// The release (or drop) of a long note tail.
    Release,
}

/// A single judgment emitted by the engine. Never mutated once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    /// Id of the judged note.
    pub note_id: u32,
    /// Lane of the judged note.
    pub lane: usize,
    pub kind: JudgmentKind,
    /// Signed offset in ms (negative = early, positive = late).
    pub offset_ms: f64,
    /// Chart time at which the judgment was decided.
    pub timestamp_ms: f64,
    pub phase: HitPhase,
}

impl Judgment {
    pub fn is_release(&self) -> bool {
        self.phase == HitPhase::Release
    }
}

/// Per-kind judgment counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentCounts {
    counts: [u32; 6],
}

impl JudgmentCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, kind: JudgmentKind) {
        self.counts[kind.index()] += 1;
    }

    pub fn get(&self, kind: JudgmentKind) -> u32 {
        self.counts[kind.index()]
    }

    /// Sum over every kind, misses included.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (JudgmentKind, u32)> + '_ {
        JudgmentKind::ALL.iter().map(|&k| (k, self.get(k)))
    }
}

/// Running mean / standard deviation of timing offsets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OffsetStats {
    pub count: u32,
    sum_ms: f64,
    sum_sq_ms: f64,
}

impl OffsetStats {
    pub fn push(&mut self, offset_ms: f64) {
        self.count += 1;
        self.sum_ms += offset_ms;
        self.sum_sq_ms += offset_ms * offset_ms;
    }

    /// Mean offset in ms, `0.0` when empty.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum_ms / self.count as f64
    }

    /// Population standard deviation in ms.
    pub fn std_dev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq_ms / self.count as f64 - mean * mean).max(0.0).sqrt()
    }
}

/// Release-timing statistic for long-note tails.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseStats {
    pub counts: JudgmentCounts,
    pub offsets: OffsetStats,
}

/// Letter grade shown on the result screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    X,
    SS,
    S,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Grade for an accuracy percentage (0-100). Failed plays are always `F`.
    pub fn from_accuracy(accuracy: f64, failed: bool) -> Self {
        if failed {
            return Grade::F;
        }
        match accuracy {
            a if a >= 100.0 => Grade::X,
            a if a >= 99.0 => Grade::SS,
            a if a >= 95.0 => Grade::S,
            a if a >= 90.0 => Grade::A,
            a if a >= 80.0 => Grade::B,
            a if a >= 70.0 => Grade::C,
            _ => Grade::D,
        }
    }
}
