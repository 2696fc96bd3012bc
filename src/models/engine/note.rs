//! Chart notes and their runtime state.

use crate::error::{ChartError, EngineError};
use crate::models::engine::MAX_LANES;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A single note in a chart. Immutable once loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Unique within the chart.
    pub id: u32,
    /// Which lane (0-indexed).
    pub lane: usize,
    /// When the note should be hit (ms).
    pub start_ms: f64,
    /// When a long note should be released (ms). `None` for taps.
    #[serde(default)]
    pub end_ms: Option<f64>,
}

impl Note {
    /// Creates a new tap note.
    pub fn tap(id: u32, lane: usize, start_ms: f64) -> Self {
        Self {
            id,
            lane,
            start_ms,
            end_ms: None,
        }
    }

    /// Creates a new hold note.
    pub fn hold(id: u32, lane: usize, start_ms: f64, end_ms: f64) -> Self {
        Self {
            id,
            lane,
            start_ms,
            end_ms: Some(end_ms),
        }
    }

    /// Returns true if this is a hold note.
    pub fn is_hold(&self) -> bool {
        self.end_ms.is_some()
    }

    /// Returns the end time of this note.
    /// For holds: the release time. For taps: same as start.
    pub fn end_time_ms(&self) -> f64 {
        self.end_ms.unwrap_or(self.start_ms)
    }

    /// Returns the hold duration, 0 for taps.
    pub fn duration_ms(&self) -> f64 {
        self.end_time_ms() - self.start_ms
    }

    /// Ordering key: start time, then lane, then id.
    pub(crate) fn sort_key(&self) -> (OrderedFloat<f64>, usize, u32) {
        (OrderedFloat(self.start_ms), self.lane, self.id)
    }
}

/// Runtime status of a note.
///
/// Transitions only move forward:
/// `Pending -> Held -> Judged | Missed` or `Pending -> Judged | Missed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteState {
    Pending,
    /// Long note head pressed, waiting for the release.
    Held,
    Judged,
    Missed,
}

impl NoteState {
    pub fn is_terminal(self) -> bool {
        matches!(self, NoteState::Judged | NoteState::Missed)
    }

    /// Whether moving from `self` to `next` is allowed.
    pub fn can_become(self, next: NoteState) -> bool {
        matches!(
            (self, next),
            (NoteState::Pending, NoteState::Held)
                | (NoteState::Pending, NoteState::Judged)
                | (NoteState::Pending, NoteState::Missed)
                | (NoteState::Held, NoteState::Judged)
                | (NoteState::Held, NoteState::Missed)
        )
    }
}

/// A validated chart: lane count plus notes sorted by start time, lane, id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chart {
    lane_count: usize,
    notes: Vec<Note>,
}

/// On-disk JSON shape of a chart.
#[derive(Deserialize)]
struct RawChart {
    lane_count: usize,
    notes: Vec<Note>,
}

impl Chart {
    /// Validates and sorts the notes.
    pub fn new(lane_count: usize, mut notes: Vec<Note>) -> Result<Self, ChartError> {
        if lane_count == 0 || lane_count > MAX_LANES {
            return Err(ChartError::InvalidLaneCount(lane_count));
        }

        let mut ids = HashSet::with_capacity(notes.len());
        for note in &notes {
            if note.lane >= lane_count {
                return Err(ChartError::LaneOutOfRange {
                    id: note.id,
                    lane: note.lane,
                    lane_count,
                });
            }
            if !note.start_ms.is_finite() || note.end_ms.is_some_and(|e| !e.is_finite()) {
                return Err(ChartError::InvalidTime(note.id));
            }
            if let Some(end_ms) = note.end_ms {
                if end_ms < note.start_ms {
                    return Err(ChartError::InvalidHold {
                        id: note.id,
                        start_ms: note.start_ms,
                        end_ms,
                    });
                }
            }
            if !ids.insert(note.id) {
                return Err(ChartError::DuplicateNoteId(note.id));
            }
        }

        notes.sort_by_key(Note::sort_key);

        Ok(Self { lane_count, notes })
    }

    /// Loads a chart from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, ChartError> {
        let raw: RawChart =
            serde_json::from_str(json).map_err(|e| ChartError::Parse(e.to_string()))?;
        Self::new(raw.lane_count, raw.notes)
    }

    /// Reads a chart JSON file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path).map_err(|source| EngineError::ChartIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_json(&json)?)
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Time of the last judged action (last start or release).
    pub fn duration_ms(&self) -> f64 {
        self.notes
            .iter()
            .map(Note::end_time_ms)
            .fold(0.0, f64::max)
    }

    /// Md5 of the lane count and every note, used to bind replays to charts.
    pub fn hash(&self) -> String {
        let mut ctx = md5::Context::new();
        ctx.consume((self.lane_count as u64).to_le_bytes());
        for note in &self.notes {
            ctx.consume(note.id.to_le_bytes());
            ctx.consume((note.lane as u64).to_le_bytes());
            ctx.consume(note.start_ms.to_bits().to_le_bytes());
            ctx.consume(note.end_ms.map_or(u64::MAX, f64::to_bits).to_le_bytes());
        }
        format!("{:x}", ctx.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_sorts_by_time_lane_id() {
        let chart = Chart::new(
            4,
            vec![
                Note::tap(3, 2, 500.0),
                Note::tap(1, 1, 500.0),
                Note::tap(2, 1, 100.0),
                Note::tap(0, 1, 500.0),
            ],
        )
        .unwrap();

        let ids: Vec<u32> = chart.notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_chart_rejects_bad_notes() {
        assert_eq!(
            Chart::new(4, vec![Note::tap(0, 4, 0.0)]),
            Err(ChartError::LaneOutOfRange {
                id: 0,
                lane: 4,
                lane_count: 4
            })
        );
        assert_eq!(
            Chart::new(4, vec![Note::tap(0, 0, 0.0), Note::tap(0, 1, 5.0)]),
            Err(ChartError::DuplicateNoteId(0))
        );
        assert!(matches!(
            Chart::new(4, vec![Note::hold(0, 0, 100.0, 50.0)]),
            Err(ChartError::InvalidHold { .. })
        ));
        assert_eq!(
            Chart::new(4, vec![Note::tap(0, 0, f64::NAN)]),
            Err(ChartError::InvalidTime(0))
        );
        assert_eq!(Chart::new(0, vec![]), Err(ChartError::InvalidLaneCount(0)));
    }

    #[test]
    fn test_chart_hash_changes_with_notes() {
        let a = Chart::new(4, vec![Note::tap(0, 0, 100.0)]).unwrap();
        let b = Chart::new(4, vec![Note::tap(0, 0, 101.0)]).unwrap();
        assert_eq!(a.hash(), a.clone().hash());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_chart_from_json() {
        let chart = Chart::from_json(
            r#"{"lane_count":7,"notes":[{"id":0,"lane":6,"start_ms":10.0},{"id":1,"lane":0,"start_ms":5.0,"end_ms":50.0}]}"#,
        )
        .unwrap();
        assert_eq!(chart.lane_count(), 7);
        assert_eq!(chart.notes()[0].id, 1);
        assert!(chart.notes()[0].is_hold());
        assert_eq!(chart.duration_ms(), 50.0);
    }

    #[test]
    fn test_state_transitions_are_monotonic() {
        assert!(NoteState::Pending.can_become(NoteState::Held));
        assert!(NoteState::Held.can_become(NoteState::Missed));
        assert!(!NoteState::Judged.can_become(NoteState::Missed));
        assert!(!NoteState::Missed.can_become(NoteState::Judged));
        assert!(!NoteState::Held.can_become(NoteState::Pending));
    }
}
