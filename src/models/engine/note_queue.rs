//! Per-lane view over a chart with forward-only consumption.
//!
//! Each lane keeps the indices of its notes in chart order and a cursor to
//! the first note that is not terminal yet. Candidate searches scan forward
//! from that cursor, so a press can skip a note whose window already closed
//! even if no tick has marked it missed yet.

use crate::models::engine::note::{Chart, Note, NoteState};
use ordered_float::OrderedFloat;

#[derive(Debug, Clone, Default)]
struct LaneQueue {
    /// Chart indices of this lane's notes, in chart order.
    indices: Vec<usize>,
    /// Position in `indices` of the first non-terminal note.
    head: usize,
    /// Chart index of the long note currently held down.
    held: Option<usize>,
}

/// Ordered per-lane note queue owning every [`NoteState`].
#[derive(Debug, Clone)]
pub struct NoteQueue {
    notes: Vec<Note>,
    states: Vec<NoteState>,
    lanes: Vec<LaneQueue>,
    terminal: usize,
}

impl NoteQueue {
    pub fn new(chart: &Chart) -> Self {
        let mut lanes = vec![LaneQueue::default(); chart.lane_count()];
        for (i, note) in chart.notes().iter().enumerate() {
            lanes[note.lane].indices.push(i);
        }

        Self {
            notes: chart.notes().to_vec(),
            states: vec![NoteState::Pending; chart.len()],
            lanes,
            terminal: 0,
        }
    }

    /// Puts every note back to `Pending`. Used to rebuild after a seek.
    pub fn reset(&mut self) {
        self.states.fill(NoteState::Pending);
        for lane in &mut self.lanes {
            lane.head = 0;
            lane.held = None;
        }
        self.terminal = 0;
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn note(&self, idx: usize) -> &Note {
        &self.notes[idx]
    }

    pub fn state(&self, idx: usize) -> NoteState {
        self.states[idx]
    }

    pub fn states(&self) -> &[NoteState] {
        &self.states
    }

    /// Number of notes not yet Judged or Missed.
    pub fn remaining(&self) -> usize {
        self.notes.len() - self.terminal
    }

    /// Every note has reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.terminal == self.notes.len()
    }

    /// Chart index of the note currently held in `lane`.
    pub fn held(&self, lane: usize) -> Option<usize> {
        self.lanes.get(lane).and_then(|l| l.held)
    }

    /// Non-terminal notes of `lane`, starting at the lane cursor.
    fn active(&self, lane: usize) -> impl Iterator<Item = usize> + '_ {
        let queue = &self.lanes[lane];
        queue.indices[queue.head..].iter().copied()
    }

    /// Notes of `lane` still in play at `now_ms` that start no later than
    /// `now_ms + horizon_ms`, in chart order.
    ///
    /// A `Pending` note drops out once `start + widest_ms < now_ms`, even
    /// before a tick marks it missed. `Held` notes stay until resolved.
    pub fn visible(
        &self,
        lane: usize,
        now_ms: f64,
        horizon_ms: f64,
        widest_ms: f64,
    ) -> impl Iterator<Item = usize> + '_ {
        self.active(lane)
            .take_while(move |&i| self.notes[i].start_ms <= now_ms + horizon_ms)
            .filter(move |&i| match self.states[i] {
                NoteState::Pending => self.notes[i].start_ms + widest_ms >= now_ms,
                NoteState::Held => true,
                NoteState::Judged | NoteState::Missed => false,
            })
    }

    /// Earliest `Pending` note in `lane` that can still be hit at `now_ms`
    /// and starts no later than `now_ms + horizon_ms`.
    pub fn upcoming(
        &self,
        lane: usize,
        now_ms: f64,
        horizon_ms: f64,
        widest_ms: f64,
    ) -> Option<usize> {
        self.visible(lane, now_ms, horizon_ms, widest_ms)
            .find(|&i| self.states[i] == NoteState::Pending)
    }

    /// Best `Pending` note in `lane` for a press at `time_ms`.
    ///
    /// Only notes with `|time - start| <= widest_ms` qualify. The smallest
    /// absolute offset wins; ties go to the earliest note.
    pub fn best_press_candidate(&self, lane: usize, time_ms: f64, widest_ms: f64) -> Option<usize> {
        let search_limit = time_ms + widest_ms;
        let mut best: Option<(usize, f64)> = None;

        for i in self.active(lane) {
            let note = &self.notes[i];
            if note.start_ms > search_limit {
                break;
            }
            if self.states[i] != NoteState::Pending {
                continue;
            }

            let diff = (time_ms - note.start_ms).abs();
            if diff <= widest_ms && best.is_none_or(|(_, best_diff)| diff < best_diff) {
                best = Some((i, diff));
            }
        }

        best.map(|(i, _)| i)
    }

    /// Notes whose last chance expired before `now_ms`, sorted by start time,
    /// lane, id.
    ///
    /// A `Pending` note expires once `start + widest_ms < now_ms`; a `Held`
    /// note once `end + widest_ms < now_ms`.
    pub fn expired(&self, now_ms: f64, widest_ms: f64) -> Vec<usize> {
        let mut expired = Vec::new();

        for (lane_idx, lane) in self.lanes.iter().enumerate() {
            for i in self.active(lane_idx) {
                if self.notes[i].start_ms + widest_ms >= now_ms {
                    break;
                }
                if self.states[i] == NoteState::Pending {
                    expired.push(i);
                }
            }

            if let Some(i) = lane.held {
                if self.notes[i].end_time_ms() + widest_ms < now_ms {
                    expired.push(i);
                }
            }
        }

        expired.sort_by_key(|&i| self.notes[i].sort_key());
        expired.dedup();
        expired
    }

    /// Moves note `idx` to `next`.
    ///
    /// Returns `false` (and changes nothing) if the transition would go
    /// backwards, e.g. a late event targeting an already judged note.
    pub fn transition(&mut self, idx: usize, next: NoteState) -> bool {
        let current = self.states[idx];
        if !current.can_become(next) {
            log::debug!(
                "QUEUE: Rejected transition {:?} -> {:?} for note {}",
                current,
                next,
                self.notes[idx].id
            );
            return false;
        }

        self.states[idx] = next;
        let lane = self.notes[idx].lane;

        match next {
            NoteState::Held => self.lanes[lane].held = Some(idx),
            NoteState::Judged | NoteState::Missed => {
                self.terminal += 1;
                if self.lanes[lane].held == Some(idx) {
                    self.lanes[lane].held = None;
                }
                self.advance_head(lane);
            }
            NoteState::Pending => {}
        }

        true
    }

    fn advance_head(&mut self, lane: usize) {
        let states = &self.states;
        let queue = &mut self.lanes[lane];
        while queue
            .indices
            .get(queue.head)
            .is_some_and(|&i| states[i].is_terminal())
        {
            queue.head += 1;
        }
    }

    /// Start time of the earliest non-terminal note across all lanes.
    pub fn next_start_ms(&self) -> Option<f64> {
        (0..self.lanes.len())
            .filter_map(|lane| self.active(lane).next())
            .map(|i| OrderedFloat(self.notes[i].start_ms))
            .min()
            .map(|t| t.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(notes: Vec<Note>) -> NoteQueue {
        NoteQueue::new(&Chart::new(4, notes).unwrap())
    }

    #[test]
    fn test_candidate_prefers_smallest_offset() {
        let q = queue(vec![Note::tap(0, 0, 1000.0), Note::tap(1, 0, 1100.0)]);

        assert_eq!(q.best_press_candidate(0, 1040.0, 100.0), Some(0));
        assert_eq!(q.best_press_candidate(0, 1060.0, 100.0), Some(1));
        // Equidistant: earliest wins.
        assert_eq!(q.best_press_candidate(0, 1050.0, 100.0), Some(0));
        assert_eq!(q.best_press_candidate(1, 1000.0, 100.0), None);
    }

    #[test]
    fn test_candidate_skips_expired_note_without_tick() {
        let q = queue(vec![Note::tap(0, 0, 1000.0), Note::tap(1, 0, 1200.0)]);

        // Note 0 is still Pending but out of reach.
        assert_eq!(q.best_press_candidate(0, 1150.0, 100.0), Some(1));
        assert_eq!(q.state(0), NoteState::Pending);
    }

    #[test]
    fn test_transitions_advance_head() {
        let mut q = queue(vec![
            Note::tap(0, 0, 100.0),
            Note::tap(1, 0, 200.0),
            Note::tap(2, 1, 150.0),
        ]);

        assert!(q.transition(0, NoteState::Judged));
        assert!(!q.transition(0, NoteState::Missed));
        assert_eq!(q.upcoming(0, 0.0, 1000.0, 100.0), Some(2));
        assert_eq!(q.remaining(), 2);
        assert_eq!(q.next_start_ms(), Some(150.0));
        assert!(!q.is_complete());
    }

    #[test]
    fn test_upcoming_respects_horizon() {
        let q = queue(vec![Note::tap(0, 0, 1000.0)]);
        assert_eq!(q.upcoming(0, 0.0, 500.0, 100.0), None);
        assert_eq!(q.upcoming(0, 600.0, 500.0, 100.0), Some(0));
    }

    #[test]
    fn test_upcoming_skips_closed_windows() {
        let mut q = queue(vec![
            Note::hold(0, 1, 900.0, 2000.0),
            Note::tap(1, 0, 1000.0),
            Note::tap(2, 0, 1400.0),
        ]);
        q.transition(0, NoteState::Held);

        // Note 1 closed at 1100ms but no tick has expired it yet.
        assert_eq!(q.state(1), NoteState::Pending);
        assert_eq!(q.upcoming(0, 1150.0, 500.0, 100.0), Some(2));
        assert_eq!(q.upcoming(0, 1100.0, 500.0, 100.0), Some(1));

        // A held note stays visible past its head window.
        assert_eq!(q.visible(1, 1500.0, 500.0, 100.0).collect::<Vec<_>>(), vec![0]);
        assert_eq!(q.upcoming(1, 1500.0, 500.0, 100.0), None);
    }

    #[test]
    fn test_held_tracking() {
        let mut q = queue(vec![Note::hold(0, 2, 100.0, 400.0)]);

        assert!(q.transition(0, NoteState::Held));
        assert_eq!(q.held(2), Some(0));
        assert_eq!(q.expired(500.0, 100.0), Vec::<usize>::new());
        assert_eq!(q.expired(500.5, 100.0), vec![0]);

        assert!(q.transition(0, NoteState::Judged));
        assert_eq!(q.held(2), None);
        assert!(q.is_complete());
    }

    #[test]
    fn test_expired_sorted_across_lanes() {
        let q = queue(vec![
            Note::tap(0, 3, 100.0),
            Note::tap(1, 0, 300.0),
            Note::tap(2, 1, 200.0),
            Note::tap(3, 0, 900.0),
        ]);

        let ids: Vec<u32> = q.expired(500.0, 100.0).iter().map(|&i| q.note(i).id).collect();
        assert_eq!(ids, vec![0, 2, 1]);
    }

    #[test]
    fn test_reset() {
        let mut q = queue(vec![Note::tap(0, 0, 100.0)]);
        q.transition(0, NoteState::Missed);
        q.reset();
        assert_eq!(q.state(0), NoteState::Pending);
        assert_eq!(q.remaining(), 1);
    }
}
