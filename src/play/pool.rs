use log::debug;
use serde::{Deserialize, Serialize};

use crate::model::chart::ChartQueue;
use crate::model::note::{LANE_COUNT, Lane, Note};

use super::error::JudgeError;

/// Lifecycle state of a chart note.
///
/// `Pending` notes are live for matching. `Holding` only occurs for a
/// sustained note whose head was hit; it finalizes at release or expiry.
/// The remaining states are terminal and reached exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteState {
    Pending,
    Holding,
    Hit,
    PartiallyHit,
    Missed,
}

impl NoteState {
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Hit | Self::PartiallyHit | Self::Missed)
    }
}

/// The ordered, per-lane set of not-yet-resolved chart notes.
///
/// Mutated only by the judgement engine and by its own timeout pass,
/// always from the session's thread.
pub struct NotePool {
    notes: Vec<Note>,
    states: Vec<NoteState>,
    lane_index: [Vec<usize>; LANE_COUNT],
    /// Per-lane position of the first note that may still be live.
    lane_cursor: [usize; LANE_COUNT],
    /// Active sustained hold per lane (index into `notes`).
    holds: [Option<usize>; LANE_COUNT],
}

impl NotePool {
    pub fn new(chart: ChartQueue) -> Self {
        let lane_index = chart.build_lane_index();
        let notes = chart.into_notes();
        let states = vec![NoteState::Pending; notes.len()];
        Self {
            notes,
            states,
            lane_index,
            lane_cursor: [0; LANE_COUNT],
            holds: [None; LANE_COUNT],
        }
    }

    pub fn note(&self, index: usize) -> &Note {
        &self.notes[index]
    }

    pub fn state(&self, index: usize) -> NoteState {
        self.states[index]
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Nearest pending note in `lane` within `tolerance_secs` of `t_secs`.
    /// Ties on distance go to the earlier note.
    pub fn query_due(&self, lane: Lane, t_secs: f64, tolerance_secs: f64) -> Option<usize> {
        let lane_idx = lane.index();
        let mut best: Option<(usize, f64)> = None;

        for &i in &self.lane_index[lane_idx][self.lane_cursor[lane_idx]..] {
            let note = &self.notes[i];
            if note.time_secs - t_secs > tolerance_secs {
                break; // ascending in time, nothing later can be due
            }
            if self.states[i] != NoteState::Pending {
                continue;
            }
            let dist = (note.time_secs - t_secs).abs();
            if dist > tolerance_secs {
                continue;
            }
            match best {
                Some((_, best_dist)) if best_dist <= dist => {}
                _ => best = Some((i, dist)),
            }
        }

        best.map(|(i, _)| i)
    }

    /// Pending notes (across all lanes) sharing the exact target time
    /// `time_secs` — the chart's chord group at that instant.
    pub fn group_at(&self, time_secs: f64) -> Vec<usize> {
        let start = self.notes.partition_point(|n| n.time_secs < time_secs);
        let mut group = Vec::new();
        for i in start..self.notes.len() {
            if self.notes[i].time_secs != time_secs {
                break;
            }
            if self.states[i] == NoteState::Pending {
                group.push(i);
            }
        }
        group
    }

    /// Transition a note into a terminal state. Exactly-once: a second
    /// call for the same note fails with `AlreadyResolved` and leaves the
    /// first resolution in place.
    pub fn resolve(&mut self, index: usize, state: NoteState) -> Result<(), JudgeError> {
        debug_assert!(state.is_terminal());
        let note = self.notes[index];
        if self.states[index].is_terminal() {
            return Err(JudgeError::AlreadyResolved {
                lane: note.lane,
                time_secs: note.time_secs,
            });
        }
        if self.states[index] == NoteState::Holding {
            self.holds[note.lane.index()] = None;
        }
        self.states[index] = state;
        Ok(())
    }

    /// Mark a sustained note's head as hit. The terminal state is decided
    /// later, at release or expiry.
    pub fn begin_hold(&mut self, index: usize) -> Result<(), JudgeError> {
        let note = self.notes[index];
        if self.states[index] != NoteState::Pending {
            return Err(JudgeError::AlreadyResolved {
                lane: note.lane,
                time_secs: note.time_secs,
            });
        }
        self.states[index] = NoteState::Holding;
        self.holds[note.lane.index()] = Some(index);
        Ok(())
    }

    pub fn active_hold(&self, lane: Lane) -> Option<usize> {
        self.holds[lane.index()]
    }

    /// Finish the hold on `lane` at release time, if one is active.
    ///
    /// A release at or after `end − tolerance` resolves `Hit`; an earlier
    /// release resolves `PartiallyHit`.
    pub fn release_hold(
        &mut self,
        lane: Lane,
        t_secs: f64,
        tolerance_secs: f64,
    ) -> Option<(usize, NoteState)> {
        let index = self.holds[lane.index()].take()?;
        let state = if t_secs >= self.notes[index].end_secs() - tolerance_secs {
            NoteState::Hit
        } else {
            NoteState::PartiallyHit
        };
        self.states[index] = state;
        Some((index, state))
    }

    /// Timeout pass. Pending notes whose tolerance window has fully
    /// elapsed resolve `Missed`; holds whose end has passed while still
    /// held resolve `Hit`. Returns the indices that became `Missed`.
    pub fn advance(&mut self, t_secs: f64, tolerance_secs: f64) -> Vec<usize> {
        self.advance_protected(t_secs, tolerance_secs, &[])
    }

    /// Timeout pass that leaves `protected` notes alone.
    ///
    /// The session protects notes still claimable by an in-flight attempt
    /// (an open aggregation window, or a buffered press anchored inside
    /// the note's tolerance window): those were attempted, and judging the
    /// attempt decides their fate. A press anchored after the tolerance
    /// window can never match, so true timeouts are unaffected.
    pub fn advance_protected(
        &mut self,
        t_secs: f64,
        tolerance_secs: f64,
        protected: &[usize],
    ) -> Vec<usize> {
        for lane in 0..LANE_COUNT {
            if let Some(i) = self.holds[lane]
                && self.notes[i].end_secs() <= t_secs
            {
                self.holds[lane] = None;
                self.states[i] = NoteState::Hit;
                debug!("hold in lane {lane} completed at {t_secs:.3}s");
            }
        }

        let mut missed = Vec::new();
        for lane in 0..LANE_COUNT {
            let mut cursor = self.lane_cursor[lane];
            while cursor < self.lane_index[lane].len() {
                let i = self.lane_index[lane][cursor];
                let state = self.states[i];
                if state.is_terminal() {
                    cursor += 1;
                    continue;
                }
                if state == NoteState::Holding || protected.contains(&i) {
                    break;
                }
                if self.notes[i].time_secs + tolerance_secs < t_secs {
                    self.states[i] = NoteState::Missed;
                    missed.push(i);
                    cursor += 1;
                } else {
                    break;
                }
            }
            self.lane_cursor[lane] = cursor;
        }
        missed
    }

    /// True once every note has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.states.iter().all(|s| s.is_terminal())
    }

    pub fn remaining(&self) -> usize {
        self.states.iter().filter(|s| !s.is_terminal()).count()
    }
}
