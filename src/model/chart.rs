use thiserror::Error;

use super::note::{LANE_COUNT, Lane, Note};

#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("note {index} at {time_secs}s is earlier than the note before it ({prev_secs}s)")]
    OutOfOrder {
        index: usize,
        prev_secs: f64,
        time_secs: f64,
    },

    #[error("lane {lane:?} has overlapping notes around {time_secs}s")]
    LaneOverlap { lane: Lane, time_secs: f64 },

    #[error("note {index} has a negative duration")]
    NegativeDuration { index: usize },
}

/// Time-ordered sequence of chart notes.
///
/// Validated once at construction and never re-ordered afterwards:
/// globally non-decreasing by target time, and strictly increasing with
/// non-overlapping active spans within each lane.
#[derive(Debug, Clone)]
pub struct ChartQueue {
    notes: Vec<Note>,
}

impl ChartQueue {
    pub fn new(notes: Vec<Note>) -> Result<Self, ChartError> {
        let mut last_end: [Option<f64>; LANE_COUNT] = [None; LANE_COUNT];

        for (index, note) in notes.iter().enumerate() {
            if note.duration_secs < 0.0 {
                return Err(ChartError::NegativeDuration { index });
            }
            if index > 0 {
                let prev_secs = notes[index - 1].time_secs;
                if note.time_secs < prev_secs {
                    return Err(ChartError::OutOfOrder {
                        index,
                        prev_secs,
                        time_secs: note.time_secs,
                    });
                }
            }
            let lane = note.lane.index();
            if let Some(end) = last_end[lane]
                && note.time_secs <= end
            {
                return Err(ChartError::LaneOverlap {
                    lane: note.lane,
                    time_secs: note.time_secs,
                });
            }
            last_end[lane] = Some(note.end_secs());
        }

        Ok(Self { notes })
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

    /// Per-lane note indices, each list ascending in time.
    pub fn build_lane_index(&self) -> [Vec<usize>; LANE_COUNT] {
        let mut index: [Vec<usize>; LANE_COUNT] = [const { Vec::new() }; LANE_COUNT];
        for (i, note) in self.notes.iter().enumerate() {
            index[note.lane.index()].push(i);
        }
        index
    }

    pub fn into_notes(self) -> Vec<Note> {
        self.notes
    }
}
