use log::debug;

use crate::model::note::{Lane, LaneSet};

/// Direction of a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Down,
    Up,
}

/// A single key transition from the input layer, stamped with the song
/// position at which it happened. Consumed and discarded; never retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawKeyEvent {
    pub lane: Lane,
    pub kind: KeyEventKind,
    pub time_secs: f64,
}

impl RawKeyEvent {
    pub fn down(lane: Lane, time_secs: f64) -> Self {
        Self {
            lane,
            kind: KeyEventKind::Down,
            time_secs,
        }
    }

    pub fn up(lane: Lane, time_secs: f64) -> Self {
        Self {
            lane,
            kind: KeyEventKind::Up,
            time_secs,
        }
    }
}

/// A group of key-downs close enough in time to count as one attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateChord {
    pub lanes: LaneSet,
    /// Time of the first key-down in the group, in song-position seconds.
    pub anchor_secs: f64,
}

impl CandidateChord {
    fn open(lane: Lane, anchor_secs: f64) -> Self {
        Self {
            lanes: LaneSet::single(lane),
            anchor_secs,
        }
    }
}

/// Groups key-down events within a sliding detection window.
///
/// At most one window is open at a time. Every key-down ends up in exactly
/// one emitted chord; key-ups never populate a window (the session forwards
/// them straight to release handling).
#[derive(Debug, Default)]
pub struct ChordAggregator {
    open: Option<CandidateChord>,
}

impl ChordAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one key-down.
    ///
    /// Joins the open window when the event is inside the detection window
    /// and its lane is not yet a member; otherwise the open window is
    /// closed and returned, and a fresh window is anchored at this event.
    pub fn push_down(
        &mut self,
        lane: Lane,
        time_secs: f64,
        window_secs: f64,
    ) -> Option<CandidateChord> {
        let Some(open) = &mut self.open else {
            self.open = Some(CandidateChord::open(lane, time_secs));
            return None;
        };

        if time_secs - open.anchor_secs <= window_secs && open.lanes.insert(lane) {
            return None;
        }

        let closed = self.open.replace(CandidateChord::open(lane, time_secs));
        if let Some(chord) = &closed {
            debug!(
                "chord window at {:.3}s closed by key-down at {:.3}s ({} lane(s))",
                chord.anchor_secs,
                time_secs,
                chord.lanes.len()
            );
        }
        closed
    }

    /// Close the open window once it has outlived the detection window.
    /// Called every tick.
    pub fn poll_expired(&mut self, now_secs: f64, window_secs: f64) -> Option<CandidateChord> {
        match &self.open {
            Some(open) if now_secs - open.anchor_secs > window_secs => self.open.take(),
            _ => None,
        }
    }

    /// Force-close and emit whatever is open (end of song).
    pub fn flush(&mut self) -> Option<CandidateChord> {
        self.open.take()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// The currently open window, if any.
    pub fn open_window(&self) -> Option<&CandidateChord> {
        self.open.as_ref()
    }
}
