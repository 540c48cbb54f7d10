use serde::{Deserialize, Serialize};

/// Number of playable lanes (5-key layout).
pub const LANE_COUNT: usize = 5;

/// Represents one of the fixed input channels a note can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lane {
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
}

impl Lane {
    /// Returns all lanes in order.
    pub fn all() -> &'static [Lane] {
        &[Lane::Key1, Lane::Key2, Lane::Key3, Lane::Key4, Lane::Key5]
    }

    /// Returns the lane index (0-based).
    pub fn index(self) -> usize {
        match self {
            Lane::Key1 => 0,
            Lane::Key2 => 1,
            Lane::Key3 => 2,
            Lane::Key4 => 3,
            Lane::Key5 => 4,
        }
    }

    /// Create a lane from a 0-based index.
    pub fn from_index(index: usize) -> Option<Lane> {
        match index {
            0 => Some(Lane::Key1),
            1 => Some(Lane::Key2),
            2 => Some(Lane::Key3),
            3 => Some(Lane::Key4),
            4 => Some(Lane::Key5),
            _ => None,
        }
    }
}

/// Compact set of lanes. Chord membership is tracked with this so a lane
/// can never appear twice in one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaneSet(u8);

impl LaneSet {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn single(lane: Lane) -> Self {
        Self(1 << lane.index())
    }

    /// Add a lane. Returns false if it was already a member.
    pub fn insert(&mut self, lane: Lane) -> bool {
        let bit = 1 << lane.index();
        if self.0 & bit != 0 {
            return false;
        }
        self.0 |= bit;
        true
    }

    pub fn contains(self, lane: Lane) -> bool {
        self.0 & (1 << lane.index()) != 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate members in lane order.
    pub fn iter(self) -> impl Iterator<Item = Lane> {
        Lane::all().iter().copied().filter(move |l| self.contains(*l))
    }
}

impl FromIterator<Lane> for LaneSet {
    fn from_iter<I: IntoIterator<Item = Lane>>(iter: I) -> Self {
        let mut set = LaneSet::new();
        for lane in iter {
            set.insert(lane);
        }
        set
    }
}

/// Type of note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteType {
    Normal,
    Sustained,
}

/// A single note in the chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub lane: Lane,
    /// Target hit instant, in song-position seconds.
    pub time_secs: f64,
    pub note_type: NoteType,
    /// Hold length in seconds; 0.0 for normal notes.
    pub duration_secs: f64,
}

impl Note {
    /// Create a new normal note.
    pub fn normal(lane: Lane, time_secs: f64) -> Self {
        Self {
            lane,
            time_secs,
            note_type: NoteType::Normal,
            duration_secs: 0.0,
        }
    }

    /// Create a new sustained note.
    pub fn sustained(lane: Lane, time_secs: f64, duration_secs: f64) -> Self {
        Self {
            lane,
            time_secs,
            note_type: NoteType::Sustained,
            duration_secs,
        }
    }

    /// Returns true if this is a sustained note.
    pub fn is_sustained(&self) -> bool {
        self.note_type == NoteType::Sustained
    }

    /// The instant the note stops being active (hold end for sustained
    /// notes, the target instant itself otherwise).
    pub fn end_secs(&self) -> f64 {
        self.time_secs + self.duration_secs
    }
}
