mod aggregator;
mod error;
mod judge;
mod pool;
mod score;
mod session;

pub use aggregator::{CandidateChord, ChordAggregator, KeyEventKind, RawKeyEvent};
pub use error::JudgeError;
pub use judge::{Grade, JudgementResult, judge_chord};
pub use pool::{NotePool, NoteState};
pub use score::{ScoreManager, TimingDirection, TimingStats};
pub use session::{JudgementConsumer, PlaySession, SessionSummary};
