use thiserror::Error;

use crate::model::note::Lane;

/// Errors surfaced by the judgement path.
///
/// Both are local to a single frame: the session logs the error, skips
/// the offending attempt, and keeps running.
#[derive(Debug, Error, PartialEq)]
pub enum JudgeError {
    #[error("chord attempt with an empty lane set")]
    InvalidChord,

    #[error("note in lane {lane:?} at {time_secs}s was already resolved")]
    AlreadyResolved { lane: Lane, time_secs: f64 },
}
