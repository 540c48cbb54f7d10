use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::JudgeConfig;
use crate::model::note::{LANE_COUNT, Lane, LaneSet};

use super::aggregator::CandidateChord;
use super::error::JudgeError;
use super::pool::{NotePool, NoteState};

/// Outcome classification of one input attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    PerfectChord,
    PartialChord,
    SingleHit,
    Miss,
}

impl Grade {
    /// Whether this grade breaks combo in the scoring consumer.
    pub fn is_combo_break(self) -> bool {
        matches!(self, Self::Miss)
    }
}

/// Result of judging one candidate chord, one timeout batch, or one
/// sustained release. Created once, immutable, handed to consumers.
///
/// `lanes_resolved` reports the per-lane outcome: `Hit` for matched
/// presses (sustained heads included, even though the pool finalizes them
/// at release), `Missed` for attempted lanes that had nothing due or
/// whose notes were forfeited by an all-or-nothing chord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgementResult {
    pub lanes_attempted: LaneSet,
    pub lanes_resolved: [Option<NoteState>; LANE_COUNT],
    pub grade: Grade,
    pub score_delta: f64,
    /// Signed press error per hit lane: anchor time minus note target
    /// time (negative = early).
    pub timing_errors: [Option<f64>; LANE_COUNT],
}

impl JudgementResult {
    /// Number of lanes that registered a hit.
    pub fn hit_count(&self) -> usize {
        self.lanes_resolved
            .iter()
            .filter(|s| **s == Some(NoteState::Hit))
            .count()
    }

    /// Number of lanes reported missed (timeouts, ghost presses, and
    /// forfeited chord members included).
    pub fn miss_count(&self) -> usize {
        self.lanes_resolved
            .iter()
            .filter(|s| matches!(s, Some(NoteState::Missed) | Some(NoteState::PartiallyHit)))
            .count()
    }
}

/// Judge one candidate chord against the pool.
///
/// Resolves every note whose state changes, records signed timing errors
/// for the hits, and computes the score delta. A ghost press (nothing due
/// on any attempted lane) grades `Miss` without touching the pool.
pub fn judge_chord(
    config: &JudgeConfig,
    pool: &mut NotePool,
    chord: &CandidateChord,
) -> Result<JudgementResult, JudgeError> {
    if chord.lanes.is_empty() {
        return Err(JudgeError::InvalidChord);
    }

    let tolerance = config.chord_time_tolerance_secs;
    let mut due: [Option<usize>; LANE_COUNT] = [None; LANE_COUNT];
    let mut matched = LaneSet::new();
    for lane in chord.lanes.iter() {
        if let Some(i) = pool.query_due(lane, chord.anchor_secs, tolerance) {
            due[lane.index()] = Some(i);
            matched.insert(lane);
        }
    }

    let attempted = chord.lanes.len();
    let hits = matched.len();
    let grade = classify(config, pool, chord, matched, &due);

    let mut lanes_resolved: [Option<NoteState>; LANE_COUNT] = [None; LANE_COUNT];
    let mut timing_errors: [Option<f64>; LANE_COUNT] = [None; LANE_COUNT];

    if grade == Grade::Miss && hits > 0 {
        // All-or-nothing failure: forfeit every matched note and every
        // still-pending member of its exact-time chart group.
        let mut forfeited: Vec<usize> = Vec::new();
        for lane in matched.iter() {
            let Some(i) = due[lane.index()] else { continue };
            for g in pool.group_at(pool.note(i).time_secs) {
                if !forfeited.contains(&g) {
                    forfeited.push(g);
                }
            }
        }
        for &i in &forfeited {
            lanes_resolved[pool.note(i).lane.index()] = Some(NoteState::Missed);
            pool.resolve(i, NoteState::Missed)?;
        }
    } else if grade != Grade::Miss {
        for lane in matched.iter() {
            let Some(i) = due[lane.index()] else { continue };
            let note = *pool.note(i);
            timing_errors[lane.index()] = Some(chord.anchor_secs - note.time_secs);
            if note.is_sustained() {
                pool.begin_hold(i)?;
            } else {
                pool.resolve(i, NoteState::Hit)?;
            }
            lanes_resolved[lane.index()] = Some(NoteState::Hit);
        }
    }

    // Attempted lanes with nothing due are reported missed, never
    // silently dropped; no note backs them, so the pool is untouched.
    for lane in chord.lanes.iter() {
        if !matched.contains(lane) {
            lanes_resolved[lane.index()] = Some(NoteState::Missed);
        }
    }

    let score_delta = score_delta(config, grade, hits, attempted);
    debug!(
        "chord at {:.3}s: {hits}/{attempted} matched, {grade:?}, delta {score_delta:+.1}",
        chord.anchor_secs
    );

    Ok(JudgementResult {
        lanes_attempted: chord.lanes,
        lanes_resolved,
        grade,
        score_delta,
        timing_errors,
    })
}

/// Grade classification for a chord attempt.
///
/// A perfect chord needs every attempted lane matched, all matched notes
/// on one exact chart time, and that chart chord group fully covered by
/// the attempt. Below `minimum_chord_size` an attempt is judged as a
/// plain press, outside the chord policies.
fn classify(
    config: &JudgeConfig,
    pool: &NotePool,
    chord: &CandidateChord,
    matched: LaneSet,
    due: &[Option<usize>; LANE_COUNT],
) -> Grade {
    let attempted = chord.lanes.len();
    let hits = matched.len();

    if hits == 0 {
        return Grade::Miss;
    }
    if attempted < config.minimum_chord_size {
        return if hits == attempted {
            Grade::SingleHit
        } else {
            Grade::PartialChord
        };
    }
    if hits == attempted && chart_group_covered(pool, chord, matched, due) {
        return Grade::PerfectChord;
    }
    if config.allow_partial_chord_hits {
        Grade::PartialChord
    } else {
        Grade::Miss
    }
}

/// True when the matched notes share one exact chart time and no pending
/// note of that chord group sits outside the attempted lanes.
fn chart_group_covered(
    pool: &NotePool,
    chord: &CandidateChord,
    matched: LaneSet,
    due: &[Option<usize>; LANE_COUNT],
) -> bool {
    let Some(first) = matched.iter().next().and_then(|l| due[l.index()]) else {
        return false;
    };
    let group_time = pool.note(first).time_secs;

    if !matched
        .iter()
        .all(|l| due[l.index()].is_some_and(|i| pool.note(i).time_secs == group_time))
    {
        return false;
    }

    pool.group_at(group_time)
        .iter()
        .all(|&i| chord.lanes.contains(pool.note(i).lane))
}

/// Deterministic score delta from grade, multiplier, and bonus.
///
/// The partial multiplier is linear in the matched/attempted ratio.
fn score_delta(config: &JudgeConfig, grade: Grade, hits: usize, attempted: usize) -> f64 {
    let base = config.base_note_score;
    match grade {
        Grade::PerfectChord => {
            base * hits as f64 * config.chord_score_multiplier + config.perfect_chord_bonus
        }
        Grade::PartialChord => {
            let ratio = hits as f64 / attempted as f64;
            base * hits as f64 * config.chord_score_multiplier * ratio
        }
        Grade::SingleHit => base,
        Grade::Miss => -config.miss_penalty.abs(),
    }
}

/// Result for one batch of timeout misses from the pool's `advance`.
/// No lanes were attempted; the player simply never pressed.
pub fn timeout_result(config: &JudgeConfig, pool: &NotePool, missed: &[usize]) -> JudgementResult {
    let mut lanes_resolved: [Option<NoteState>; LANE_COUNT] = [None; LANE_COUNT];
    for &i in missed {
        lanes_resolved[pool.note(i).lane.index()] = Some(NoteState::Missed);
    }
    JudgementResult {
        lanes_attempted: LaneSet::new(),
        lanes_resolved,
        grade: Grade::Miss,
        score_delta: -config.miss_penalty.abs() * missed.len() as f64,
        timing_errors: [None; LANE_COUNT],
    }
}

/// Result for a sustained note released before its end window.
pub fn early_release_result(config: &JudgeConfig, lane: Lane) -> JudgementResult {
    let mut lanes_resolved: [Option<NoteState>; LANE_COUNT] = [None; LANE_COUNT];
    lanes_resolved[lane.index()] = Some(NoteState::PartiallyHit);
    JudgementResult {
        lanes_attempted: LaneSet::single(lane),
        lanes_resolved,
        grade: Grade::Miss,
        score_delta: -config.miss_penalty.abs(),
        timing_errors: [None; LANE_COUNT],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::chart::ChartQueue;
    use crate::model::note::Note;

    fn test_config() -> JudgeConfig {
        JudgeConfig::default()
    }

    fn pool_of(notes: Vec<Note>) -> NotePool {
        NotePool::new(ChartQueue::new(notes).unwrap())
    }

    fn chord(lanes: &[Lane], anchor_secs: f64) -> CandidateChord {
        CandidateChord {
            lanes: lanes.iter().copied().collect(),
            anchor_secs,
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn single_press_on_due_note_is_single_hit() {
        let config = test_config();
        let mut pool = pool_of(vec![Note::normal(Lane::Key3, 5.0)]);

        let result = judge_chord(&config, &mut pool, &chord(&[Lane::Key3], 5.03)).unwrap();

        assert_eq!(result.grade, Grade::SingleHit);
        assert_eq!(result.lanes_resolved[Lane::Key3.index()], Some(NoteState::Hit));
        let error = result.timing_errors[Lane::Key3.index()].unwrap();
        assert!((error - 0.03).abs() < 1e-9);
        assert_eq!(pool.state(0), NoteState::Hit);
    }

    #[test]
    fn full_coverage_same_time_is_perfect_chord() {
        let config = test_config();
        let mut pool = pool_of(vec![
            Note::normal(Lane::Key1, 10.0),
            Note::normal(Lane::Key3, 10.0),
        ]);

        let result =
            judge_chord(&config, &mut pool, &chord(&[Lane::Key1, Lane::Key3], 10.02)).unwrap();

        assert_eq!(result.grade, Grade::PerfectChord);
        assert_eq!(result.hit_count(), 2);
        assert!(pool.is_finished());
    }

    #[test]
    fn subset_of_chart_group_is_partial() {
        let config = test_config();
        let mut pool = pool_of(vec![
            Note::normal(Lane::Key1, 10.0),
            Note::normal(Lane::Key3, 10.0),
            Note::normal(Lane::Key5, 10.0),
        ]);

        let result =
            judge_chord(&config, &mut pool, &chord(&[Lane::Key1, Lane::Key3], 10.0)).unwrap();

        assert_eq!(result.grade, Grade::PartialChord);
        assert_eq!(pool.state(0), NoteState::Hit);
        assert_eq!(pool.state(1), NoteState::Hit);
        // the unattempted member is untouched
        assert_eq!(pool.state(2), NoteState::Pending);
    }

    #[test]
    fn unmatched_lane_reported_missed_without_pool_mutation() {
        let config = test_config();
        let mut pool = pool_of(vec![Note::normal(Lane::Key1, 10.0)]);

        let result =
            judge_chord(&config, &mut pool, &chord(&[Lane::Key1, Lane::Key4], 10.0)).unwrap();

        assert_eq!(result.grade, Grade::PartialChord);
        assert_eq!(result.lanes_resolved[Lane::Key1.index()], Some(NoteState::Hit));
        assert_eq!(result.lanes_resolved[Lane::Key4.index()], Some(NoteState::Missed));
        assert_eq!(pool.state(0), NoteState::Hit);
    }

    #[test]
    fn notes_at_different_times_never_grade_perfect() {
        let config = test_config();
        let mut pool = pool_of(vec![
            Note::normal(Lane::Key1, 10.0),
            Note::normal(Lane::Key3, 10.05),
        ]);

        let result =
            judge_chord(&config, &mut pool, &chord(&[Lane::Key1, Lane::Key3], 10.02)).unwrap();

        assert_eq!(result.grade, Grade::PartialChord);
        assert_eq!(result.hit_count(), 2);
    }

    #[test]
    fn ghost_press_is_miss_and_touches_nothing() {
        let config = test_config();
        let mut pool = pool_of(vec![Note::normal(Lane::Key1, 10.0)]);

        let result = judge_chord(&config, &mut pool, &chord(&[Lane::Key4], 20.0)).unwrap();

        assert_eq!(result.grade, Grade::Miss);
        assert_eq!(result.lanes_resolved[Lane::Key4.index()], Some(NoteState::Missed));
        assert!(result.score_delta <= 0.0);
        assert_eq!(pool.state(0), NoteState::Pending);
    }

    #[test]
    fn all_or_nothing_forfeits_whole_chart_group() {
        let config = JudgeConfig {
            allow_partial_chord_hits: false,
            ..test_config()
        };
        let mut pool = pool_of(vec![
            Note::normal(Lane::Key1, 10.0),
            Note::normal(Lane::Key3, 10.0),
            Note::normal(Lane::Key5, 10.0),
        ]);

        let result =
            judge_chord(&config, &mut pool, &chord(&[Lane::Key1, Lane::Key3], 10.0)).unwrap();

        assert_eq!(result.grade, Grade::Miss);
        assert_eq!(pool.state(0), NoteState::Missed);
        assert_eq!(pool.state(1), NoteState::Missed);
        assert_eq!(pool.state(2), NoteState::Missed);
    }

    #[test]
    fn all_or_nothing_still_allows_perfect() {
        let config = JudgeConfig {
            allow_partial_chord_hits: false,
            ..test_config()
        };
        let mut pool = pool_of(vec![
            Note::normal(Lane::Key1, 10.0),
            Note::normal(Lane::Key3, 10.0),
        ]);

        let result =
            judge_chord(&config, &mut pool, &chord(&[Lane::Key1, Lane::Key3], 10.0)).unwrap();

        assert_eq!(result.grade, Grade::PerfectChord);
    }

    #[test]
    fn empty_lane_set_is_rejected() {
        let config = test_config();
        let mut pool = pool_of(vec![Note::normal(Lane::Key1, 1.0)]);
        let invalid = CandidateChord {
            lanes: LaneSet::new(),
            anchor_secs: 1.0,
        };
        assert_eq!(
            judge_chord(&config, &mut pool, &invalid).unwrap_err(),
            JudgeError::InvalidChord
        );
        assert_eq!(pool.state(0), NoteState::Pending);
    }

    #[test]
    fn tolerance_boundary_inclusive() {
        let config = test_config();
        let tolerance = config.chord_time_tolerance_secs;

        let mut pool = pool_of(vec![Note::normal(Lane::Key2, 5.0)]);
        let result =
            judge_chord(&config, &mut pool, &chord(&[Lane::Key2], 5.0 + tolerance)).unwrap();
        assert_eq!(result.grade, Grade::SingleHit);

        let mut pool = pool_of(vec![Note::normal(Lane::Key2, 5.0)]);
        let result = judge_chord(
            &config,
            &mut pool,
            &chord(&[Lane::Key2], 5.0 + tolerance + 0.001),
        )
        .unwrap();
        assert_eq!(result.grade, Grade::Miss);
        assert_eq!(pool.state(0), NoteState::Pending);
    }

    #[test]
    fn sustained_head_begins_hold_instead_of_resolving() {
        let config = test_config();
        let mut pool = pool_of(vec![Note::sustained(Lane::Key2, 2.0, 1.0)]);

        let result = judge_chord(&config, &mut pool, &chord(&[Lane::Key2], 2.01)).unwrap();

        assert_eq!(result.grade, Grade::SingleHit);
        assert_eq!(result.lanes_resolved[Lane::Key2.index()], Some(NoteState::Hit));
        assert_eq!(pool.state(0), NoteState::Holding);
        assert_eq!(pool.active_hold(Lane::Key2), Some(0));
    }

    // =========================================================================
    // Score deltas
    // =========================================================================

    #[test]
    fn perfect_chord_delta_includes_bonus() {
        let config = test_config();
        let delta = score_delta(&config, Grade::PerfectChord, 3, 3);
        let expected =
            config.base_note_score * 3.0 * config.chord_score_multiplier + config.perfect_chord_bonus;
        assert!((delta - expected).abs() < 1e-9);
    }

    #[test]
    fn partial_delta_scales_with_match_ratio() {
        let config = test_config();
        let delta = score_delta(&config, Grade::PartialChord, 2, 3);
        let expected = config.base_note_score * 2.0 * config.chord_score_multiplier * (2.0 / 3.0);
        assert!((delta - expected).abs() < 1e-9);
    }

    #[test]
    fn miss_delta_never_positive() {
        let config = JudgeConfig {
            miss_penalty: 25.0,
            ..test_config()
        };
        assert!(score_delta(&config, Grade::Miss, 0, 2) <= 0.0);
        assert!((score_delta(&config, Grade::Miss, 0, 2) + 25.0).abs() < 1e-9);
    }

    #[test]
    fn timeout_result_reports_missed_lanes() {
        let config = test_config();
        let mut pool = pool_of(vec![
            Note::normal(Lane::Key1, 1.0),
            Note::normal(Lane::Key4, 1.0),
        ]);
        let missed = pool.advance(2.0, config.chord_time_tolerance_secs);
        let result = timeout_result(&config, &pool, &missed);

        assert_eq!(result.grade, Grade::Miss);
        assert!(result.lanes_attempted.is_empty());
        assert_eq!(result.lanes_resolved[Lane::Key1.index()], Some(NoteState::Missed));
        assert_eq!(result.lanes_resolved[Lane::Key4.index()], Some(NoteState::Missed));
    }
}
