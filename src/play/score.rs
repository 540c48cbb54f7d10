use super::judge::{Grade, JudgementResult};

/// Accumulates score, combo, and per-grade counts from judgement results.
///
/// Lives outside the judgement engine: the engine only ever emits deltas.
#[derive(Debug, Clone, Default)]
pub struct ScoreManager {
    pub total_score: f64,
    pub perfect_chords: u32,
    pub partial_chords: u32,
    pub single_hits: u32,
    pub misses: u32,
    pub combo: u32,
    pub max_combo: u32,
    /// Lanes that registered hits, as reported in results.
    pub lanes_hit: u32,
    /// Lanes reported missed or partially hit, as reported in results.
    pub lanes_missed: u32,
}

impl ScoreManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, result: &JudgementResult) {
        self.total_score += result.score_delta;

        match result.grade {
            Grade::PerfectChord => self.perfect_chords += 1,
            Grade::PartialChord => self.partial_chords += 1,
            Grade::SingleHit => self.single_hits += 1,
            Grade::Miss => self.misses += 1,
        }

        let hits = result.hit_count() as u32;
        let misses = result.miss_count() as u32;

        // Any miss in the result breaks combo before the hits extend it,
        // so a partial chord restarts the chain at its hit count.
        if misses > 0 || result.grade.is_combo_break() {
            self.combo = 0;
        }
        self.combo += hits;
        self.max_combo = self.max_combo.max(self.combo);

        self.lanes_hit += hits;
        self.lanes_missed += misses;
    }

    /// Hit ratio over everything reported so far, as a percentage.
    pub fn accuracy(&self) -> f64 {
        let total = self.lanes_hit + self.lanes_missed;
        if total == 0 {
            return 100.0;
        }
        (self.lanes_hit as f64 / total as f64) * 100.0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Timing direction for fast/slow display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingDirection {
    Fast,
    Exact,
    Slow,
}

impl TimingDirection {
    const EXACT_THRESHOLD_SECS: f64 = 0.005;

    /// Classify a signed press error (anchor − note time; negative = early).
    pub fn from_error(error_secs: f64) -> Self {
        if error_secs < -Self::EXACT_THRESHOLD_SECS {
            TimingDirection::Fast
        } else if error_secs > Self::EXACT_THRESHOLD_SECS {
            TimingDirection::Slow
        } else {
            TimingDirection::Exact
        }
    }
}

/// Cumulative fast/slow statistics during gameplay.
#[derive(Debug, Clone, Default)]
pub struct TimingStats {
    pub fast_count: u32,
    pub slow_count: u32,
}

impl TimingStats {
    pub fn record(&mut self, result: &JudgementResult) {
        for error in result.timing_errors.iter().flatten() {
            match TimingDirection::from_error(*error) {
                TimingDirection::Fast => self.fast_count += 1,
                TimingDirection::Slow => self.slow_count += 1,
                TimingDirection::Exact => {}
            }
        }
    }
}
