use std::collections::VecDeque;

use log::{debug, warn};

use crate::config::JudgeConfig;
use crate::model::chart::ChartQueue;
use crate::model::note::Lane;

use super::aggregator::{CandidateChord, ChordAggregator, KeyEventKind, RawKeyEvent};
use super::judge::{self, JudgementResult};
use super::pool::{NotePool, NoteState};
use super::score::{ScoreManager, TimingStats};

/// One consumer of judgement results.
pub type JudgementConsumer = Box<dyn FnMut(&JudgementResult)>;

/// Snapshot of a play-through for result screens.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub total_notes: usize,
    pub resolved_notes: usize,
    pub total_score: f64,
    pub max_combo: u32,
    pub accuracy: f64,
    pub fast_count: u32,
    pub slow_count: u32,
}

/// Owns the judgement pipeline for one play-through of a chart.
///
/// Constructed explicitly at session start and dropped at session end;
/// there is no ambient global state. The host pushes raw key transitions
/// as they arrive and calls `tick` once per frame with the current song
/// position. Everything runs synchronously on the caller's thread:
/// timeout misses first (sparing only notes an in-flight, in-time attempt
/// can still claim), then buffered input, then window expiry. A press
/// anchored after a note's tolerance window can never bring it back.
pub struct PlaySession {
    config: JudgeConfig,
    pool: NotePool,
    aggregator: ChordAggregator,
    pending: VecDeque<RawKeyEvent>,
    consumers: Vec<JudgementConsumer>,
    score: ScoreManager,
    timing: TimingStats,
}

impl PlaySession {
    pub fn new(config: JudgeConfig, chart: ChartQueue) -> Self {
        Self {
            config,
            pool: NotePool::new(chart),
            aggregator: ChordAggregator::new(),
            pending: VecDeque::new(),
            consumers: Vec::new(),
            score: ScoreManager::new(),
            timing: TimingStats::default(),
        }
    }

    /// Register a judgement consumer. Consumers run synchronously in
    /// registration order, once per emitted result, and must not block.
    pub fn register_consumer(&mut self, consumer: impl FnMut(&JudgementResult) + 'static) {
        self.consumers.push(Box::new(consumer));
    }

    /// Queue a raw key transition. Judgement happens on the next `tick`.
    pub fn push_key_event(&mut self, event: RawKeyEvent) {
        self.pending.push_back(event);
    }

    /// Per-frame driver.
    pub fn tick(&mut self, now_secs: f64) {
        let tolerance = self.config.chord_time_tolerance_secs;
        let detection = self.config.chord_detection_window_secs;

        let claimed = self.claimed_notes();
        let missed = self.pool.advance_protected(now_secs, tolerance, &claimed);
        if !missed.is_empty() {
            debug!("{} note(s) timed out at {now_secs:.3}s", missed.len());
            let result = judge::timeout_result(&self.config, &self.pool, &missed);
            self.emit(result);
        }

        while let Some(event) = self.pending.pop_front() {
            match event.kind {
                KeyEventKind::Down => {
                    if let Some(chord) =
                        self.aggregator.push_down(event.lane, event.time_secs, detection)
                    {
                        self.judge_and_emit(chord);
                    }
                }
                KeyEventKind::Up => {
                    // A lone key letting go ends its attempt right away;
                    // the release never cancels window membership.
                    let lone = self
                        .aggregator
                        .open_window()
                        .is_some_and(|open| open.lanes.len() == 1 && open.lanes.contains(event.lane));
                    if lone && let Some(chord) = self.aggregator.flush() {
                        self.judge_and_emit(chord);
                    }
                    self.handle_release(event.lane, event.time_secs);
                }
            }
        }

        if let Some(chord) = self.aggregator.poll_expired(now_secs, detection) {
            self.judge_and_emit(chord);
        }
    }

    /// End-of-song flush: emit the open aggregation window and time out
    /// every note still unresolved.
    pub fn finish(&mut self, now_secs: f64) {
        self.tick(now_secs);
        if let Some(chord) = self.aggregator.flush() {
            self.judge_and_emit(chord);
        }
        let missed = self
            .pool
            .advance(f64::INFINITY, self.config.chord_time_tolerance_secs);
        if !missed.is_empty() {
            let result = judge::timeout_result(&self.config, &self.pool, &missed);
            self.emit(result);
        }
    }

    /// Notes still claimable by an in-flight attempt: the open
    /// aggregation window, or a buffered press anchored inside the note's
    /// tolerance window. These are exempt from this tick's timeout pass —
    /// the attempt itself decides their fate when it is judged.
    fn claimed_notes(&self) -> Vec<usize> {
        let tolerance = self.config.chord_time_tolerance_secs;
        let mut claimed = Vec::new();

        if let Some(open) = self.aggregator.open_window() {
            for lane in open.lanes.iter() {
                if let Some(i) = self.pool.query_due(lane, open.anchor_secs, tolerance) {
                    claimed.push(i);
                }
            }
        }
        for event in &self.pending {
            if event.kind == KeyEventKind::Down
                && let Some(i) = self.pool.query_due(event.lane, event.time_secs, tolerance)
                && !claimed.contains(&i)
            {
                claimed.push(i);
            }
        }
        claimed
    }

    fn handle_release(&mut self, lane: Lane, time_secs: f64) {
        let tolerance = self.config.chord_time_tolerance_secs;
        if let Some((_, state)) = self.pool.release_hold(lane, time_secs, tolerance) {
            match state {
                NoteState::Hit => {
                    debug!("hold on {lane:?} released cleanly at {time_secs:.3}s");
                }
                NoteState::PartiallyHit => {
                    debug!("hold on {lane:?} dropped early at {time_secs:.3}s");
                    let result = judge::early_release_result(&self.config, lane);
                    self.emit(result);
                }
                _ => {
                    warn!("hold on {lane:?} resolved to unexpected state {state:?}");
                }
            }
        }
    }

    fn judge_and_emit(&mut self, chord: CandidateChord) {
        match judge::judge_chord(&self.config, &mut self.pool, &chord) {
            Ok(result) => self.emit(result),
            // Local to this frame: log, skip the attempt, keep playing.
            Err(err) => warn!("skipping chord at {:.3}s: {err}", chord.anchor_secs),
        }
    }

    fn emit(&mut self, result: JudgementResult) {
        self.score.apply(&result);
        self.timing.record(&result);
        for consumer in &mut self.consumers {
            consumer(&result);
        }
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    pub fn score(&self) -> &ScoreManager {
        &self.score
    }

    pub fn timing_stats(&self) -> &TimingStats {
        &self.timing
    }

    /// True once every chart note has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.pool.is_finished()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            total_notes: self.pool.len(),
            resolved_notes: self.pool.len() - self.pool.remaining(),
            total_score: self.score.total_score,
            max_combo: self.score.max_combo,
            accuracy: self.score.accuracy(),
            fast_count: self.timing.fast_count,
            slow_count: self.timing.slow_count,
        }
    }
}
