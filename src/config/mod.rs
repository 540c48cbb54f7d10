use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Tolerances and scoring knobs for the judgement engine.
///
/// Loaded once at session start and read-only until the next session;
/// the engine borrows it, never copies it. Replace wholesale between
/// sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// Maximum spread between the first and last key-down of one chord
    /// attempt, in seconds.
    #[serde(default = "default_chord_detection_window")]
    pub chord_detection_window_secs: f64,
    /// Maximum |press − note target| for a hit, in seconds.
    #[serde(default = "default_chord_time_tolerance")]
    pub chord_time_tolerance_secs: f64,
    /// Smallest number of simultaneous lanes that counts as a chord
    /// attempt; below this an input is judged as a plain press.
    #[serde(default = "default_minimum_chord_size")]
    pub minimum_chord_size: usize,
    /// When false, chord attempts are all-or-nothing.
    #[serde(default = "default_allow_partial")]
    pub allow_partial_chord_hits: bool,
    /// Score multiplier applied per note of a chord hit.
    #[serde(default = "default_chord_score_multiplier")]
    pub chord_score_multiplier: f64,
    /// Flat bonus for hitting a full chart chord.
    #[serde(default = "default_perfect_chord_bonus")]
    pub perfect_chord_bonus: f64,
    /// Score for a plain single-note hit.
    #[serde(default = "default_base_note_score")]
    pub base_note_score: f64,
    /// Score subtracted per miss; always applied as a non-positive delta.
    #[serde(default)]
    pub miss_penalty: f64,
}

fn default_chord_detection_window() -> f64 {
    0.050
}

fn default_chord_time_tolerance() -> f64 {
    0.100
}

fn default_minimum_chord_size() -> usize {
    2
}

fn default_allow_partial() -> bool {
    true
}

fn default_chord_score_multiplier() -> f64 {
    1.5
}

fn default_perfect_chord_bonus() -> f64 {
    50.0
}

fn default_base_note_score() -> f64 {
    100.0
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            chord_detection_window_secs: default_chord_detection_window(),
            chord_time_tolerance_secs: default_chord_time_tolerance(),
            minimum_chord_size: default_minimum_chord_size(),
            allow_partial_chord_hits: default_allow_partial(),
            chord_score_multiplier: default_chord_score_multiplier(),
            perfect_chord_bonus: default_perfect_chord_bonus(),
            base_note_score: default_base_note_score(),
            miss_penalty: 0.0,
        }
    }
}

impl JudgeConfig {
    /// Load the config from its platform location, falling back to
    /// defaults when missing or unreadable.
    pub fn load() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_from(&path).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the config to its platform location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("com", "chordfall", "chordfall") {
            Ok(proj_dirs.config_dir().join("judge.json"))
        } else {
            Ok(PathBuf::from(".chordfall-judge.json"))
        }
    }
}
