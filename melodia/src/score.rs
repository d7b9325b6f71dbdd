// Scores as the pipeline sees them.
//
// A notation parser (outside this crate) reduces each source file to a
// monophonic list of events: a pitch or a rest plus a duration in quarter
// lengths. That list is handed over as a small JSON document:
//
//   { "title": "erk 042", "key": "G major",
//     "events": [ { "pitch": 67, "duration": 1.0 },
//                 { "pitch": null, "duration": 0.5 } ] }
//
// `key` is optional; when it is missing, `key.rs` estimates one from the
// pitch content. Score trees are walked recursively and in sorted order, so
// item indices are stable between runs.

use crate::config::QuantizationConfig;
use crate::error::{MelodiaError, Result};
use crate::key::Key;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One note or rest. `pitch == None` is a rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub pitch: Option<u8>,
    /// Quarter lengths.
    pub duration: f64,
}

impl ScoreEvent {
    pub fn note(pitch: u8, duration: f64) -> Self {
        ScoreEvent { pitch: Some(pitch), duration }
    }

    pub fn rest(duration: f64) -> Self {
        ScoreEvent { pitch: None, duration }
    }

    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub title: Option<String>,
    /// Declared key signature, if the source had one.
    #[serde(default)]
    pub key: Option<Key>,
    pub events: Vec<ScoreEvent>,
}

impl Score {
    pub fn from_events(events: Vec<ScoreEvent>) -> Self {
        Score { title: None, key: None, events }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Index of the first event whose duration is not accepted.
    pub fn first_unacceptable_duration(&self, quantization: &QuantizationConfig) -> Option<usize> {
        self.events
            .iter()
            .position(|e| !quantization.accepts(e.duration))
    }
}

/// True when every event's duration is in the accepted set.
pub fn has_acceptable_durations(score: &Score, quantization: &QuantizationConfig) -> bool {
    score.first_unacceptable_duration(quantization).is_none()
}

/// Reject the score if any duration is outside the accepted set.
pub fn check_durations(score: &Score, quantization: &QuantizationConfig) -> Result<()> {
    match score.first_unacceptable_duration(quantization) {
        Some(index) => Err(MelodiaError::UnquantizableDuration {
            index,
            duration: score.events[index].duration,
        }),
        None => Ok(()),
    }
}

/// All `*.json` score files under `dir`, sorted by path.
pub fn score_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    collect_json_files(dir, &mut paths)?;
    paths.sort();
    Ok(paths)
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

/// Load every score under `dir`. Files that fail to parse are logged and
/// skipped, so one broken export does not sink the whole dataset.
pub fn load_scores(dir: &Path) -> Result<Vec<(PathBuf, Score)>> {
    let mut scores = Vec::new();
    for path in score_paths(dir)? {
        match Score::load(&path) {
            Ok(score) => scores.push((path, score)),
            Err(e) => tracing::warn!("skipping unreadable score {}: {}", path.display(), e),
        }
    }
    Ok(scores)
}
