// Data-driven pipeline configuration.
//
// Every tunable number the pipeline uses lives in `MelodiaConfig`, loaded
// from JSON. Fields carry `#[serde(default)]`, so a config file only needs
// the values it changes; an empty object `{}` is the stock setup (sixteenth
// note grid, 64-step windows, folk-song duration set).
//
// `sequence_length` is the single source for three quantities that must
// agree: the training window length, the delimiter run written between
// corpus items, and the delimiter padding placed in front of a generation
// seed. If the delimiter run were shorter than the window, a training
// context could straddle two unrelated items without ever seeing a full
// boundary.
//
// See also: `preprocess.rs` (reads paths + quantization), `generator.rs`
// (reads `generation`), `main.rs` (CLI flags override these values).

use crate::error::{MelodiaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tolerance used when comparing durations measured in quarter lengths.
pub const DURATION_EPSILON: f64 = 1e-9;

/// Longest single event, in steps, the grid will represent.
pub const MAX_EVENT_STEPS: usize = 1 << 16;

/// Everything needed to place events on the time-step grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizationConfig {
    /// Length of one time step in quarter notes (0.25 = sixteenth).
    pub step_duration: f64,
    /// Durations (quarter lengths) an item may contain. Anything else
    /// rejects the whole item.
    pub acceptable_durations: Vec<f64>,
}

impl Default for QuantizationConfig {
    fn default() -> Self {
        QuantizationConfig {
            step_duration: 0.25,
            acceptable_durations: vec![0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0],
        }
    }
}

impl QuantizationConfig {
    /// Whether `duration` is one of the accepted values.
    pub fn accepts(&self, duration: f64) -> bool {
        self.acceptable_durations
            .iter()
            .any(|&d| (d - duration).abs() <= DURATION_EPSILON)
    }

    /// Number of whole steps `duration` spans, if it lies on the grid and
    /// is at most `MAX_EVENT_STEPS` long.
    pub fn steps_for(&self, duration: f64) -> Option<usize> {
        if !duration.is_finite() || duration <= 0.0 {
            return None;
        }
        let steps = (duration / self.step_duration).round();
        let on_grid = (steps * self.step_duration - duration).abs() <= DURATION_EPSILON;
        if (1.0..=MAX_EVENT_STEPS as f64).contains(&steps) && on_grid {
            Some(steps as usize)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.step_duration.is_finite() || self.step_duration <= 0.0 {
            return Err(MelodiaError::Config(format!(
                "step_duration must be positive, got {}",
                self.step_duration
            )));
        }
        for &d in &self.acceptable_durations {
            if self.steps_for(d).is_none() {
                return Err(MelodiaError::Config(format!(
                    "acceptable duration {d} is not a positive multiple of step {}",
                    self.step_duration
                )));
            }
        }
        Ok(())
    }
}

/// Defaults for the generation entry point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub num_steps: usize,
    pub max_context: usize,
    pub temperature: f64,
    /// Fixed RNG seed. `None` picks one from the clock.
    pub seed: Option<u64>,
    pub tempo_bpm: u16,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            num_steps: 500,
            max_context: 64,
            temperature: 0.3,
            seed: None,
            tempo_bpm: 120,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelodiaConfig {
    pub quantization: QuantizationConfig,
    /// Training window length, delimiter run length, and seed padding.
    pub sequence_length: usize,
    /// Root of the score tree (`*.json` score files).
    pub dataset_dir: PathBuf,
    /// Per-item encodings, one text file per accepted score.
    pub encoded_dir: PathBuf,
    /// The assembled, delimited corpus stream.
    pub corpus_path: PathBuf,
    /// Symbol -> id mapping.
    pub mapping_path: PathBuf,
    /// Trained n-gram predictor.
    pub model_path: PathBuf,
    pub ngram_order: usize,
    pub generation: GenerationConfig,
}

impl Default for MelodiaConfig {
    fn default() -> Self {
        MelodiaConfig {
            quantization: QuantizationConfig::default(),
            sequence_length: 64,
            dataset_dir: PathBuf::from("dataset/raw"),
            encoded_dir: PathBuf::from("dataset/encoded"),
            corpus_path: PathBuf::from("file_dataset"),
            mapping_path: PathBuf::from("mapping.json"),
            model_path: PathBuf::from("ngram_model.json"),
            ngram_order: 4,
            generation: GenerationConfig::default(),
        }
    }
}

impl MelodiaConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MelodiaConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<()> {
        self.quantization.validate()?;
        if self.sequence_length == 0 {
            return Err(MelodiaError::Config("sequence_length must be positive".into()));
        }
        if self.ngram_order == 0 {
            return Err(MelodiaError::Config("ngram_order must be positive".into()));
        }
        if self.generation.max_context == 0 {
            return Err(MelodiaError::Config("max_context must be positive".into()));
        }
        let t = self.generation.temperature;
        if !t.is_finite() || t <= 0.0 {
            return Err(MelodiaError::InvalidTemperature(t));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_the_default_setup() {
        let config = MelodiaConfig::from_json("{}").unwrap();
        assert_eq!(config, MelodiaConfig::default());
        assert_eq!(config.sequence_length, 64);
        assert_eq!(config.quantization.step_duration, 0.25);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = MelodiaConfig::from_json(
            r#"{ "sequence_length": 32, "generation": { "temperature": 0.8 } }"#,
        )
        .unwrap();
        assert_eq!(config.sequence_length, 32);
        assert_eq!(config.generation.temperature, 0.8);
        assert_eq!(config.generation.num_steps, 500);
        assert_eq!(config.quantization.acceptable_durations.len(), 8);
    }

    #[test]
    fn steps_follow_the_grid() {
        let q = QuantizationConfig::default();
        assert_eq!(q.steps_for(0.25), Some(1));
        assert_eq!(q.steps_for(0.75), Some(3));
        assert_eq!(q.steps_for(4.0), Some(16));
        assert_eq!(q.steps_for(1.0 / 3.0), None);
        assert_eq!(q.steps_for(0.1), None);
        assert_eq!(q.steps_for(0.0), None);
        assert_eq!(q.steps_for(-0.5), None);
    }

    #[test]
    fn huge_durations_are_off_the_grid() {
        let q = QuantizationConfig::default();
        let longest = MAX_EVENT_STEPS as f64 * q.step_duration;
        assert_eq!(q.steps_for(longest), Some(MAX_EVENT_STEPS));
        assert_eq!(q.steps_for(longest + q.step_duration), None);
        assert_eq!(q.steps_for(1e30), None);
        assert_eq!(q.steps_for(f64::INFINITY), None);

        let json = r#"{ "quantization": { "acceptable_durations": [1.0, 1e30] } }"#;
        assert!(matches!(MelodiaConfig::from_json(json), Err(MelodiaError::Config(_))));
    }

    #[test]
    fn off_grid_acceptable_duration_is_rejected() {
        let json = r#"{ "quantization": { "step_duration": 0.5, "acceptable_durations": [0.5, 0.75] } }"#;
        assert!(matches!(MelodiaConfig::from_json(json), Err(MelodiaError::Config(_))));
    }

    #[test]
    fn bad_scalars_are_rejected() {
        assert!(MelodiaConfig::from_json(r#"{ "sequence_length": 0 }"#).is_err());
        assert!(matches!(
            MelodiaConfig::from_json(r#"{ "generation": { "temperature": 0.0 } }"#),
            Err(MelodiaError::InvalidTemperature(_))
        ));
        assert!(MelodiaConfig::from_json(r#"{ "quantization": { "step_duration": -1.0 } }"#).is_err());
    }
}
