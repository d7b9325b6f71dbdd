// Keys and transposition to a canonical key.
//
// Before encoding, every score is moved to C major or A minor so the model
// learns scale-degree patterns instead of twelve copies of each tune. The
// key comes from the score's declared signature when it has one; otherwise
// it is estimated with the Krumhansl-Kessler key profiles (correlation of a
// duration-weighted pitch-class histogram against the 24 rotated profiles).
//
// When a score declares a key AND the estimate disagrees, the declared key
// is used and the disagreement is logged as a warning. Ambiguous pieces do
// trip this; it is surfaced for a human to look at, never silently resolved
// toward the estimate.
//
// The shift is chosen in [-6, +5] semitones so melodies move as little as
// possible in register.

use crate::error::{MelodiaError, Result};
use crate::score::{Score, ScoreEvent};
use crate::symbol::MAX_PITCH;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
}

/// A tonic pitch class (0 = C .. 11 = B) plus a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    pub tonic: u8,
    pub mode: Mode,
}

const TONIC_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Krumhansl-Kessler probe-tone ratings, tonic first.
const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

impl Key {
    pub fn new(tonic: u8, mode: Mode) -> Self {
        Key { tonic: tonic % 12, mode }
    }

    pub fn c_major() -> Self {
        Key::new(0, Mode::Major)
    }

    pub fn a_minor() -> Self {
        Key::new(9, Mode::Minor)
    }

    /// The canonical key sharing this key's mode.
    pub fn canonical(self) -> Self {
        match self.mode {
            Mode::Major => Key::c_major(),
            Mode::Minor => Key::a_minor(),
        }
    }

    /// Semitone shift taking this key's tonic to the canonical tonic.
    pub fn canonical_shift(self) -> i8 {
        let target = self.canonical().tonic as i8;
        let up = (target - self.tonic as i8).rem_euclid(12);
        if up > 5 { up - 12 } else { up }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Major => "major",
            Mode::Minor => "minor",
        };
        write!(f, "{} {}", TONIC_NAMES[self.tonic as usize], mode)
    }
}

impl FromStr for Key {
    type Err = MelodiaError;

    /// Accepts "G major", "f# minor", "Bb", "e" (lowercase tonic alone = minor).
    fn from_str(text: &str) -> Result<Self> {
        let invalid = || MelodiaError::Config(format!("unrecognized key '{text}'"));
        let mut parts = text.split_whitespace();
        let tonic_text = parts.next().ok_or_else(invalid)?;
        let mode_text = parts.next();
        if parts.next().is_some() {
            return Err(invalid());
        }

        let mut chars = tonic_text.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        let natural: i8 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(invalid()),
        };
        let mut alteration: i8 = 0;
        for accidental in chars {
            alteration += match accidental {
                '#' => 1,
                'b' | '-' => -1,
                _ => return Err(invalid()),
            };
        }

        let mode = match mode_text.map(str::to_ascii_lowercase).as_deref() {
            Some("major") => Mode::Major,
            Some("minor") => Mode::Minor,
            Some(_) => return Err(invalid()),
            None if letter.is_ascii_lowercase() => Mode::Minor,
            None => Mode::Major,
        };
        Ok(Key::new((natural + alteration).rem_euclid(12) as u8, mode))
    }
}

impl TryFrom<String> for Key {
    type Error = MelodiaError;

    fn try_from(text: String) -> Result<Self> {
        text.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

/// Duration-weighted pitch-class histogram.
fn pitch_class_weights(events: &[ScoreEvent]) -> [f64; 12] {
    let mut weights = [0.0; 12];
    for event in events {
        if let Some(pitch) = event.pitch {
            weights[(pitch % 12) as usize] += event.duration;
        }
    }
    weights
}

fn correlation(xs: &[f64; 12], ys: &[f64; 12]) -> Option<f64> {
    let mean_x = xs.iter().sum::<f64>() / 12.0;
    let mean_y = ys.iter().sum::<f64>() / 12.0;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    let denom = (var_x * var_y).sqrt();
    if denom > 0.0 { Some(cov / denom) } else { None }
}

/// Estimate the key from pitch content. `None` when there is nothing to
/// go on (no pitched events, or a flat histogram).
pub fn estimate_key(events: &[ScoreEvent]) -> Option<Key> {
    let weights = pitch_class_weights(events);
    let mut best: Option<(f64, Key)> = None;
    for (mode, profile) in [(Mode::Major, &MAJOR_PROFILE), (Mode::Minor, &MINOR_PROFILE)] {
        for tonic in 0..12u8 {
            let rotated: [f64; 12] =
                std::array::from_fn(|pc| profile[(pc + 12 - tonic as usize) % 12]);
            let Some(r) = correlation(&weights, &rotated) else {
                continue;
            };
            if best.is_none_or(|(best_r, _)| r > best_r) {
                best = Some((r, Key::new(tonic, mode)));
            }
        }
    }
    best.map(|(_, key)| key)
}

/// The key used for transposition: declared if present, else estimated.
pub fn resolve_key(score: &Score) -> Option<Key> {
    let estimated = estimate_key(&score.events);
    match (score.key, estimated) {
        (Some(declared), Some(estimate)) if declared != estimate => {
            tracing::warn!(
                "{}: declared key {} disagrees with analysed key {}; using declared",
                score.title.as_deref().unwrap_or("<untitled>"),
                declared,
                estimate
            );
            Some(declared)
        }
        (Some(declared), _) => Some(declared),
        (None, estimate) => estimate,
    }
}

/// Shift every pitch by `semitones`. Fails if a pitch is outside the MIDI
/// range before or after the shift.
pub fn transpose(score: &Score, semitones: i8) -> Result<Score> {
    let events = score
        .events
        .iter()
        .enumerate()
        .map(|(index, event)| {
            let pitch = match event.pitch {
                None => None,
                Some(p) if p > MAX_PITCH => {
                    return Err(MelodiaError::InvalidScore {
                        index,
                        reason: format!("pitch {p} is outside the MIDI range"),
                    });
                }
                Some(p) => {
                    let shifted = p as i16 + semitones as i16;
                    if !(0..=MAX_PITCH as i16).contains(&shifted) {
                        return Err(MelodiaError::InvalidScore {
                            index,
                            reason: format!("pitch {p} shifted by {semitones} leaves the MIDI range"),
                        });
                    }
                    Some(shifted as u8)
                }
            };
            Ok(ScoreEvent { pitch, duration: event.duration })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Score {
        title: score.title.clone(),
        key: score.key.map(|k| Key::new((k.tonic as i16 + semitones as i16).rem_euclid(12) as u8, k.mode)),
        events,
    })
}

/// Move the score to C major / A minor. Scores with no usable key (all
/// rests) come back unchanged.
pub fn transpose_to_canonical(score: &Score) -> Result<Score> {
    match resolve_key(score) {
        Some(key) => {
            let mut moved = transpose(score, key.canonical_shift())?;
            moved.key = Some(key.canonical());
            Ok(moved)
        }
        None => Ok(score.clone()),
    }
}
