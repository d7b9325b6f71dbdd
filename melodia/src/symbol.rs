// The time-step alphabet.
//
// Every slot of an encoded melody holds exactly one `Symbol`: a MIDI pitch
// that starts sounding at that step, a rest that starts at that step, a hold
// that extends whatever started most recently, or a delimiter marking the
// boundary between two unrelated items.
//
// Textual forms ("60", "r", "_", "/") are what get persisted in corpus files
// and the vocabulary mapping, and what users type as generation seeds.
// `SymbolSequence` is the owned ordered list shared by encoded scores, the
// corpus stream, and generated melodies; it renders as space-separated
// tokens and parses back from any whitespace-separated text.

use crate::error::{MelodiaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const REST_TOKEN: &str = "r";
pub const HOLD_TOKEN: &str = "_";
pub const DELIMITER_TOKEN: &str = "/";

/// Highest valid MIDI note number.
pub const MAX_PITCH: u8 = 127;

/// One time-step of an encoded melody.
///
/// The derived ordering (pitches ascending, then rest, hold, delimiter) is
/// the order in which vocabulary ids are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Symbol {
    Pitch(u8),
    Rest,
    Hold,
    Delimiter,
}

impl Symbol {
    pub fn is_hold(self) -> bool {
        self == Symbol::Hold
    }

    pub fn is_delimiter(self) -> bool {
        self == Symbol::Delimiter
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Pitch(p) => write!(f, "{p}"),
            Symbol::Rest => f.write_str(REST_TOKEN),
            Symbol::Hold => f.write_str(HOLD_TOKEN),
            Symbol::Delimiter => f.write_str(DELIMITER_TOKEN),
        }
    }
}

impl FromStr for Symbol {
    type Err = MelodiaError;

    fn from_str(token: &str) -> Result<Self> {
        match token {
            REST_TOKEN => Ok(Symbol::Rest),
            HOLD_TOKEN => Ok(Symbol::Hold),
            DELIMITER_TOKEN => Ok(Symbol::Delimiter),
            // Canonical decimal only: "060" and "+60" would alias "60".
            _ => match token.parse::<u8>() {
                Ok(p) if p <= MAX_PITCH && p.to_string() == token => Ok(Symbol::Pitch(p)),
                _ => Err(MelodiaError::InvalidSymbol(token.to_string())),
            },
        }
    }
}

impl TryFrom<String> for Symbol {
    type Error = MelodiaError;

    fn try_from(token: String) -> Result<Self> {
        token.parse()
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.to_string()
    }
}

/// An ordered run of symbols, one per time step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolSequence(Vec<Symbol>);

/// Output of the encoder for one score.
pub type EncodedSequence = SymbolSequence;

/// A generated melody: the seed plus everything sampled after it.
pub type Melody = SymbolSequence;

impl SymbolSequence {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, symbol: Symbol) {
        self.0.push(symbol);
    }

    /// Append `count` copies of `symbol`.
    pub fn push_run(&mut self, symbol: Symbol, count: usize) {
        self.0.extend(std::iter::repeat_n(symbol, count));
    }

    pub fn extend_from(&mut self, other: &SymbolSequence) {
        self.0.extend_from_slice(&other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Symbol] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Symbol> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Symbol> {
        self.0
    }
}

impl From<Vec<Symbol>> for SymbolSequence {
    fn from(symbols: Vec<Symbol>) -> Self {
        Self(symbols)
    }
}

impl FromIterator<Symbol> for SymbolSequence {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SymbolSequence {
    type Item = &'a Symbol;
    type IntoIter = std::slice::Iter<'a, Symbol>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for SymbolSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, symbol) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

impl FromStr for SymbolSequence {
    type Err = MelodiaError;

    fn from_str(text: &str) -> Result<Self> {
        text.split_whitespace().map(str::parse).collect()
    }
}
