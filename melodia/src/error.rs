// Crate-wide error type.
//
// Every fallible operation returns `Result<T>` with `MelodiaError`. Variants
// carry the offending index, token, id or value so a failure in a long
// preprocessing run can be traced back to the item that caused it. Nothing
// in the crate retries; errors propagate to the caller, and the CLI wraps
// them with `anyhow` context.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MelodiaError {
    /// A score holds a duration that is not on the time-step grid. The
    /// whole item is rejected.
    #[error("event {index}: duration {duration} is not an accepted multiple of the time step")]
    UnquantizableDuration { index: usize, duration: f64 },

    /// A textual symbol missing from the vocabulary.
    #[error("symbol '{0}' is not in the vocabulary")]
    UnknownSymbol(String),

    /// An integer id missing from the vocabulary.
    #[error("id {0} is not in the vocabulary")]
    UnknownId(u32),

    /// Text that does not parse as any symbol.
    #[error("invalid symbol token '{0}'")]
    InvalidSymbol(String),

    #[error("temperature must be a positive finite number, got {0}")]
    InvalidTemperature(f64),

    /// The predictor returned a distribution that breaks its contract.
    #[error("predictor contract violated: {0}")]
    PredictorContract(String),

    #[error("invalid vocabulary: {0}")]
    InvalidVocabulary(String),

    #[error("score event {index}: {reason}")]
    InvalidScore { index: usize, reason: String },

    #[error("config: {0}")]
    Config(String),

    #[error("midi: {0}")]
    Midi(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MelodiaError>;
