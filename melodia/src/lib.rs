// Melodia: time-step melody encoding and autoregressive generation.
//
// Turns monophonic scores into a fixed-time-step symbol encoding suitable
// for next-symbol prediction, assembles a delimited training corpus, and
// drives a temperature-controlled sampling loop over any predictor to
// produce new melodies, which are decoded back into timed events.
//
// Architecture:
// - symbol.rs: The alphabet (pitch, rest, hold, delimiter) and symbol sequences
// - vocabulary.rs: Frozen symbol <-> id bijection, persisted as JSON
// - config.rs: JSON-loaded configuration (grid, window length, paths, generation)
// - score.rs: Score/event model, JSON score files, duration filter
// - key.rs: Key parsing, profile-based key estimation, canonical transposition
// - encoder.rs: Score -> symbol-per-step sequence (opener + holds)
// - corpus.rs: Delimited corpus stream assembly and persistence
// - preprocess.rs: Parallel dataset pipeline (filter, transpose, encode, write)
// - windower.rs: Sliding (context, target) training pairs and one-hot matrices
// - sampling.rs: Distribution checks, temperature scaling, CDF sampling
// - predictor.rs: The predictor trait (external model boundary)
// - ngram.rs: Built-in backoff n-gram predictor
// - generator.rs: The autoregressive generation loop
// - decoder.rs: Symbol sequence -> timed note/rest events
// - midi.rs: Event output as MIDI (via midly) or JSON
//
// Generation is deterministic given a seed: all randomness flows through a
// caller-supplied `RandomSource` (normally `melodia_prng::MelodyRng`).

pub mod config;
pub mod corpus;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod generator;
pub mod key;
pub mod midi;
pub mod ngram;
pub mod predictor;
pub mod preprocess;
pub mod sampling;
pub mod score;
pub mod symbol;
pub mod vocabulary;
pub mod windower;

pub use error::{MelodiaError, Result};
pub use generator::{CancellationToken, GenerationParams, MelodyGenerator};
pub use symbol::{Melody, Symbol, SymbolSequence};
pub use vocabulary::Vocabulary;
