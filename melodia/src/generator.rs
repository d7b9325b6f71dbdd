// Autoregressive melody generation.
//
// The melody starts as the caller's seed. The predictor context starts as
// `padding` delimiters followed by the seed's ids; padding equals the
// training window length, so the first prediction sees the same "item just
// began" boundary the model saw during training.
//
// Each step:
//   1. keep only the last `max_context` ids of the context,
//   2. one-hot them and ask the predictor for a distribution,
//   3. check the distribution, then draw an id at the requested temperature,
//   4. append the id to the context,
//   5. map it to a symbol; a delimiter ends the melody (and is not kept),
//      anything else is appended.
//
// The loop stops after `num_steps` draws, on a delimiter, or when the
// optional cancellation token is raised (checked once per step). Steps are
// strictly sequential: each input depends on the previous draw.
//
// Temperature is validated before the first predictor call; predictor
// contract violations abort immediately without retry.

use crate::error::{MelodiaError, Result};
use crate::predictor::Predictor;
use crate::sampling::{RandomSource, check_distribution, check_temperature, sample_with_temperature};
use crate::symbol::{Melody, Symbol};
use crate::vocabulary::Vocabulary;
use crate::windower::OneHot;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared stop flag for a running generation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-call generation knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Upper bound on sampled steps.
    pub num_steps: usize,
    /// Trailing ids visible to the predictor.
    pub max_context: usize,
    pub temperature: f64,
}

/// Why a generation run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Delimiter,
    StepBudget,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub melody: Melody,
    /// Predictor calls made.
    pub steps: usize,
    pub stop: StopReason,
}

pub struct MelodyGenerator<'v, P> {
    vocabulary: &'v Vocabulary,
    predictor: P,
    padding: usize,
    cancel: Option<CancellationToken>,
}

impl<'v, P: Predictor> MelodyGenerator<'v, P> {
    /// `padding` must be the training window length (`sequence_length`).
    pub fn new(vocabulary: &'v Vocabulary, predictor: P, padding: usize) -> Self {
        MelodyGenerator {
            vocabulary,
            predictor,
            padding,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn into_predictor(self) -> P {
        self.predictor
    }

    /// Generate from a space-separated seed such as `"67 _ _ _ 64 _"`.
    pub fn generate_from_text(
        &mut self,
        seed_text: &str,
        params: &GenerationParams,
        rng: &mut impl RandomSource,
    ) -> Result<Melody> {
        let seed: Melody = seed_text.parse()?;
        self.generate(seed.as_slice(), params, rng)
    }

    /// Generate and return just the melody.
    pub fn generate(
        &mut self,
        seed: &[Symbol],
        params: &GenerationParams,
        rng: &mut impl RandomSource,
    ) -> Result<Melody> {
        Ok(self.run(seed, params, rng)?.melody)
    }

    /// Generate, also reporting how the run ended.
    pub fn run(
        &mut self,
        seed: &[Symbol],
        params: &GenerationParams,
        rng: &mut impl RandomSource,
    ) -> Result<Generation> {
        check_temperature(params.temperature)?;
        if params.max_context == 0 {
            return Err(MelodiaError::Config("max_context must be positive".into()));
        }

        let delimiter_id = self.vocabulary.id_of(Symbol::Delimiter)?;
        let mut context = vec![delimiter_id; self.padding];
        context.extend(self.vocabulary.encode(seed)?);
        let mut melody: Melody = seed.iter().copied().collect();
        let width = self.vocabulary.len();

        let mut steps = 0;
        let mut stop = StopReason::StepBudget;
        while steps < params.num_steps {
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                stop = StopReason::Cancelled;
                break;
            }

            let start = context.len().saturating_sub(params.max_context);
            context.drain(..start);

            let one_hot = OneHot::encode(&context, width)?;
            let probabilities = self.predictor.predict(&one_hot)?;
            check_distribution(&probabilities, width)?;
            steps += 1;

            let id = sample_with_temperature(&probabilities, params.temperature, rng)? as u32;
            context.push(id);

            let symbol = self.vocabulary.symbol_of(id)?;
            if symbol.is_delimiter() {
                stop = StopReason::Delimiter;
                break;
            }
            melody.push(symbol);
        }

        tracing::debug!(
            "generated {} symbols in {} steps ({:?})",
            melody.len() - seed.len(),
            steps,
            stop
        );
        Ok(Generation { melody, steps, stop })
    }
}
