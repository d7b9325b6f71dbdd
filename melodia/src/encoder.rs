// Score -> fixed time-step symbol sequence.
//
// Each event occupies `duration / step_duration` consecutive slots: the
// first slot carries the pitch (or rest), the remaining slots carry `Hold`.
// The number of holds after an opener plus one is therefore the event's
// length in steps, which is exactly what `decoder.rs` counts back.
//
// The duration check runs over the whole score before anything is emitted.
// One off-grid duration rejects the item; nothing is rounded or truncated.

use crate::config::QuantizationConfig;
use crate::error::{MelodiaError, Result};
use crate::score::{Score, ScoreEvent, check_durations};
use crate::symbol::{EncodedSequence, MAX_PITCH, Symbol};

/// The opening symbol for an event.
pub fn event_symbol(event: &ScoreEvent) -> Symbol {
    match event.pitch {
        Some(p) => Symbol::Pitch(p),
        None => Symbol::Rest,
    }
}

/// Encode a score. The score should already be in its canonical key.
pub fn encode_score(score: &Score, quantization: &QuantizationConfig) -> Result<EncodedSequence> {
    check_durations(score, quantization)?;
    encode_events(&score.events, quantization)
}

/// Encode an event list, rejecting any event that is not on the grid.
pub fn encode_events(events: &[ScoreEvent], quantization: &QuantizationConfig) -> Result<EncodedSequence> {
    let mut steps_per_event = Vec::with_capacity(events.len());
    for (index, event) in events.iter().enumerate() {
        if let Some(p) = event.pitch.filter(|&p| p > MAX_PITCH) {
            return Err(MelodiaError::InvalidScore {
                index,
                reason: format!("pitch {p} is outside the MIDI range"),
            });
        }
        let steps = quantization
            .steps_for(event.duration)
            .ok_or(MelodiaError::UnquantizableDuration { index, duration: event.duration })?;
        steps_per_event.push(steps);
    }

    let total = steps_per_event
        .iter()
        .enumerate()
        .try_fold(0usize, |acc, (index, &steps)| {
            acc.checked_add(steps).ok_or_else(|| MelodiaError::InvalidScore {
                index,
                reason: "encoded length overflows".into(),
            })
        })?;
    let mut encoded = EncodedSequence::with_capacity(total);
    for (event, &steps) in events.iter().zip(&steps_per_event) {
        encoded.push(event_symbol(event));
        encoded.push_run(Symbol::Hold, steps - 1);
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_fill_out_each_event() {
        let q = QuantizationConfig::default();
        let score = Score::from_events(vec![
            ScoreEvent::note(67, 1.0),
            ScoreEvent::note(64, 0.5),
            ScoreEvent::rest(0.25),
            ScoreEvent::note(60, 0.75),
        ]);
        let encoded = encode_score(&score, &q).unwrap();
        assert_eq!(encoded.to_string(), "67 _ _ _ 64 _ r 60 _ _");
    }

    #[test]
    fn one_bad_duration_rejects_the_whole_item() {
        let q = QuantizationConfig::default();
        let score = Score::from_events(vec![
            ScoreEvent::note(60, 1.0),
            ScoreEvent::note(62, 1.0),
            ScoreEvent::note(64, 0.125),
        ]);
        match encode_score(&score, &q) {
            Err(MelodiaError::UnquantizableDuration { index, duration }) => {
                assert_eq!(index, 2);
                assert_eq!(duration, 0.125);
            }
            other => panic!("expected UnquantizableDuration, got {other:?}"),
        }
    }

    #[test]
    fn durations_outside_the_accepted_set_are_rejected_even_on_grid() {
        // 1.25 is five sixteenths but not in the default accepted set.
        let q = QuantizationConfig::default();
        let score = Score::from_events(vec![ScoreEvent::note(60, 1.25)]);
        assert!(encode_score(&score, &q).is_err());
        // The raw event encoder only checks the grid.
        assert_eq!(encode_events(&score.events, &q).unwrap().len(), 5);
    }

    #[test]
    fn zero_and_negative_durations_never_produce_slots() {
        let q = QuantizationConfig::default();
        assert!(encode_events(&[ScoreEvent::note(60, 0.0)], &q).is_err());
        assert!(encode_events(&[ScoreEvent::rest(-0.25)], &q).is_err());
    }

    #[test]
    fn enormous_duration_is_rejected_not_allocated() {
        let q = QuantizationConfig::default();
        match encode_events(&[ScoreEvent::note(60, 1e30)], &q) {
            Err(MelodiaError::UnquantizableDuration { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected UnquantizableDuration, got {other:?}"),
        }

        let lenient = QuantizationConfig {
            acceptable_durations: vec![1.0, 1e30],
            ..QuantizationConfig::default()
        };
        let score = Score::from_events(vec![ScoreEvent::note(60, 1.0), ScoreEvent::rest(1e30)]);
        assert!(encode_score(&score, &lenient).is_err());
    }

    #[test]
    fn empty_score_encodes_to_nothing() {
        let q = QuantizationConfig::default();
        assert!(encode_score(&Score::default(), &q).unwrap().is_empty());
    }

    #[test]
    fn output_is_deterministic() {
        let q = QuantizationConfig::default();
        let score = Score::from_events(vec![ScoreEvent::note(72, 2.0), ScoreEvent::rest(1.5)]);
        assert_eq!(encode_score(&score, &q).unwrap(), encode_score(&score, &q).unwrap());
    }
}
