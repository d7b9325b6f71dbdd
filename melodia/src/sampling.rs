// Temperature-adjusted categorical sampling.
//
// Split into pure pieces so each can be checked with fixed inputs:
// - `check_distribution`: the predictor contract (width, non-negative,
//   finite, sums to 1 within `PROBABILITY_TOLERANCE`).
// - `apply_temperature`: p_i -> softmax(ln(p_i) / T). Computed with the
//   max log subtracted before exponentiating, so tiny temperatures do not
//   overflow. Zero-probability entries stay exactly zero.
// - `sample_index`: CDF walk with one uniform draw in [0, 1).
//
// T = 1 reproduces the input distribution, T -> 0 concentrates all mass on
// the arg-max, T > 1 flattens toward uniform over the non-zero entries.
//
// Randomness enters only through `RandomSource`, so tests can drive the
// sampler with scripted values.

use crate::error::{MelodiaError, Result};
use melodia_prng::MelodyRng;

/// Allowed deviation of a predictor distribution's sum from 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-3;

/// Source of uniform draws in [0, 1).
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

impl RandomSource for MelodyRng {
    fn next_unit(&mut self) -> f64 {
        self.next_unit_f64()
    }
}

/// Check a predictor output against its contract.
pub fn check_distribution(probabilities: &[f64], expected_width: usize) -> Result<()> {
    if probabilities.len() != expected_width {
        return Err(MelodiaError::PredictorContract(format!(
            "expected {expected_width} probabilities, got {}",
            probabilities.len()
        )));
    }
    if let Some((i, p)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p < 0.0)
    {
        return Err(MelodiaError::PredictorContract(format!(
            "probability {p} at index {i} is negative or not finite"
        )));
    }
    let sum: f64 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(MelodiaError::PredictorContract(format!(
            "probabilities sum to {sum}, not 1"
        )));
    }
    Ok(())
}

pub fn check_temperature(temperature: f64) -> Result<()> {
    if temperature.is_finite() && temperature > 0.0 {
        Ok(())
    } else {
        Err(MelodiaError::InvalidTemperature(temperature))
    }
}

/// Reweight a distribution by temperature and renormalize.
pub fn apply_temperature(probabilities: &[f64], temperature: f64) -> Result<Vec<f64>> {
    check_temperature(temperature)?;
    let scaled: Vec<f64> = probabilities
        .iter()
        .map(|&p| if p > 0.0 { p.ln() / temperature } else { f64::NEG_INFINITY })
        .collect();
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return Err(MelodiaError::PredictorContract(
            "distribution has no positive entries".into(),
        ));
    }

    let weights: Vec<f64> = scaled.iter().map(|&x| (x - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    Ok(weights.into_iter().map(|w| w / total).collect())
}

/// Pick an index by walking the CDF with `draw` in [0, 1).
///
/// Rounding can leave the final cumulative sum a hair under 1; a draw past
/// it lands on the last index with positive probability.
pub fn sample_index(probabilities: &[f64], draw: f64) -> usize {
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, &p) in probabilities.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        cumulative += p;
        last_positive = i;
        if draw < cumulative {
            return i;
        }
    }
    last_positive
}

/// Temperature-adjust `probabilities` and draw one index.
pub fn sample_with_temperature(
    probabilities: &[f64],
    temperature: f64,
    rng: &mut impl RandomSource,
) -> Result<usize> {
    let adjusted = apply_temperature(probabilities, temperature)?;
    Ok(sample_index(&adjusted, rng.next_unit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays a fixed list of draws.
    struct Scripted(Vec<f64>, usize);

    impl RandomSource for Scripted {
        fn next_unit(&mut self) -> f64 {
            let v = self.0[self.1 % self.0.len()];
            self.1 += 1;
            v
        }
    }

    const DIST: [f64; 4] = [0.1, 0.2, 0.5, 0.2];

    #[test]
    fn unit_temperature_is_identity() {
        let adjusted = apply_temperature(&DIST, 1.0).unwrap();
        for (a, b) in adjusted.iter().zip(DIST) {
            assert!((a - b).abs() < 1e-12, "{a} vs {b}");
        }
    }

    #[test]
    fn low_temperature_sharpens_high_flattens() {
        let cold = apply_temperature(&DIST, 0.5).unwrap();
        let hot = apply_temperature(&DIST, 5.0).unwrap();
        assert!(cold[2] > DIST[2]);
        assert!(hot[2] < DIST[2]);
        assert!(hot[0] > DIST[0]);
        for adjusted in [&cold, &hot] {
            assert!((adjusted.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn tiny_temperature_is_argmax_without_overflow() {
        let adjusted = apply_temperature(&DIST, 1e-4).unwrap();
        assert!(adjusted.iter().all(|p| p.is_finite()));
        assert!(adjusted[2] > 0.999_999);
        let mut rng = MelodyRng::from_seed(3);
        for _ in 0..1000 {
            assert_eq!(sample_with_temperature(&DIST, 1e-4, &mut rng).unwrap(), 2);
        }
    }

    #[test]
    fn zero_probabilities_are_never_sampled() {
        let dist = [0.0, 0.5, 0.0, 0.5];
        for t in [0.3, 1.0, 4.0] {
            let adjusted = apply_temperature(&dist, t).unwrap();
            assert_eq!(adjusted[0], 0.0);
            assert_eq!(adjusted[2], 0.0);
        }
        assert_eq!(sample_index(&dist, 0.999_999_999), 3);
        assert_eq!(sample_index(&dist, 0.0), 1);
    }

    #[test]
    fn non_positive_temperature_is_rejected() {
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                apply_temperature(&DIST, t),
                Err(MelodiaError::InvalidTemperature(_))
            ));
        }
    }

    #[test]
    fn unit_temperature_matches_empirical_distribution() {
        let mut rng = MelodyRng::from_seed(1234);
        let n = 10_000;
        let mut counts = [0usize; 4];
        for _ in 0..n {
            counts[sample_with_temperature(&DIST, 1.0, &mut rng).unwrap()] += 1;
        }
        for (count, p) in counts.iter().zip(DIST) {
            let freq = *count as f64 / n as f64;
            assert!((freq - p).abs() < 0.02, "freq {freq} vs p {p}");
        }
    }

    #[test]
    fn cdf_walk_follows_scripted_draws() {
        let mut rng = Scripted(vec![0.05, 0.25, 0.65, 0.95], 0);
        let picks: Vec<usize> = (0..4)
            .map(|_| sample_with_temperature(&DIST, 1.0, &mut rng).unwrap())
            .collect();
        assert_eq!(picks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn rounding_overflow_lands_on_last_positive() {
        let dist = [0.3, 0.3, 0.3, 0.0];
        assert_eq!(sample_index(&dist, 0.95), 2);
    }

    #[test]
    fn contract_checks() {
        assert!(check_distribution(&DIST, 4).is_ok());
        assert!(check_distribution(&[0.5, 0.5000001], 2).is_ok());
        for (dist, width) in [
            (&[0.5, 0.5][..], 3),
            (&[1.2, -0.2][..], 2),
            (&[0.5, 0.2][..], 2),
            (&[f64::NAN, 1.0][..], 2),
        ] {
            assert!(matches!(
                check_distribution(dist, width),
                Err(MelodiaError::PredictorContract(_))
            ));
        }
    }
}
