// The boundary to whatever model scores the next symbol.
//
// A predictor receives the one-hot context (`rows` = context length,
// `width` = vocabulary size) and returns one probability per vocabulary
// id. The generator validates every returned vector with
// `sampling::check_distribution`; a violation aborts generation.

use crate::error::Result;
use crate::windower::OneHot;

pub trait Predictor {
    fn predict(&mut self, context: &OneHot) -> Result<Vec<f64>>;
}

/// Plain closures work as predictors, which keeps test stubs to one line.
impl<F> Predictor for F
where
    F: FnMut(&OneHot) -> Vec<f64>,
{
    fn predict(&mut self, context: &OneHot) -> Result<Vec<f64>> {
        Ok(self(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_predictors() {
        let mut calls = 0;
        let mut stub = |ctx: &OneHot| {
            calls += 1;
            let mut out = vec![0.0; ctx.width()];
            out[0] = 1.0;
            out
        };
        let ctx = OneHot::encode(&[1, 2], 3).unwrap();
        assert_eq!(stub.predict(&ctx).unwrap(), vec![1.0, 0.0, 0.0]);
        assert_eq!(calls, 1);
    }
}
