// Sliding-window training pairs over the integer corpus.
//
// For a stream of length N and window length L, pair i is
// (stream[i..i+L], stream[i+L]) for every i in 0..N-L. Pairs are produced
// in stream order, untouched: shuffling, filtering and weighting belong to
// the training runtime.
//
// Contexts are expanded to one-hot rows of width |vocabulary| via `OneHot`,
// the same matrix type the generator hands to a predictor; targets stay
// plain ids.

use crate::error::{MelodiaError, Result};

/// A row-major one-hot matrix: one row per id, `width` columns.
#[derive(Debug, Clone, PartialEq)]
pub struct OneHot {
    rows: usize,
    width: usize,
    data: Vec<f32>,
}

impl OneHot {
    /// Expand `ids` over `width` classes. Fails on an id `>= width`.
    pub fn encode(ids: &[u32], width: usize) -> Result<Self> {
        let mut data = vec![0.0f32; ids.len() * width];
        for (row, &id) in ids.iter().enumerate() {
            if id as usize >= width {
                return Err(MelodiaError::UnknownId(id));
            }
            data[row * width + id as usize] = 1.0;
        }
        Ok(OneHot { rows: ids.len(), width, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Flat row-major values, `rows * width` long.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.width..(row + 1) * self.width]
    }

    /// The id set in `row`.
    pub fn hot_index(&self, row: usize) -> Option<u32> {
        self.row(row).iter().position(|&v| v == 1.0).map(|i| i as u32)
    }

    /// All ids, in row order.
    pub fn hot_indices(&self) -> Vec<u32> {
        (0..self.rows).filter_map(|r| self.hot_index(r)).collect()
    }
}

/// One (context, next-id) training example borrowed from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainingPair<'a> {
    pub context: &'a [u32],
    pub target: u32,
}

/// Number of pairs a stream of `len` ids yields for window `window`.
pub fn pair_count(len: usize, window: usize) -> usize {
    len.saturating_sub(window)
}

/// Lazily yield every training pair. Yields nothing when `window >= stream.len()`.
pub fn training_pairs(stream: &[u32], window: usize) -> impl Iterator<Item = TrainingPair<'_>> {
    (0..pair_count(stream.len(), window)).map(move |i| TrainingPair {
        context: &stream[i..i + window],
        target: stream[i + window],
    })
}

/// Fully expanded training set: one-hot contexts and their target ids.
#[derive(Debug, Clone)]
pub struct TrainingBatch {
    pub inputs: Vec<OneHot>,
    pub targets: Vec<u32>,
}

pub fn training_batch(stream: &[u32], window: usize, vocab_size: usize) -> Result<TrainingBatch> {
    let count = pair_count(stream.len(), window);
    let mut inputs = Vec::with_capacity(count);
    let mut targets = Vec::with_capacity(count);
    for pair in training_pairs(stream, window) {
        inputs.push(OneHot::encode(pair.context, vocab_size)?);
        targets.push(pair.target);
    }
    Ok(TrainingBatch { inputs, targets })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_n_minus_l_pairs_in_order() {
        let stream: Vec<u32> = (10..20).collect();
        let pairs: Vec<_> = training_pairs(&stream, 3).collect();
        assert_eq!(pairs.len(), 7);
        for (i, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.context, &stream[i..i + 3]);
            assert_eq!(pair.target, stream[i + 3]);
        }
    }

    #[test]
    fn short_streams_yield_nothing() {
        let stream = [1u32, 2, 3];
        assert_eq!(training_pairs(&stream, 3).count(), 0);
        assert_eq!(training_pairs(&stream, 10).count(), 0);
        assert_eq!(pair_count(3, 10), 0);
    }

    #[test]
    fn one_hot_rows_mark_exactly_one_column() {
        let hot = OneHot::encode(&[2, 0, 3], 4).unwrap();
        assert_eq!(hot.rows(), 3);
        assert_eq!(hot.width(), 4);
        assert_eq!(hot.row(0), &[0.0f32, 0.0, 1.0, 0.0][..]);
        assert_eq!(hot.as_slice().iter().sum::<f32>(), 3.0);
        assert_eq!(hot.hot_indices(), vec![2, 0, 3]);
    }

    #[test]
    fn one_hot_rejects_ids_outside_width() {
        assert!(matches!(OneHot::encode(&[1, 4], 4), Err(MelodiaError::UnknownId(4))));
    }

    #[test]
    fn batch_expands_contexts_and_keeps_targets() {
        let stream = [0u32, 1, 2, 1, 0];
        let batch = training_batch(&stream, 2, 3).unwrap();
        assert_eq!(batch.targets, vec![2, 1, 0]);
        assert_eq!(batch.inputs.len(), 3);
        assert_eq!(batch.inputs[1].hot_indices(), vec![1, 2]);
    }
}
