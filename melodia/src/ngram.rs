// Count-based n-gram predictor with backoff.
//
// A self-contained stand-in for a trained neural predictor, so the CLI can
// go from corpus to MIDI without an external ML runtime. Trained from the
// integer corpus; persisted as JSON next to the vocabulary mapping.
//
// Prediction looks at the longest available suffix of the context (up to
// `order - 1` ids) that was seen in training and returns its normalized
// next-id counts, backing off one id at a time, and finally to the unigram
// table. The output always has one entry per vocabulary id and sums to 1,
// so it satisfies the same contract the generator checks for any predictor.

use crate::error::{MelodiaError, Result};
use crate::predictor::Predictor;
use crate::windower::OneHot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Next id -> count.
type TransitionTable = BTreeMap<u32, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NGramModel {
    /// n: contexts of up to n - 1 ids are remembered.
    pub order: usize,
    pub vocab_size: usize,
    /// Keyed by the comma-joined context ids (all context lengths share one map).
    pub transitions: BTreeMap<String, TransitionTable>,
    pub unigram: TransitionTable,
}

impl NGramModel {
    pub fn train(ids: &[u32], order: usize, vocab_size: usize) -> Result<Self> {
        if order == 0 {
            return Err(MelodiaError::Config("n-gram order must be positive".into()));
        }
        if let Some(&bad) = ids.iter().find(|&&id| id as usize >= vocab_size) {
            return Err(MelodiaError::UnknownId(bad));
        }

        let mut transitions: BTreeMap<String, TransitionTable> = BTreeMap::new();
        let mut unigram = TransitionTable::new();
        for (i, &next) in ids.iter().enumerate() {
            *unigram.entry(next).or_insert(0.0) += 1.0;
            for k in 1..order.min(i + 1) {
                let key = context_key(&ids[i - k..i]);
                *transitions.entry(key).or_default().entry(next).or_insert(0.0) += 1.0;
            }
        }

        tracing::info!(
            "trained order-{} model: {} contexts over {} ids",
            order,
            transitions.len(),
            ids.len()
        );
        Ok(NGramModel { order, vocab_size, transitions, unigram })
    }

    /// Distribution over all ids given the trailing context.
    pub fn distribution(&self, context: &[u32]) -> Vec<f64> {
        let longest = context.len().min(self.order.saturating_sub(1));
        for k in (1..=longest).rev() {
            let key = context_key(&context[context.len() - k..]);
            if let Some(dist) = self.transitions.get(&key).and_then(|t| self.normalize(t)) {
                return dist;
            }
        }
        self.normalize(&self.unigram)
            .unwrap_or_else(|| vec![1.0 / self.vocab_size as f64; self.vocab_size])
    }

    fn normalize(&self, table: &TransitionTable) -> Option<Vec<f64>> {
        let total: f64 = table.values().sum();
        if total <= 0.0 {
            return None;
        }
        let mut dist = vec![0.0; self.vocab_size];
        for (&id, &count) in table {
            dist[id as usize] = count / total;
        }
        Some(dist)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let model: NGramModel = serde_json::from_str(&data)?;
        let out_of_range = model
            .unigram
            .keys()
            .chain(model.transitions.values().flat_map(|t| t.keys()))
            .find(|&&id| id as usize >= model.vocab_size);
        if let Some(&id) = out_of_range {
            return Err(MelodiaError::UnknownId(id));
        }
        Ok(model)
    }
}

impl Predictor for NGramModel {
    fn predict(&mut self, context: &OneHot) -> Result<Vec<f64>> {
        if context.width() != self.vocab_size {
            return Err(MelodiaError::PredictorContract(format!(
                "model trained on {} ids, context is {} wide",
                self.vocab_size,
                context.width()
            )));
        }
        Ok(self.distribution(&context.hot_indices()))
    }
}

fn context_key(context: &[u32]) -> String {
    context.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}
