// Dataset preprocessing: score tree -> per-item encodings -> corpus + vocabulary.
//
// Pipeline:
//   1. load every score under `dataset_dir`,
//   2. drop scores with any duration outside the accepted set,
//   3. transpose to C major / A minor,
//   4. encode onto the time-step grid,
//   5. write each encoding to `encoded_dir/<index>`,
//   6. join them into the delimited corpus at `corpus_path`,
//   7. build the vocabulary and write it to `mapping_path`.
//
// Steps 2-4 touch nothing shared, so they run across rayon's thread pool;
// results come back in input order and everything from step 5 on is a
// single sequential writer. A rejected item is logged and counted, never
// partially encoded.
//
// Step 5 first clears every numerically named file already in
// `encoded_dir`, so the directory always holds exactly the last run's
// items. `rebuild_corpus` re-runs steps 6-7 from those files alone, for
// when only `sequence_length` changed.

use crate::config::MelodiaConfig;
use crate::corpus::Corpus;
use crate::encoder::encode_score;
use crate::error::{MelodiaError, Result};
use crate::key::transpose_to_canonical;
use crate::score::{Score, check_durations, load_scores};
use crate::symbol::EncodedSequence;
use crate::vocabulary::Vocabulary;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Counts from one preprocessing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessReport {
    pub loaded: usize,
    pub encoded: usize,
    pub skipped: usize,
    pub corpus_len: usize,
    pub vocabulary_size: usize,
}

/// Filter, transpose and encode one score.
pub fn prepare_score(score: &Score, config: &MelodiaConfig) -> Result<EncodedSequence> {
    // Checked before transposition: an off-grid item is never worth analysing.
    check_durations(score, &config.quantization)?;
    let canonical = transpose_to_canonical(score)?;
    encode_score(&canonical, &config.quantization)
}

/// Encode many scores in parallel. Returns the accepted encodings in input
/// order together with the number of rejected items.
pub fn encode_all(scores: &[Score], config: &MelodiaConfig) -> (Vec<EncodedSequence>, usize) {
    let results: Vec<Result<EncodedSequence>> = scores
        .par_iter()
        .map(|score| prepare_score(score, config))
        .collect();

    let mut encoded = Vec::with_capacity(results.len());
    let mut skipped = 0;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(sequence) => encoded.push(sequence),
            Err(e) => {
                skipped += 1;
                let title = scores[index].title.as_deref().unwrap_or("<untitled>");
                tracing::warn!("skipping item {index} ({title}): {e}");
            }
        }
    }
    (encoded, skipped)
}

/// Write one file per encoding, named by position, replacing any
/// encodings a previous run left in `dir`.
pub fn save_encoded(items: &[EncodedSequence], dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (_, path) in encoded_files(dir)? {
        std::fs::remove_file(path)?;
    }
    for (index, item) in items.iter().enumerate() {
        std::fs::write(dir.join(index.to_string()), item.to_string())?;
    }
    Ok(())
}

/// Numerically named files in `dir`, sorted by index.
fn encoded_files(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(index) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.parse::<usize>().ok())
        else {
            continue;
        };
        files.push((index, path));
    }
    files.sort();
    Ok(files)
}

/// Read back per-item encodings written by `save_encoded`, in index order.
pub fn load_encoded_dir(dir: &Path) -> Result<Vec<EncodedSequence>> {
    encoded_files(dir)?
        .into_iter()
        .map(|(_, path)| -> Result<EncodedSequence> { std::fs::read_to_string(path)?.parse() })
        .collect()
}

/// Write the corpus and vocabulary for `encoded`. Returns (corpus length,
/// vocabulary size).
fn write_corpus(encoded: &[EncodedSequence], config: &MelodiaConfig) -> Result<(usize, usize)> {
    let corpus = Corpus::assemble(encoded, config.sequence_length);
    corpus.save(&config.corpus_path)?;
    let vocabulary = corpus.build_vocabulary();
    vocabulary.save(&config.mapping_path)?;
    Ok((corpus.len(), vocabulary.len()))
}

/// Run the full pipeline described at the top of this module.
pub fn preprocess(config: &MelodiaConfig) -> Result<PreprocessReport> {
    config.validate()?;

    tracing::info!("loading scores from {}", config.dataset_dir.display());
    let scores: Vec<Score> = load_scores(&config.dataset_dir)?
        .into_iter()
        .map(|(_, score)| score)
        .collect();
    tracing::info!("loaded {} scores", scores.len());

    let (encoded, skipped) = encode_all(&scores, config);
    if encoded.is_empty() {
        return Err(MelodiaError::Config(format!(
            "no usable scores under {}",
            config.dataset_dir.display()
        )));
    }
    save_encoded(&encoded, &config.encoded_dir)?;
    let (corpus_len, vocabulary_size) = write_corpus(&encoded, config)?;

    let report = PreprocessReport {
        loaded: scores.len(),
        encoded: encoded.len(),
        skipped,
        corpus_len,
        vocabulary_size,
    };
    tracing::info!(
        "encoded {} of {} scores ({} skipped); corpus {} symbols, vocabulary {}",
        report.encoded,
        report.loaded,
        report.skipped,
        report.corpus_len,
        report.vocabulary_size
    );
    Ok(report)
}

/// Rebuild the corpus and vocabulary from the encodings of the last
/// `preprocess` run, without touching the score tree.
pub fn rebuild_corpus(config: &MelodiaConfig) -> Result<PreprocessReport> {
    config.validate()?;
    let encoded = load_encoded_dir(&config.encoded_dir)?;
    if encoded.is_empty() {
        return Err(MelodiaError::Config(format!(
            "no encoded items under {}",
            config.encoded_dir.display()
        )));
    }
    let (corpus_len, vocabulary_size) = write_corpus(&encoded, config)?;
    tracing::info!(
        "rebuilt corpus from {} encoded items: {} symbols, vocabulary {}",
        encoded.len(),
        corpus_len,
        vocabulary_size
    );
    Ok(PreprocessReport {
        loaded: encoded.len(),
        encoded: encoded.len(),
        skipped: 0,
        corpus_len,
        vocabulary_size,
    })
}

/// Load the corpus and vocabulary written by `preprocess`, as ids.
pub fn load_training_stream(config: &MelodiaConfig) -> Result<(Vocabulary, Vec<u32>)> {
    let vocabulary = Vocabulary::load(&config.mapping_path)?;
    let corpus = Corpus::load(&config.corpus_path)?;
    let ids = corpus.to_ids(&vocabulary)?;
    Ok((vocabulary, ids))
}
