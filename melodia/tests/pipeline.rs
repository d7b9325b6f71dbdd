// End-to-end tests for the melody pipeline.
//
// Score files on disk -> preprocess -> training pairs -> n-gram fit ->
// generation -> decode -> MIDI, using the same library calls the CLI makes.
// Also checks that encode/decode inverts on random on-grid scores.

use melodia::config::{MelodiaConfig, QuantizationConfig};
use melodia::decoder::{Event, decode};
use melodia::encoder::encode_events;
use melodia::generator::{GenerationParams, MelodyGenerator, StopReason};
use melodia::midi::{OutputFormat, write_events};
use melodia::ngram::NGramModel;
use melodia::preprocess::{load_training_stream, preprocess};
use melodia::score::ScoreEvent;
use melodia::windower::{pair_count, training_pairs};
use melodia::{Symbol, Vocabulary};
use melodia_prng::MelodyRng;
use std::path::Path;

const WINDOW: usize = 4;

fn config_in(dir: &Path) -> MelodiaConfig {
    MelodiaConfig {
        sequence_length: WINDOW,
        dataset_dir: dir.join("raw"),
        encoded_dir: dir.join("encoded"),
        corpus_path: dir.join("file_dataset"),
        mapping_path: dir.join("mapping.json"),
        model_path: dir.join("model.json"),
        ngram_order: 3,
        ..MelodiaConfig::default()
    }
}

fn write_scores(dataset: &Path) {
    let nested = dataset.join("folk");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(
        dataset.join("one.json"),
        r#"{ "title": "one", "key": "C major", "events": [
            { "pitch": 60, "duration": 1.0 },
            { "pitch": 62, "duration": 0.5 },
            { "pitch": 64, "duration": 0.5 },
            { "pitch": null, "duration": 0.25 },
            { "pitch": 67, "duration": 2.0 }
        ] }"#,
    )
    .unwrap();
    std::fs::write(
        nested.join("two.json"),
        r#"{ "title": "two", "key": "C major", "events": [
            { "pitch": 67, "duration": 0.75 },
            { "pitch": 65, "duration": 0.25 },
            { "pitch": 64, "duration": 1.5 },
            { "pitch": 60, "duration": 0.5 }
        ] }"#,
    )
    .unwrap();
    // Off-grid duration: rejected whole.
    std::fs::write(
        nested.join("triplet.json"),
        r#"{ "key": "C major", "events": [ { "pitch": 60, "duration": 0.333 } ] }"#,
    )
    .unwrap();
    // Unparsable files are skipped by the loader.
    std::fs::write(dataset.join("broken.json"), "{ not json").unwrap();
}

#[test]
fn scores_to_midi() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_scores(&config.dataset_dir);

    let report = preprocess(&config).unwrap();
    assert_eq!(report.loaded, 3);
    assert_eq!(report.encoded, 2);
    assert_eq!(report.skipped, 1);

    // Item lengths in steps: one = 4+2+2+1+8, two = 3+1+6+2; each followed
    // by a run of WINDOW delimiters.
    assert_eq!(report.corpus_len, 17 + WINDOW + 12 + WINDOW);

    let (vocabulary, ids) = load_training_stream(&config).unwrap();
    assert_eq!(ids.len(), report.corpus_len);
    assert_eq!(training_pairs(&ids, WINDOW).count(), pair_count(ids.len(), WINDOW));
    assert_eq!(pair_count(ids.len(), WINDOW), ids.len() - WINDOW);

    let model = NGramModel::train(&ids, config.ngram_order, vocabulary.len()).unwrap();
    model.save(&config.model_path).unwrap();
    let model = NGramModel::load(&config.model_path).unwrap();
    let vocabulary = Vocabulary::load(&config.mapping_path).unwrap();

    let params = GenerationParams { num_steps: 200, max_context: 16, temperature: 1.0 };
    let mut generator = MelodyGenerator::new(&vocabulary, model, config.sequence_length);
    let mut rng = MelodyRng::from_seed(7);
    let seed: Vec<Symbol> = "60 _ _ _".parse::<melodia::Melody>().unwrap().into_vec();
    let generation = generator.run(&seed, &params, &mut rng).unwrap();

    assert_eq!(&generation.melody.as_slice()[..seed.len()], &seed[..]);
    assert!(generation.melody.iter().all(|s| !s.is_delimiter()));
    assert!(generation.steps <= params.num_steps);
    if generation.stop == StopReason::StepBudget {
        assert_eq!(generation.steps, params.num_steps);
    }

    // The seed opens with a pitch, so no hold is dropped and the decoded
    // events cover every step.
    let step = config.quantization.step_duration;
    let events = decode(generation.melody.as_slice(), step);
    let total: f64 = events.iter().map(|e| e.duration).sum();
    assert!((total - generation.melody.len() as f64 * step).abs() < 1e-9);

    let out = dir.path().join("mel.mid");
    write_events(&events, step, 120, OutputFormat::from_path(&out), &out).unwrap();
    let bytes = std::fs::read(&out).unwrap();
    let smf = midly::Smf::parse(&bytes).unwrap();
    assert_eq!(smf.tracks.len(), 1);
}

#[test]
fn generation_is_reproducible_from_seed() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    write_scores(&config.dataset_dir);
    preprocess(&config).unwrap();
    let (vocabulary, ids) = load_training_stream(&config).unwrap();
    let model = NGramModel::train(&ids, 3, vocabulary.len()).unwrap();

    let params = GenerationParams { num_steps: 64, max_context: 8, temperature: 0.7 };
    let run = |rng_seed: u64| {
        let mut generator = MelodyGenerator::new(&vocabulary, model.clone(), WINDOW);
        let mut rng = MelodyRng::from_seed(rng_seed);
        generator.generate_from_text("67 _ _", &params, &mut rng).unwrap()
    };
    assert_eq!(run(42), run(42));
}

#[test]
fn encode_then_decode_recovers_random_scores() {
    let quantization = QuantizationConfig::default();
    let durations = quantization.acceptable_durations.clone();
    let mut rng = MelodyRng::from_seed(2024);

    for _ in 0..50 {
        let len = 1 + rng.below(20) as usize;
        let events: Vec<ScoreEvent> = (0..len)
            .map(|_| {
                let duration = durations[rng.below(durations.len() as u64) as usize];
                if rng.below(5) == 0 {
                    ScoreEvent::rest(duration)
                } else {
                    ScoreEvent::note(48 + rng.below(36) as u8, duration)
                }
            })
            .collect();

        let encoded = encode_events(&events, &quantization).unwrap();
        let decoded = decode(encoded.as_slice(), quantization.step_duration);
        let expected: Vec<Event> = events
            .iter()
            .map(|e| match e.pitch {
                Some(p) => Event::pitch(p, e.duration),
                None => Event::rest(e.duration),
            })
            .collect();
        assert_eq!(decoded, expected);
    }
}
