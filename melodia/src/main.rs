// Melodia CLI.
//
// Three stages, each reading what the previous one wrote:
//   preprocess  score tree -> per-item encodings, corpus stream, mapping.json
//   train       corpus + mapping -> n-gram predictor
//   generate    seed + predictor -> melody -> MIDI/JSON
//
// Usage:
//   melodia preprocess [--config cfg.json] [--dataset DIR] [--reuse-encoded]
//   melodia train [--config cfg.json] [--order N]
//   melodia generate --seed "67 _ _ _ 67 _ _ _ 64 _" [--steps N]
//     [--max-context N] [--temperature T] [--rng-seed N] [--output mel.mid]
//     [--format midi|json]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use melodia::config::MelodiaConfig;
use melodia::decoder::decode;
use melodia::generator::{GenerationParams, MelodyGenerator};
use melodia::midi::{OutputFormat, write_events};
use melodia::ngram::NGramModel;
use melodia::preprocess::{load_training_stream, preprocess, rebuild_corpus};
use melodia::vocabulary::Vocabulary;
use melodia_prng::MelodyRng;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "melodia", about = "Time-step melody encoding and generation")]
struct Args {
    /// JSON config file. Missing fields use defaults.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a score tree into the corpus stream and vocabulary.
    Preprocess {
        /// Override the dataset directory.
        #[arg(long)]
        dataset: Option<PathBuf>,

        /// Rebuild corpus and mapping from the existing per-item encodings
        /// instead of re-reading the score tree.
        #[arg(long, conflicts_with = "dataset")]
        reuse_encoded: bool,
    },
    /// Fit the n-gram predictor on the preprocessed corpus.
    Train {
        #[arg(long)]
        order: Option<usize>,
    },
    /// Generate a melody from a seed.
    Generate {
        /// Space-separated seed symbols, e.g. "67 _ _ _ 64 _".
        #[arg(long, short = 's')]
        seed: String,

        #[arg(long)]
        steps: Option<usize>,

        #[arg(long)]
        max_context: Option<usize>,

        #[arg(long, short = 't')]
        temperature: Option<f64>,

        /// RNG seed for reproducible output.
        #[arg(long)]
        rng_seed: Option<u64>,

        #[arg(long, short = 'o', default_value = "mel.mid")]
        output: PathBuf,

        /// Output format. Defaults to JSON for `.json` paths, MIDI otherwise.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Midi,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Midi => OutputFormat::Midi,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => MelodiaConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MelodiaConfig::default(),
    };

    match args.command {
        Command::Preprocess { dataset, reuse_encoded } => {
            if let Some(dir) = dataset {
                config.dataset_dir = dir;
            }
            let report = if reuse_encoded {
                rebuild_corpus(&config)?
            } else {
                preprocess(&config)?
            };
            println!(
                "{} encoded, {} skipped; corpus {} symbols; vocabulary {} symbols",
                report.encoded, report.skipped, report.corpus_len, report.vocabulary_size
            );
        }
        Command::Train { order } => {
            if let Some(order) = order {
                config.ngram_order = order;
            }
            config.validate()?;
            let (vocabulary, ids) = load_training_stream(&config)
                .context("run `melodia preprocess` first")?;
            let model = NGramModel::train(&ids, config.ngram_order, vocabulary.len())?;
            model.save(&config.model_path)?;
            println!("model written to {}", config.model_path.display());
        }
        Command::Generate {
            seed,
            steps,
            max_context,
            temperature,
            rng_seed,
            output,
            format,
        } => {
            let generation = &mut config.generation;
            if let Some(n) = steps {
                generation.num_steps = n;
            }
            if let Some(n) = max_context {
                generation.max_context = n;
            }
            if let Some(t) = temperature {
                generation.temperature = t;
            }
            if rng_seed.is_some() {
                generation.seed = rng_seed;
            }
            config.validate()?;
            let format = format.map_or_else(|| OutputFormat::from_path(&output), OutputFormat::from);
            run_generate(&config, &seed, &output, format)?;
        }
    }
    Ok(())
}

fn run_generate(
    config: &MelodiaConfig,
    seed_text: &str,
    output: &Path,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let vocabulary = Vocabulary::load(&config.mapping_path)
        .with_context(|| format!("failed to load mapping {}", config.mapping_path.display()))?;
    let model = NGramModel::load(&config.model_path)
        .with_context(|| format!("failed to load model {}", config.model_path.display()))?;
    if model.vocab_size != vocabulary.len() {
        bail!(
            "model covers {} symbols but the mapping has {}; retrain after preprocessing",
            model.vocab_size,
            vocabulary.len()
        );
    }

    let rng_seed = config.generation.seed.unwrap_or_else(clock_seed);
    tracing::info!("rng seed {rng_seed}");
    let mut rng = MelodyRng::from_seed(rng_seed);

    let params = GenerationParams {
        num_steps: config.generation.num_steps,
        max_context: config.generation.max_context,
        temperature: config.generation.temperature,
    };
    let mut generator = MelodyGenerator::new(&vocabulary, model, config.sequence_length);
    let melody = generator.generate_from_text(seed_text, &params, &mut rng)?;
    println!("{melody}");

    let step = config.quantization.step_duration;
    let events = decode(melody.as_slice(), step);
    write_events(
        &events,
        step,
        config.generation.tempo_bpm,
        format,
        output,
    )?;
    Ok(())
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
