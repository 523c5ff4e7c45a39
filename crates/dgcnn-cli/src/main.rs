//! DGCNN CLI - train and inspect sort-pooling graph classifiers.
//!
//! # Usage
//!
//! ```bash
//! # Train on a dataset descriptor; MUTAG picks its tuned learning rate
//! dgcnn train data/MUTAG.json -E 100
//!
//! # Override the preset and the pooling percentile
//! dgcnn train data/graphs.json --name proteins -r 1e-5 -k 70
//!
//! # Layer settings from a file and the environment
//! DGCNN_TRAINING__EPOCHS=20 dgcnn train data/DD.json --config run.toml
//!
//! # Node-count statistics and the resulting top_k
//! dgcnn inspect data/MUTAG.json
//! ```

mod presets;
mod settings;

use anyhow::{Context, Result};
use candle_core::Device;
use clap::{Parser, Subcommand};
use dgcnn_core::{assemble, split_train_test, AssembleConfig, Dataset, DatasetDescriptor};
use dgcnn_nn::{EpochReport, Trainer, TrainingObserver};
use indicatif::{ProgressBar, ProgressStyle};
use presets::Preset;
use settings::RunConfig;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "dgcnn")]
#[command(about = "DGCNN graph classification CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train and evaluate a classifier
    Train {
        /// Dataset descriptor (JSON)
        input: PathBuf,

        /// Dataset preset (default: inferred from the file name)
        #[arg(long, value_enum)]
        name: Option<Preset>,

        /// Number of epochs
        #[arg(short = 'E', long)]
        epochs: Option<usize>,

        /// Learning rate (overrides the preset)
        #[arg(short = 'r', long)]
        learning_rate: Option<f64>,

        /// Node-count percentile for top_k
        #[arg(short = 'k', long)]
        percentile: Option<f64>,

        /// Fraction of graphs held out for testing
        #[arg(long)]
        test_fraction: Option<f64>,

        /// Random seed for the split, initialization and dropout
        #[arg(long)]
        seed: Option<u64>,

        /// Config file (TOML, JSON or YAML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print first-layer weight statistics every epoch
        #[arg(long)]
        debug: bool,
    },

    /// Show dataset statistics and the pooling cutoff
    Inspect {
        /// Dataset descriptor (JSON)
        input: PathBuf,

        /// Node-count percentile for top_k
        #[arg(short = 'k', long, default_value = "60")]
        percentile: f64,
    },
}

/// Flags that override the layered configuration.
struct Overrides {
    epochs: Option<usize>,
    learning_rate: Option<f64>,
    percentile: Option<f64>,
    test_fraction: Option<f64>,
    seed: Option<u64>,
    debug: bool,
}

impl Overrides {
    fn apply(self, config: &mut RunConfig) {
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if let Some(lr) = self.learning_rate {
            config.training.learning_rate = lr;
        }
        if let Some(p) = self.percentile {
            config.data.percentile = p;
        }
        if let Some(f) = self.test_fraction {
            config.data.test_fraction = f;
        }
        if let Some(seed) = self.seed {
            config.data.seed = seed;
            config.training.seed = seed;
        }
        config.training.debug |= self.debug;
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            input,
            name,
            epochs,
            learning_rate,
            percentile,
            test_fraction,
            seed,
            config,
            debug,
        } => {
            let overrides = Overrides {
                epochs,
                learning_rate,
                percentile,
                test_fraction,
                seed,
                debug,
            };
            cmd_train(&input, name, config.as_deref(), overrides)
        }
        Commands::Inspect { input, percentile } => cmd_inspect(&input, percentile),
    }
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal());
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", path.display()));

    let dataset = DatasetDescriptor::from_json_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?
        .into_dataset()
        .with_context(|| format!("Invalid dataset {}", path.display()))?;

    pb.finish_with_message(format!("Loaded {} graphs in {:.2?}", dataset.len(), start.elapsed()));
    Ok(dataset)
}

/// One progress bar per epoch, advanced on every optimizer step.
struct EpochProgress {
    bar: Option<ProgressBar>,
}

impl TrainingObserver for EpochProgress {
    fn on_epoch_start(&mut self, epoch: usize, steps: usize) {
        let bar = ProgressBar::new(steps as u64);
        if let Ok(style) = ProgressStyle::with_template("epoch {prefix:>4} [{bar:30}] {pos}/{len} {msg}") {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(epoch.to_string());
        self.bar = Some(bar);
    }

    fn on_step(&mut self, _step: usize, loss: f32) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("loss {loss:.4}"));
            bar.inc(1);
        }
    }

    fn on_epoch_end(&mut self, _report: &EpochReport) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn cmd_train(
    input: &Path,
    name: Option<Preset>,
    config_file: Option<&Path>,
    overrides: Overrides,
) -> Result<()> {
    let mut base = RunConfig::default();
    if let Some(preset) = name.or_else(|| Preset::from_path(input)) {
        info!(?preset, lr = preset.learning_rate(), "using dataset preset");
        base.training.learning_rate = preset.learning_rate();
    }
    let mut run = RunConfig::load(&base, config_file).context("Failed to load configuration")?;
    overrides.apply(&mut run);

    let dataset = load_dataset(input)?;
    let device = Device::Cpu;
    let data = assemble(
        &dataset,
        &AssembleConfig::default().with_percentile(run.data.percentile),
        &device,
    )
    .context("Failed to assemble dataset")?;
    let split = split_train_test(data, run.data.test_fraction, run.data.seed).context("Failed to split dataset")?;

    let trainer = Trainer::new(run.training.clone());
    let mut model = trainer.build_model(&split, &device).with_context(|| {
        format!(
            "Cannot build model with top_k = {} (raise the percentile with -k)",
            split.top_k
        )
    })?;
    info!(parameters = model.num_parameters(), top_k = split.top_k, "model ready");

    let result = trainer.fit(&mut model, &split, &mut EpochProgress { bar: None })?;

    println!();
    println!("Training Summary");
    println!("================");
    println!("Epochs:          {}", result.history.len());
    println!("Train graphs:    {}", split.train.len());
    println!("Test graphs:     {}", split.test.len());
    println!("Train accuracy:  {:.4}", result.final_train_accuracy());
    println!("Test accuracy:   {:.4}", result.final_test_accuracy());
    println!("Time consumption: {:.2?}", result.elapsed);
    Ok(())
}

fn cmd_inspect(input: &Path, percentile: f64) -> Result<()> {
    let dataset = load_dataset(input)?;
    let stats = dataset.stats();
    let data = assemble(
        &dataset,
        &AssembleConfig::default().with_percentile(percentile),
        &Device::Cpu,
    )
    .context("Failed to assemble dataset")?;
    let labels = data.label_counts();

    println!("Dataset Statistics");
    println!("==================");
    println!("Graphs:         {}", stats.graph_count);
    println!("Nodes min/max:  {} / {}", stats.min_nodes, stats.max_nodes);
    println!("Nodes mean:     {:.2}", stats.mean_nodes);
    println!("Edges:          {}", stats.total_edges);
    println!("Positive:       {}", labels.positive);
    println!("Negative:       {}", labels.negative);
    match stats.tag_vocabulary {
        Some(v) => println!("Encoding:       one-hot tags ({v})"),
        None => println!("Encoding:       normalized degree"),
    }
    println!("Channels:       {}", data.channels);
    println!("top_k:          {} ({}th percentile)", data.top_k, percentile);
    Ok(())
}
