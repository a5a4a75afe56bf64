//! ddilink CLI - link-prediction experiments from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Show dataset statistics
//! ddilink stats edges.csv
//!
//! # Generate train/valid/test splits with fixed negatives
//! ddilink split edges.csv -o split/ --valid-frac 0.1 --test-frac 0.1
//!
//! # Generate perturbed copies of the dataset
//! ddilink perturb edges.csv -o perturbation/ --kind remove --proportions 0.1,0.25,0.5
//!
//! # Train one model
//! ddilink train random-walk --data edges.csv --split split/ -o runs/walk
//!
//! # Full sweep: perturbation kinds x proportions x models
//! ddilink sweep --data edges.csv --split split/ --perturb-dir perturbation/ \
//!     -o results/ --models common-neighbors,adamic-adar --proportions 0.0,0.1
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ddilink_core::perturb::{perturb, PerturbConfig, PerturbKind};
use ddilink_core::{EdgeSplit, InteractionGraph, SplitConfig};
use ddilink_predict::eval::{test_report, validation_report};
use ddilink_predict::{
    best_checkpoint, AdamicAdar, CommonNeighbors, GnnPredictor, GnnTrainConfig, HitsEvaluator,
    LinkPredictor, RandomWalkPredictor, TrainContext, TrainReport, WalkTrainConfig,
};
use indicatif::ProgressBar;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ddilink")]
#[command(about = "Link prediction experiment harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show statistics about an edge-list dataset
    Stats {
        /// Input file (CSV edge list or binary snapshot)
        input: PathBuf,
    },

    /// Generate train/valid/test edge splits with fixed negative samples
    Split {
        /// Input file (CSV edge list)
        input: PathBuf,

        /// Output directory for the split CSVs
        #[arg(short, long)]
        output: PathBuf,

        /// Fraction of edges held out for validation
        #[arg(long, default_value = "0.1")]
        valid_frac: f64,

        /// Fraction of edges held out for testing
        #[arg(long, default_value = "0.1")]
        test_frac: f64,

        /// Negative samples per held-out partition (default: match positives)
        #[arg(long)]
        num_neg: Option<usize>,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Generate perturbed dataset copies (edge addition/removal)
    Perturb {
        /// Input file (CSV edge list)
        input: PathBuf,

        /// Output directory for perturbation CSVs
        #[arg(short, long)]
        output: PathBuf,

        /// Perturbation kind (add | remove)
        #[arg(long)]
        kind: PerturbKind,

        /// Proportions of the edge count to perturb
        #[arg(long, value_delimiter = ',', default_values_t = vec![0.1, 0.25, 0.5])]
        proportions: Vec<f64>,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Train a single model on a dataset
    Train {
        /// Model variant to train
        #[arg(value_enum)]
        model: ModelKind,

        /// Input file (CSV edge list)
        #[arg(long)]
        data: PathBuf,

        /// Split directory (validation edges drive checkpointing)
        #[arg(long)]
        split: Option<PathBuf>,

        /// Output directory for checkpoints and the final model
        #[arg(short, long)]
        output: PathBuf,

        /// Override the configured epoch count
        #[arg(long)]
        epochs: Option<usize>,
    },

    /// Run the full experiment matrix: perturbations x models
    Sweep {
        /// Base dataset (CSV edge list)
        #[arg(long)]
        data: PathBuf,

        /// Split directory (canonical valid/test edges with negatives)
        #[arg(long)]
        split: PathBuf,

        /// Directory holding perturbation CSVs (required for proportions > 0)
        #[arg(long)]
        perturb_dir: Option<PathBuf>,

        /// Output directory for per-combination results
        #[arg(short, long)]
        output: PathBuf,

        /// Models to run (default: all)
        #[arg(long, value_enum, value_delimiter = ',')]
        models: Vec<ModelKind>,

        /// Perturbation kinds to iterate (default: add,remove)
        #[arg(long, value_delimiter = ',')]
        kinds: Vec<PerturbKind>,

        /// Perturbation proportions to iterate (0.0 = unperturbed base graph)
        #[arg(long, value_delimiter = ',', default_values_t = vec![0.0])]
        proportions: Vec<f64>,

        /// Skip training and evaluate previously saved models
        #[arg(long)]
        no_train: bool,

        /// Override the configured epoch count
        #[arg(long)]
        epochs: Option<usize>,
    },
}

/// Model variants selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModelKind {
    /// Message-passing network (GraphSAGE)
    Gnn,
    /// Random-walk skip-gram embeddings
    RandomWalk,
    /// Common-neighbors heuristic
    CommonNeighbors,
    /// Adamic-Adar heuristic
    AdamicAdar,
}

impl ModelKind {
    fn all() -> Vec<Self> {
        vec![
            Self::Gnn,
            Self::RandomWalk,
            Self::CommonNeighbors,
            Self::AdamicAdar,
        ]
    }

    /// Whether the variant trains parameters and writes epoch checkpoints.
    fn is_neural(self) -> bool {
        matches!(self, Self::Gnn | Self::RandomWalk)
    }

    fn build(self, epochs: Option<usize>) -> Box<dyn LinkPredictor> {
        match self {
            Self::Gnn => {
                let mut config = GnnTrainConfig::default();
                if let Some(epochs) = epochs {
                    config = config.with_epochs(epochs);
                }
                Box::new(GnnPredictor::new(config))
            }
            Self::RandomWalk => {
                let mut config = WalkTrainConfig::default();
                if let Some(epochs) = epochs {
                    config = config.with_epochs(epochs);
                }
                Box::new(RandomWalkPredictor::new(config))
            }
            Self::CommonNeighbors => Box::new(CommonNeighbors::new()),
            Self::AdamicAdar => Box::new(AdamicAdar::new()),
        }
    }

    /// File name of the final saved model.
    fn model_file(self) -> &'static str {
        match self {
            Self::Gnn => "gnn_final.safetensors",
            Self::RandomWalk => "randomwalk_final.bin",
            Self::CommonNeighbors => "common_neighbors.bin",
            Self::AdamicAdar => "adamic_adar.bin",
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { input } => cmd_stats(&input),
        Commands::Split {
            input,
            output,
            valid_frac,
            test_frac,
            num_neg,
            seed,
        } => cmd_split(&input, &output, valid_frac, test_frac, num_neg, seed),
        Commands::Perturb {
            input,
            output,
            kind,
            proportions,
            seed,
        } => cmd_perturb(&input, &output, kind, &proportions, seed),
        Commands::Train {
            model,
            data,
            split,
            output,
            epochs,
        } => cmd_train(model, &data, split.as_deref(), &output, epochs),
        Commands::Sweep {
            data,
            split,
            perturb_dir,
            output,
            models,
            kinds,
            proportions,
            no_train,
            epochs,
        } => cmd_sweep(
            &data,
            &split,
            perturb_dir.as_deref(),
            &output,
            &models,
            &kinds,
            &proportions,
            no_train,
            epochs,
        ),
    }
}

fn load_graph(path: &Path) -> Result<InteractionGraph> {
    let start = Instant::now();
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Loading {}...", path.display()));

    let graph = if path.extension().is_some_and(|e| e == "bin") {
        InteractionGraph::from_binary_file(path)
            .with_context(|| format!("Failed to load binary snapshot {}", path.display()))?
    } else {
        InteractionGraph::from_csv_file(path)
            .with_context(|| format!("Failed to load edge list {}", path.display()))?
    };

    pb.finish_with_message(format!("Loaded in {:.2?}", start.elapsed()));
    Ok(graph)
}

fn cmd_stats(input: &Path) -> Result<()> {
    let graph = load_graph(input)?;
    let stats = graph.stats();

    println!("Dataset Statistics");
    println!("==================");
    println!("Nodes:      {}", stats.node_count);
    println!("Edges:      {}", stats.edge_count);
    println!("Avg degree: {:.2}", stats.avg_degree);

    Ok(())
}

fn cmd_split(
    input: &Path,
    output: &Path,
    valid_frac: f64,
    test_frac: f64,
    num_neg: Option<usize>,
    seed: u64,
) -> Result<()> {
    let graph = load_graph(input)?;

    let config = SplitConfig {
        valid_frac,
        test_frac,
        num_neg,
        seed,
    };
    let split = EdgeSplit::generate(&graph, &config)
        .with_context(|| format!("Failed to split {}", input.display()))?;

    split
        .save_dir(output)
        .with_context(|| format!("Failed to write split to {}", output.display()))?;

    println!(
        "Split {} edges -> train {}, valid {} (+{} neg), test {} (+{} neg)",
        graph.num_edges(),
        split.train.edges.len(),
        split.valid.edges.len(),
        split.valid.neg_edges.len(),
        split.test.edges.len(),
        split.test.neg_edges.len(),
    );
    println!("Written to {}", output.display());
    Ok(())
}

fn cmd_perturb(
    input: &Path,
    output: &Path,
    kind: PerturbKind,
    proportions: &[f64],
    seed: u64,
) -> Result<()> {
    let graph = load_graph(input)?;
    fs::create_dir_all(output)?;

    for &proportion in proportions {
        let config = PerturbConfig {
            kind,
            proportion,
            seed,
        };
        let perturbed = perturb(&graph, &config)
            .with_context(|| format!("Failed to perturb with {kind} {proportion}"))?;

        let path = config.csv_path(output);
        perturbed.to_csv_file(&path)?;
        println!(
            "{}: {} edges -> {}",
            path.display(),
            perturbed.num_edges(),
            config.file_name()
        );
    }

    Ok(())
}

fn cmd_train(
    kind: ModelKind,
    data: &Path,
    split_dir: Option<&Path>,
    output: &Path,
    epochs: Option<usize>,
) -> Result<()> {
    let graph = load_graph(data)?;
    let split = split_dir
        .map(|dir| {
            EdgeSplit::load_dir(dir)
                .with_context(|| format!("Failed to load split from {}", dir.display()))
        })
        .transpose()?;

    fs::create_dir_all(output)?;
    let mut model = kind.build(epochs);

    let ckpt_dir = output.join("checkpoints");
    let mut ctx = TrainContext::default();
    if let Some(split) = &split {
        ctx = ctx.with_validation(&split.valid);
    }
    if kind.is_neural() {
        ctx = ctx.with_checkpoint_dir(&ckpt_dir);
    }

    println!("==> Training {}", model.name());
    let start = Instant::now();
    let report = model.train(&graph, &ctx)?;
    println!("Trained in {:.2?}", start.elapsed());

    if let (Some(epoch), Some(hits)) = (report.best_epoch, report.best_val_hits) {
        println!("Best validation Hits@20: {:.4} (epoch {})", hits, epoch + 1);
    }

    let model_path = output.join(kind.model_file());
    model.save_model(&model_path)?;
    write_history(&output.join(format!("{}_history.csv", model.name())), &report)?;
    println!("Saved model to {}", model_path.display());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_sweep(
    data: &Path,
    split_dir: &Path,
    perturb_dir: Option<&Path>,
    output: &Path,
    models: &[ModelKind],
    kinds: &[PerturbKind],
    proportions: &[f64],
    no_train: bool,
    epochs: Option<usize>,
) -> Result<()> {
    let split = EdgeSplit::load_dir(split_dir)
        .with_context(|| format!("Failed to load split from {}", split_dir.display()))?;

    let models = if models.is_empty() {
        ModelKind::all()
    } else {
        models.to_vec()
    };
    let kinds = if kinds.is_empty() {
        vec![PerturbKind::Add, PerturbKind::Remove]
    } else {
        kinds.to_vec()
    };

    let combos: Vec<(PerturbKind, f64)> = kinds
        .iter()
        .flat_map(|&kind| proportions.iter().map(move |&prop| (kind, prop)))
        .collect();

    let pb = ProgressBar::new((combos.len() * models.len()) as u64);
    let start = Instant::now();

    for (kind, proportion) in combos {
        // Proportion zero means the unperturbed base graph.
        let graph = if proportion == 0.0 {
            load_graph(data)?
        } else {
            let Some(perturb_dir) = perturb_dir else {
                warn!(%kind, proportion, "no --perturb-dir given, skipping perturbed combination");
                pb.inc(models.len() as u64);
                continue;
            };
            let path = PerturbConfig::new(kind, proportion).csv_path(perturb_dir);
            if !path.exists() {
                warn!(path = %path.display(), "perturbation file missing, skipping combination");
                pb.inc(models.len() as u64);
                continue;
            }
            load_graph(&path)?
        };

        for &model_kind in &models {
            run_combination(
                model_kind,
                &graph,
                &split,
                output,
                kind,
                proportion,
                no_train,
                epochs,
            )?;
            pb.inc(1);
        }
    }

    pb.finish();
    println!("Sweep finished in {:.2?}", start.elapsed());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_combination(
    model_kind: ModelKind,
    graph: &InteractionGraph,
    split: &EdgeSplit,
    output: &Path,
    kind: PerturbKind,
    proportion: f64,
    no_train: bool,
    epochs: Option<usize>,
) -> Result<()> {
    let mut model = model_kind.build(epochs);
    let combo_dir = output
        .join(kind.to_string())
        .join(proportion.to_string())
        .join(model.name());
    fs::create_dir_all(&combo_dir)?;

    let model_path = combo_dir.join(model_kind.model_file());

    if model_kind.is_neural() {
        let ckpt_dir = combo_dir.join("checkpoints");

        if !no_train {
            println!("==> Training {}: {} {}", model.name(), kind, proportion);
            let ctx = TrainContext::default()
                .with_validation(&split.valid)
                .with_checkpoint_dir(&ckpt_dir);
            let report = model.train(graph, &ctx)?;
            write_history(
                &combo_dir.join(format!("{}_history.csv", model.name())),
                &report,
            )?;
        }

        // Reload the best checkpoint (highest embedded epoch) before testing
        let best = match best_checkpoint(&ckpt_dir) {
            Ok(best) => best,
            Err(_) => {
                warn!(
                    dir = %ckpt_dir.display(),
                    "no trained checkpoint for this combination, skipping"
                );
                return Ok(());
            }
        };
        println!("\tBest model: {}", best.display());
        model.load_model(&best)?;
        model.save_model(&model_path)?;
    } else if no_train {
        if !model_path.exists() {
            warn!(
                path = %model_path.display(),
                "no saved model for this combination, skipping"
            );
            return Ok(());
        }
        model.load_model(&model_path)?;
    } else {
        model.train(graph, &TrainContext::default())?;
        model.save_model(&model_path)?;
        // Reload what was saved so evaluation exercises the persisted state
        model.load_model(&model_path)?;
    }

    println!("==> Testing {}", model.name());
    let evaluator = HitsEvaluator::default();

    let valid_metrics =
        evaluator.evaluate(model.as_ref(), &split.valid.edges, &split.valid.neg_edges)?;
    println!("\t{valid_metrics:?}");

    let report_path = combo_dir.join(format!("{}_final.txt", model.name()));
    fs::write(&report_path, validation_report(&valid_metrics))
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    let test_metrics =
        evaluator.evaluate(model.as_ref(), &split.test.edges, &split.test.neg_edges)?;
    println!("\t{test_metrics:?}");

    let mut report_file = OpenOptions::new().append(true).open(&report_path)?;
    report_file.write_all(test_report(&test_metrics).as_bytes())?;

    Ok(())
}

/// Write per-epoch loss and validation metrics as CSV.
fn write_history(path: &Path, report: &TrainReport) -> Result<()> {
    let rows = report.loss_history.len().max(report.val_hits.len());
    if rows == 0 {
        return Ok(());
    }

    let mut file = File::create(path)?;
    writeln!(file, "epoch,loss,val_hits20")?;
    for epoch in 0..rows {
        let loss = report
            .loss_history
            .get(epoch)
            .map(|l| l.to_string())
            .unwrap_or_default();
        let hits = report
            .val_hits
            .get(epoch)
            .map(|h| h.to_string())
            .unwrap_or_default();
        writeln!(file, "{},{},{}", epoch + 1, loss, hits)?;
    }
    Ok(())
}
