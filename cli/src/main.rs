//! `trackpair` CLI: pair two tracking results (one pair or a whole folder),
//! inspect spot distances, generate synthetic two-channel scenes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pairing_core::export::{write_csv, SupplementalColumn};
use pairing_core::histogram::{DistanceReport, HistogramConfig};
use pairing_core::metrics::PairingMetrics;
use pairing_core::{run_pairing, PairingConfig, PairingMethodKind};
use sim::scenarios::{ScenarioKind, Scene};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser)]
#[command(name = "trackpair", about = "Pair the tracks of two tracking results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair the tracks of two models and export the spot pairs as CSV.
    Pair {
        /// First model (JSON)
        model1: PathBuf,
        /// Second model (JSON)
        model2: PathBuf,
        #[arg(long, value_enum, default_value_t = PairingMethodKind::Concensus)]
        method: PairingMethodKind,
        /// Max pairing distance, in the units of the first model
        #[arg(long, default_value_t = 1.0)]
        max_distance: f64,
        /// CSV output; defaults to a name derived from both model paths
        #[arg(long)]
        output: Option<PathBuf>,
        /// Extra spot feature column, as HEADER:FEATURE_KEY:SIDE (side 1 or 2)
        #[arg(long = "column")]
        columns: Vec<SupplementalColumn>,
        /// Known track pairs (JSON), to report precision and recall
        #[arg(long)]
        truth: Option<PathBuf>,
    },
    /// Pair every `<name>-ch1.json` / `<name>-ch2.json` set found in a folder,
    /// writing `<name>.csv` next to each.
    Batch {
        dir: PathBuf,
        #[arg(long, value_enum, default_value_t = PairingMethodKind::Concensus)]
        method: PairingMethodKind,
        #[arg(long, default_value_t = 1.0)]
        max_distance: f64,
    },
    /// Histogram and cumulative distribution of frame-matched spot distances.
    Histogram {
        model1: PathBuf,
        model2: PathBuf,
        /// Fixed number of bins; automatic otherwise
        #[arg(long)]
        bins: Option<usize>,
        /// Write the report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Generate a synthetic scene: two models and their true track pairs.
    Simulate {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducibility
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pair {
            model1,
            model2,
            method,
            max_distance,
            output,
            columns,
            truth,
        } => {
            let config = PairingConfig {
                method,
                max_pairing_distance: max_distance,
            };
            run_pair(
                &config,
                &model1,
                &model2,
                output.as_deref(),
                &columns,
                truth.as_deref(),
            )?;
        }
        Commands::Batch {
            dir,
            method,
            max_distance,
        } => {
            let config = PairingConfig {
                method,
                max_pairing_distance: max_distance,
            };
            let summary = run_batch(&config, &dir)?;
            println!(
                "\nFinished batch pairing in {}: {} paired, {} skipped",
                dir.display(),
                summary.paired.len(),
                summary.skipped.len(),
            );
        }
        Commands::Histogram {
            model1,
            model2,
            bins,
            output,
        } => {
            run_histogram(&model1, &model2, bins, output.as_deref())?;
        }
        Commands::Simulate {
            scenario,
            seed,
            out_dir,
        } => {
            run_simulate(scenario, seed, &out_dir)?;
        }
    }

    Ok(())
}

fn run_pair(
    config: &PairingConfig,
    path1: &Path,
    path2: &Path,
    output_path: Option<&Path>,
    columns: &[SupplementalColumn],
    truth_path: Option<&Path>,
) -> Result<()> {
    let model1 = sim::load_model(path1)?;
    let model2 = sim::load_model(path2)?;
    println!(
        "Pairing {} tracks with {} tracks ({}, max dist {} {})...",
        model1.n_tracks(),
        model2.n_tracks(),
        config.method,
        config.max_pairing_distance,
        model1.space_units,
    );

    let pairing = run_pairing(config, &model1, &model2)?;
    println!("{pairing}");

    let csv_path = match output_path {
        Some(p) => p.to_path_buf(),
        None => default_csv_path(path1, path2),
    };
    let file = std::fs::File::create(&csv_path)
        .with_context(|| format!("cannot create {}", csv_path.display()))?;
    let rows = write_csv(&pairing, columns, std::io::BufWriter::new(file))?;
    println!("{} spot pairs saved to {}", rows, csv_path.display());

    if let Some(tpath) = truth_path {
        let truth = sim::load_truth(tpath)?;
        let metrics = PairingMetrics::evaluate(&pairing, &truth);
        println!(
            "Precision {:.3}, recall {:.3} (TP {}, FP {}, FN {})",
            metrics.precision(),
            metrics.recall(),
            metrics.true_positives,
            metrics.false_positives,
            metrics.false_negatives,
        );
    }

    Ok(())
}

/// Outcome of a batch run, by first-channel model file.
#[derive(Debug, Default)]
struct BatchSummary {
    paired: Vec<PathBuf>,
    skipped: Vec<PathBuf>,
}

/// Model sets of `dir`: each `<name>-ch1.json` with its `<name>-ch2.json`
/// sibling, in file name order. A missing sibling is reported as `None`.
fn batch_inputs(dir: &Path) -> Result<Vec<(PathBuf, Option<PathBuf>)>> {
    let mut firsts: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("-ch1.json"))
        })
        .collect();
    firsts.sort();

    Ok(firsts
        .into_iter()
        .map(|first| {
            let name = first
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .replace("-ch1.json", "-ch2.json");
            let second = first.with_file_name(name);
            let second = second.is_file().then_some(second);
            (first, second)
        })
        .collect())
}

/// Pair every model set of `dir`. A set that cannot be paired is logged and
/// skipped; the batch goes on.
fn run_batch(config: &PairingConfig, dir: &Path) -> Result<BatchSummary> {
    config.validate()?;
    let mut summary = BatchSummary::default();
    for (first, second) in batch_inputs(dir)? {
        println!("\nProcessing {}", first.display());
        let Some(second) = second else {
            warn!(path = %first.display(), "no matching -ch2 model, skipped");
            summary.skipped.push(first);
            continue;
        };
        match run_pair(config, &first, &second, None, &[], None) {
            Ok(()) => summary.paired.push(first),
            Err(err) => {
                warn!(
                    path = %first.display(),
                    error = %format!("{err:#}"),
                    "pairing failed, skipped"
                );
                summary.skipped.push(first);
            }
        }
    }
    Ok(summary)
}

fn run_histogram(
    path1: &Path,
    path2: &Path,
    bins: Option<usize>,
    output_path: Option<&Path>,
) -> Result<()> {
    let model1 = sim::load_model(path1)?;
    let model2 = sim::load_model(path2)?;
    let config = HistogramConfig {
        bins,
        ..HistogramConfig::default()
    };
    let report = DistanceReport::compute(&model1, &model2, &config);

    println!(
        "{} distances, {} bins of {:.3} {}",
        report.n_samples,
        report.histogram.n_bins(),
        report.histogram.bin_width,
        report.units,
    );
    for (edge, count) in report.histogram.bin_edges().iter().zip(&report.histogram.counts) {
        println!("  {edge:>10.3}  {count}");
    }

    if let Some(opath) = output_path {
        std::fs::write(opath, serde_json::to_string_pretty(&report)?)?;
        println!("Report saved to {}", opath.display());
    }

    Ok(())
}

fn run_simulate(kind: ScenarioKind, seed: u64, out_dir: &Path) -> Result<()> {
    let scene = Scene::build(kind, seed);
    let files = sim::save_scene(&scene, out_dir)?;
    println!(
        "Scene '{}' (seed={}): {} + {} tracks, {} true pairs",
        scene.name,
        seed,
        scene.model1.n_tracks(),
        scene.model2.n_tracks(),
        scene.truth.len(),
    );
    println!("  {}", files.model1.display());
    println!("  {}", files.model2.display());
    println!("  {}", files.truth.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Default output name
// ---------------------------------------------------------------------------

fn longest_common_prefix(a: &str, b: &str) -> String {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

/// `<common prefix of both file stems>.csv` next to the first model, with a
/// trailing `-ch` (channel suffix) dropped. Falls back to `pairing.csv`.
fn default_csv_path(path1: &Path, path2: &Path) -> PathBuf {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let prefix = longest_common_prefix(&stem(path1), &stem(path2));
    let prefix = prefix.strip_suffix("-ch").unwrap_or(&prefix);
    let name = if prefix.is_empty() {
        "pairing.csv".to_string()
    } else {
        format!("{prefix}.csv")
    };
    path1.with_file_name(name)
}
