//! Offline trainer: fits scaler, centroids, and the cluster → tier mapping from a
//! historical CSV and publishes them as a new artifact version.
//!
//! ```text
//! cargo run --bin train -- --dataset dataset/dataset_siswa.csv --artifact-dir model
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use student_potential_advisor::config::AdvisorConfig;
use student_potential_advisor::{dataset, logging, trainer, ArtifactStore};

#[derive(Debug, Parser)]
#[command(name = "train", about = "Fit and publish the student potential model")]
struct Args {
    /// Training CSV (defaults to `training.dataset` from the config).
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Artifact store root (defaults to `artifacts.dir` from the config).
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    /// Seed for k-means initialization.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of seeded k-means restarts.
    #[arg(long)]
    n_init: Option<usize>,

    /// Fit and report, but do not publish.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let args = Args::parse();
    let mut cfg = AdvisorConfig::load().context("loading advisor config")?;
    if let Some(p) = args.dataset {
        cfg.training.dataset = p;
    }
    if let Some(d) = args.artifact_dir {
        cfg.artifacts.dir = d;
    }
    if let Some(s) = args.seed {
        cfg.training.seed = s;
    }
    if let Some(n) = args.n_init {
        cfg.training.n_init = n;
    }

    let store = ArtifactStore::new(&cfg.artifacts.dir);
    // held for the whole run so two trainers never interleave
    let lock = if args.dry_run { None } else { Some(store.lock()?) };

    let samples = dataset::load_csv(&cfg.training.dataset)?;
    info!(path = %cfg.training.dataset.display(), rows = samples.len(), "dataset loaded");

    let set = trainer::run(&samples, &cfg.training.train_options())
        .context("training failed; existing artifacts left untouched")?;

    match &lock {
        Some(lock) => {
            let version = store.publish(&set, lock)?;
            println!("published {} to {}", version, store.root().display());
        }
        None => info!("dry run: nothing published"),
    }

    if let Some(report) = &set.report {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}
