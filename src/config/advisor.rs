// src/config/advisor.rs
//! Service + trainer configuration (TOML), with env overrides.
//!
//! Resolution:
//! 1) `$ADVISOR_CONFIG_PATH` (must exist if set)
//! 2) `config/advisor.toml` (optional; built-in defaults if absent)
//! 3) `ADVISOR_ARTIFACT_DIR` / `ADVISOR_SEED` override the file values

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cluster::KMeansOptions;
use crate::trainer::TrainOptions;

pub const DEFAULT_CONFIG_PATH: &str = "config/advisor.toml";
pub const ENV_CONFIG_PATH: &str = "ADVISOR_CONFIG_PATH";
pub const ENV_ARTIFACT_DIR: &str = "ADVISOR_ARTIFACT_DIR";
pub const ENV_SEED: &str = "ADVISOR_SEED";

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("model")
}
fn default_dataset() -> PathBuf {
    PathBuf::from("dataset/dataset_siswa.csv")
}
fn default_seed() -> u64 {
    42
}
fn default_n_init() -> usize {
    10
}
fn default_max_iter() -> usize {
    300
}
fn default_tolerance() -> f64 {
    1e-4
}
fn default_elbow_max_k() -> usize {
    9
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default)]
    pub artifacts: ArtifactsSection,
    #[serde(default)]
    pub training: TrainingSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsSection {
    #[serde(default = "default_artifact_dir")]
    pub dir: PathBuf,
}

impl Default for ArtifactsSection {
    fn default() -> Self {
        Self {
            dir: default_artifact_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSection {
    #[serde(default = "default_dataset")]
    pub dataset: PathBuf,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_n_init")]
    pub n_init: usize,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_elbow_max_k")]
    pub elbow_max_k: usize,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            seed: default_seed(),
            n_init: default_n_init(),
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
            elbow_max_k: default_elbow_max_k(),
        }
    }
}

impl TrainingSection {
    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            kmeans: KMeansOptions {
                seed: self.seed,
                n_init: self.n_init.max(1),
                max_iter: self.max_iter.max(1),
                tolerance: self.tolerance,
                ..KMeansOptions::default()
            },
            elbow_max_k: self.elbow_max_k,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_true")]
    pub cors_permissive: bool,
    #[serde(default = "default_true")]
    pub metrics: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            cors_permissive: true,
            metrics: true,
        }
    }
}

impl AdvisorConfig {
    /// Load using env var + fallbacks, then apply env overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!(
                        "{ENV_CONFIG_PATH} points to non-existent path {}",
                        pb.display()
                    ));
                }
                Self::load_from_file(&pb)?
            }
            Err(_) => {
                let p = Path::new(DEFAULT_CONFIG_PATH);
                if p.exists() {
                    Self::load_from_file(p)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        if !(cfg.training.tolerance >= 0.0) {
            return Err(anyhow!("training.tolerance must be >= 0"));
        }
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(ENV_ARTIFACT_DIR) {
            if !dir.trim().is_empty() {
                self.artifacts.dir = PathBuf::from(dir.trim());
            }
        }
        if let Ok(raw) = std::env::var(ENV_SEED) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.training.seed = seed,
                Err(_) => warn!(value = %raw, "ignoring invalid {ENV_SEED}"),
            }
        }
    }
}
