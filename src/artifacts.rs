//! # Artifact store
//! Versioned on-disk home of the three trained artifacts (`scaler`, `centroids`,
//! `label_mapping`) plus an optional training report.
//!
//! Layout under the store root:
//! ```text
//! CURRENT                 name of the active version directory
//! .train.lock             held while a trainer run is in progress
//! v<unix_ms>-<pid>-<seq>/
//!     scaler.json
//!     centroids.json
//!     label_mapping.json
//!     report.json         (optional, never read by serving logic)
//! ```
//! Publishing writes a complete new version directory and then swaps `CURRENT`
//! with a rename, so readers see either the old set or the new one, never a mix.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Context};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

use crate::cluster::ClusterModel;
use crate::error::{EngineError, EngineResult};
use crate::scaler::ScalerParams;
use crate::tier::LabelMapping;
use crate::trainer::TrainingReport;

pub const CURRENT_FILE: &str = "CURRENT";
pub const LOCK_FILE: &str = ".train.lock";
pub const SCALER_FILE: &str = "scaler.json";
pub const CENTROIDS_FILE: &str = "centroids.json";
pub const LABEL_MAPPING_FILE: &str = "label_mapping.json";
pub const REPORT_FILE: &str = "report.json";

// disambiguates versions published by one process within the same millisecond
static PUBLISH_SEQ: AtomicU64 = AtomicU64::new(0);

/// The complete fitted state consumed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    /// Version directory this set was loaded from, if any.
    pub version: Option<String>,
    pub scaler: ScalerParams,
    pub centroids: ClusterModel,
    pub label_mapping: LabelMapping,
    pub report: Option<TrainingReport>,
}

impl ArtifactSet {
    pub fn new(scaler: ScalerParams, centroids: ClusterModel, label_mapping: LabelMapping) -> Self {
        Self {
            version: None,
            scaler,
            centroids,
            label_mapping,
            report: None,
        }
    }

    /// Internal consistency of the three artifacts.
    pub fn validate(&self) -> EngineResult<()> {
        self.scaler.validate()?;
        self.centroids.validate()?;
        self.label_mapping.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the active version, from `CURRENT`.
    pub fn current_version(&self) -> EngineResult<String> {
        let path = self.root.join(CURRENT_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(EngineError::NotFitted(format!(
                    "no published model in {} (run the trainer first)",
                    self.root.display()
                )))
            }
            Err(e) => return Err(EngineError::artifact(CURRENT_FILE, e)),
        };
        let version = raw.trim();
        if version.is_empty() || version.contains(['/', '\\']) || version == ".." {
            return Err(EngineError::artifact(
                CURRENT_FILE,
                format!("invalid version name `{version}`"),
            ));
        }
        Ok(version.to_string())
    }

    /// Load and validate the active artifact set.
    pub fn load(&self) -> EngineResult<ArtifactSet> {
        let version = self.current_version()?;
        self.load_version(&version)
    }

    pub fn load_version(&self, version: &str) -> EngineResult<ArtifactSet> {
        let dir = self.root.join(version);
        let scaler: ScalerParams = read_json(&dir, SCALER_FILE, "scaler")?;
        let centroids: ClusterModel = read_json(&dir, CENTROIDS_FILE, "centroids")?;
        let label_mapping: LabelMapping = read_json(&dir, LABEL_MAPPING_FILE, "label_mapping")?;

        let report = match read_json::<TrainingReport>(&dir, REPORT_FILE, "report") {
            Ok(r) => Some(r),
            Err(EngineError::NotFitted(_)) => None,
            Err(e) => {
                warn!(version, error = %e, "ignoring unreadable training report");
                None
            }
        };

        let set = ArtifactSet {
            version: Some(version.to_string()),
            scaler,
            centroids,
            label_mapping,
            report,
        };
        set.validate()?;
        info!(version, dir = %dir.display(), "artifact set loaded");
        Ok(set)
    }

    /// Write `set` as a new version and make it active. All-or-nothing.
    ///
    /// Requires the trainer lock of this store, taken with [`ArtifactStore::lock`].
    pub fn publish(&self, set: &ArtifactSet, lock: &TrainLock) -> anyhow::Result<String> {
        if lock.path != self.root.join(LOCK_FILE) {
            return Err(anyhow!(
                "trainer lock {} does not belong to store {}",
                lock.path.display(),
                self.root.display()
            ));
        }
        set.validate().context("refusing to publish an inconsistent artifact set")?;
        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating artifact root {}", self.root.display()))?;

        let version = format!(
            "v{}-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            std::process::id(),
            PUBLISH_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let dir = self.root.join(&version);
        fs::create_dir(&dir).with_context(|| format!("creating {}", dir.display()))?;

        if let Err(e) = write_version(&dir, set) {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %cleanup, "failed to remove partial version");
            }
            return Err(e);
        }

        let tmp = self.root.join(format!("{CURRENT_FILE}.tmp-{version}"));
        write_synced(&tmp, version.as_bytes())?;
        fs::rename(&tmp, self.root.join(CURRENT_FILE))
            .with_context(|| format!("activating version {version}"))?;
        // directory fsync makes the rename durable; not supported everywhere
        if let Ok(d) = File::open(&self.root) {
            let _ = d.sync_all();
        }

        info!(version, root = %self.root.display(), "artifact set published");
        Ok(version)
    }

    /// Exclusive trainer lock; released when the guard is dropped.
    pub fn lock(&self) -> anyhow::Result<TrainLock> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating artifact root {}", self.root.display()))?;
        let path = self.root.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut f) => {
                let _ = writeln!(f, "{}", std::process::id());
                Ok(TrainLock { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(anyhow!(
                "another training run holds {} (remove it if that run is dead)",
                path.display()
            )),
            Err(e) => Err(e).with_context(|| format!("creating {}", path.display())),
        }
    }
}

#[derive(Debug)]
pub struct TrainLock {
    path: PathBuf,
}

impl Drop for TrainLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release trainer lock");
        }
    }
}

fn write_version(dir: &Path, set: &ArtifactSet) -> anyhow::Result<()> {
    write_json(&dir.join(SCALER_FILE), &set.scaler)?;
    write_json(&dir.join(CENTROIDS_FILE), &set.centroids)?;
    write_json(&dir.join(LABEL_MAPPING_FILE), &set.label_mapping)?;
    if let Some(report) = &set.report {
        write_json(&dir.join(REPORT_FILE), report)?;
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .with_context(|| format!("serializing {}", path.display()))?;
    write_synced(path, &bytes)
}

fn write_synced(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    f.write_all(bytes)
        .with_context(|| format!("writing {}", path.display()))?;
    f.sync_all()
        .with_context(|| format!("syncing {}", path.display()))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str, artifact: &str) -> EngineResult<T> {
    let path = dir.join(file);
    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(EngineError::NotFitted(format!(
                "artifact `{artifact}` missing at {}",
                path.display()
            )))
        }
        Err(e) => return Err(EngineError::artifact(artifact, e)),
    };
    serde_json::from_slice(&bytes).map_err(|e| EngineError::artifact(artifact, e))
}
