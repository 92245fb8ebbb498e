//! # Trainer
//! Offline batch fit: scaler → k-means (k = 3) → cluster/tier mapping, plus
//! diagnostics (silhouette, elbow curve, per-cluster summary) that serving never reads.
//!
//! Pure with respect to storage: `run` returns an [`ArtifactSet`]; publishing it is the
//! caller's job (see `bin/train.rs`), which keeps this testable without a filesystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifacts::ArtifactSet;
use crate::cluster::{euclidean, ClusterModel, KMeansOptions, N_CLUSTERS};
use crate::error::EngineResult;
use crate::scaler::{FeatureVector, ScalerParams};
use crate::scores::{RawScores, N_FEATURES};
use crate::tier::{LabelMapping, TierLabel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOptions {
    pub kmeans: KMeansOptions,
    /// Largest k evaluated for the elbow curve; 0 disables it.
    pub elbow_max_k: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            kmeans: KMeansOptions::default(),
            elbow_max_k: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElbowPoint {
    pub k: usize,
    pub inertia: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub tier: TierLabel,
    pub size: usize,
    /// Mean raw scores of the members, in feature order.
    pub mean_scores: RawScores,
    pub mean_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub trained_at: DateTime<Utc>,
    pub n_samples: usize,
    pub seed: u64,
    pub n_init: usize,
    pub inertia: f64,
    pub iterations: usize,
    /// `None` when undefined (fewer than two non-empty clusters).
    pub silhouette: Option<f64>,
    #[serde(default)]
    pub elbow: Vec<ElbowPoint>,
    pub clusters: Vec<ClusterSummary>,
}

/// Fit all three artifacts from historical samples.
pub fn run(samples: &[RawScores], opts: &TrainOptions) -> EngineResult<ArtifactSet> {
    info!(n_samples = samples.len(), seed = opts.kmeans.seed, "training started");

    let scaler = ScalerParams::fit(samples)?;
    let vectors = samples
        .iter()
        .map(|s| scaler.apply(s))
        .collect::<EngineResult<Vec<_>>>()?;

    let kmeans = KMeansOptions {
        k: N_CLUSTERS,
        ..opts.kmeans
    };
    let fit = ClusterModel::fit(&vectors, &kmeans)?;
    let mapping = LabelMapping::derive(&fit.labels, samples)?;

    let silhouette = silhouette_score(&vectors, &fit.labels);
    match silhouette {
        Some(s) => info!(silhouette = s, inertia = fit.inertia, "clusters fitted"),
        None => warn!(inertia = fit.inertia, "silhouette undefined for this clustering"),
    }

    let elbow = elbow_curve(&vectors, &kmeans, opts.elbow_max_k);
    for p in &elbow {
        info!(k = p.k, inertia = p.inertia, "elbow");
    }

    let clusters = summarize(&fit.labels, samples, &mapping)?;
    for c in &clusters {
        info!(
            cluster = c.cluster_id,
            tier = %c.tier,
            size = c.size,
            mean_score = c.mean_score,
            "cluster mapped"
        );
    }

    let report = TrainingReport {
        trained_at: Utc::now(),
        n_samples: samples.len(),
        seed: kmeans.seed,
        n_init: kmeans.n_init,
        inertia: fit.inertia,
        iterations: fit.iterations,
        silhouette,
        elbow,
        clusters,
    };

    let mut set = ArtifactSet::new(scaler, fit.model, mapping);
    set.report = Some(report);
    set.validate()?;
    Ok(set)
}

/// Mean silhouette coefficient; singletons contribute 0.
pub fn silhouette_score(vectors: &[FeatureVector], labels: &[usize]) -> Option<f64> {
    let k = labels.iter().copied().max()? + 1;
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }
    if sizes.iter().filter(|&&n| n > 0).count() < 2 || vectors.len() < 2 {
        return None;
    }

    let mut total = 0.0;
    for (i, v) in vectors.iter().enumerate() {
        let own = labels[i];
        if sizes[own] < 2 {
            continue;
        }
        let mut sums = vec![0.0; k];
        for (j, w) in vectors.iter().enumerate() {
            if i != j {
                sums[labels[j]] += euclidean(v, w);
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Some(total / vectors.len() as f64)
}

/// Best inertia for k = 1..=max_k, skipping k values the data cannot support.
pub fn elbow_curve(
    vectors: &[FeatureVector],
    base: &KMeansOptions,
    max_k: usize,
) -> Vec<ElbowPoint> {
    (1..=max_k)
        .filter_map(|k| {
            let opts = KMeansOptions { k, ..*base };
            ClusterModel::fit(vectors, &opts)
                .ok()
                .map(|fit| ElbowPoint {
                    k,
                    inertia: fit.inertia,
                })
        })
        .collect()
}

fn summarize(
    labels: &[usize],
    samples: &[RawScores],
    mapping: &LabelMapping,
) -> EngineResult<Vec<ClusterSummary>> {
    let mut sums = [[0.0; N_FEATURES]; N_CLUSTERS];
    let mut sizes = [0usize; N_CLUSTERS];
    for (&l, s) in labels.iter().zip(samples) {
        for (acc, x) in sums[l].iter_mut().zip(s.as_array()) {
            *acc += x;
        }
        sizes[l] += 1;
    }

    (0..N_CLUSTERS)
        .map(|c| {
            let n = sizes[c].max(1) as f64;
            let mean_scores = RawScores::from_array(sums[c].map(|x| x / n));
            Ok(ClusterSummary {
                cluster_id: c,
                tier: mapping.lookup(c)?,
                size: sizes[c],
                mean_score: mean_scores.mean(),
                mean_scores,
            })
        })
        .collect()
}
