//! # Cluster model
//! Nearest-centroid assignment plus a seeded k-means (Lloyd) fit with k-means++
//! initialization and best-inertia restarts.
//!
//! Reproducibility: restart `r` draws from `StdRng::seed_from_u64(seed + r)`, so the same
//! data, options, and seed always produce the same centroids in the same order.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::scaler::FeatureVector;

/// Number of tiers, and therefore clusters, served at inference.
pub const N_CLUSTERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansOptions {
    pub k: usize,
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence threshold on the largest centroid shift between iterations.
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self {
            k: N_CLUSTERS,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// Nearest centroid plus the distance to every centroid, indexed by cluster id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    pub cluster_id: usize,
    pub distances: Vec<f64>,
}

/// Centroids in standardized space; the position in `centroids` is the cluster id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    pub centroids: Vec<FeatureVector>,
}

/// Output of [`ClusterModel::fit`].
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub model: ClusterModel,
    /// Cluster id per input vector.
    pub labels: Vec<usize>,
    /// Sum of squared distances of vectors to their assigned centroid.
    pub inertia: f64,
    pub iterations: usize,
}

pub fn euclidean(a: &FeatureVector, b: &FeatureVector) -> f64 {
    squared(a, b).sqrt()
}

fn squared(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the nearest centroid; ties go to the lowest id.
fn nearest(v: &FeatureVector, centroids: &[FeatureVector]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.iter().enumerate() {
        let d = squared(v, c);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

impl ClusterModel {
    pub fn new(centroids: Vec<FeatureVector>) -> Self {
        Self { centroids }
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Distances to every centroid and the id of the nearest one.
    pub fn assign(&self, v: &FeatureVector) -> EngineResult<ClusterAssignment> {
        if self.centroids.is_empty() {
            return Err(EngineError::NotFitted("no centroids loaded".into()));
        }
        let distances: Vec<f64> = self.centroids.iter().map(|c| euclidean(v, c)).collect();
        let mut cluster_id = 0;
        for (i, d) in distances.iter().enumerate().skip(1) {
            if *d < distances[cluster_id] {
                cluster_id = i;
            }
        }
        Ok(ClusterAssignment {
            cluster_id,
            distances,
        })
    }

    /// Structural check used when loading the `centroids` artifact.
    pub fn validate(&self) -> EngineResult<()> {
        if self.centroids.is_empty() {
            return Err(EngineError::NotFitted("centroid set is empty".into()));
        }
        if self.centroids.len() != N_CLUSTERS {
            return Err(EngineError::artifact(
                "centroids",
                format!("expected {N_CLUSTERS} centroids, found {}", self.centroids.len()),
            ));
        }
        if self.centroids.iter().flatten().any(|x| !x.is_finite()) {
            return Err(EngineError::artifact("centroids", "non-finite coordinate"));
        }
        Ok(())
    }

    /// Fit `opts.k` centroids with `opts.n_init` seeded restarts, keeping the lowest inertia.
    pub fn fit(vectors: &[FeatureVector], opts: &KMeansOptions) -> EngineResult<KMeansFit> {
        if opts.k == 0 {
            return Err(EngineError::InsufficientData("k must be positive".into()));
        }
        let distinct = count_distinct(vectors);
        if distinct < opts.k {
            return Err(EngineError::InsufficientData(format!(
                "need at least {} distinct samples for k={}, got {}",
                opts.k, opts.k, distinct
            )));
        }

        let mut best: Option<KMeansFit> = None;
        for restart in 0..opts.n_init.max(1) {
            let mut rng = StdRng::seed_from_u64(opts.seed.wrapping_add(restart as u64));
            let init = kmeans_plus_plus(vectors, opts.k, &mut rng);
            let run = lloyd(vectors, init, opts);
            debug!(
                restart,
                inertia = run.inertia,
                iterations = run.iterations,
                "k-means restart finished"
            );
            // strict `<` keeps the earliest restart on ties
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        best.ok_or_else(|| EngineError::InsufficientData("no k-means run completed".into()))
    }
}

fn count_distinct(vectors: &[FeatureVector]) -> usize {
    let mut keys: Vec<[u64; 3]> = vectors
        .iter()
        .map(|v| [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()])
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
}

/// k-means++ seeding: first centre uniform, the rest proportional to squared distance.
fn kmeans_plus_plus(vectors: &[FeatureVector], k: usize, rng: &mut StdRng) -> Vec<FeatureVector> {
    let n = vectors.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(vectors[rng.random_range(0..n)]);

    let mut d2: Vec<f64> = vectors.iter().map(|v| squared(v, &centroids[0])).collect();
    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let idx = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = n - 1;
            for (i, d) in d2.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            rng.random_range(0..n)
        };
        let c = vectors[idx];
        for (v, d) in vectors.iter().zip(d2.iter_mut()) {
            *d = d.min(squared(v, &c));
        }
        centroids.push(c);
    }
    centroids
}

fn lloyd(
    vectors: &[FeatureVector],
    mut centroids: Vec<FeatureVector>,
    opts: &KMeansOptions,
) -> KMeansFit {
    let k = centroids.len();
    let mut labels = vec![usize::MAX; vectors.len()];
    let mut iterations = 0;

    while iterations < opts.max_iter.max(1) {
        iterations += 1;

        let mut changed = false;
        for (v, label) in vectors.iter().zip(labels.iter_mut()) {
            let (c, _) = nearest(v, &centroids);
            if c != *label {
                *label = c;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![[0.0; 3]; k];
        let mut counts = vec![0usize; k];
        for (v, &l) in vectors.iter().zip(&labels) {
            for j in 0..3 {
                sums[l][j] += v[j];
            }
            counts[l] += 1;
        }

        let mut shift = 0.0f64;
        for c in 0..k {
            let next = if counts[c] > 0 {
                sums[c].map(|s| s / counts[c] as f64)
            } else {
                // Empty cluster: take over the point worst served by its centroid.
                // Relabeling it keeps a second empty cluster from picking it again.
                let i = farthest_point(vectors, &labels, &centroids);
                labels[i] = c;
                vectors[i]
            };
            shift = shift.max(squared(&centroids[c], &next));
            centroids[c] = next;
        }
        if shift <= opts.tolerance * opts.tolerance {
            break;
        }
    }

    // labels must describe the returned centroids, not the previous ones
    for (v, label) in vectors.iter().zip(labels.iter_mut()) {
        *label = nearest(v, &centroids).0;
    }

    let inertia = vectors
        .iter()
        .zip(&labels)
        .map(|(v, &l)| squared(v, &centroids[l]))
        .sum();

    KMeansFit {
        model: ClusterModel::new(centroids),
        labels,
        inertia,
        iterations,
    }
}

fn farthest_point(
    vectors: &[FeatureVector],
    labels: &[usize],
    centroids: &[FeatureVector],
) -> usize {
    let mut best = (0, -1.0);
    for (i, (v, &l)) in vectors.iter().zip(labels).enumerate() {
        let d = squared(v, &centroids[l]);
        if d > best.1 {
            best = (i, d);
        }
    }
    best.0
}
