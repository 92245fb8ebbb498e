//! Tier labels and the fit-time cluster → tier mapping.
//!
//! k-means cluster ids are arbitrary, so the mapping is derived once from the
//! training set (clusters ordered by the mean of their members' raw scores) and
//! persisted. It is never recomputed at inference.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cluster::N_CLUSTERS;
use crate::error::{EngineError, EngineResult};
use crate::scores::RawScores;

/// Ordered potential tier. `Low < Moderate < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TierLabel {
    #[serde(alias = "Potensi Kurang")]
    Low,
    #[serde(alias = "Potensi Cukup")]
    Moderate,
    #[serde(alias = "Potensi Tinggi")]
    High,
}

impl TierLabel {
    /// All tiers, ascending.
    pub const ALL: [TierLabel; N_CLUSTERS] = [TierLabel::Low, TierLabel::Moderate, TierLabel::High];

    /// Position in [`TierLabel::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TierLabel::Low => "Low",
            TierLabel::Moderate => "Moderate",
            TierLabel::High => "High",
        }
    }
}

impl fmt::Display for TierLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cluster id → tier. Serialized as a JSON object keyed by cluster id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMapping(BTreeMap<usize, TierLabel>);

impl LabelMapping {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, TierLabel)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Order clusters by the mean of their members' per-sample raw mean and assign
    /// Low/Moderate/High ascending. `labels[i]` is the cluster of `samples[i]`.
    pub fn derive(labels: &[usize], samples: &[RawScores]) -> EngineResult<Self> {
        if labels.len() != samples.len() {
            return Err(EngineError::InsufficientData(format!(
                "{} cluster labels for {} samples",
                labels.len(),
                samples.len()
            )));
        }

        let mut sums = [0.0f64; N_CLUSTERS];
        let mut counts = [0usize; N_CLUSTERS];
        for (&l, s) in labels.iter().zip(samples) {
            if l >= N_CLUSTERS {
                return Err(EngineError::UnknownCluster(l));
            }
            sums[l] += s.mean();
            counts[l] += 1;
        }
        if let Some(empty) = counts.iter().position(|&c| c == 0) {
            return Err(EngineError::InsufficientData(format!(
                "cluster {empty} has no members"
            )));
        }

        let mut order: Vec<(usize, f64)> = (0..N_CLUSTERS)
            .map(|c| (c, sums[c] / counts[c] as f64))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        Ok(Self::from_pairs(
            order.into_iter().map(|(c, _)| c).zip(TierLabel::ALL),
        ))
    }

    pub fn lookup(&self, cluster_id: usize) -> EngineResult<TierLabel> {
        self.0
            .get(&cluster_id)
            .copied()
            .ok_or(EngineError::UnknownCluster(cluster_id))
    }

    /// Inverse lookup: the cluster id carrying `tier`.
    pub fn cluster_for(&self, tier: TierLabel) -> EngineResult<usize> {
        self.0
            .iter()
            .find_map(|(&c, &t)| (t == tier).then_some(c))
            .ok_or_else(|| {
                EngineError::artifact("label_mapping", format!("no cluster is mapped to {tier}"))
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, TierLabel)> + '_ {
        self.0.iter().map(|(&c, &t)| (c, t))
    }

    /// Must be a bijection between cluster ids `0..3` and the three tiers.
    pub fn validate(&self) -> EngineResult<()> {
        if self.0.len() != N_CLUSTERS {
            return Err(EngineError::artifact(
                "label_mapping",
                format!("expected {N_CLUSTERS} entries, found {}", self.0.len()),
            ));
        }
        if let Some(&c) = self.0.keys().find(|&&c| c >= N_CLUSTERS) {
            return Err(EngineError::artifact(
                "label_mapping",
                format!("cluster id {c} out of range"),
            ));
        }
        for tier in TierLabel::ALL {
            self.cluster_for(tier)?;
        }
        Ok(())
    }
}
