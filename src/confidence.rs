//! Distance-derived closeness score per tier.
//!
//! `confidence[tier] = round2((1 - d[cluster_of(tier)] / Σd) * 100)`.
//! Not a probability: the three values sum to 200, not 100. The distance for a
//! tier is always found through the label mapping, never by array position.

use serde::{Deserialize, Serialize};

use crate::cluster::N_CLUSTERS;
use crate::error::{EngineError, EngineResult};
use crate::tier::{LabelMapping, TierLabel};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Moderate")]
    pub moderate: f64,
    #[serde(rename = "High")]
    pub high: f64,
}

impl ConfidenceReport {
    pub fn get(&self, tier: TierLabel) -> f64 {
        match tier {
            TierLabel::Low => self.low,
            TierLabel::Moderate => self.moderate,
            TierLabel::High => self.high,
        }
    }

    fn set(&mut self, tier: TierLabel, v: f64) {
        match tier {
            TierLabel::Low => self.low = v,
            TierLabel::Moderate => self.moderate = v,
            TierLabel::High => self.high = v,
        }
    }

    /// `distances` is indexed by cluster id. Each cluster's tier comes from the
    /// mapping; a cluster missing from it, or a tier claimed twice, is `UnknownCluster`.
    pub fn compute(distances: &[f64], mapping: &LabelMapping) -> EngineResult<Self> {
        let total: f64 = distances.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return Err(EngineError::DegenerateDistance { total });
        }

        let mut slots: [Option<f64>; N_CLUSTERS] = [None; N_CLUSTERS];
        for (cluster, &d) in distances.iter().enumerate() {
            let slot = &mut slots[mapping.lookup(cluster)?.index()];
            if slot.is_some() {
                return Err(EngineError::UnknownCluster(cluster));
            }
            *slot = Some(round2((1.0 - d / total) * 100.0));
        }

        let mut report = ConfidenceReport {
            low: 0.0,
            moderate: 0.0,
            high: 0.0,
        };
        for tier in TierLabel::ALL {
            let v = slots[tier.index()].ok_or_else(|| {
                EngineError::UnknownCluster(mapping.cluster_for(tier).unwrap_or(distances.len()))
            })?;
            report.set(tier, v);
        }
        Ok(report)
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> LabelMapping {
        LabelMapping::from_pairs([
            (0, TierLabel::Low),
            (1, TierLabel::Moderate),
            (2, TierLabel::High),
        ])
    }

    #[test]
    fn basic_formula() {
        let r = ConfidenceReport::compute(&[1.0, 2.0, 3.0], &identity()).unwrap();
        assert!((r.low - 83.33).abs() < 1e-9);
        assert!((r.moderate - 66.67).abs() < 1e-9);
        assert!((r.high - 50.0).abs() < 1e-9);
    }

    #[test]
    fn distances_are_routed_through_the_mapping() {
        // cluster 2 is Low, cluster 0 is High: position 0 must NOT be read as Low
        let m = LabelMapping::from_pairs([
            (0, TierLabel::High),
            (1, TierLabel::Moderate),
            (2, TierLabel::Low),
        ]);
        let r = ConfidenceReport::compute(&[0.5, 2.0, 3.5], &m).unwrap();
        assert!(r.high > r.moderate && r.moderate > r.low);
        assert!((r.high - 91.67).abs() < 1e-9);
        assert!((r.low - 41.67).abs() < 1e-9);
    }

    #[test]
    fn values_stay_in_range_and_nearest_wins() {
        let m = identity();
        for d in [[0.0, 1.0, 2.0], [5.0, 0.1, 5.0], [3.0, 3.0, 0.2], [1e-9, 1e9, 1.0]] {
            let r = ConfidenceReport::compute(&d, &m).unwrap();
            let vals = [r.low, r.moderate, r.high];
            assert!(vals.iter().all(|v| (0.0..=100.0).contains(v)));
            let nearest = d
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
            assert!(vals.iter().all(|v| *v <= vals[nearest]));
        }
    }

    #[test]
    fn zero_total_is_degenerate() {
        let err = ConfidenceReport::compute(&[0.0, 0.0, 0.0], &identity()).unwrap_err();
        assert!(matches!(err, EngineError::DegenerateDistance { .. }));
    }

    #[test]
    fn mapping_gaps_are_unknown_clusters() {
        let partial = LabelMapping::from_pairs([(0, TierLabel::Low), (1, TierLabel::Moderate)]);
        assert_eq!(
            ConfidenceReport::compute(&[1.0, 2.0, 3.0], &partial),
            Err(EngineError::UnknownCluster(2))
        );

        let doubled = LabelMapping::from_pairs([
            (0, TierLabel::Low),
            (1, TierLabel::Low),
            (2, TierLabel::High),
        ]);
        assert_eq!(
            ConfidenceReport::compute(&[1.0, 2.0, 3.0], &doubled),
            Err(EngineError::UnknownCluster(1))
        );
    }

    #[test]
    fn serializes_with_tier_keys() {
        let r = ConfidenceReport::compute(&[1.0, 1.0, 2.0], &identity()).unwrap();
        let v = serde_json::to_value(r).unwrap();
        assert_eq!(v["Low"], 75.0);
        assert_eq!(v["High"], 50.0);
    }
}
