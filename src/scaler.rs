//! # Scaler
//! Per-feature standardization (zero mean, unit variance) so that Euclidean distance
//! weighs the three score axes equally. Uses the population standard deviation.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::scores::{RawScores, FEATURE_NAMES, N_FEATURES};

/// A point in standardized feature space.
pub type FeatureVector = [f64; N_FEATURES];

/// Standard deviations at or below this are treated as zero.
const MIN_STD: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStat {
    pub feature: String,
    pub mean: f64,
    pub std: f64,
}

/// Fitted scaler parameters, one entry per feature in `FEATURE_NAMES` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub features: [FeatureStat; N_FEATURES],
}

impl ScalerParams {
    /// Fit means and population standard deviations.
    pub fn fit(samples: &[RawScores]) -> EngineResult<Self> {
        if samples.len() < 2 {
            return Err(EngineError::InsufficientData(format!(
                "need at least 2 samples to fit the scaler, got {}",
                samples.len()
            )));
        }
        let n = samples.len() as f64;

        let mut sums = [0.0; N_FEATURES];
        for s in samples {
            for (acc, x) in sums.iter_mut().zip(s.as_array()) {
                *acc += x;
            }
        }
        let means = sums.map(|s| s / n);

        let mut sq = [0.0; N_FEATURES];
        for s in samples {
            for (j, x) in s.as_array().into_iter().enumerate() {
                let d = x - means[j];
                sq[j] += d * d;
            }
        }

        let features = std::array::from_fn(|j| FeatureStat {
            feature: FEATURE_NAMES[j].to_string(),
            mean: means[j],
            std: (sq[j] / n).sqrt(),
        });
        let params = Self { features };

        if let Some(stat) = params.features.iter().find(|f| f.std <= MIN_STD) {
            return Err(EngineError::InsufficientData(format!(
                "feature `{}` has zero variance",
                stat.feature
            )));
        }
        Ok(params)
    }

    /// `(x - mean) / std` per feature.
    pub fn apply(&self, scores: &RawScores) -> EngineResult<FeatureVector> {
        let raw = scores.as_array();
        let mut out = [0.0; N_FEATURES];
        for (j, stat) in self.features.iter().enumerate() {
            if !(stat.std > MIN_STD) {
                return Err(EngineError::DegenerateScale {
                    feature: FEATURE_NAMES[j],
                    std: stat.std,
                });
            }
            out[j] = (raw[j] - stat.mean) / stat.std;
        }
        Ok(out)
    }

    /// Inverse transform (`x * std + mean`).
    pub fn invert(&self, v: &FeatureVector) -> RawScores {
        RawScores::from_array(std::array::from_fn(|j| {
            v[j] * self.features[j].std + self.features[j].mean
        }))
    }

    /// Structural check used when loading the `scaler` artifact.
    pub fn validate(&self) -> EngineResult<()> {
        for (j, stat) in self.features.iter().enumerate() {
            if stat.feature != FEATURE_NAMES[j] {
                return Err(EngineError::artifact(
                    "scaler",
                    format!(
                        "feature #{j} is `{}`, expected `{}`",
                        stat.feature, FEATURE_NAMES[j]
                    ),
                ));
            }
            if !stat.mean.is_finite() || !stat.std.is_finite() || stat.std <= MIN_STD {
                return Err(EngineError::artifact(
                    "scaler",
                    format!("feature `{}` has invalid mean/std", stat.feature),
                ));
            }
        }
        Ok(())
    }
}
