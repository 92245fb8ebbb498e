//! Raw per-student scores and request validation.
//!
//! Feature order is fixed and significant: task average, midterm, final.
//! Scaler parameters and centroids are stored in this order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// Number of features every vector in the engine carries.
pub const N_FEATURES: usize = 3;

/// Canonical feature names, in storage order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = ["task_average", "midterm", "final"];

/// Largest accepted magnitude for a request score. Scores slightly outside 0..=100
/// still classify; values this far out would overflow the squared distances.
pub const MAX_ABS_SCORE: f64 = 1e6;

/// Accepted request / dataset spellings per feature. The second and later names are
/// the column names of the historical student dataset.
pub(crate) const FEATURE_ALIASES: [&[&str]; N_FEATURES] = [
    &["task_average", "rata_tugas"],
    &["midterm", "nilai_uts", "uts"],
    &["final", "nilai_uas", "uas"],
];

/// Assignment average, midterm, and final exam scores (nominally 0..=100).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawScores {
    #[serde(alias = "rata_tugas")]
    pub task_average: f64,
    #[serde(alias = "nilai_uts")]
    pub midterm: f64,
    #[serde(rename = "final", alias = "nilai_uas")]
    pub final_exam: f64,
}

impl RawScores {
    pub fn new(task_average: f64, midterm: f64, final_exam: f64) -> Self {
        Self {
            task_average,
            midterm,
            final_exam,
        }
    }

    pub fn from_array(v: [f64; N_FEATURES]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn as_array(&self) -> [f64; N_FEATURES] {
        [self.task_average, self.midterm, self.final_exam]
    }

    /// Mean of the three raw features; used to order clusters into tiers.
    pub fn mean(&self) -> f64 {
        self.as_array().iter().sum::<f64>() / N_FEATURES as f64
    }

    /// Validate an untrusted JSON body into scores.
    ///
    /// Every feature is required and must be a finite JSON number no larger than
    /// [`MAX_ABS_SCORE`] in magnitude. Numeric strings are rejected rather than coerced.
    pub fn from_json(body: &Value) -> EngineResult<Self> {
        let obj = body
            .as_object()
            .ok_or_else(|| EngineError::Validation("request body must be a JSON object".into()))?;

        let mut out = [0.0; N_FEATURES];
        for (i, aliases) in FEATURE_ALIASES.iter().enumerate() {
            let canonical = FEATURE_NAMES[i];
            let raw = aliases
                .iter()
                .find_map(|k| obj.get(*k))
                .ok_or_else(|| EngineError::Validation(format!("missing field `{canonical}`")))?;
            let x = raw.as_f64().ok_or_else(|| {
                EngineError::Validation(format!("field `{canonical}` must be a number"))
            })?;
            if !x.is_finite() {
                return Err(EngineError::Validation(format!(
                    "field `{canonical}` must be finite"
                )));
            }
            if x.abs() > MAX_ABS_SCORE {
                return Err(EngineError::Validation(format!(
                    "field `{canonical}` is out of range (|x| <= {MAX_ABS_SCORE})"
                )));
            }
            out[i] = x;
        }
        Ok(Self::from_array(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_canonical_and_dataset_names() {
        let a = RawScores::from_json(&json!({"task_average": 85, "midterm": 90, "final": 88}))
            .unwrap();
        let b = RawScores::from_json(&json!({"rata_tugas": 85, "nilai_uts": 90, "nilai_uas": 88}))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_array(), [85.0, 90.0, 88.0]);
    }

    #[test]
    fn missing_final_is_rejected() {
        let err = RawScores::from_json(&json!({"task_average": 85, "midterm": 90})).unwrap_err();
        assert_eq!(err, EngineError::Validation("missing field `final`".into()));
    }

    #[test]
    fn non_numeric_and_null_are_rejected() {
        let e1 = RawScores::from_json(&json!({"task_average": "85", "midterm": 90, "final": 88}))
            .unwrap_err();
        assert!(e1.is_client_error());
        assert!(e1.to_string().contains("task_average"));

        let e2 = RawScores::from_json(&json!({"task_average": 85, "midterm": null, "final": 88}))
            .unwrap_err();
        assert!(e2.to_string().contains("midterm"));
    }

    #[test]
    fn huge_magnitudes_are_rejected_but_mild_overshoot_is_not() {
        let err = RawScores::from_json(&json!({"task_average": 1e200, "midterm": 90, "final": 88}))
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("task_average"));

        let neg = RawScores::from_json(&json!({"task_average": 80, "midterm": -2e6, "final": 88}));
        assert!(matches!(neg, Err(EngineError::Validation(_))));

        let ok = RawScores::from_json(&json!({"task_average": 101.5, "midterm": -1, "final": 88}));
        assert_eq!(ok.unwrap(), RawScores::new(101.5, -1.0, 88.0));
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(RawScores::from_json(&json!([85, 90, 88])).is_err());
    }

    #[test]
    fn mean_of_three() {
        let s = RawScores::new(60.0, 70.0, 80.0);
        assert!((s.mean() - 70.0).abs() < 1e-12);
    }

    #[test]
    fn serializes_final_under_its_wire_name() {
        let v = serde_json::to_value(RawScores::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(v, json!({"task_average": 1.0, "midterm": 2.0, "final": 3.0}));
    }
}
