//! Error taxonomy shared by the scoring engine, the trainer, and the artifact store.
//!
//! Only `Validation` is caller-facing; everything else is an internal fault and is
//! reported to clients with a generic message (see `api.rs`).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed, missing, or non-numeric request field.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A required artifact does not exist (yet).
    #[error("model not fitted: {0}")]
    NotFitted(String),

    /// An artifact exists but cannot be read or is internally inconsistent.
    #[error("failed to load artifact `{artifact}`: {reason}")]
    ArtifactLoad { artifact: String, reason: String },

    #[error("degenerate scale for feature `{feature}` (std = {std})")]
    DegenerateScale { feature: &'static str, std: f64 },

    #[error("degenerate distances: total distance to all centroids is {total}")]
    DegenerateDistance { total: f64 },

    #[error("cluster {0} has no tier in the label mapping")]
    UnknownCluster(usize),

    #[error("insufficient training data: {0}")]
    InsufficientData(String),
}

impl EngineError {
    pub fn artifact(artifact: impl Into<String>, reason: impl ToString) -> Self {
        Self::ArtifactLoad {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }

    /// 4xx-equivalent errors; all others are server faults.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFitted(_) => "not_fitted",
            Self::ArtifactLoad { .. } => "artifact_load",
            Self::DegenerateScale { .. } => "degenerate_scale",
            Self::DegenerateDistance { .. } => "degenerate_distance",
            Self::UnknownCluster(_) => "unknown_cluster",
            Self::InsufficientData(_) => "insufficient_data",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_validation_is_caller_facing() {
        assert!(EngineError::Validation("x".into()).is_client_error());
        assert!(!EngineError::UnknownCluster(7).is_client_error());
        assert!(!EngineError::DegenerateDistance { total: 0.0 }.is_client_error());
        assert!(!EngineError::artifact("centroids", "missing").is_client_error());
    }

    #[test]
    fn messages_name_the_artifact() {
        let e = EngineError::artifact("centroids", "file not found");
        assert_eq!(
            e.to_string(),
            "failed to load artifact `centroids`: file not found"
        );
        assert_eq!(e.kind(), "artifact_load");
    }
}
