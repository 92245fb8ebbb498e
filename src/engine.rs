//! # Advisory Engine
//! Pure, testable inference path: `RawScores` → `Prediction`.
//! No I/O; the fitted artifacts are loaded once elsewhere and shared read-only.
//!
//! Pipeline: scale → nearest centroid → tier lookup → confidence (distances routed
//! through the mapping) → advisory rules on the raw scores.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::advisory::{self, StatusUi};
use crate::artifacts::{ArtifactSet, ArtifactStore};
use crate::confidence::ConfidenceReport;
use crate::error::EngineResult;
use crate::scores::RawScores;
use crate::tier::TierLabel;

/// Response record for one student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub cluster_id: usize,
    pub tier_label: TierLabel,
    pub status_ui: StatusUi,
    pub confidence: ConfidenceReport,
    pub scores: RawScores,
    pub recommendation: String,
}

/// Immutable engine over one validated artifact set. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AdvisorEngine {
    artifacts: Arc<ArtifactSet>,
}

impl AdvisorEngine {
    /// Validates the set; an inconsistent set never becomes an engine.
    pub fn new(artifacts: ArtifactSet) -> EngineResult<Self> {
        artifacts.validate()?;
        Ok(Self {
            artifacts: Arc::new(artifacts),
        })
    }

    pub fn from_store(store: &ArtifactStore) -> EngineResult<Self> {
        Self::new(store.load()?)
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    pub fn classify(&self, scores: &RawScores) -> EngineResult<Prediction> {
        let a = &*self.artifacts;
        let features = a.scaler.apply(scores)?;
        let assignment = a.centroids.assign(&features)?;
        let tier = a.label_mapping.lookup(assignment.cluster_id)?;
        let confidence = ConfidenceReport::compute(&assignment.distances, &a.label_mapping)?;
        let advice = advisory::evaluate(tier, scores);

        debug!(
            cluster = assignment.cluster_id,
            tier = %tier,
            status = ?advice.status_ui,
            rule = ?advice.rule,
            "student classified"
        );

        Ok(Prediction {
            cluster_id: assignment.cluster_id,
            tier_label: tier,
            status_ui: advice.status_ui,
            confidence,
            scores: *scores,
            recommendation: advice.text,
        })
    }
}
