// src/lib.rs
// Public library surface for the server, the trainer binary, and integration tests.

pub mod error;
pub mod scores;

// Inference pipeline, leaf-first
pub mod scaler;
pub mod cluster;
pub mod tier;
pub mod confidence;
pub mod advisory;
pub mod engine;

// Offline fitting and the artifact store it publishes to
pub mod artifacts;
pub mod dataset;
pub mod trainer;

// Service plumbing
pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::artifacts::{ArtifactSet, ArtifactStore};
pub use crate::engine::{AdvisorEngine, Prediction};
pub use crate::error::{EngineError, EngineResult};
pub use crate::scores::RawScores;
pub use crate::tier::TierLabel;
