//! Student Potential Advisor: binary entrypoint
//! Loads the trained artifact set once, then boots the Axum HTTP server.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::{error, info};

use student_potential_advisor::config::AdvisorConfig;
use student_potential_advisor::metrics::Metrics;
use student_potential_advisor::{create_router, logging, AdvisorEngine, AppState, ArtifactStore};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let cfg = AdvisorConfig::load().context("loading advisor config")?;

    let store = ArtifactStore::new(&cfg.artifacts.dir);
    let engine = match AdvisorEngine::from_store(&store) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, dir = %store.root().display(), "cannot load model artifacts");
            return Err(anyhow::Error::new(e)
                .context("model artifacts unavailable; refusing to serve")
                .into());
        }
    };
    info!(
        version = engine.artifacts().version.as_deref().unwrap_or("-"),
        "model ready"
    );

    let state = AppState {
        engine,
        cors_permissive: cfg.server.cors_permissive,
    };
    let mut router = create_router(state);

    if cfg.server.metrics {
        let metrics = Metrics::init()?;
        router = router.merge(metrics.router());
    }

    Ok(router.into())
}
