use anyhow::Context;
use axum::{routing::get, Router};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::EngineError;
use crate::tier::TierLabel;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

// Without an installed recorder these are no-ops (tests, metrics disabled).

pub fn record_prediction(tier: TierLabel) {
    counter!("advisor_predictions_total", "tier" => tier.as_str()).increment(1);
}

pub fn record_rejection(err: &EngineError) {
    let class = if err.is_client_error() {
        "validation"
    } else {
        "internal"
    };
    counter!("advisor_rejections_total", "kind" => class, "error" => err.kind()).increment(1);
}
