use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::engine::{AdvisorEngine, Prediction};
use crate::error::EngineError;
use crate::metrics;
use crate::scaler::ScalerParams;
use crate::scores::RawScores;
use crate::tier::LabelMapping;
use crate::trainer::TrainingReport;

#[derive(Clone)]
pub struct AppState {
    pub engine: AdvisorEngine,
    pub cors_permissive: bool,
}

impl AppState {
    pub fn new(engine: AdvisorEngine) -> Self {
        Self {
            engine,
            cors_permissive: true,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = state.cors_permissive;
    let router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/predict", post(predict))
        .route("/model", get(model_info))
        .with_state(state);

    if cors {
        router.layer(CorsLayer::very_permissive())
    } else {
        router
    }
}

/// Engine errors at the HTTP boundary: validation → 400 with its message,
/// anything else → logged in full, 500 with a generic message.
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        metrics::record_rejection(&self.0);
        let (status, message) = if self.0.is_client_error() {
            warn!(error = %self.0, "request rejected");
            (StatusCode::BAD_REQUEST, self.0.to_string())
        } else {
            error!(error = %self.0, kind = self.0.kind(), "classification failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
        };
        (status, Json(json!({ "status": "error", "message": message }))).into_response()
    }
}

#[derive(Serialize)]
struct PredictResp {
    status: &'static str,
    #[serde(flatten)]
    prediction: Prediction,
}

async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResp>, ApiError> {
    let Json(body) = body.map_err(|e| EngineError::Validation(e.body_text()))?;
    let scores = RawScores::from_json(&body)?;
    let prediction = state.engine.classify(&scores)?;
    metrics::record_prediction(prediction.tier_label);
    Ok(Json(PredictResp {
        status: "success",
        prediction,
    }))
}

#[derive(Serialize)]
struct ModelInfo {
    version: Option<String>,
    scaler: ScalerParams,
    label_mapping: LabelMapping,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<TrainingReport>,
}

async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    let a = state.engine.artifacts();
    Json(ModelInfo {
        version: a.version.clone(),
        scaler: a.scaler.clone(),
        label_mapping: a.label_mapping.clone(),
        report: a.report.clone(),
    })
}
