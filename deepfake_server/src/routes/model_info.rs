use crate::server::SharedState;
use axum::{extract::State, response::IntoResponse, response::Json};
use deepfake_detection::ModelInfo;
use serde::Serialize;

#[derive(Serialize)]
pub struct ModelStatus {
    status: &'static str,
    message: &'static str,
    model_info: ModelInfo,
}

/// The model is loaded before the server binds, so this always reports it as ready.
pub async fn model_info(State(state): State<SharedState>) -> impl IntoResponse {
    state.metrics.record_request("/test");
    Json(ModelStatus {
        status: "ok",
        message: "Model loaded successfully",
        model_info: state.inference.model_info(),
    })
}
