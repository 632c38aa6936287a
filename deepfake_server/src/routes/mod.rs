mod classify;
mod health;
mod metrics;
mod model_info;

use crate::server::SharedState;
use axum::{
    routing::{get, post},
    Router,
};

pub use classify::ClassifyError;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(health::healthcheck))
        .route("/health", get(health::healthcheck))
        .route("/test", get(model_info::model_info))
        .route("/classify", post(classify::classify))
        .route("/metrics", get(metrics::metrics_handler))
}
