use crate::config::Config;
use crate::server::{HttpServer, SharedState};
use crate::telemetry::Metrics;

use deepfake_detection::{InferenceService, ModelProvider, ModelService, OrtModelLoader};
use std::sync::Arc;
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> anyhow::Result<()> {
    let provider = ModelProvider::new(OrtModelLoader::new(config.model.clone())?);

    let model = match provider.get_model().await {
        Ok(model) => model,
        Err(e) => {
            tracing::error!("Failed to initialize model: {:?}", e);
            return Err(e.into());
        }
    };
    let model: Arc<dyn ModelService> = model;
    tracing::info!("Model ready: {:?}", model.info());

    let state = SharedState {
        inference: Arc::new(InferenceService::new(model, config.pipeline.clone())),
        metrics: Arc::new(Metrics::new()?),
    };

    let server = HttpServer::new(state, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_handle = server.run(shutdown_tx.subscribe()).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    server_handle.await??;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
