use crate::{
    config::ModelConfig, errors::DetectionError, model_service::ModelService,
    ort_service::OrtModelService, temp_file::TempFile,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tokio::{io::AsyncWriteExt, sync::OnceCell};

const DOWNLOAD_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})";

/// Shared, read-only reference to the loaded classifier.
pub type ModelHandle<M> = Arc<M>;

/// Produces a classifier. Called at most once per [`ModelProvider`].
pub trait ModelLoader: Send + Sync + 'static {
    type Model: ModelService;

    fn load(&self) -> impl Future<Output = Result<Self::Model, DetectionError>> + Send;
}

/// Memoizes the classifier for the lifetime of the process. Concurrent first callers
/// wait on the same load instead of starting their own.
pub struct ModelProvider<L: ModelLoader> {
    loader: L,
    handle: OnceCell<ModelHandle<L::Model>>,
}

impl<L: ModelLoader> ModelProvider<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            handle: OnceCell::new(),
        }
    }

    pub async fn get_model(&self) -> Result<ModelHandle<L::Model>, DetectionError> {
        self.handle
            .get_or_try_init(|| async { self.loader.load().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// The classifier, if it has already been loaded.
    pub fn loaded(&self) -> Option<ModelHandle<L::Model>> {
        self.handle.get().cloned()
    }
}

#[derive(Error, Debug)]
enum FetchError {
    #[error("no remote model url configured")]
    NoRemote,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to load downloaded model: {0}")]
    Load(#[from] ort::Error),
    #[error("model loading task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Downloads the ONNX artifact from the object store, falling back to the copy shipped
/// in `model_dir` when the remote path fails for any reason.
pub struct OrtModelLoader {
    config: ModelConfig,
    client: reqwest::Client,
}

impl OrtModelLoader {
    pub fn new(config: ModelConfig) -> Result<Self, DetectionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()
            .map_err(|e| DetectionError::ModelUnavailable(format!("http client: {}", e)))?;
        Ok(Self { config, client })
    }

    async fn fetch_remote(&self) -> Result<OrtModelService, FetchError> {
        let url = self.config.remote_url.as_deref().ok_or(FetchError::NoRemote)?;
        tracing::info!("Downloading model from {}", url);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let progress = match response.content_length() {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::default_bar().template(DOWNLOAD_TEMPLATE) {
            progress.set_style(style.progress_chars("#>-"));
        }

        if let Some(parent) = self.config.get_temp_path().parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let artifact = TempFile::new(self.config.get_temp_path());
        let mut file = tokio::fs::File::create(artifact.path()).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            progress.inc(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);
        progress.finish_and_clear();

        tracing::info!("Loading downloaded model");
        let num_instances = self.config.num_instances;
        let model = tokio::task::spawn_blocking(move || {
            let model = OrtModelService::from_file(artifact.path(), num_instances);
            drop(artifact);
            model
        })
        .await??;
        Ok(model)
    }

    async fn load_local(&self, path: PathBuf) -> Result<OrtModelService, DetectionError> {
        let num_instances = self.config.num_instances;
        tokio::task::spawn_blocking(move || load_local_file(&path, num_instances))
            .await
            .map_err(|e| DetectionError::ModelUnavailable(format!("local load task: {}", e)))?
    }
}

fn load_local_file(path: &Path, num_instances: usize) -> Result<OrtModelService, DetectionError> {
    if !path.exists() {
        return Err(DetectionError::ModelUnavailable(format!(
            "local model not found at {}",
            path.display()
        )));
    }
    tracing::info!("Loading local model from {}", path.display());
    OrtModelService::from_file(path, num_instances).map_err(|e| {
        DetectionError::ModelUnavailable(format!(
            "failed to load local model {}: {}",
            path.display(),
            e
        ))
    })
}

impl ModelLoader for OrtModelLoader {
    type Model = OrtModelService;

    async fn load(&self) -> Result<OrtModelService, DetectionError> {
        let remote_error = match self.fetch_remote().await {
            Ok(model) => {
                tracing::info!("Model loaded successfully from remote store");
                return Ok(model);
            }
            Err(e) => e,
        };
        tracing::warn!("Error loading model from remote store: {}", remote_error);

        self.load_local(self.config.get_local_path())
            .await
            .map_err(|local_error| {
                tracing::error!("Failed to load model: {}", local_error);
                DetectionError::ModelUnavailable(format!(
                    "remote: {}; local: {}",
                    remote_error, local_error
                ))
            })
    }
}
