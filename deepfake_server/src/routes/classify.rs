use crate::{media::MediaKind, server::SharedState};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use deepfake_detection::{ClassificationResult, DetectionError, InferenceService};
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::instrument;

const MEDIA_FIELD: &str = "mediaFile";

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("No file uploaded")]
    NoFile,
    #[error("No file selected")]
    NoFileSelected,
    #[error("{0}")]
    Rejected(String),
    #[error("Empty file")]
    EmptyFile,
    #[cfg(not(feature = "video"))]
    #[error("Video classification is not enabled in this build")]
    VideoUnsupported,
    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[cfg(feature = "video")]
    #[error("Failed to stage upload: {0}")]
    Staging(std::io::Error),
    #[error("Classification worker failed: {0}")]
    Worker(#[from] JoinError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ClassifyError {
    fn status(&self) -> StatusCode {
        match self {
            ClassifyError::NoFile
            | ClassifyError::NoFileSelected
            | ClassifyError::Rejected(_)
            | ClassifyError::EmptyFile => StatusCode::BAD_REQUEST,
            #[cfg(not(feature = "video"))]
            ClassifyError::VideoUnsupported => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ClassifyError::Multipart(e) => e.status(),
            ClassifyError::Detection(e) => match e {
                DetectionError::MediaOpen(_) | DetectionError::EmptyBatch => {
                    StatusCode::BAD_REQUEST
                }
                DetectionError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                DetectionError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            #[cfg(feature = "video")]
            ClassifyError::Staging(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ClassifyError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ClassifyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Error processing file: {}", self);
        } else {
            tracing::warn!("Rejected classification request: {}", self);
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

struct Upload {
    filename: String,
    content_type: String,
    data: Bytes,
}

async fn read_media_field(multipart: &mut Multipart) -> Result<Upload, ClassifyError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(MEDIA_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ClassifyError::NoFileSelected);
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await?;

        return Ok(Upload {
            filename,
            content_type,
            data,
        });
    }

    Err(ClassifyError::NoFile)
}

#[instrument(skip(state, multipart))]
pub async fn classify(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<ClassificationResult>, ClassifyError> {
    state.metrics.record_request("/classify");

    let upload = read_media_field(&mut multipart).await?;
    tracing::debug!(
        "Processing file: {} ({}, {} bytes)",
        upload.filename,
        upload.content_type,
        upload.data.len()
    );

    let kind = MediaKind::classify(&upload.filename, &upload.content_type);
    let media = kind.as_str();
    let inference = state.inference.clone();
    let started = Instant::now();

    let result = match kind {
        MediaKind::Rejected(reason) => return Err(ClassifyError::Rejected(reason)),
        _ if upload.data.is_empty() => return Err(ClassifyError::EmptyFile),
        MediaKind::Image => {
            let data = upload.data;
            tokio::task::spawn_blocking(move || inference.classify_image(&data)).await??
        }
        MediaKind::Video { extension } => {
            classify_video(inference, upload.data, &extension).await?
        }
    };

    state
        .metrics
        .record_inference_duration(started.elapsed().as_millis() as u64, media);
    state.metrics.record_classification(
        result.classification.as_str(),
        media,
        result.predictions.len(),
    );
    tracing::debug!("Classification result: {:?}", result);

    Ok(Json(result))
}

/// Stages the upload in a temp file for OpenCV, which only reads from paths. The file
/// is removed once the blocking task finishes, whatever the outcome.
#[cfg(feature = "video")]
async fn classify_video(
    inference: Arc<InferenceService>,
    data: Bytes,
    extension: &str,
) -> Result<ClassificationResult, ClassifyError> {
    let staged = deepfake_detection::TempFile::unique(extension);
    tokio::fs::write(staged.path(), &data)
        .await
        .map_err(ClassifyError::Staging)?;
    tracing::debug!("Saved upload to {}", staged.path().display());

    let result = tokio::task::spawn_blocking(move || {
        let result = inference.classify_video_file(staged.path());
        drop(staged);
        result
    })
    .await??;

    Ok(result)
}

#[cfg(not(feature = "video"))]
async fn classify_video(
    _inference: Arc<InferenceService>,
    _data: Bytes,
    _extension: &str,
) -> Result<ClassificationResult, ClassifyError> {
    Err(ClassifyError::VideoUnsupported)
}
