use thiserror::Error;

/// Failures surfaced by the classification pipeline.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// Neither the remote artifact nor the local copy produced a usable model.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    /// The uploaded image or video could not be opened or decoded.
    #[error("Unable to open media: {0}")]
    MediaOpen(String),
    #[error("Prediction requires at least one frame")]
    EmptyBatch,
    #[error("Inference failed: {0}")]
    Inference(String),
}

impl From<ort::Error> for DetectionError {
    fn from(err: ort::Error) -> Self {
        DetectionError::Inference(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DetectionError {
    fn from(err: ndarray::ShapeError) -> Self {
        DetectionError::Inference(format!("invalid tensor shape: {}", err))
    }
}

/// A single frame index could not be decoded. The sampler skips it.
#[derive(Error, Debug)]
#[error("Failed to read frame {index}: {reason}")]
pub struct FrameReadError {
    pub index: usize,
    pub reason: String,
}

impl FrameReadError {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}
