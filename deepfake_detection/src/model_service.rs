use crate::errors::DetectionError;
use ndarray::ArrayView4;
use serde::Serialize;

/// A loaded binary classifier.
///
/// `batch` is laid out as `[N, height, width, 3]`; implementations return exactly one
/// score per row, in order. `batch_size` only bounds how many rows go through the
/// backend at once and must not change the scores.
pub trait ModelService: Send + Sync + 'static {
    fn predict(&self, batch: ArrayView4<f32>, batch_size: usize)
        -> Result<Vec<f32>, DetectionError>;

    fn info(&self) -> ModelInfo;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelInfo {
    pub backend: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub instances: usize,
}
