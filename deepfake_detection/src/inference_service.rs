use crate::{
    config::PipelineConfig,
    decision::{decide, ClassificationResult, ScoreVector},
    errors::DetectionError,
    frame::Frame,
    model_service::{ModelInfo, ModelService},
    preprocess::preprocess,
    sampler::{sample_frames, VideoSource},
};
use ndarray::{s, Array4};
use std::sync::Arc;

/// Preprocesses `frames`, runs them through the model as one batch and returns one
/// score per frame in input order. An empty slice is rejected.
pub fn predict_batch<M: ModelService + ?Sized>(
    model: &M,
    frames: &[Frame],
    config: &PipelineConfig,
) -> Result<ScoreVector, DetectionError> {
    if frames.is_empty() {
        return Err(DetectionError::EmptyBatch);
    }

    let size = config.input_size as usize;
    let mut batch = Array4::<f32>::zeros((frames.len(), size, size, 3));
    for (i, frame) in frames.iter().enumerate() {
        batch
            .slice_mut(s![i, .., .., ..])
            .assign(&preprocess(frame, config));
    }

    let scores = model.predict(batch.view(), config.batch_size)?;
    if scores.len() != frames.len() {
        return Err(DetectionError::Inference(format!(
            "expected {} scores, model returned {}",
            frames.len(),
            scores.len()
        )));
    }

    if let Some((index, score)) = scores
        .iter()
        .enumerate()
        .find(|(_, score)| !(0.0_f32..=1.0).contains(*score))
    {
        return Err(DetectionError::Inference(format!(
            "score {} for frame {} is outside [0, 1]",
            score, index
        )));
    }

    ScoreVector::new(scores)
}

/// Entry point of the pipeline: media in, verdict out.
pub struct InferenceService<M: ModelService + ?Sized = dyn ModelService> {
    model: Arc<M>,
    config: PipelineConfig,
}

impl<M: ModelService + ?Sized> InferenceService<M> {
    pub fn new(model: Arc<M>, config: PipelineConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model_info(&self) -> ModelInfo {
        self.model.info()
    }

    pub fn classify_frames(
        &self,
        frames: &[Frame],
    ) -> Result<ClassificationResult, DetectionError> {
        let scores = predict_batch(self.model.as_ref(), frames, &self.config)?;
        let result = decide(scores, self.config.threshold);
        tracing::debug!(
            "Classified {} frames as {} (best {:.4})",
            result.predictions.len(),
            result.classification.as_str(),
            result.best_prediction
        );
        Ok(result)
    }

    /// Decodes an encoded image and classifies it.
    pub fn classify_image(&self, data: &[u8]) -> Result<ClassificationResult, DetectionError> {
        let frame = Frame::decode(data)?;
        tracing::debug!("Image shape: {}x{}x3", frame.height(), frame.width());
        self.classify_frames(&[frame])
    }

    pub fn classify_video<V: VideoSource + ?Sized>(
        &self,
        source: &mut V,
    ) -> Result<ClassificationResult, DetectionError> {
        let frames = sample_frames(source, self.config.num_frames)?;
        self.classify_frames(&frames)
    }

    /// Opens the video at `path`, samples it and classifies the sampled frames. The
    /// capture is released before returning.
    #[cfg(feature = "video")]
    pub fn classify_video_file(
        &self,
        path: &std::path::Path,
    ) -> Result<ClassificationResult, DetectionError> {
        let mut video = crate::video::OpenCvVideo::open(path)?;
        self.classify_video(&mut video)
    }
}
