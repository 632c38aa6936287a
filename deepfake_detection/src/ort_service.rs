use crate::{
    errors::DetectionError,
    model_service::{ModelInfo, ModelService},
};
use ndarray::{ArrayView4, Axis};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use parking_lot::Mutex;
use std::{
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

/// ONNX Runtime backed classifier. Requests are spread round-robin over a pool of
/// sessions so concurrent classifications don't queue on a single one.
pub struct OrtModelService {
    sessions: Vec<Mutex<Session>>,
    counter: AtomicUsize,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

impl OrtModelService {
    pub fn from_file(model_path: &Path, num_instances: usize) -> ort::Result<Self> {
        let sessions = (0..num_instances.max(1))
            .map(|_| {
                let builder = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?;
                #[cfg(feature = "tensorrt")]
                let builder = builder.with_execution_providers([
                    ort::execution_providers::TensorRTExecutionProvider::default()
                        .with_engine_cache(true)
                        .build(),
                ])?;
                #[cfg(feature = "cuda")]
                let builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default().build(),
                ])?;
                let session = builder.commit_from_file(model_path)?;
                Ok(Mutex::new(session))
            })
            .collect::<ort::Result<Vec<_>>>()?;

        let (inputs, outputs) = {
            let session = sessions[0].lock();
            (
                session.inputs.iter().map(|i| i.name.clone()).collect(),
                session.outputs.iter().map(|o| o.name.clone()).collect(),
            )
        };

        tracing::info!(
            "Created {} ONNX sessions from {}",
            sessions.len(),
            model_path.display()
        );

        Ok(Self {
            sessions,
            counter: AtomicUsize::new(0),
            inputs,
            outputs,
        })
    }

    fn run_inference(&self, input: ArrayView4<f32>) -> Result<Vec<f32>, DetectionError> {
        let output_name = self
            .outputs
            .first()
            .ok_or_else(|| DetectionError::Inference("model declares no outputs".into()))?;

        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        let mut session = self.sessions[index].lock();
        tracing::debug!("Handling batch of {} with session {}", input.len_of(Axis(0)), index);

        let input = input.as_standard_layout();
        let tensor_ref = TensorRef::from_array_view(&input)
            .map_err(|e| DetectionError::Inference(format!("failed to build tensor: {}", e)))?;

        let outputs = session.run(ort::inputs![tensor_ref])?;
        let scores = outputs[output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(format!("failed to extract tensor: {}", e)))?
            .iter()
            .copied()
            .collect();

        Ok(scores)
    }
}

impl ModelService for OrtModelService {
    fn predict(
        &self,
        batch: ArrayView4<f32>,
        batch_size: usize,
    ) -> Result<Vec<f32>, DetectionError> {
        let mut scores = Vec::with_capacity(batch.len_of(Axis(0)));
        for chunk in batch.axis_chunks_iter(Axis(0), batch_size.max(1)) {
            let rows = chunk.len_of(Axis(0));
            let chunk_scores = self.run_inference(chunk)?;
            if chunk_scores.len() != rows {
                return Err(DetectionError::Inference(format!(
                    "model returned {} scores for {} frames",
                    chunk_scores.len(),
                    rows
                )));
            }
            scores.extend(chunk_scores);
        }
        Ok(scores)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            backend: "onnxruntime".into(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            instances: self.sessions.len(),
        }
    }
}
