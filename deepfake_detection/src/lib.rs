mod decision;
mod errors;
mod frame;
mod inference_service;
mod model_provider;
mod model_service;
mod ort_service;
mod preprocess;
mod sampler;
mod temp_file;
#[cfg(feature = "video")]
mod video;

pub mod config;

pub use decision::{decide, ClassificationResult, Label, ScoreVector};
pub use errors::{DetectionError, FrameReadError};
pub use frame::Frame;
pub use inference_service::{predict_batch, InferenceService};
pub use model_provider::{ModelHandle, ModelLoader, ModelProvider, OrtModelLoader};
pub use model_service::{ModelInfo, ModelService};
pub use ort_service::OrtModelService;
pub use preprocess::preprocess;
pub use sampler::{sample_frames, sample_indices, VideoSource};
pub use temp_file::TempFile;
#[cfg(feature = "video")]
pub use video::OpenCvVideo;
