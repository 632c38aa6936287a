use serde::Deserialize;
use std::path::PathBuf;

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Object-store URL of the model artifact. When unset only the local copy is used.
    #[serde(default)]
    pub remote_url: Option<String>,
    pub model_dir: PathBuf,
    pub model_file: String,
    #[serde(default = "default_temp_file")]
    pub temp_file: String,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

fn default_temp_file() -> String {
    "temp_model.onnx".into()
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_download_timeout_secs() -> u64 {
    300
}

impl ModelConfig {
    pub fn get_local_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    pub fn get_temp_path(&self) -> PathBuf {
        self.model_dir.join(&self.temp_file)
    }
}

impl Validatable for ModelConfig {
    fn validate(&self) -> Result<(), String> {
        if self.model_file.trim().is_empty() {
            return Err("model.model_file must not be empty".into());
        }
        if self.temp_file == self.model_file {
            return Err("model.temp_file must differ from model.model_file".into());
        }
        if self.num_instances == 0 {
            return Err("model.num_instances must be at least 1".into());
        }
        Ok(())
    }
}

/// Channel order of the tensors handed to the classifier.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    #[default]
    Bgr,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default = "default_num_frames")]
    pub num_frames: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default)]
    pub channel_order: ChannelOrder,
}

fn default_input_size() -> u32 {
    128
}

fn default_num_frames() -> usize {
    20
}

fn default_batch_size() -> usize {
    32
}

fn default_threshold() -> f32 {
    0.5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_size: default_input_size(),
            num_frames: default_num_frames(),
            batch_size: default_batch_size(),
            threshold: default_threshold(),
            channel_order: ChannelOrder::default(),
        }
    }
}

impl Validatable for PipelineConfig {
    fn validate(&self) -> Result<(), String> {
        if self.input_size == 0 {
            return Err("pipeline.input_size must be at least 1".into());
        }
        if self.num_frames == 0 {
            return Err("pipeline.num_frames must be at least 1".into());
        }
        if self.batch_size == 0 {
            return Err("pipeline.batch_size must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(format!(
                "pipeline.threshold must lie in [0, 1], got {}",
                self.threshold
            ));
        }
        Ok(())
    }
}
