use crate::{
    errors::{DetectionError, FrameReadError},
    frame::Frame,
    sampler::VideoSource,
};
use opencv::{core, core::Mat, prelude::*, videoio};
use std::path::{Path, PathBuf};

/// A video file opened through OpenCV. The capture is released when this value drops.
pub struct OpenCvVideo {
    capture: videoio::VideoCapture,
    frame_count: usize,
    path: PathBuf,
}

impl OpenCvVideo {
    pub fn open(path: &Path) -> Result<Self, DetectionError> {
        let filename = path.to_str().ok_or_else(|| {
            DetectionError::MediaOpen(format!("non UTF-8 video path: {}", path.display()))
        })?;

        let capture = videoio::VideoCapture::from_file(filename, videoio::CAP_ANY)
            .map_err(|e| open_error(path, e))?;
        if !capture.is_opened().map_err(|e| open_error(path, e))? {
            return Err(DetectionError::MediaOpen(format!(
                "Unable to open video: {}",
                path.display()
            )));
        }

        let frame_count = capture
            .get(videoio::CAP_PROP_FRAME_COUNT)
            .map_err(|e| open_error(path, e))?
            .max(0.0) as usize;

        tracing::debug!("Opened {} with {} frames", path.display(), frame_count);

        Ok(Self {
            capture,
            frame_count,
            path: path.to_path_buf(),
        })
    }
}

fn open_error(path: &Path, err: opencv::Error) -> DetectionError {
    DetectionError::MediaOpen(format!("Unable to open video {}: {}", path.display(), err))
}

/// A refused seek leaves the capture at its previous position, so the next read would
/// return a frame from the wrong index.
fn check_seek(index: usize, seek: opencv::Result<bool>) -> Result<(), FrameReadError> {
    match seek {
        Ok(true) => Ok(()),
        Ok(false) => Err(FrameReadError::new(index, "seek failed")),
        Err(e) => Err(FrameReadError::new(index, e.to_string())),
    }
}

impl VideoSource for OpenCvVideo {
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn read_frame(&mut self, index: usize) -> Result<Frame, FrameReadError> {
        let read_error = |e: opencv::Error| FrameReadError::new(index, e.to_string());

        check_seek(index, self.capture.set(videoio::CAP_PROP_POS_FRAMES, index as f64))?;

        let mut mat = Mat::default();
        if !self.capture.read(&mut mat).map_err(read_error)? || mat.empty() {
            return Err(FrameReadError::new(index, "no frame returned"));
        }
        if mat.typ() != core::CV_8UC3 {
            return Err(FrameReadError::new(
                index,
                format!("unsupported pixel type {}", mat.typ()),
            ));
        }

        let mat = if mat.is_continuous() {
            mat
        } else {
            mat.try_clone().map_err(read_error)?
        };
        let bytes = mat.data_bytes().map_err(read_error)?;

        Frame::from_bgr(mat.cols() as u32, mat.rows() as u32, bytes)
            .map_err(|e| FrameReadError::new(index, e.to_string()))
    }
}

impl Drop for OpenCvVideo {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            tracing::error!("Failed to release {}: {}", self.path.display(), e);
        }
    }
}
