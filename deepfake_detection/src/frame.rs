use crate::errors::DetectionError;
use image::RgbImage;
use std::io::Cursor;

/// A decoded still image, always three channels in RGB order.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Result<Self, DetectionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectionError::MediaOpen(format!(
                "frame has zero-sized dimension {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(Self { image })
    }

    /// Builds a frame from an interleaved BGR buffer as produced by OpenCV.
    pub fn from_bgr(width: u32, height: u32, bgr: &[u8]) -> Result<Self, DetectionError> {
        let expected = width as usize * height as usize * 3;
        if bgr.len() != expected {
            return Err(DetectionError::MediaOpen(format!(
                "expected {} bytes for a {}x{} BGR frame, got {}",
                expected,
                width,
                height,
                bgr.len()
            )));
        }
        let rgb: Vec<u8> = bgr
            .chunks_exact(3)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect();
        let image = RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
            DetectionError::MediaOpen(format!("invalid {}x{} frame buffer", width, height))
        })?;
        Self::new(image)
    }

    /// Decodes an encoded image (PNG, JPEG, ...) sniffing the format from its content.
    pub fn decode(bytes: &[u8]) -> Result<Self, DetectionError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DetectionError::MediaOpen(format!("Error decoding image: {}", e)))?;

        let decoded = reader
            .decode()
            .map_err(|e| DetectionError::MediaOpen(format!("Unable to decode image data: {}", e)))?;

        Self::new(decoded.to_rgb8())
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }
}
