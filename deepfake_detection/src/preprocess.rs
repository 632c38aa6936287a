use crate::{
    config::{ChannelOrder, PipelineConfig},
    frame::Frame,
};
use image::imageops::{self, FilterType};
use ndarray::{Array, Ix3};

/// Resizes a frame to `input_size` x `input_size` and scales it into `[0, 1]`,
/// laid out as `[height, width, channel]`.
pub fn preprocess(frame: &Frame, config: &PipelineConfig) -> Array<f32, Ix3> {
    let size = config.input_size;
    let img = imageops::resize(frame.as_image(), size, size, FilterType::Triangle);

    let mut tensor = Array::zeros((size as usize, size as usize, 3));
    for (x, y, pixel) in img.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b] = pixel.0;
        let channels = match config.channel_order {
            ChannelOrder::Rgb => [r, g, b],
            ChannelOrder::Bgr => [b, g, r],
        };
        for (c, value) in channels.into_iter().enumerate() {
            tensor[[y, x, c]] = (value as f32) / 255.;
        }
    }

    tensor
}
