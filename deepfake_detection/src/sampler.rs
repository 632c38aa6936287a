use crate::{
    errors::{DetectionError, FrameReadError},
    frame::Frame,
};

/// Random-access source of decoded video frames.
pub trait VideoSource {
    /// Total number of frames reported by the container.
    fn frame_count(&self) -> usize;

    fn read_frame(&mut self, index: usize) -> Result<Frame, FrameReadError>;
}

/// Frame indices visited when sampling `target_count` frames out of `total`.
pub fn sample_indices(total: usize, target_count: usize) -> impl Iterator<Item = usize> {
    let stride = (total / target_count.max(1)).max(1);
    (0..total).step_by(stride)
}

/// Collects up to `target_count` frames at an even stride. Frames that fail to decode
/// are skipped; the call only fails when nothing at all could be read.
pub fn sample_frames<V: VideoSource + ?Sized>(
    source: &mut V,
    target_count: usize,
) -> Result<Vec<Frame>, DetectionError> {
    let total = source.frame_count();
    let mut frames = Vec::with_capacity(target_count.min(total));

    for index in sample_indices(total, target_count) {
        if frames.len() >= target_count {
            break;
        }
        match source.read_frame(index) {
            Ok(frame) => frames.push(frame),
            Err(e) => tracing::debug!("Skipping frame: {}", e),
        }
    }

    if frames.is_empty() {
        return Err(DetectionError::MediaOpen(format!(
            "no decodable frames among {} reported",
            total
        )));
    }

    tracing::debug!("Sampled {} of {} frames", frames.len(), total);
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    /// Encodes the frame index in the red channel so tests can see which ones were read.
    struct FakeVideo {
        total: usize,
        broken: Vec<usize>,
        reads: Vec<usize>,
    }

    impl FakeVideo {
        fn new(total: usize) -> Self {
            Self {
                total,
                broken: vec![],
                reads: vec![],
            }
        }
    }

    impl VideoSource for FakeVideo {
        fn frame_count(&self) -> usize {
            self.total
        }

        fn read_frame(&mut self, index: usize) -> Result<Frame, FrameReadError> {
            self.reads.push(index);
            if self.broken.contains(&index) {
                return Err(FrameReadError::new(index, "corrupt packet"));
            }
            let image = ImageBuffer::from_pixel(4, 4, Rgb([index as u8, 0, 0]));
            Ok(Frame::new(image).unwrap())
        }
    }

    fn frame_indices(frames: &[Frame]) -> Vec<usize> {
        frames
            .iter()
            .map(|f| f.as_image().get_pixel(0, 0).0[0] as usize)
            .collect()
    }

    #[test]
    fn test_even_stride_over_long_video() {
        let mut video = FakeVideo::new(100);
        let frames = sample_frames(&mut video, 20).unwrap();

        let expected: Vec<usize> = (0..100).step_by(5).collect();
        assert_eq!(frames.len(), 20);
        assert_eq!(frame_indices(&frames), expected);
    }

    #[test]
    fn test_short_video_is_not_padded() {
        let mut video = FakeVideo::new(5);
        let frames = sample_frames(&mut video, 20).unwrap();

        assert_eq!(frame_indices(&frames), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_stops_once_target_reached() {
        let mut video = FakeVideo::new(45);
        let frames = sample_frames(&mut video, 20).unwrap();

        assert_eq!(frames.len(), 20);
        assert_eq!(video.reads, (0..20).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_broken_frames_are_skipped() {
        let mut video = FakeVideo::new(100);
        video.broken = vec![0, 50];
        let frames = sample_frames(&mut video, 20).unwrap();

        let indices = frame_indices(&frames);
        assert_eq!(indices.len(), 18);
        assert!(!indices.contains(&50));
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_no_readable_frames_escalates() {
        let mut video = FakeVideo::new(3);
        video.broken = vec![0, 1, 2];
        let result = sample_frames(&mut video, 20);
        assert!(matches!(result, Err(DetectionError::MediaOpen(_))));

        let mut empty = FakeVideo::new(0);
        assert!(matches!(
            sample_frames(&mut empty, 20),
            Err(DetectionError::MediaOpen(_))
        ));
    }

    #[test]
    fn test_sample_indices() {
        assert_eq!(
            sample_indices(100, 20).collect::<Vec<_>>(),
            (0..100).step_by(5).collect::<Vec<_>>()
        );
        assert_eq!(sample_indices(5, 20).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        assert_eq!(sample_indices(45, 20).count(), 23);
        assert_eq!(sample_indices(0, 20).count(), 0);
    }
}
