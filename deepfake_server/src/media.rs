use std::path::Path;

const IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];
const VIDEO_EXTENSIONS: [&str; 3] = [".mp4", ".avi", ".mov"];
const DEFAULT_EXTENSION: &str = ".png";

/// What an upload is, decided once from its filename and declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    /// Carries the normalized extension, used to name the temp file OpenCV reads.
    Video { extension: String },
    Rejected(String),
}

impl MediaKind {
    pub fn classify(filename: &str, content_type: &str) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        let declared_image = content_type.starts_with("image/");
        let declared_video = content_type.starts_with("video/");
        if !declared_image && !declared_video {
            return MediaKind::Rejected(format!(
                "Invalid file type {}, must be an image or a video",
                content_type
            ));
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            if declared_image {
                MediaKind::Image
            } else {
                MediaKind::Rejected(format!(
                    "Content type {} does not match image extension {}",
                    content_type, extension
                ))
            }
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            if declared_video {
                MediaKind::Video { extension }
            } else {
                MediaKind::Rejected(format!(
                    "Content type {} does not match video extension {}",
                    content_type, extension
                ))
            }
        } else {
            MediaKind::Rejected(format!("Unsupported file format: {}", extension))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video { .. } => "video",
            MediaKind::Rejected(_) => "rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images() {
        assert_eq!(MediaKind::classify("cat.JPG", "image/jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::classify("cat.jpeg", "image/jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::classify("cat.png", "IMAGE/PNG"), MediaKind::Image);
    }

    #[test]
    fn test_missing_extension_defaults_to_png() {
        assert_eq!(MediaKind::classify("blob", "image/png"), MediaKind::Image);
        assert!(matches!(
            MediaKind::classify("blob", "video/mp4"),
            MediaKind::Rejected(_)
        ));
    }

    #[test]
    fn test_videos() {
        assert_eq!(
            MediaKind::classify("clip.MOV", "video/quicktime"),
            MediaKind::Video {
                extension: ".mov".into()
            }
        );
        assert_eq!(
            MediaKind::classify("clip.avi", "video/x-msvideo").as_str(),
            "video"
        );
    }

    #[test]
    fn test_rejections() {
        let cases = [
            ("notes.txt", "text/plain"),
            ("photo.gif", "image/gif"),
            ("clip.mp4", "image/png"),
            ("photo.png", "video/mp4"),
            ("photo.png", "application/octet-stream"),
        ];
        for (filename, content_type) in cases {
            assert!(
                matches!(
                    MediaKind::classify(filename, content_type),
                    MediaKind::Rejected(_)
                ),
                "{} / {} should be rejected",
                filename,
                content_type
            );
        }
    }
}
