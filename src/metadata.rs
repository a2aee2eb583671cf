//! Video metadata types.
//!
//! [`VideoMetadata`] is read from the container and stream headers when a
//! [`VideoDecoder`](crate::VideoDecoder) is opened. Nothing is decoded to fill
//! it in, so probing stays cheap regardless of file size.

use serde::Serialize;

/// Metadata for the best video stream of a file.
///
/// # Example
///
/// ```no_run
/// use storyboard_continuity::VideoDecoder;
///
/// let metadata = VideoDecoder::probe("input.mp4")?;
/// println!("{}x{}, {:.1}s", metadata.width, metadata.height, metadata.duration_seconds);
/// # Ok::<(), storyboard_continuity::StoryboardError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct VideoMetadata {
    /// Native frame width in pixels.
    pub width: u32,
    /// Native frame height in pixels.
    pub height: u32,
    /// Total duration in seconds.
    pub duration_seconds: f64,
    /// Frames per second (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
}

impl VideoMetadata {
    /// Width divided by height, or `None` for degenerate dimensions.
    pub fn aspect_ratio(&self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(self.width as f64 / self.height as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(width: u32, height: u32) -> VideoMetadata {
        VideoMetadata {
            width,
            height,
            duration_seconds: 10.0,
            frames_per_second: 30.0,
            codec: "h264".to_string(),
            format: "mp4".to_string(),
        }
    }

    #[test]
    fn aspect_ratio_of_landscape_and_portrait() {
        assert_eq!(metadata(1920, 1080).aspect_ratio(), Some(1920.0 / 1080.0));
        assert_eq!(metadata(1080, 1920).aspect_ratio(), Some(0.5625));
    }

    #[test]
    fn degenerate_dimensions_have_no_aspect_ratio() {
        assert_eq!(metadata(0, 1080).aspect_ratio(), None);
        assert_eq!(metadata(1920, 0).aspect_ratio(), None);
    }
}
