//! Sampled frames and the batch handed to the analysis provider.

use std::fmt::{Display, Formatter, Result as FmtResult};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{RgbImage, codecs::jpeg::JpegEncoder};

use crate::error::StoryboardError;

/// Media type tag carried by every encoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MediaType {
    /// Baseline JPEG (`image/jpeg`).
    Jpeg,
}

impl MediaType {
    /// The MIME type string sent to the provider.
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            MediaType::Jpeg => "jpg",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.mime_type())
    }
}

/// One encoded still image sampled from a video.
///
/// Immutable once built; the encoded bytes can only be read or moved out.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: u32,
    timestamp: f64,
    width: u32,
    height: u32,
    media_type: MediaType,
    image_bytes: Vec<u8>,
}

impl Frame {
    /// Wrap already-encoded image bytes.
    pub fn new(
        index: u32,
        timestamp: f64,
        width: u32,
        height: u32,
        media_type: MediaType,
        image_bytes: Vec<u8>,
    ) -> Self {
        Self {
            index,
            timestamp,
            width,
            height,
            media_type,
            image_bytes,
        }
    }

    /// Encode an RGB surface as JPEG at `quality` (1–100).
    ///
    /// # Errors
    ///
    /// Returns [`StoryboardError::Image`] if the encoder rejects the image.
    pub fn encode_jpeg(
        index: u32,
        timestamp: f64,
        image: &RgbImage,
        quality: u8,
    ) -> Result<Self, StoryboardError> {
        let mut image_bytes = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut image_bytes, quality.clamp(1, 100));
        encoder.encode_image(image)?;
        Ok(Self::new(
            index,
            timestamp,
            image.width(),
            image.height(),
            MediaType::Jpeg,
            image_bytes,
        ))
    }

    /// Position of this frame in its batch.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Source timestamp the frame was sampled at, in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Encoded width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Encoded height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Media type of the encoded bytes.
    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Encoded image bytes.
    pub fn image_bytes(&self) -> &[u8] {
        &self.image_bytes
    }

    /// Encoded bytes as standard base64, the form inline image parts use.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.image_bytes)
    }
}

/// The ordered frames of one sampling run plus the source duration.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBatch {
    frames: Vec<Frame>,
    duration: f64,
}

impl FrameBatch {
    /// Build a batch from frames already in sample order.
    pub fn new(frames: Vec<Frame>, duration: f64) -> Self {
        Self { frames, duration }
    }

    /// Frames in sample order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Source duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of frames in the batch.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` if the batch holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total encoded payload size in bytes.
    pub fn payload_bytes(&self) -> usize {
        self.frames.iter().map(|frame| frame.image_bytes.len()).sum()
    }

    /// Seconds between consecutive samples.
    pub fn interval(&self) -> f64 {
        if self.frames.is_empty() {
            0.0
        } else {
            self.duration / self.frames.len() as f64
        }
    }

    /// Consume the batch, returning its frames and duration.
    pub fn into_parts(self) -> (Vec<Frame>, f64) {
        (self.frames, self.duration)
    }
}
