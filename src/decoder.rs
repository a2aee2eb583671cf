//! FFmpeg-backed video decoding.
//!
//! [`VideoDecoder`] is the transient playable handle the sampler works
//! against: it owns the demuxer, one video decoder and one scaling surface,
//! and exposes a single current playback position. Opening it reads headers
//! only; frames are decoded lazily as seeks are requested.
//!
//! Dropping the decoder releases every FFmpeg resource it holds, so a sampler
//! that bails out halfway through still cleans up.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoStreamDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};
use image::RgbImage;

use crate::{
    conversion::{frame_to_rgb_buffer, pts_to_seconds, seconds_to_seek_timestamp},
    error::StoryboardError,
    metadata::VideoMetadata,
    sampler::FrameSource,
};

/// FFmpeg's own stderr verbosity.
///
/// This does not affect the crate's `log` output, only what the FFmpeg
/// libraries print while demuxing and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoderLogLevel {
    /// Print nothing.
    Quiet,
    /// Recoverable errors and worse.
    Error,
    /// Warnings and worse (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging output.
    Debug,
}

impl DecoderLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            DecoderLogLevel::Quiet => Level::Quiet,
            DecoderLogLevel::Error => Level::Error,
            DecoderLogLevel::Warning => Level::Warning,
            DecoderLogLevel::Info => Level::Info,
            DecoderLogLevel::Debug => Level::Debug,
        }
    }

    /// Parse a level name as accepted on the command line.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" | "off" => Some(DecoderLogLevel::Quiet),
            "error" => Some(DecoderLogLevel::Error),
            "warning" | "warn" => Some(DecoderLogLevel::Warning),
            "info" => Some(DecoderLogLevel::Info),
            "debug" => Some(DecoderLogLevel::Debug),
            _ => None,
        }
    }
}

/// Set FFmpeg's internal log verbosity.
pub fn set_decoder_log_level(level: DecoderLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Scaler plus its output frame, rebuilt only when the source format or the
/// requested output size changes.
struct Surface {
    key: (Pixel, u32, u32, u32, u32),
    scaler: ScalingContext,
    rgb_frame: VideoFrame,
}

/// A single-position video decoder over one file.
///
/// # Example
///
/// ```no_run
/// use storyboard_continuity::{FrameSource, VideoDecoder};
///
/// let mut decoder = VideoDecoder::open("input.mp4")?;
/// decoder.seek(12.5)?;
/// let image = decoder.render(640, 360)?;
/// image.save("at_12s.png")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct VideoDecoder {
    input_context: Input,
    decoder: VideoStreamDecoder,
    stream_index: usize,
    time_base: Rational,
    metadata: VideoMetadata,
    current_frame: VideoFrame,
    scratch_frame: VideoFrame,
    has_frame: bool,
    surface: Option<Surface>,
}

impl Debug for VideoDecoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoDecoder")
            .field("metadata", &self.metadata)
            .field("stream_index", &self.stream_index)
            .field("has_frame", &self.has_frame)
            .finish_non_exhaustive()
    }
}

impl VideoDecoder {
    /// Open a video file and read its metadata.
    ///
    /// Initializes FFmpeg (idempotent), opens the demuxer, selects the best
    /// video stream and prepares a decoder for it. No frame is decoded.
    ///
    /// # Errors
    ///
    /// Returns [`StoryboardError::Decode`] if the file cannot be opened, has
    /// no video stream, or its codec has no decoder.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoryboardError> {
        let path = path.as_ref();
        log::debug!("Opening video: {}", path.display());

        ffmpeg_next::init().map_err(|error| {
            StoryboardError::Decode(format!("FFmpeg initialisation failed: {error}"))
        })?;

        let input_context = ffmpeg_next::format::input(&path).map_err(|error| {
            StoryboardError::Decode(format!("cannot open \"{}\": {error}", path.display()))
        })?;

        let stream = input_context.streams().best(Type::Video).ok_or_else(|| {
            StoryboardError::Decode(format!("no video stream in \"{}\"", path.display()))
        })?;
        let stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let decoder = decoder_context.decoder().video().map_err(|error| {
            StoryboardError::Decode(format!("no decoder for video stream {stream_index}: {error}"))
        })?;

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            0.0
        };

        // Container duration is in AV_TIME_BASE; fall back to the stream's own.
        let container_duration = input_context.duration();
        let duration_seconds = if container_duration > 0 {
            container_duration as f64 / 1_000_000.0
        } else if stream.duration() > 0 {
            pts_to_seconds(stream.duration(), time_base)
        } else {
            0.0
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            duration_seconds,
            frames_per_second,
            codec,
            format: input_context.format().name().to_string(),
        };

        log::info!(
            "Opened video: {} (format={}, {}x{}, {:.2}s, {:.2} fps, codec={})",
            path.display(),
            metadata.format,
            metadata.width,
            metadata.height,
            metadata.duration_seconds,
            metadata.frames_per_second,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            decoder,
            stream_index,
            time_base,
            metadata,
            current_frame: VideoFrame::empty(),
            scratch_frame: VideoFrame::empty(),
            has_frame: false,
            surface: None,
        })
    }

    /// Read metadata and close the file again.
    ///
    /// # Errors
    ///
    /// Same as [`open`](VideoDecoder::open).
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<VideoMetadata, StoryboardError> {
        let decoder = Self::open(path)?;
        Ok(decoder.metadata)
    }

    /// Pull the next decoded frame into `current_frame`, keeping the previous
    /// one intact when the decoder has nothing to give.
    fn receive_into_current(&mut self) -> bool {
        if self.decoder.receive_frame(&mut self.scratch_frame).is_ok() {
            std::mem::swap(&mut self.current_frame, &mut self.scratch_frame);
            self.has_frame = true;
            true
        } else {
            false
        }
    }
}

/// Presentation time of a decoded frame in seconds.
fn frame_seconds(frame: &VideoFrame, time_base: Rational) -> f64 {
    let pts = frame.timestamp().or_else(|| frame.pts()).unwrap_or(0);
    pts_to_seconds(pts, time_base)
}

/// Where a seek has to land, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SeekTarget {
    seconds: f64,
    /// Half a frame interval; a frame this close below the target counts.
    tolerance: f64,
}

impl SeekTarget {
    fn new(seconds: f64, metadata: &VideoMetadata) -> Self {
        let seconds = seconds.clamp(0.0, metadata.duration_seconds.max(0.0));
        let tolerance = if metadata.frames_per_second > 0.0 {
            0.5 / metadata.frames_per_second
        } else {
            0.0
        };
        Self { seconds, tolerance }
    }

    fn is_reached_by(&self, frame_seconds: f64) -> bool {
        frame_seconds + self.tolerance >= self.seconds
    }

    /// Decide a seek that ran out of packets before reaching the target.
    fn settle_at_end_of_stream(&self, last_frame: Option<f64>) -> Result<(), StoryboardError> {
        match last_frame {
            Some(last) => {
                log::debug!(
                    "Seek to {:.3}s hit end of stream, using last frame at {last:.3}s",
                    self.seconds
                );
                Ok(())
            }
            None => Err(StoryboardError::Decode(format!(
                "no frame could be decoded at {:.2}s",
                self.seconds
            ))),
        }
    }
}

impl FrameSource for VideoDecoder {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Seek to the nearest keyframe before `seconds`, then decode forward to
    /// the first frame at or after it.
    ///
    /// Near the end of the stream the last decodable frame is kept, so a
    /// target inside the final frame interval still resolves.
    fn seek(&mut self, seconds: f64) -> Result<(), StoryboardError> {
        let seek_target = SeekTarget::new(seconds, &self.metadata);
        let timestamp = seconds_to_seek_timestamp(seek_target.seconds);

        self.input_context.seek(timestamp, ..timestamp)?;
        self.decoder.flush();
        self.has_frame = false;

        let stream_index = self.stream_index;
        let mut packets_sent = false;
        for (stream, packet) in self.input_context.packets() {
            if stream.index() != stream_index {
                continue;
            }
            packets_sent = true;
            self.decoder.send_packet(&packet)?;

            while self.decoder.receive_frame(&mut self.scratch_frame).is_ok() {
                std::mem::swap(&mut self.current_frame, &mut self.scratch_frame);
                self.has_frame = true;
                if seek_target.is_reached_by(frame_seconds(&self.current_frame, self.time_base)) {
                    return Ok(());
                }
            }
        }

        if packets_sent {
            self.decoder.send_eof()?;
            while self.receive_into_current() {
                if seek_target.is_reached_by(frame_seconds(&self.current_frame, self.time_base)) {
                    return Ok(());
                }
            }
        }

        let last_frame = self
            .has_frame
            .then(|| frame_seconds(&self.current_frame, self.time_base));
        seek_target.settle_at_end_of_stream(last_frame)
    }

    fn render(&mut self, width: u32, height: u32) -> Result<RgbImage, StoryboardError> {
        if !self.has_frame {
            return Err(StoryboardError::Decode(
                "render requested before any frame was decoded".to_string(),
            ));
        }

        let key = (
            self.current_frame.format(),
            self.current_frame.width(),
            self.current_frame.height(),
            width,
            height,
        );
        let rebuild = self
            .surface
            .as_ref()
            .is_none_or(|surface| surface.key != key);
        if rebuild {
            let scaler = ScalingContext::get(
                key.0,
                key.1,
                key.2,
                Pixel::RGB24,
                width,
                height,
                ScalingFlags::BILINEAR,
            )?;
            self.surface = Some(Surface {
                key,
                scaler,
                rgb_frame: VideoFrame::empty(),
            });
        }

        let surface = self.surface.as_mut().ok_or_else(|| {
            StoryboardError::Decode("scaling surface was not initialised".to_string())
        })?;
        surface.scaler.run(&self.current_frame, &mut surface.rgb_frame)?;

        let buffer = frame_to_rgb_buffer(&surface.rgb_frame, width, height);
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            StoryboardError::Decode(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(duration_seconds: f64, frames_per_second: f64) -> VideoMetadata {
        VideoMetadata {
            width: 640,
            height: 480,
            duration_seconds,
            frames_per_second,
            codec: "h264".to_string(),
            format: "mp4".to_string(),
        }
    }

    #[test]
    fn target_is_clamped_to_the_stream() {
        let metadata = metadata(10.0, 25.0);
        assert_eq!(SeekTarget::new(-3.0, &metadata).seconds, 0.0);
        assert_eq!(SeekTarget::new(4.5, &metadata).seconds, 4.5);
        assert_eq!(SeekTarget::new(99.0, &metadata).seconds, 10.0);
    }

    #[test]
    fn frame_within_half_an_interval_reaches_the_target() {
        // 25 fps: frames every 0.04 s, tolerance 0.02 s.
        let target = SeekTarget::new(2.0, &metadata(10.0, 25.0));
        assert!(target.is_reached_by(2.0));
        assert!(target.is_reached_by(2.04));
        assert!(target.is_reached_by(1.985));
        assert!(!target.is_reached_by(1.96));
    }

    #[test]
    fn unknown_frame_rate_needs_an_exact_hit() {
        let target = SeekTarget::new(2.0, &metadata(10.0, 0.0));
        assert!(!target.is_reached_by(1.999));
        assert!(target.is_reached_by(2.0));
    }

    #[test]
    fn end_of_stream_keeps_the_last_frame() {
        let target = SeekTarget::new(9.99, &metadata(10.0, 25.0));
        assert!(!target.is_reached_by(9.96));
        assert!(target.settle_at_end_of_stream(Some(9.96)).is_ok());
    }

    #[test]
    fn end_of_stream_without_any_frame_is_a_decode_error() {
        let target = SeekTarget::new(3.0, &metadata(10.0, 25.0));
        match target.settle_at_end_of_stream(None) {
            Err(StoryboardError::Decode(message)) => assert!(message.contains("3.00s")),
            other => panic!("Expected Decode error, got: {other:?}"),
        }
    }
}
