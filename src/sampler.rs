//! Bounded frame sampling.
//!
//! [`FrameSampler`] turns a video of any length or resolution into a
//! [`FrameBatch`] of exactly [`max_samples`](crate::SamplerOptions::max_samples)
//! JPEG frames, evenly spaced over the source duration and capped at the
//! configured height. Output size depends only on the options, never on the
//! input, which keeps the provider request bounded.
//!
//! Sampling is strictly sequential. Each step seeks the single decoder, waits
//! for that seek to land, renders, encodes, and only then moves on; the
//! [`FrameSource`] trait takes `&mut self` for both operations so two seeks
//! can never overlap.

use std::{path::Path, sync::Arc};

use image::RgbImage;

use crate::{
    configuration::SamplerOptions,
    decoder::VideoDecoder,
    error::StoryboardError,
    frame::{Frame, FrameBatch},
    metadata::VideoMetadata,
    progress::ProgressTracker,
};

/// A seekable source of decoded frames with one current position.
///
/// [`VideoDecoder`] is the FFmpeg implementation. Other implementations are
/// useful for synthetic sources.
pub trait FrameSource {
    /// Metadata read when the source was opened.
    fn metadata(&self) -> &VideoMetadata;

    /// Move the playback position to `seconds` and block until the frame
    /// there is decoded.
    fn seek(&mut self, seconds: f64) -> Result<(), StoryboardError>;

    /// Render the current frame into an RGB surface of exactly
    /// `width` × `height`.
    fn render(&mut self, width: u32, height: u32) -> Result<RgbImage, StoryboardError>;
}

/// Anything that can turn a local video file into a [`FrameBatch`].
///
/// The orchestrator drives its sampler through this trait on a blocking
/// worker, which is why implementations must be `Send + Sync + 'static`.
pub trait VideoSampler: Send + Sync + 'static {
    /// Sample the video at `path`.
    fn sample(&self, path: &Path) -> Result<FrameBatch, StoryboardError>;
}

/// Sample times, in seconds, for `count` evenly spaced samples over
/// `duration`: `i * (duration / count)` for `i` in `0..count`.
pub fn sample_times(duration: f64, count: u32) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let interval = duration / count as f64;
    (0..count).map(|index| index as f64 * interval).collect()
}

/// The default sampler: FFmpeg decoding plus JPEG encoding.
///
/// # Example
///
/// ```no_run
/// use storyboard_continuity::{FrameSampler, SamplerOptions};
///
/// let sampler = FrameSampler::new(SamplerOptions::new());
/// let batch = sampler.sample("input.mp4")?;
/// assert_eq!(batch.len(), 250);
/// # Ok::<(), storyboard_continuity::StoryboardError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    options: SamplerOptions,
}

impl FrameSampler {
    /// Create a sampler with the given options.
    pub fn new(options: SamplerOptions) -> Self {
        Self { options }
    }

    /// The options this sampler was built with.
    pub fn options(&self) -> &SamplerOptions {
        &self.options
    }

    /// Open the video at `path` and sample it.
    ///
    /// The decoder is dropped before this returns, on success and on every
    /// error path.
    ///
    /// # Errors
    ///
    /// Returns [`StoryboardError::Decode`] if the file cannot be opened or any
    /// sample step fails, or [`StoryboardError::Image`] if encoding fails.
    pub fn sample<P: AsRef<Path>>(&self, path: P) -> Result<FrameBatch, StoryboardError> {
        let mut decoder = VideoDecoder::open(path)?;
        self.sample_source(&mut decoder)
    }

    /// Sample an already-open [`FrameSource`].
    ///
    /// Any failing seek, render or encode aborts the run; no partial batch is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoryboardError::Decode`] for a source without positive
    /// duration or usable dimensions, and propagates the first step failure.
    pub fn sample_source<S: FrameSource>(&self, source: &mut S) -> Result<FrameBatch, StoryboardError> {
        let metadata = source.metadata().clone();
        let duration = metadata.duration_seconds;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(StoryboardError::Decode(format!(
                "video has no positive duration ({duration})"
            )));
        }
        if metadata.width == 0 || metadata.height == 0 {
            return Err(StoryboardError::Decode(format!(
                "invalid video dimensions: {}x{}",
                metadata.width, metadata.height
            )));
        }

        let (width, height) = self
            .options
            .output_dimensions(metadata.width, metadata.height);
        let times = sample_times(duration, self.options.max_samples);

        log::debug!(
            "Sampling {} frames every {:.3}s at {}x{} (source {}x{}, quality {})",
            times.len(),
            duration / times.len() as f64,
            width,
            height,
            metadata.width,
            metadata.height,
            self.options.jpeg_quality,
        );

        let mut tracker = ProgressTracker::new(
            Arc::clone(&self.options.progress),
            Some(times.len() as u64),
            self.options.batch_size,
        );

        let mut frames = Vec::with_capacity(times.len());
        for (index, &time) in times.iter().enumerate() {
            let index = index as u32;
            let frame = capture(source, index, time, width, height, self.options.jpeg_quality)
                .inspect_err(|error| {
                    log::warn!("Sampling aborted at frame {index} ({time:.2}s): {error}");
                })?;
            frames.push(frame);
            tracker.advance(Some(time));
        }
        tracker.finish();

        let batch = FrameBatch::new(frames, duration);
        log::info!(
            "Sampled {} frames ({} KiB) from {:.2}s of video",
            batch.len(),
            batch.payload_bytes() / 1024,
            duration,
        );
        Ok(batch)
    }
}

impl VideoSampler for FrameSampler {
    fn sample(&self, path: &Path) -> Result<FrameBatch, StoryboardError> {
        FrameSampler::sample(self, path)
    }
}

/// Seek, render and encode one sample.
fn capture<S: FrameSource>(
    source: &mut S,
    index: u32,
    time: f64,
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Frame, StoryboardError> {
    source.seek(time)?;
    let surface = source.render(width, height)?;
    Frame::encode_jpeg(index, time, &surface, quality)
}

/// Run `sampler` on tokio's blocking pool and wait for it.
///
/// `video` is moved into the worker and dropped there once sampling ends,
/// which removes a downloaded temporary file on every exit path.
///
/// # Errors
///
/// Propagates the sampler's error, or [`StoryboardError::Decode`] if the
/// worker panicked.
pub async fn sample_async<S, V>(sampler: Arc<S>, video: V) -> Result<FrameBatch, StoryboardError>
where
    S: VideoSampler,
    V: AsRef<Path> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let result = sampler.sample(video.as_ref());
        drop(video);
        result
    })
    .await
    .map_err(|error| StoryboardError::Decode(format!("sampling worker failed: {error}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_times_are_evenly_spaced() {
        let times = sample_times(10.0, 4);
        assert_eq!(times, vec![0.0, 2.5, 5.0, 7.5]);
    }

    #[test]
    fn zero_samples_yield_no_times() {
        assert!(sample_times(10.0, 0).is_empty());
    }
}
