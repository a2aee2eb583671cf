//! Sampling configuration.
//!
//! [`SamplerOptions`] is a builder that carries the sample budget, output
//! resolution cap, JPEG quality and an optional progress callback into the
//! [`FrameSampler`](crate::FrameSampler).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use storyboard_continuity::{FrameSampler, ProgressCallback, ProgressInfo, SamplerOptions};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{} of {:?} frames", info.current, info.total);
//!     }
//! }
//!
//! let options = SamplerOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_batch_size(25);
//! let sampler = FrameSampler::new(options);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{NoOpProgress, ProgressCallback};

/// Number of frames sampled from every video, whatever its length.
pub const DEFAULT_MAX_SAMPLES: u32 = 250;

/// Output frame height cap in pixels. Matches the analysis provider's
/// internal processing grid.
pub const DEFAULT_TARGET_HEIGHT: u32 = 448;

/// JPEG quality (1–100) used for every sampled frame.
pub const DEFAULT_JPEG_QUALITY: u8 = 45;

/// Configuration for [`FrameSampler`](crate::FrameSampler).
///
/// A default-constructed value samples 250 frames, caps their height at
/// 448 px and encodes them at JPEG quality 45.
#[derive(Clone)]
pub struct SamplerOptions {
    pub(crate) max_samples: u32,
    pub(crate) target_height: u32,
    pub(crate) jpeg_quality: u8,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) batch_size: u64,
}

impl Debug for SamplerOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SamplerOptions")
            .field("max_samples", &self.max_samples)
            .field("target_height", &self.target_height)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplerOptions {
    /// Create options with the default budget and no progress callback.
    pub fn new() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
            target_height: DEFAULT_TARGET_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    /// Set the number of frames to sample. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_max_samples(mut self, samples: u32) -> Self {
        self.max_samples = samples.max(1);
        self
    }

    /// Set the output height cap. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_target_height(mut self, height: u32) -> Self {
        self.target_height = height.max(1);
        self
    }

    /// Set the JPEG quality, clamped to `1..=100`.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Attach a progress callback, fired every
    /// [`batch_size`](SamplerOptions::with_batch_size) frames.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Number of frames every sample run produces.
    pub fn max_samples(&self) -> u32 {
        self.max_samples
    }

    /// Output height cap in pixels.
    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    /// JPEG quality in `1..=100`.
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Resolve the output frame size for a source of the given dimensions.
    ///
    /// Applies a uniform factor of `min(1, target_height / source_height)`
    /// to both axes, so frames are only ever scaled down and the aspect ratio
    /// is kept within rounding. Returns `(width, height)`.
    pub fn output_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        if source_width == 0 || source_height == 0 || source_height <= self.target_height {
            return (source_width, source_height);
        }
        let scale = self.target_height as f64 / source_height as f64;
        let width = (source_width as f64 * scale).round() as u32;
        let height = (source_height as f64 * scale).round() as u32;
        (width.max(1), height.max(1))
    }
}
