//! Sampling progress reporting.
//!
//! The sampler reports through a [`ProgressCallback`] with
//! [`ProgressInfo`] snapshots. Callbacks only observe: there is no way to stop
//! a sampling run once it has started.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use storyboard_continuity::{
//!     FrameSampler, ProgressCallback, ProgressInfo, SamplerOptions, StoryboardError,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% sampled");
//!         }
//!     }
//! }
//!
//! let sampler = FrameSampler::new(SamplerOptions::new().with_progress(Arc::new(PrintProgress)));
//! let batch = sampler.sample("input.mp4")?;
//! # Ok::<(), StoryboardError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot of sampling progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// How many frames have been captured so far.
    pub current: u64,
    /// Total frames expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since sampling started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Source timestamp (seconds) of the frame just captured.
    pub current_timestamp: Option<f64>,
}

/// Trait for receiving progress updates during sampling.
///
/// Implementations must be [`Send`] and [`Sync`] because sampling runs on a
/// blocking worker thread when driven by the orchestrator.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals while frames are captured.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing and emits callbacks every `batch_size` items.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>, batch_size: u64) -> Self {
        Self {
            callback,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one completed item and fire the callback if the batch
    /// threshold is reached.
    pub(crate) fn advance(&mut self, timestamp: Option<f64>) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(timestamp);
            self.items_since_last_report = 0;
        }
    }

    /// Emit a final report unless the last `advance` already did.
    pub(crate) fn finish(&mut self) {
        if self.items_since_last_report > 0 {
            self.report(None);
            self.items_since_last_report = 0;
        }
    }

    fn report(&self, timestamp: Option<f64>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.map(|total| {
                let remaining = total.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_timestamp: timestamp,
        });
    }
}
