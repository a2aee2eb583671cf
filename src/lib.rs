//! # storyboard-continuity
//!
//! Turn a video into a continuity storyboard: recurring characters, an
//! emotional arc, and an ordered chain of segment prompts with transition
//! bridges between them.
//!
//! The crate has two halves:
//!
//! - a **bounded frame sampler** that decodes any video with FFmpeg (via
//!   [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)) and produces
//!   exactly 250 evenly spaced JPEG frames no taller than 448 px, whatever the
//!   source length or resolution, and
//! - an **analysis orchestrator** that fetches remote inputs, runs the
//!   sampler, sends the batch to a multimodal provider and keeps a small
//!   `idle → uploading → analyzing → completed | error` state machine.
//!
//! ## Quick Start
//!
//! ### Sample a Video
//!
//! ```no_run
//! use storyboard_continuity::{FrameSampler, SamplerOptions};
//!
//! let sampler = FrameSampler::new(SamplerOptions::new());
//! let batch = sampler.sample("input.mp4").unwrap();
//! println!("{} frames, {:.2}s apart", batch.len(), batch.interval());
//! ```
//!
//! ### Analyse a Video
//!
//! ```no_run
//! use storyboard_continuity::{GeminiProvider, Orchestrator, VideoInput};
//!
//! # async fn run() -> Result<(), storyboard_continuity::StoryboardError> {
//! let mut orchestrator = Orchestrator::new(GeminiProvider::from_env()?);
//! orchestrator.submit(VideoInput::parse("https://example.com/clip.mp4")).await?;
//!
//! let mut prompts = Vec::new();
//! orchestrator.copy_all_prompts(&mut prompts)?;
//! orchestrator.download_json("exports".as_ref())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod analysis;
pub mod configuration;
mod conversion;
pub mod coverage;
pub mod decoder;
pub mod error;
pub mod export;
pub mod fetch;
pub mod frame;
pub mod metadata;
pub mod orchestrator;
pub mod progress;
pub mod provider;
pub mod sampler;
pub mod state;

pub use analysis::{AnalysisResult, Character, VideoSegment};
pub use configuration::{
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SAMPLES, DEFAULT_TARGET_HEIGHT, SamplerOptions,
};
pub use coverage::{CoverageGap, CoverageReport, check_coverage, parse_timestamp};
pub use decoder::{DecoderLogLevel, VideoDecoder, set_decoder_log_level};
pub use error::{RESOURCE_LIMIT_MESSAGE, StoryboardError};
pub use export::{EXPORT_FILE_NAME, format_prompts};
pub use fetch::{LocalVideo, VideoInput};
pub use frame::{Frame, FrameBatch, MediaType};
pub use metadata::VideoMetadata;
pub use orchestrator::{Orchestrator, STATUS_INTERVAL, STATUS_MESSAGES, StateObserver};
pub use progress::{ProgressCallback, ProgressInfo};
pub use provider::{AnalysisProvider, GeminiProvider, ProviderConfig};
pub use sampler::{FrameSampler, FrameSource, VideoSampler, sample_async, sample_times};
pub use state::{AnalysisStatus, AppState};
