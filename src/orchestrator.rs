//! The analysis lifecycle driver.
//!
//! [`Orchestrator`] owns the single [`AppState`] and runs one submission at a
//! time through fetch, sampling and the provider call:
//!
//! ```text
//! idle ──submit──▶ uploading ──▶ analyzing ──▶ completed
//!                      │             │
//!                      └─────────────┴──────▶ error
//! completed | error ──reset──▶ idle
//! ```
//!
//! Every transition is pushed to the registered [`StateObserver`]s as a
//! read-only snapshot. While `analyzing`, a rotating status phrase is pushed
//! every [`STATUS_INTERVAL`]; the phrases are feedback only and never touch
//! the pipeline.
//!
//! # Example
//!
//! ```no_run
//! use storyboard_continuity::{GeminiProvider, Orchestrator, VideoInput};
//!
//! # async fn run() -> Result<(), storyboard_continuity::StoryboardError> {
//! let mut orchestrator = Orchestrator::new(GeminiProvider::from_env()?);
//! let state = orchestrator.submit(VideoInput::parse("input.mp4")).await?;
//! println!("{}", state.status());
//! # Ok(())
//! # }
//! ```

use std::{
    future::Future,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use reqwest::Client;
use tokio::time::{self, MissedTickBehavior};

use crate::{
    analysis::AnalysisResult,
    error::StoryboardError,
    fetch::{self, LocalVideo, VideoInput},
    provider::AnalysisProvider,
    sampler::{FrameSampler, VideoSampler, sample_async},
    state::AppState,
};

/// Cadence of the rotating status phrases.
pub const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Phrases shown in rotation while a video is being analysed.
pub const STATUS_MESSAGES: &[&str] = &[
    "Sampling frames across the whole video...",
    "Identifying recurring characters...",
    "Tracking wardrobe and physical details...",
    "Mapping the emotional arc...",
    "Breaking the video into continuous segments...",
    "Describing camera motion and framing...",
    "Writing transition bridges between segments...",
    "Composing generation prompts...",
];

/// Receives state snapshots and status phrases.
pub trait StateObserver: Send + Sync {
    /// Called after every state transition.
    fn on_transition(&self, state: &AppState);

    /// Called with each rotating status phrase while `analyzing`.
    fn on_status_message(&self, _message: &str) {}
}

/// Drives one analysis at a time and owns the resulting [`AppState`].
pub struct Orchestrator<P, S = FrameSampler> {
    state: AppState,
    provider: P,
    sampler: Arc<S>,
    http: Client,
    observers: Vec<Arc<dyn StateObserver>>,
    status_interval: Duration,
}

impl<P: AnalysisProvider> Orchestrator<P> {
    /// Create an orchestrator with the default [`FrameSampler`].
    pub fn new(provider: P) -> Self {
        Self {
            state: AppState::new(),
            provider,
            sampler: Arc::new(FrameSampler::default()),
            http: Client::new(),
            observers: Vec::new(),
            status_interval: STATUS_INTERVAL,
        }
    }
}

impl<P: AnalysisProvider, S: VideoSampler> Orchestrator<P, S> {
    /// Replace the sampler.
    #[must_use]
    pub fn with_sampler<T: VideoSampler>(self, sampler: T) -> Orchestrator<P, T> {
        Orchestrator {
            state: self.state,
            provider: self.provider,
            sampler: Arc::new(sampler),
            http: self.http,
            observers: self.observers,
            status_interval: self.status_interval,
        }
    }

    /// Register an observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StateObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Change the status phrase cadence. Clamped to at least one millisecond.
    #[must_use]
    pub fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Use `client` to download remote videos.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// The current state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The sampler.
    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Run `input` through the full lifecycle.
    ///
    /// Returns the final snapshot, which is always `completed` or `error`.
    /// Pipeline failures do not surface as `Err`: they are classified and
    /// stored in [`AppState::error`].
    ///
    /// # Errors
    ///
    /// Returns [`StoryboardError::InvalidTransition`] if the orchestrator is
    /// not `idle`; the state is left untouched.
    pub async fn submit(
        &mut self,
        input: impl Into<VideoInput>,
    ) -> Result<&AppState, StoryboardError> {
        let input = input.into();
        self.state.begin_upload()?;
        log::info!("Analysis of {input} started");
        self.notify();

        match self.run(&input).await {
            Ok(result) => {
                log::info!("Analysis of {input} completed");
                self.state.complete(result)?;
            }
            Err(error) => {
                let error = error.classify();
                log::warn!("Analysis of {input} failed: {error}");
                self.state.fail(error.user_message())?;
            }
        }
        self.notify();
        Ok(&self.state)
    }

    /// Return to `idle` from `completed` or `error`.
    ///
    /// A reset while already `idle` changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoryboardError::InvalidTransition`] while a submission is in
    /// flight.
    pub fn reset(&mut self) -> Result<&AppState, StoryboardError> {
        let before = self.state.status();
        self.state.reset()?;
        if before != self.state.status() {
            self.notify();
        }
        Ok(&self.state)
    }

    /// See [`AppState::copy_all_prompts`].
    ///
    /// # Errors
    ///
    /// Returns any error from writing to `sink`.
    pub fn copy_all_prompts<W: Write>(&self, sink: &mut W) -> io::Result<bool> {
        self.state.copy_all_prompts(sink)
    }

    /// See [`AppState::download_json`].
    ///
    /// # Errors
    ///
    /// Returns an error if the export file cannot be written.
    pub fn download_json(&self, directory: &Path) -> Result<Option<PathBuf>, StoryboardError> {
        self.state.download_json(directory)
    }

    async fn run(&mut self, input: &VideoInput) -> Result<AnalysisResult, StoryboardError> {
        let video = fetch::resolve(&self.http, input).await?;

        self.state.begin_analysis()?;
        self.notify();

        let pipeline = analyze_video(&self.provider, Arc::clone(&self.sampler), video);
        with_status_messages(pipeline, self.status_interval, &self.observers).await
    }

    fn notify(&self) {
        for observer in &self.observers {
            observer.on_transition(&self.state);
        }
    }
}

/// Sample `video`, hand the batch to `provider` and report coverage.
async fn analyze_video<P, S>(
    provider: &P,
    sampler: Arc<S>,
    video: LocalVideo,
) -> Result<AnalysisResult, StoryboardError>
where
    P: AnalysisProvider,
    S: VideoSampler,
{
    let batch = sample_async(sampler, video).await?;
    let duration = batch.duration();
    let result = provider.analyze(batch).await?;

    let coverage = result.coverage(duration);
    if !coverage.is_complete() {
        log::warn!(
            "Segments cover the video up to {:.1}s of {:.1}s",
            coverage.covered_until,
            duration
        );
    }
    Ok(result)
}

/// Await `future`, pushing the next status phrase to `observers` and the log
/// every `interval`, starting immediately.
async fn with_status_messages<F: Future>(
    future: F,
    interval: Duration,
    observers: &[Arc<dyn StateObserver>],
) -> F::Output {
    tokio::pin!(future);
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut phrases = STATUS_MESSAGES.iter().cycle();

    loop {
        tokio::select! {
            biased;
            output = &mut future => return output,
            _ = ticker.tick() => {
                if let Some(message) = phrases.next() {
                    log::info!("{message}");
                    for observer in observers {
                        observer.on_status_message(message);
                    }
                }
            }
        }
    }
}
