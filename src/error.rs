//! Error types for the `storyboard-continuity` crate.
//!
//! This module defines [`StoryboardError`], the unified error type returned by
//! every fallible operation in the crate, from opening a video through to the
//! provider call. The orchestrator never hands these values to presentation
//! directly: it reduces them to a single human-readable line with
//! [`StoryboardError::user_message`].

use std::io::Error as IoError;

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::state::AnalysisStatus;

/// Message shown in place of any failure that looks like a size or memory
/// limit being hit.
pub const RESOURCE_LIMIT_MESSAGE: &str =
    "Memory overflow: the video is too large to analyze. Try a shorter file.";

/// Lowercase fragments that mark a failure message as a resource-limit
/// condition.
///
/// Matched against the failure detail only, with paths and URLs removed.
const RESOURCE_LIMIT_INDICATORS: &[&str] = &[
    "out of memory",
    "cannot allocate",
    "allocation failed",
    "invalid string length",
    "too large",
    "size exceeds",
    "exceeds the limit",
    "quota",
    "resource exhausted",
    "resource has been exhausted",
];

/// The unified error type for all `storyboard-continuity` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoryboardError {
    /// The video could not be loaded or decoded.
    #[error("Failed to decode video: {0}")]
    Decode(String),

    /// A remote video could not be downloaded.
    #[error("Failed to fetch video: {0}")]
    Fetch(String),

    /// The analysis provider failed or returned data that could not be used.
    #[error("Analysis provider error: {0}")]
    Provider(String),

    /// A failure whose message points at size or memory exhaustion.
    ///
    /// Carries the original message for logging; its display text is always
    /// [`RESOURCE_LIMIT_MESSAGE`].
    #[error("{RESOURCE_LIMIT_MESSAGE}")]
    ResourceLimit(String),

    /// A lifecycle transition was requested from a state that does not allow
    /// it.
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition {
        /// The state the machine was in.
        from: AnalysisStatus,
        /// The state that was requested.
        to: AnalysisStatus,
    },

    /// Provider or CLI configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// A sampled frame could not be encoded.
    #[error("Image encoding error: {0}")]
    Image(#[from] ImageError),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<FfmpegError> for StoryboardError {
    fn from(error: FfmpegError) -> Self {
        StoryboardError::Decode(format!("FFmpeg error: {error}"))
    }
}

impl From<reqwest::Error> for StoryboardError {
    fn from(error: reqwest::Error) -> Self {
        StoryboardError::Provider(error.to_string())
    }
}

impl StoryboardError {
    /// Returns `true` if the error text suggests a size or memory limit was
    /// reached somewhere in the pipeline.
    pub fn indicates_resource_limit(&self) -> bool {
        match self {
            StoryboardError::ResourceLimit(_) => true,
            StoryboardError::InvalidTransition { .. } => false,
            _ => {
                let detail = strip_locations(&self.detail()).to_ascii_lowercase();
                RESOURCE_LIMIT_INDICATORS
                    .iter()
                    .any(|indicator| detail.contains(indicator))
            }
        }
    }

    /// The underlying failure text, without the variant's display prefix.
    fn detail(&self) -> String {
        match self {
            StoryboardError::Decode(detail)
            | StoryboardError::Fetch(detail)
            | StoryboardError::Provider(detail)
            | StoryboardError::ResourceLimit(detail)
            | StoryboardError::Configuration(detail) => detail.clone(),
            StoryboardError::Io(error) => error.to_string(),
            StoryboardError::Image(error) => error.to_string(),
            StoryboardError::Json(error) => error.to_string(),
            StoryboardError::InvalidTransition { .. } => String::new(),
        }
    }

    /// Reclassify the error as [`StoryboardError::ResourceLimit`] when its
    /// message carries a size/memory indicator.
    pub fn classify(self) -> Self {
        if matches!(self, StoryboardError::ResourceLimit(_)) || !self.indicates_resource_limit() {
            return self;
        }
        StoryboardError::ResourceLimit(self.to_string())
    }

    /// The single line stored in `AppState::error` for this failure.
    ///
    /// Resource-limit failures collapse to [`RESOURCE_LIMIT_MESSAGE`]; decode
    /// failures carry a hint about container and codec support; everything
    /// else is surfaced verbatim.
    pub fn user_message(&self) -> String {
        if self.indicates_resource_limit() {
            return RESOURCE_LIMIT_MESSAGE.to_string();
        }
        match self {
            StoryboardError::Decode(_) => format!(
                "{self}. Check that the file is a valid MP4, MOV or WebM video with a supported codec."
            ),
            _ => self.to_string(),
        }
    }
}

/// Drop quoted spans and path- or URL-like words so that a file called
/// `memory_lane.mp4` cannot look like an out-of-memory failure.
fn strip_locations(detail: &str) -> String {
    let mut unquoted = String::with_capacity(detail.len());
    let mut in_quotes = false;
    for character in detail.chars() {
        if character == '"' {
            in_quotes = !in_quotes;
            unquoted.push(' ');
        } else if !in_quotes {
            unquoted.push(character);
        }
    }

    unquoted
        .split_whitespace()
        .filter(|word| !looks_like_location(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn looks_like_location(word: &str) -> bool {
    let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != '\\');
    word.contains('/') || word.contains('\\') || word.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_failure_is_a_resource_limit() {
        let error = StoryboardError::Provider("Array buffer allocation failed".to_string());
        assert!(error.indicates_resource_limit());
        assert_eq!(error.user_message(), RESOURCE_LIMIT_MESSAGE);
    }

    #[test]
    fn invalid_string_length_is_a_resource_limit() {
        let error = StoryboardError::Provider("RangeError: Invalid string LENGTH".to_string());
        assert!(matches!(error.classify(), StoryboardError::ResourceLimit(_)));
    }

    #[test]
    fn fetch_failures_are_verbatim() {
        let error = StoryboardError::Fetch("HTTP 404 Not Found".to_string());
        assert_eq!(error.user_message(), "Failed to fetch video: HTTP 404 Not Found");
    }

    #[test]
    fn decode_failures_mention_codecs() {
        let error = StoryboardError::Decode("Invalid data found".to_string());
        let message = error.user_message();
        assert!(message.starts_with("Failed to decode video: Invalid data found"));
        assert!(message.contains("codec"));
    }

    #[test]
    fn file_names_do_not_count_as_indicators() {
        let error = StoryboardError::Decode(
            "cannot open \"/home/me/out of memory.mp4\": Invalid data found".to_string(),
        );
        assert!(!error.indicates_resource_limit());

        let error = StoryboardError::Decode("cannot open too_large.mp4: Invalid data".to_string());
        assert!(!error.indicates_resource_limit());
    }

    #[test]
    fn locations_are_stripped_but_words_are_kept() {
        assert_eq!(
            strip_locations("error sending request for url (http://host/payload.mp4) out of memory"),
            "error sending request for url out of memory"
        );
        assert_eq!(strip_locations("open \"my clip.mov\" failed."), "open failed.");
    }

    #[test]
    fn transitions_are_never_resource_limits() {
        let error = StoryboardError::InvalidTransition {
            from: AnalysisStatus::Analyzing,
            to: AnalysisStatus::Uploading,
        };
        assert!(!error.indicates_resource_limit());
    }
}
