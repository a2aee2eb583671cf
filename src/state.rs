//! The analysis lifecycle state.
//!
//! [`AppState`] is the one mutable record presentation reads. It moves
//! through `idle → uploading → analyzing → completed | error` and back to
//! `idle` on reset; the transition methods are crate-private so only the
//! [`Orchestrator`](crate::Orchestrator) can drive it, and each one checks
//! that it is legal from the current status.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{analysis::AnalysisResult, error::StoryboardError, export};

/// Lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// Nothing submitted yet, or reset after a finished run.
    #[default]
    Idle,
    /// Resolving the input into a local file.
    Uploading,
    /// Sampling frames and waiting for the provider.
    Analyzing,
    /// The provider returned a result.
    Completed,
    /// The run failed; see [`AppState::error`].
    Error,
}

impl AnalysisStatus {
    /// Returns `true` for `completed` and `error`.
    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Error)
    }

    /// Returns `true` while a submission is in flight.
    pub fn is_busy(self) -> bool {
        matches!(self, AnalysisStatus::Uploading | AnalysisStatus::Analyzing)
    }
}

impl Display for AnalysisStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            AnalysisStatus::Idle => "idle",
            AnalysisStatus::Uploading => "uploading",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Snapshot of the analysis lifecycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AppState {
    status: AnalysisStatus,
    progress: f32,
    result: Option<AnalysisResult>,
    error: Option<String>,
}

impl AppState {
    /// A fresh `idle` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    /// Reserved progress value. Always `0.0` at present.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// The analysis result, once `completed`.
    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    /// The user-facing failure message, once in `error`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn transition(
        &mut self,
        allowed_from: &[AnalysisStatus],
        to: AnalysisStatus,
    ) -> Result<(), StoryboardError> {
        if !allowed_from.contains(&self.status) {
            return Err(StoryboardError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        log::debug!("State {} -> {}", self.status, to);
        self.status = to;
        Ok(())
    }

    pub(crate) fn begin_upload(&mut self) -> Result<(), StoryboardError> {
        self.transition(&[AnalysisStatus::Idle], AnalysisStatus::Uploading)
    }

    pub(crate) fn begin_analysis(&mut self) -> Result<(), StoryboardError> {
        self.transition(&[AnalysisStatus::Uploading], AnalysisStatus::Analyzing)
    }

    pub(crate) fn complete(&mut self, result: AnalysisResult) -> Result<(), StoryboardError> {
        self.transition(&[AnalysisStatus::Analyzing], AnalysisStatus::Completed)?;
        self.result = Some(result);
        self.error = None;
        Ok(())
    }

    pub(crate) fn fail(&mut self, message: String) -> Result<(), StoryboardError> {
        self.transition(
            &[AnalysisStatus::Uploading, AnalysisStatus::Analyzing],
            AnalysisStatus::Error,
        )?;
        self.result = None;
        self.error = Some(message);
        Ok(())
    }

    /// Return to `idle`, dropping any result or error.
    ///
    /// Legal from `completed` and `error`; a reset while already `idle` is
    /// a no-op.
    pub(crate) fn reset(&mut self) -> Result<(), StoryboardError> {
        if self.status.is_busy() {
            return Err(StoryboardError::InvalidTransition {
                from: self.status,
                to: AnalysisStatus::Idle,
            });
        }
        if self.status.is_terminal() {
            log::debug!("State {} -> {}", self.status, AnalysisStatus::Idle);
            *self = Self::default();
        }
        Ok(())
    }

    /// Write every segment prompt to `sink` in the clipboard text format.
    ///
    /// Returns `false` without touching `sink` when there is no result.
    ///
    /// # Errors
    ///
    /// Returns any error from writing to `sink`.
    pub fn copy_all_prompts<W: Write>(&self, sink: &mut W) -> io::Result<bool> {
        let Some(result) = &self.result else {
            return Ok(false);
        };
        sink.write_all(export::format_prompts(result).as_bytes())?;
        sink.flush()?;
        Ok(true)
    }

    /// Write the JSON export into `directory`.
    ///
    /// Returns `Ok(None)` without creating anything when there is no result.
    ///
    /// # Errors
    ///
    /// Returns [`StoryboardError::Io`] or [`StoryboardError::Json`] if the
    /// export cannot be written.
    pub fn download_json(&self, directory: &Path) -> Result<Option<PathBuf>, StoryboardError> {
        match &self.result {
            Some(result) => export::write_json_export(result, directory).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [AnalysisStatus; 5] = [
        AnalysisStatus::Idle,
        AnalysisStatus::Uploading,
        AnalysisStatus::Analyzing,
        AnalysisStatus::Completed,
        AnalysisStatus::Error,
    ];

    #[test]
    fn busy_and_terminal_partition_the_non_idle_states() {
        for status in ALL {
            let expected_busy = matches!(status, AnalysisStatus::Uploading | AnalysisStatus::Analyzing);
            let expected_terminal = matches!(status, AnalysisStatus::Completed | AnalysisStatus::Error);
            assert_eq!(status.is_busy(), expected_busy, "{status}");
            assert_eq!(status.is_terminal(), expected_terminal, "{status}");
            assert!(!(status.is_busy() && status.is_terminal()));
        }
        assert!(!AnalysisStatus::Idle.is_busy());
        assert!(!AnalysisStatus::Idle.is_terminal());
    }

    #[test]
    fn reset_is_rejected_while_busy() {
        let mut state = AppState::new();
        state.begin_upload().unwrap();
        assert!(state.status().is_busy());

        let error = state.reset().unwrap_err();
        assert!(matches!(
            error,
            StoryboardError::InvalidTransition {
                from: AnalysisStatus::Uploading,
                to: AnalysisStatus::Idle,
            }
        ));
        assert_eq!(state.status(), AnalysisStatus::Uploading);
    }

    #[test]
    fn reset_from_a_terminal_state_clears_everything() {
        let mut state = AppState::new();
        state.begin_upload().unwrap();
        state.fail("boom".to_string()).unwrap();
        assert!(state.status().is_terminal());

        state.reset().unwrap();
        assert_eq!(state.status(), AnalysisStatus::Idle);
        assert!(state.error().is_none());
    }
}
