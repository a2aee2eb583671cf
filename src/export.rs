//! Prompt and JSON exports of an [`AnalysisResult`].
//!
//! Both exports are pure reads. The `AppState` wrappers
//! ([`copy_all_prompts`](crate::AppState::copy_all_prompts) and
//! [`download_json`](crate::AppState::download_json)) turn them into no-ops
//! when no result is present.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{analysis::AnalysisResult, error::StoryboardError};

/// File name used for the JSON export.
pub const EXPORT_FILE_NAME: &str = "storyboard_continuity_export.json";

/// Render every segment's prompt and transition bridge as plain text.
///
/// One block per segment, numbered from 1, joined by a blank line:
///
/// ```text
/// [Segment 1] 00:00-00:12
/// PROMPT: ...
/// BRIDGE: ...
/// ```
pub fn format_prompts(result: &AnalysisResult) -> String {
    result
        .segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            format!(
                "[Segment {}] {}-{}\nPROMPT: {}\nBRIDGE: {}",
                index + 1,
                segment.start_time,
                segment.end_time,
                segment.generated_prompt,
                segment.transition_bridge,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Pretty-printed JSON for the full result.
///
/// # Errors
///
/// Returns [`StoryboardError::Json`] if serialization fails.
pub fn to_pretty_json(result: &AnalysisResult) -> Result<String, StoryboardError> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Write the JSON export into `directory` and return the file path.
///
/// # Errors
///
/// Returns [`StoryboardError::Io`] if the directory cannot be created or the
/// file cannot be written.
pub fn write_json_export(
    result: &AnalysisResult,
    directory: &Path,
) -> Result<PathBuf, StoryboardError> {
    fs::create_dir_all(directory)?;
    let path = directory.join(EXPORT_FILE_NAME);
    fs::write(&path, to_pretty_json(result)?)?;
    log::info!("Wrote storyboard export to {}", path.display());
    Ok(path)
}
