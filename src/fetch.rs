//! Video input resolution.
//!
//! A submission names either a local file or a remote URL. Remote videos are
//! downloaded in full into a temporary file before sampling starts; the
//! temporary file is removed when the [`LocalVideo`] holding it is dropped.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::Write,
    path::{Path, PathBuf},
};

use reqwest::{Client, Url};
use tempfile::NamedTempFile;

use crate::error::StoryboardError;

/// Where a video comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoInput {
    /// A file on the local filesystem.
    File(PathBuf),
    /// An `http` or `https` URL resolving to a video.
    Url(Url),
}

impl VideoInput {
    /// Interpret a command-line style argument.
    ///
    /// Anything that parses as an `http`/`https` URL is remote; everything
    /// else is treated as a path.
    pub fn parse(value: &str) -> Self {
        match Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => VideoInput::Url(url),
            _ => VideoInput::File(PathBuf::from(value)),
        }
    }

    /// Returns `true` for [`VideoInput::Url`].
    pub fn is_remote(&self) -> bool {
        matches!(self, VideoInput::Url(_))
    }
}

impl From<PathBuf> for VideoInput {
    fn from(path: PathBuf) -> Self {
        VideoInput::File(path)
    }
}

impl From<&Path> for VideoInput {
    fn from(path: &Path) -> Self {
        VideoInput::File(path.to_path_buf())
    }
}

impl From<Url> for VideoInput {
    fn from(url: Url) -> Self {
        VideoInput::Url(url)
    }
}

impl Display for VideoInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VideoInput::File(path) => write!(f, "{}", path.display()),
            VideoInput::Url(url) => write!(f, "{url}"),
        }
    }
}

/// A video that is readable from the local filesystem.
#[derive(Debug)]
pub enum LocalVideo {
    /// A caller-owned file, left untouched.
    Path(PathBuf),
    /// A downloaded copy, deleted on drop.
    Temporary(NamedTempFile),
}

impl AsRef<Path> for LocalVideo {
    fn as_ref(&self) -> &Path {
        match self {
            LocalVideo::Path(path) => path,
            LocalVideo::Temporary(file) => file.path(),
        }
    }
}

/// Turn `input` into a local file, downloading it first if it is remote.
///
/// # Errors
///
/// Returns [`StoryboardError::Decode`] if a local path does not exist and
/// [`StoryboardError::Fetch`] if the download fails.
pub async fn resolve(client: &Client, input: &VideoInput) -> Result<LocalVideo, StoryboardError> {
    match input {
        VideoInput::File(path) => {
            if !path.is_file() {
                return Err(StoryboardError::Decode(format!(
                    "no such file \"{}\"",
                    path.display()
                )));
            }
            Ok(LocalVideo::Path(path.clone()))
        }
        VideoInput::Url(url) => fetch_to_tempfile(client, url)
            .await
            .map(LocalVideo::Temporary),
    }
}

/// Download `url` in full into a new temporary file.
///
/// The body is written chunk by chunk so it is never held in memory as one
/// buffer. Nothing is retried.
///
/// # Errors
///
/// Returns [`StoryboardError::Fetch`] on transport failure, a non-success
/// status, or a failed write.
pub async fn fetch_to_tempfile(client: &Client, url: &Url) -> Result<NamedTempFile, StoryboardError> {
    log::info!("Fetching video from {url}");

    let mut response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|error| StoryboardError::Fetch(error.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(StoryboardError::Fetch(format!("HTTP {status}")));
    }

    let mut file = NamedTempFile::new()
        .map_err(|error| StoryboardError::Fetch(format!("cannot create temporary file: {error}")))?;
    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|error| StoryboardError::Fetch(error.to_string()))?
    {
        file.write_all(&chunk)
            .map_err(|error| StoryboardError::Fetch(format!("cannot write download: {error}")))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .map_err(|error| StoryboardError::Fetch(format!("cannot write download: {error}")))?;

    log::info!("Fetched {} KiB into {}", written / 1024, file.path().display());
    Ok(file)
}
