//! The external analysis provider.
//!
//! [`AnalysisProvider`] is the seam between the orchestrator and whatever
//! multimodal model turns a [`FrameBatch`] into an [`AnalysisResult`]. The
//! shipped implementation, [`GeminiProvider`], posts every frame as inline
//! base64 image data to the Generative Language `generateContent` endpoint
//! together with an instruction prompt and a JSON response schema, and parses
//! the model's JSON answer.
//!
//! A call is a single request: no streaming, no partial results, no retry.

use std::{future::Future, time::Duration};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    analysis::AnalysisResult, conversion::format_clock, error::StoryboardError, frame::FrameBatch,
};

/// Default Generative Language API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Default HTTP timeout. Analysing a few hundred frames routinely takes
/// minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Turns a sampled video into a structured storyboard.
///
/// The batch is moved into the call; the caller keeps no copy of the frames.
pub trait AnalysisProvider: Send + Sync + 'static {
    /// Analyse `batch` and return the structured result.
    fn analyze(
        &self,
        batch: FrameBatch,
    ) -> impl Future<Output = Result<AnalysisResult, StoryboardError>> + Send;
}

/// Connection settings for [`GeminiProvider`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API host, without a trailing path.
    pub base_url: String,
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Model name, e.g. `gemini-2.5-pro`.
    pub model: String,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            temperature: 0.4,
        }
    }
}

impl ProviderConfig {
    /// Create a config with the given API key and default everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Read the config from the environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `GEMINI_API_KEY`, then `API_KEY` | required |
    /// | `GEMINI_MODEL` | [`DEFAULT_MODEL`] |
    /// | `GEMINI_BASE_URL` | [`DEFAULT_BASE_URL`] |
    /// | `GEMINI_TIMEOUT_SECS` | 900 |
    ///
    /// # Errors
    ///
    /// Returns [`StoryboardError::Configuration`] if no API key is set.
    pub fn from_env() -> Result<Self, StoryboardError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                StoryboardError::Configuration(
                    "set GEMINI_API_KEY (or API_KEY) to call the analysis provider".to_string(),
                )
            })?;

        let defaults = Self::default();
        Ok(Self {
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            timeout: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            temperature: defaults.temperature,
        })
    }

    /// Set the API host.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// [`AnalysisProvider`] backed by the Gemini `generateContent` REST API.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    http: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    /// Build a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`StoryboardError::Configuration`] if the API key is empty or
    /// the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, StoryboardError> {
        if config.api_key.trim().is_empty() {
            return Err(StoryboardError::Configuration(
                "analysis provider API key is empty".to_string(),
            ));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| StoryboardError::Configuration(error.to_string()))?;
        Ok(Self { http, config })
    }

    /// Build a provider from [`ProviderConfig::from_env`].
    ///
    /// # Errors
    ///
    /// See [`ProviderConfig::from_env`] and [`GeminiProvider::new`].
    pub fn from_env() -> Result<Self, StoryboardError> {
        Self::new(ProviderConfig::from_env()?)
    }

    /// The provider's settings.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

impl AnalysisProvider for GeminiProvider {
    async fn analyze(&self, batch: FrameBatch) -> Result<AnalysisResult, StoryboardError> {
        let frame_count = batch.len();
        let request = build_request(batch, self.config.temperature);
        let url = self.config.endpoint();

        log::info!(
            "Sending {} frames to {} ({})",
            frame_count,
            self.config.model,
            url
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            log::warn!("Analysis provider returned {status}: {message}");
            return Err(StoryboardError::Provider(format!("HTTP {status}: {message}")));
        }

        let response: GenerateContentResponse = serde_json::from_str(&body).map_err(|error| {
            StoryboardError::Provider(format!("unexpected response body: {error}"))
        })?;
        let text = response.into_text()?;
        let result = parse_analysis(&text)?;

        log::info!(
            "Analysis returned {} characters and {} segments",
            result.characters.len(),
            result.segments.len()
        );
        Ok(result)
    }
}

/// Strip a Markdown code fence, if any, and parse the analysis JSON.
///
/// # Errors
///
/// Returns [`StoryboardError::Provider`] if the text is not a valid
/// [`AnalysisResult`].
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, StoryboardError> {
    let json_text = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(json_text)
        .map_err(|error| StoryboardError::Provider(format!("malformed analysis JSON: {error}")))
}

/// The instruction sent after the frames.
fn instruction(duration: f64, frame_count: usize, interval: f64) -> String {
    format!(
        "You are given {frame_count} frames sampled every {interval:.2} seconds from a video that \
         is {duration:.1} seconds ({clock}) long. Each frame is preceded by its timestamp.\n\
         \n\
         Produce a continuity storyboard of the whole video:\n\
         - summary: the overall narrative.\n\
         - emotionalArc: how the emotional tone develops from start to finish.\n\
         - characters: every recurring person with a stable id, a name or role, a physical \
         description and their wardrobe. Reuse the same id whenever the same person appears.\n\
         - segments: consecutive segments in chronological order whose startTime/endTime \
         (mm:ss) cover the video from 00:00 to {clock} with no gaps (100% coverage). For each \
         segment give the characters present, each character's emotion, the scene, camera \
         motion, action, dominant emotion with an intensity from 0 to 1, a generation prompt \
         for the segment, and a transitionBridge describing how it hands over to the next \
         segment so the generated clips stay continuous.\n\
         - fullVideoPrompt: one prompt describing the entire video.\n\
         \n\
         Answer with JSON only.",
        clock = format_clock(duration),
    )
}

fn build_request(batch: FrameBatch, temperature: f32) -> GenerateContentRequest {
    let duration = batch.duration();
    let interval = batch.interval();
    let frame_count = batch.len();
    let (frames, _) = batch.into_parts();

    let mut parts = Vec::with_capacity(frames.len() * 2 + 1);
    for frame in frames {
        parts.push(Part::Text {
            text: format!(
                "Frame {} at {}",
                frame.index() + 1,
                format_clock(frame.timestamp())
            ),
        });
        parts.push(Part::InlineData {
            inline_data: Blob {
                mime_type: frame.media_type().mime_type().to_string(),
                data: frame.to_base64(),
            },
        });
    }
    parts.push(Part::Text {
        text: instruction(duration, frame_count, interval),
    });

    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts,
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
            temperature,
        },
    }
}

/// JSON schema of [`AnalysisResult`] in the provider's OpenAPI subset.
///
/// Character emotions are requested as a list of `{characterId, emotion}`
/// because the schema language has no free-form maps.
fn response_schema() -> Value {
    let string = json!({ "type": "STRING" });
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": string,
            "emotionalArc": string,
            "characters": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": string,
                        "name": string,
                        "physicalDescription": string,
                        "wardrobe": string
                    },
                    "required": ["id", "name", "physicalDescription", "wardrobe"]
                }
            },
            "segments": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "startTime": string,
                        "endTime": string,
                        "charactersPresent": { "type": "ARRAY", "items": string },
                        "characterEmotions": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "characterId": string,
                                    "emotion": string
                                },
                                "required": ["characterId", "emotion"]
                            }
                        },
                        "sceneDescription": string,
                        "cameraMotion": string,
                        "action": string,
                        "dominantEmotion": string,
                        "emotionIntensity": { "type": "NUMBER" },
                        "transitionBridge": string,
                        "generatedPrompt": string
                    },
                    "required": [
                        "startTime",
                        "endTime",
                        "charactersPresent",
                        "sceneDescription",
                        "cameraMotion",
                        "action",
                        "dominantEmotion",
                        "emotionIntensity",
                        "transitionBridge",
                        "generatedPrompt"
                    ]
                }
            },
            "fullVideoPrompt": string
        },
        "required": ["summary", "emotionalArc", "characters", "segments", "fullVideoPrompt"]
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String, StoryboardError> {
        let block_reason = self.prompt_feedback.and_then(|feedback| feedback.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(StoryboardError::Provider(match block_reason {
                Some(reason) => format!("request was blocked ({reason})"),
                None => "response contained no candidates".to_string(),
            }));
        };

        if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
            return Err(StoryboardError::Provider(
                "response was cut off at the output token limit".to_string(),
            ));
        }

        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            return Err(StoryboardError::Provider(format!(
                "response contained no text (finish reason {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;
    use crate::frame::Frame;

    #[test]
    fn strips_code_fences() {
        let text = "```json\n{\"summary\":\"s\",\"emotionalArc\":\"a\",\"fullVideoPrompt\":\"p\"}\n```";
        let result = parse_analysis(text).unwrap();
        assert_eq!(result.summary, "s");
        assert!(result.segments.is_empty());
    }

    #[test]
    fn malformed_json_is_a_provider_error() {
        let error = parse_analysis("not json").unwrap_err();
        assert!(matches!(error, StoryboardError::Provider(_)));
    }

    #[test]
    fn request_interleaves_labels_and_images() {
        let image = RgbImage::new(4, 2);
        let frames = (0..3)
            .map(|index| Frame::encode_jpeg(index, index as f64 * 2.0, &image, 45).unwrap())
            .collect();
        let request = build_request(FrameBatch::new(frames, 6.0), 0.4);
        let value = serde_json::to_value(&request).unwrap();

        let parts = value["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 7);
        assert_eq!(parts[0]["text"], "Frame 1 at 00:00");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[2]["text"], "Frame 2 at 00:02");
        assert!(parts[6]["text"].as_str().unwrap().contains("100% coverage"));
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let error = response.into_text().unwrap_err();
        assert!(error.to_string().contains("SAFETY"));
    }
}
