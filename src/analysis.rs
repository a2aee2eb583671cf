//! The structured storyboard returned by the analysis provider.
//!
//! Field names follow the provider's camelCase JSON contract so a response
//! body deserializes directly and the JSON export round-trips it unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::coverage::{self, CoverageReport};

/// Complete analysis of one video.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Global narrative summary.
    pub summary: String,
    /// How the emotional tone develops across the video.
    pub emotional_arc: String,
    /// Recurring characters.
    #[serde(default)]
    pub characters: Vec<Character>,
    /// Temporally ordered segments.
    #[serde(default)]
    pub segments: Vec<VideoSegment>,
    /// One prompt describing the whole video.
    pub full_video_prompt: String,
}

/// A recurring character with a stable identity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    /// Stable identifier referenced by segments.
    pub id: String,
    /// Display name or role.
    pub name: String,
    /// Face, build, hair and other physical traits.
    #[serde(default)]
    pub physical_description: String,
    /// Clothing and accessories.
    #[serde(default)]
    pub wardrobe: String,
}

/// A contiguous time range of the video with its annotations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSegment {
    /// Start timestamp as displayed, e.g. `"01:05"`.
    pub start_time: String,
    /// End timestamp as displayed.
    pub end_time: String,
    /// Ids of the characters on screen.
    #[serde(default)]
    pub characters_present: Vec<String>,
    /// Emotion per character id.
    #[serde(default, deserialize_with = "deserialize_emotions")]
    pub character_emotions: BTreeMap<String, String>,
    /// Setting, lighting and composition.
    #[serde(default)]
    pub scene_description: String,
    /// Camera framing and movement.
    #[serde(default)]
    pub camera_motion: String,
    /// What happens in the segment.
    #[serde(default)]
    pub action: String,
    /// Dominant emotion label.
    #[serde(default)]
    pub dominant_emotion: String,
    /// Strength of the dominant emotion.
    #[serde(default)]
    pub emotion_intensity: f64,
    /// How this segment hands over to the next one.
    #[serde(default)]
    pub transition_bridge: String,
    /// Generation prompt for this segment.
    #[serde(default)]
    pub generated_prompt: String,
}

impl AnalysisResult {
    /// Look up a character by id.
    pub fn character(&self, id: &str) -> Option<&Character> {
        self.characters.iter().find(|character| character.id == id)
    }

    /// Check how well the segments cover `[0, duration]`.
    pub fn coverage(&self, duration: f64) -> CoverageReport {
        coverage::check_coverage(&self.segments, duration)
    }
}

/// Provider-side shape for a single character emotion entry.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmotionEntry {
    character_id: String,
    emotion: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmotionsWire {
    Map(BTreeMap<String, String>),
    List(Vec<EmotionEntry>),
}

/// Accept either `{"id": "emotion"}` or `[{"characterId", "emotion"}]`.
///
/// Response schemas cannot always express free-form maps, so the request asks
/// for the list form while exports write the map form.
fn deserialize_emotions<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let wire = Option::<EmotionsWire>::deserialize(deserializer)?;
    Ok(match wire {
        None => BTreeMap::new(),
        Some(EmotionsWire::Map(map)) => map,
        Some(EmotionsWire::List(entries)) => entries
            .into_iter()
            .map(|entry| (entry.character_id, entry.emotion))
            .collect(),
    })
}
