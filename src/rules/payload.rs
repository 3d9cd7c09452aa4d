/// Display / voice content attached to a rule. The scheduler never looks
/// inside; it only hands the payload to the dispatch sink when a rule fires.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    /// Image reference understood by the UI (file name or asset key).
    pub image:   String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Full sentence, read out by the voice line and shown in the feed.
    pub text:       String,
    /// Shortened variant for in-game chat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_text: Option<String>,
    /// Key of the pre-recorded voice clip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_key:  Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon:       Option<Icon>,
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), short_text: None, audio_key: None, icon: None }
    }

    /// Chat line: the short text when there is one, otherwise the full text.
    pub fn chat_text(&self) -> &str {
        self.short_text.as_deref().unwrap_or(&self.text)
    }
}
