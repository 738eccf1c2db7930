//! Default session configuration for the Live API.
//!
//! Token endpoints normally issue the `setup` object together with the
//! credential. This builder produces the same default shape so the CLI can
//! show what a session is configured with.

use serde_json::{Value, json};

/// Model used when none is requested
pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";

/// Prebuilt voice used when none is requested
pub const DEFAULT_VOICE: &str = "Zephyr";

pub const DEFAULT_MEDIA_RESOLUTION: &str = "MEDIA_RESOLUTION_LOW";

/// Context window compression: compress once this many tokens are used
pub const DEFAULT_TRIGGER_TOKENS: u64 = 25600;

/// Context window compression: sliding window target
pub const DEFAULT_TARGET_TOKENS: u64 = 12800;

/// Builds the `setup` message payload.
#[derive(Debug, Clone)]
pub struct SetupBuilder {
    model: String,
    voice: String,
}

impl Default for SetupBuilder {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }
}

impl SetupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank values keep the default.
    pub fn model(mut self, model: &str) -> Self {
        if !model.trim().is_empty() {
            self.model = model.trim().to_string();
        }
        self
    }

    /// Blank values keep the default.
    pub fn voice(mut self, voice: &str) -> Self {
        if !voice.trim().is_empty() {
            self.voice = voice.trim().to_string();
        }
        self
    }

    pub fn build(&self) -> Value {
        json!({
            "model": self.model,
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "mediaResolution": DEFAULT_MEDIA_RESOLUTION,
                "speechConfig": {
                    "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": self.voice } }
                },
            },
            "contextWindowCompression": {
                "triggerTokens": DEFAULT_TRIGGER_TOKENS,
                "slidingWindow": { "targetTokens": DEFAULT_TARGET_TOKENS },
            },
        })
    }
}
