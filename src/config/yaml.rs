use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override the environment.
///
/// # Example YAML structure
/// ```yaml
/// token:
///   url: "http://localhost:8080/token"
///   timeout_seconds: 10
///   overrides:
///     model: "models/gemini-2.5-flash-native-audio-preview-09-2025"
///     voice: "Zephyr"
///
/// session:
///   ws_endpoint: "wss://generativelanguage.googleapis.com/ws/..."
///   capture_sample_rate: 16000
///   capture_block_size: 4096
///   connect_timeout_seconds: 10
///
/// playback:
///   lead_time_ms: 180
///   fallback_sample_rate: 24000
///
/// vad:
///   threshold: 0.017
///   hold_ms: 320
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub token: Option<TokenYaml>,
    pub session: Option<SessionYaml>,
    pub playback: Option<PlaybackYaml>,
    pub vad: Option<VadYaml>,
}

/// Token endpoint configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TokenYaml {
    pub url: Option<String>,
    pub timeout_seconds: Option<u64>,
    /// JSON body sent to the token endpoint (model, voice, setup overrides)
    pub overrides: Option<serde_json::Value>,
}

/// Session configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    pub ws_endpoint: Option<String>,
    pub capture_sample_rate: Option<u32>,
    pub capture_block_size: Option<usize>,
    pub connect_timeout_seconds: Option<u64>,
}

/// Playback configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PlaybackYaml {
    pub lead_time_ms: Option<u64>,
    pub fallback_sample_rate: Option<u32>,
}

/// Speech detection configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VadYaml {
    /// RMS energy threshold (0.0 - 1.0)
    pub threshold: Option<f32>,
    /// Hold after the last loud block (ms)
    pub hold_ms: Option<u64>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
