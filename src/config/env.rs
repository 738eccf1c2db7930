use std::env;
use std::str::FromStr;

use crate::core::session::{
    DEFAULT_CAPTURE_BLOCK_SIZE, DEFAULT_CAPTURE_SAMPLE_RATE, DEFAULT_CONNECT_TIMEOUT_SECONDS,
    DEFAULT_TOKEN_ENDPOINT, DEFAULT_TOKEN_TIMEOUT_SECONDS, DEFAULT_WS_ENDPOINT,
};
use crate::core::playback::{DEFAULT_FALLBACK_SAMPLE_RATE, DEFAULT_LEAD_TIME_MS};
use crate::core::vad::{DEFAULT_HOLD_MS, DEFAULT_SPEECH_THRESHOLD};

/// Values read from the environment, with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct EnvConfig {
    pub token_endpoint: String,
    pub token_timeout_seconds: u64,
    pub ws_endpoint: String,
    pub capture_sample_rate: u32,
    pub capture_block_size: usize,
    pub connect_timeout_seconds: u64,
    pub playback_lead_time_ms: u64,
    pub playback_fallback_sample_rate: u32,
    pub speech_threshold: f32,
    pub speech_hold_ms: u64,
}

impl EnvConfig {
    /// Read every supported variable, falling back to defaults for unset ones
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            token_endpoint: env_string("TOKEN_ENDPOINT", DEFAULT_TOKEN_ENDPOINT),
            token_timeout_seconds: env_parse("TOKEN_TIMEOUT_SECONDS", DEFAULT_TOKEN_TIMEOUT_SECONDS)?,
            ws_endpoint: env_string("WS_ENDPOINT", DEFAULT_WS_ENDPOINT),
            capture_sample_rate: env_parse("CAPTURE_SAMPLE_RATE", DEFAULT_CAPTURE_SAMPLE_RATE)?,
            capture_block_size: env_parse("CAPTURE_BLOCK_SIZE", DEFAULT_CAPTURE_BLOCK_SIZE)?,
            connect_timeout_seconds: env_parse(
                "CONNECT_TIMEOUT_SECONDS",
                DEFAULT_CONNECT_TIMEOUT_SECONDS,
            )?,
            playback_lead_time_ms: env_parse("PLAYBACK_LEAD_TIME_MS", DEFAULT_LEAD_TIME_MS)?,
            playback_fallback_sample_rate: env_parse(
                "PLAYBACK_FALLBACK_SAMPLE_RATE",
                DEFAULT_FALLBACK_SAMPLE_RATE,
            )?,
            speech_threshold: env_parse("SPEECH_THRESHOLD", DEFAULT_SPEECH_THRESHOLD)?,
            speech_hold_ms: env_parse("SPEECH_HOLD_MS", DEFAULT_HOLD_MS)?,
        })
    }
}

/// Non-empty value of `name`, else `default`
fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parsed value of `name`, else `default`. A set but unparsable value is an error.
fn env_parse<T>(name: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|e| format!("Invalid value for {name} ('{value}'): {e}").into()),
        _ => Ok(default),
    }
}
