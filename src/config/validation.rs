use url::Url;

use crate::core::session::{SessionConfig, TokenEndpointConfig};

/// Largest accepted capture block (samples)
const MAX_CAPTURE_BLOCK_SIZE: usize = 65536;

/// Largest accepted sample rate (Hz)
const MAX_SAMPLE_RATE: u32 = 192_000;

/// Validate the token endpoint settings
///
/// The endpoint must be an absolute http(s) URL and the timeout non-zero.
pub fn validate_token_endpoint(
    config: &TokenEndpointConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(&config.url)
        .map_err(|e| format!("Invalid token endpoint '{}': {e}", config.url))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!(
            "Token endpoint must use http or https, got '{}'",
            url.scheme()
        )
        .into());
    }
    if config.timeout_seconds == 0 {
        return Err("Token timeout_seconds must be greater than 0".into());
    }
    if !config.overrides.is_object() {
        return Err("Token overrides must be a JSON object".into());
    }
    Ok(())
}

/// Validate session, playback and speech detection settings
pub fn validate_session(config: &SessionConfig) -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(&config.ws_endpoint)
        .map_err(|e| format!("Invalid socket endpoint '{}': {e}", config.ws_endpoint))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(format!(
            "Socket endpoint must use ws or wss, got '{}'",
            url.scheme()
        )
        .into());
    }

    if config.capture_sample_rate == 0 || config.capture_sample_rate > MAX_SAMPLE_RATE {
        return Err(format!(
            "capture_sample_rate must be between 1 and {MAX_SAMPLE_RATE}, got {}",
            config.capture_sample_rate
        )
        .into());
    }
    if config.capture_block_size == 0 || config.capture_block_size > MAX_CAPTURE_BLOCK_SIZE {
        return Err(format!(
            "capture_block_size must be between 1 and {MAX_CAPTURE_BLOCK_SIZE}, got {}",
            config.capture_block_size
        )
        .into());
    }
    if config.connect_timeout_seconds == 0 {
        return Err("connect_timeout_seconds must be greater than 0".into());
    }

    config
        .vad
        .validate()
        .map_err(|e| format!("Invalid vad configuration: {e}"))?;
    config
        .playback
        .validate()
        .map_err(|e| format!("Invalid playback configuration: {e}"))?;
    Ok(())
}
