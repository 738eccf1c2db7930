use super::ClientConfig;
use super::env::EnvConfig;
use super::yaml::YamlConfig;
use crate::core::playback::PlaybackConfig;
use crate::core::session::{SessionConfig, TokenEndpointConfig};
use crate::core::vad::VADConfig;

/// Build the configuration from the environment, then apply YAML overrides
pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let env = EnvConfig::load()?;

    let mut config = ClientConfig {
        token: TokenEndpointConfig {
            url: env.token_endpoint,
            timeout_seconds: env.token_timeout_seconds,
            ..TokenEndpointConfig::default()
        },
        session: SessionConfig {
            ws_endpoint: env.ws_endpoint,
            capture_sample_rate: env.capture_sample_rate,
            capture_block_size: env.capture_block_size,
            connect_timeout_seconds: env.connect_timeout_seconds,
            vad: VADConfig {
                threshold: env.speech_threshold,
                hold_ms: env.speech_hold_ms,
            },
            playback: PlaybackConfig {
                lead_time_ms: env.playback_lead_time_ms,
                fallback_sample_rate: env.playback_fallback_sample_rate,
            },
        },
    };

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(token) = yaml.token {
        if let Some(url) = token.url {
            config.token.url = url;
        }
        if let Some(timeout) = token.timeout_seconds {
            config.token.timeout_seconds = timeout;
        }
        if let Some(overrides) = token.overrides {
            if !overrides.is_object() {
                return Err("token.overrides must be a mapping".into());
            }
            config.token.overrides = overrides;
        }
    }

    if let Some(session) = yaml.session {
        if let Some(endpoint) = session.ws_endpoint {
            config.session.ws_endpoint = endpoint;
        }
        if let Some(rate) = session.capture_sample_rate {
            config.session.capture_sample_rate = rate;
        }
        if let Some(block_size) = session.capture_block_size {
            config.session.capture_block_size = block_size;
        }
        if let Some(timeout) = session.connect_timeout_seconds {
            config.session.connect_timeout_seconds = timeout;
        }
    }

    if let Some(playback) = yaml.playback {
        if let Some(lead) = playback.lead_time_ms {
            config.session.playback.lead_time_ms = lead;
        }
        if let Some(rate) = playback.fallback_sample_rate {
            config.session.playback.fallback_sample_rate = rate;
        }
    }

    if let Some(vad) = yaml.vad {
        if let Some(threshold) = vad.threshold {
            config.session.vad.threshold = threshold;
        }
        if let Some(hold) = vad.hold_ms {
            config.session.vad.hold_ms = hold;
        }
    }

    Ok(config)
}
