//! VAD configuration types

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default RMS energy above which a block counts as speech.
pub const DEFAULT_SPEECH_THRESHOLD: f32 = 0.017;

/// Default time speech is held after the last loud block.
pub const DEFAULT_HOLD_MS: u64 = 320;

/// Configuration for energy-based speech activity detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VADConfig {
    /// RMS energy threshold (0.0 - 1.0)
    /// Lower values react to quieter speech but also to room noise
    pub threshold: f32,

    /// How long speech is considered ongoing after the last block above
    /// the threshold (ms). Bridges short pauses inside a phrase.
    pub hold_ms: u64,
}

impl Default for VADConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SPEECH_THRESHOLD,
            hold_ms: DEFAULT_HOLD_MS,
        }
    }
}

impl VADConfig {
    /// Create a new VADConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a VADConfig for noisy rooms (louder speech required, longer hold)
    pub fn noisy_environment() -> Self {
        Self {
            threshold: 0.04,
            hold_ms: 450,
        }
    }

    /// Hold duration as a `Duration`
    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            anyhow::bail!("VAD threshold must be between 0.0 and 1.0");
        }
        if self.hold_ms > 10_000 {
            anyhow::bail!("VAD hold_ms must not exceed 10000");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VADConfig::default();
        assert_eq!(config.threshold, 0.017);
        assert_eq!(config.hold_ms, 320);
        assert_eq!(config.hold_duration(), Duration::from_millis(320));
    }

    #[test]
    fn test_validate_threshold() {
        let mut config = VADConfig::default();
        assert!(config.validate().is_ok());

        config.threshold = -0.1;
        assert!(config.validate().is_err());

        config.threshold = 1.1;
        assert!(config.validate().is_err());

        config.threshold = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_hold() {
        let mut config = VADConfig::noisy_environment();
        assert!(config.validate().is_ok());

        config.hold_ms = 60_000;
        assert!(config.validate().is_err());
    }
}
