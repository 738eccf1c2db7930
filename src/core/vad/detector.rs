//! Energy detector with hold-time hysteresis

use std::time::Instant;
use tracing::trace;

use super::config::VADConfig;
use crate::core::audio::rms_energy;

/// Result of VAD processing for a single audio block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VADResult {
    /// Whether the user is considered to be speaking after this block
    pub is_speech: bool,
    /// RMS energy of the block
    pub energy: f32,
    /// Whether speech just started (transition from silence to speech)
    pub speech_start: bool,
    /// Whether speech just ended (transition from speech to silence)
    pub speech_end: bool,
}

/// Per-block RMS detector used to flag "user is speaking".
///
/// A block at or above the threshold marks speech immediately. Speech only
/// ends once no loud block has been seen for longer than the hold time, so
/// short gaps inside a phrase do not toggle the state.
#[derive(Debug, Clone)]
pub struct SpeechActivityDetector {
    config: VADConfig,
    speaking: bool,
    last_active_at: Option<Instant>,
}

impl SpeechActivityDetector {
    pub fn new(config: VADConfig) -> Self {
        Self {
            config,
            speaking: false,
            last_active_at: None,
        }
    }

    /// Observe a block at the current time and return the speaking state.
    pub fn observe(&mut self, samples: &[f32]) -> bool {
        self.observe_at(samples, Instant::now())
    }

    /// Observe a block at `now` and return the speaking state.
    pub fn observe_at(&mut self, samples: &[f32], now: Instant) -> bool {
        self.process_block_at(samples, now).is_speech
    }

    /// Process a block at the current time, reporting edges.
    pub fn process_block(&mut self, samples: &[f32]) -> VADResult {
        self.process_block_at(samples, Instant::now())
    }

    /// Process a block at `now`, reporting edges.
    pub fn process_block_at(&mut self, samples: &[f32], now: Instant) -> VADResult {
        // An empty block carries no evidence either way
        if samples.is_empty() {
            return VADResult {
                is_speech: self.speaking,
                ..Default::default()
            };
        }

        let energy = rms_energy(samples);
        let was_speaking = self.speaking;

        if energy >= self.config.threshold {
            self.last_active_at = Some(now);
            self.speaking = true;
        } else if self.speaking {
            let held_for = self
                .last_active_at
                .map(|at| now.saturating_duration_since(at))
                .unwrap_or_default();
            if held_for > self.config.hold_duration() {
                self.speaking = false;
            }
        }

        if was_speaking != self.speaking {
            trace!(energy, speaking = self.speaking, "Speech activity changed");
        }

        VADResult {
            is_speech: self.speaking,
            energy,
            speech_start: !was_speaking && self.speaking,
            speech_end: was_speaking && !self.speaking,
        }
    }

    /// Check if currently in speech state
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Reset internal state (call when starting a new audio stream)
    pub fn reset(&mut self) {
        self.speaking = false;
        self.last_active_at = None;
    }

    /// Get the configuration
    pub fn config(&self) -> &VADConfig {
        &self.config
    }
}

impl Default for SpeechActivityDetector {
    fn default() -> Self {
        Self::new(VADConfig::default())
    }
}
