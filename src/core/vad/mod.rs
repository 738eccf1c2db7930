//! Voice Activity Detection (VAD) module
//!
//! Flags "user is speaking" from the energy of each captured block. The
//! session controller uses the speech start/end edges to silence model
//! playback while the user talks (barge-in).
//!
//! # Example
//!
//! ```rust
//! use duplex_voice::core::vad::{SpeechActivityDetector, VADConfig};
//!
//! let mut vad = SpeechActivityDetector::new(VADConfig::default());
//! let result = vad.process_block(&[0.3; 512]);
//!
//! assert!(result.speech_start);
//! ```

pub mod config;
pub mod detector;

pub use config::{DEFAULT_HOLD_MS, DEFAULT_SPEECH_THRESHOLD, VADConfig};
pub use detector::{SpeechActivityDetector, VADResult};
