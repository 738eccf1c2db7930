pub mod audio;
pub mod devices;
pub mod playback;
pub mod session;
pub mod transcript;
pub mod vad;

// Re-export commonly used types for convenience
pub use audio::AudioBlock;

pub use playback::{
    AudioOutput, AudioOutputFactory, PlaybackConfig, PlaybackError, PlaybackScheduler,
    VirtualClock,
};

pub use session::{
    SessionComponents, SessionConfig, SessionController, SessionError, SessionHandle,
    SessionResult, SessionState, StatusUpdate, StatusVariant,
};

pub use transcript::{Speaker, TextMode, TranscriptAggregator, TranscriptUpdate};

pub use vad::{SpeechActivityDetector, VADConfig};
