//! Playback of model audio.
//!
//! [`PlaybackScheduler`] turns inbound base64 PCM16 payloads into segments
//! and lines them up gaplessly on an [`AudioOutput`] clock. The clock is
//! either a real device (see `core::devices`) or the manually driven
//! [`VirtualClock`].

pub mod output;
pub mod scheduler;
pub mod virtual_clock;

pub use output::{
    AudioOutput, AudioOutputFactory, PlaybackError, PlaybackResult, PlaybackSegment, SourceId,
};
pub use scheduler::{
    DEFAULT_FALLBACK_SAMPLE_RATE, DEFAULT_LEAD_TIME_MS, PlaybackConfig, PlaybackScheduler,
    ScheduledSource,
};
pub use virtual_clock::{ScheduledPlayback, VirtualClock, VirtualOutputFactory};
