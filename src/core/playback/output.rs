//! Output clock abstraction the scheduler plays segments on.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while scheduling playback
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Inbound audio payload was not valid base64
    #[error("Audio decode failed: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Output device or clock could not be created
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),

    /// A segment could not be started or stopped on the output
    #[error("Scheduling failed: {0}")]
    Schedule(String),

    /// Releasing the output failed
    #[error("Audio output close failed: {0}")]
    Close(String),
}

/// Result type for playback operations
pub type PlaybackResult<T> = Result<T, PlaybackError>;

// =============================================================================
// Segments
// =============================================================================

/// Identifier of one scheduled source. Allocated in increasing order, so a
/// larger id always starts no earlier than a smaller one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub u64);

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source-{}", self.0)
    }
}

/// Decoded model audio at its declared sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSegment {
    /// Mono samples in `[-1, 1]`
    pub samples: Vec<f32>,
    /// Declared sample rate (Hz)
    pub sample_rate: u32,
}

impl PlaybackSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Playback length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

// =============================================================================
// Output traits
// =============================================================================

/// A running audio output with its own clock.
///
/// Times are seconds on the output's clock. A source that plays to its end
/// is reported by sending its id on the channel the output was created
/// with. A source stopped through [`AudioOutput::stop`] must not be
/// reported.
#[async_trait]
pub trait AudioOutput: Send {
    /// Current time of the output clock in seconds
    fn current_time(&self) -> f64;

    /// Start `segment` at `start_at` on the output clock
    fn start(&mut self, id: SourceId, segment: PlaybackSegment, start_at: f64)
    -> PlaybackResult<()>;

    /// Stop a source before it finishes
    fn stop(&mut self, id: SourceId) -> PlaybackResult<()>;

    /// Release the output. Called once; the output is dropped afterwards.
    async fn close(&mut self) -> PlaybackResult<()>;
}

/// Creates outputs on demand. Creation may suspend (device start-up).
#[async_trait]
pub trait AudioOutputFactory: Send + Sync {
    async fn create(
        &self,
        finished: mpsc::UnboundedSender<SourceId>,
    ) -> PlaybackResult<Box<dyn AudioOutput>>;
}
