//! Base types for duplex voice sessions.
//!
//! Errors, lifecycle state, status reporting and the capture-side traits
//! shared by the controller and its collaborators.
//!
//! # Audio Format
//!
//! Capture is sent upstream as PCM 16-bit signed little-endian mono at the
//! configured capture rate (16kHz by default). Model audio arrives as PCM16
//! at the rate declared in its MIME type (24kHz when absent).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::audio::AudioBlock;
use crate::core::playback::PlaybackConfig;
use crate::core::transcript::TranscriptUpdate;
use crate::core::vad::VADConfig;

/// Endpoint used when the credential response carries no `wsUrl`
pub const DEFAULT_WS_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Rate captured audio is resampled to before sending (Hz)
pub const DEFAULT_CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Samples per capture callback
pub const DEFAULT_CAPTURE_BLOCK_SIZE: usize = 4096;

/// Limit on credential fetch plus transport open (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 10;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during a session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    /// The token endpoint rejected or failed the request
    #[error("{0}")]
    CredentialFetch(String),

    /// The token response had no usable credential or endpoint
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Microphone access was denied or no input device exists
    #[error("Microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    /// The transport could not be opened
    #[error("Transport open failed: {0}")]
    TransportOpen(String),

    /// Operation timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Mid-session transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server reported a fatal error
    #[error("Server error: {0}")]
    Server(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,

    /// The start attempt was overtaken by a stop
    #[error("Session start cancelled")]
    Cancelled,

    /// The controller task is gone
    #[error("Session controller has shut down")]
    ControllerStopped,
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

// =============================================================================
// Configuration Types
// =============================================================================

/// Configuration for a duplex voice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Endpoint used when the credential response names none
    pub ws_endpoint: String,

    /// Rate audio is sent upstream at (Hz)
    pub capture_sample_rate: u32,

    /// Samples per capture block at the device rate
    pub capture_block_size: usize,

    /// Bound on opening the transport (seconds)
    pub connect_timeout_seconds: u64,

    /// Speech detection used for barge-in
    pub vad: VADConfig,

    /// Playback scheduling
    pub playback: PlaybackConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ws_endpoint: DEFAULT_WS_ENDPOINT.to_string(),
            capture_sample_rate: DEFAULT_CAPTURE_SAMPLE_RATE,
            capture_block_size: DEFAULT_CAPTURE_BLOCK_SIZE,
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECONDS,
            vad: VADConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle state of the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session
    #[default]
    Idle,
    /// Fetching credentials, acquiring the microphone, opening the transport
    Starting,
    /// Streaming in both directions
    Active,
    /// Tearing down
    Closing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Starting => write!(f, "starting"),
            SessionState::Active => write!(f, "active"),
            SessionState::Closing => write!(f, "closing"),
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// Presentation hint for a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusVariant {
    Info,
    Active,
    Error,
}

impl fmt::Display for StatusVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusVariant::Info => write!(f, "info"),
            StatusVariant::Active => write!(f, "active"),
            StatusVariant::Error => write!(f, "error"),
        }
    }
}

/// User-facing status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub message: String,
    pub variant: StatusVariant,
}

impl StatusUpdate {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            variant: StatusVariant::Info,
        }
    }

    pub fn active(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            variant: StatusVariant::Active,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            variant: StatusVariant::Error,
        }
    }
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback type for status updates.
pub type StatusCallback =
    Arc<dyn Fn(StatusUpdate) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for transcript updates.
pub type TranscriptCallback =
    Arc<dyn Fn(TranscriptUpdate) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Capture
// =============================================================================

/// What the session asks of the microphone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Samples per block delivered to the session
    pub block_size: usize,
    /// Rate the session will resample to; devices may run at any rate
    pub target_sample_rate: u32,
}

/// Grants microphone access.
#[async_trait]
pub trait MicrophoneSource: Send + Sync {
    /// Acquire the microphone. May suspend while permission is resolved.
    async fn acquire(&self, request: &CaptureRequest) -> SessionResult<Box<dyn MicrophoneStream>>;
}

/// An acquired microphone.
pub trait MicrophoneStream: Send {
    /// Native rate of the delivered blocks (Hz)
    fn sample_rate(&self) -> u32;

    /// Begin delivering blocks. Blocks that do not fit in `blocks` are
    /// dropped rather than waited for.
    fn start(&mut self, blocks: mpsc::Sender<AudioBlock>) -> SessionResult<()>;

    /// Stop capture and release the device. Must tolerate repeated calls.
    fn stop(&mut self);
}
