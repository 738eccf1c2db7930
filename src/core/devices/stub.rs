//! Device access when the `device-audio` feature is disabled

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::playback::{
    AudioOutput, AudioOutputFactory, PlaybackError, PlaybackResult, SourceId,
};
use crate::core::session::{
    CaptureRequest, MicrophoneSource, MicrophoneStream, SessionError, SessionResult,
};

const UNSUPPORTED: &str = "built without the device-audio feature";

/// Placeholder input device; acquiring it always fails
#[derive(Debug, Clone, Default)]
pub struct DeviceMicrophone;

impl DeviceMicrophone {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MicrophoneSource for DeviceMicrophone {
    async fn acquire(&self, _request: &CaptureRequest) -> SessionResult<Box<dyn MicrophoneStream>> {
        Err(SessionError::MicrophoneUnavailable(UNSUPPORTED.to_string()))
    }
}

/// Placeholder output device; creating it always fails
#[derive(Debug, Clone, Default)]
pub struct DeviceOutputFactory;

impl DeviceOutputFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioOutputFactory for DeviceOutputFactory {
    async fn create(
        &self,
        _finished: mpsc::UnboundedSender<SourceId>,
    ) -> PlaybackResult<Box<dyn AudioOutput>> {
        Err(PlaybackError::OutputUnavailable(UNSUPPORTED.to_string()))
    }
}
