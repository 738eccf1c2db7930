//! Live API WebSocket message types.
//!
//! All messages are JSON objects keyed by their kind.
//!
//! # Protocol Overview
//!
//! Client messages (sent to server):
//! - `setup` - Session configuration, sent once right after the socket opens
//! - `realtimeInput.audio` - One captured PCM16 block
//! - `realtimeInput.audioStreamEnd` - No more audio will follow
//!
//! Server messages (received from server):
//! - `error` - Fatal server-side error
//! - `reply` - Diagnostic reply, logged only
//! - `setupComplete` - Setup acknowledged
//! - `serverContent` - Transcriptions, model turn parts and turn signals

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::audio::pcm_mime_type;

/// Model start marker carried in `serverContent.event`
const MODEL_START_EVENT: &str = "model_start";

// =============================================================================
// Client Messages (sent to server)
// =============================================================================

/// Messages sent to the Live API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    /// Opaque session configuration issued with the credential
    Setup(Value),

    /// Streaming input
    RealtimeInput(RealtimeInput),
}

/// Payload of a `realtimeInput` message.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<WireAudioChunk>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_stream_end: Option<bool>,
}

/// One block of encoded audio on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAudioChunk {
    /// Base64 PCM16 little-endian
    pub data: String,
    /// `audio/pcm;rate=<n>`
    pub mime_type: String,
}

impl ClientMessage {
    pub fn setup(config: Value) -> Self {
        ClientMessage::Setup(config)
    }

    /// Create an audio message from an already encoded block.
    pub fn audio(data: String, sample_rate: u32) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            audio: Some(WireAudioChunk {
                data,
                mime_type: pcm_mime_type(sample_rate),
            }),
            audio_stream_end: None,
        })
    }

    pub fn audio_stream_end() -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            audio: None,
            audio_stream_end: Some(true),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Server Messages (received from server)
// =============================================================================

/// A transport frame as delivered by the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

/// An inbound frame that could not be decoded.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed server message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Everything the session reacts to, in the order it must be handled.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Fatal server error
    Error { message: String, detail: Value },
    /// Diagnostic reply
    Reply(Value),
    /// Setup acknowledged
    SetupComplete,
    /// Cumulative user transcription
    InputTranscription(String),
    /// Cumulative transcription of the model's speech
    OutputTranscription(String),
    /// Incremental model text
    ModelText(String),
    /// Model audio chunk
    ModelAudio {
        data: String,
        mime_type: Option<String>,
    },
    /// Server-side barge-in: generation was cut short
    Interrupted,
    /// Model turn finished
    TurnComplete,
    /// User activity finished
    ActivityEnd,
    /// Model started generating
    ModelStart,
    /// Nothing this client understands
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServerMessage {
    error: Option<Value>,
    reply: Option<Value>,
    setup_complete: Option<Value>,
    server_content: Option<RawServerContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServerContent {
    input_transcription: Option<RawTranscription>,
    output_transcription: Option<RawTranscription>,
    model_turn: Option<RawModelTurn>,
    turn_complete: Option<Value>,
    activity_end: Option<Value>,
    interrupted: Option<Value>,
    event: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTranscription {
    text: Option<String>,
    transcript: Option<RawTranscript>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTranscript {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModelTurn {
    #[serde(default)]
    parts: Vec<RawPart>,
    turn_complete: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPart {
    text: Option<String>,
    inline_data: Option<RawInlineData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInlineData {
    data: Option<String>,
    mime_type: Option<String>,
}

impl RawTranscription {
    fn into_text(self) -> Option<String> {
        self.text
            .filter(|t| !t.is_empty())
            .or_else(|| self.transcript.and_then(|t| t.text))
            .filter(|t| !t.is_empty())
    }
}

/// JSON truthiness: absent, `null`, `false`, `0` and `""` do not count.
fn is_truthy(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn error_message(detail: &Value) -> String {
    match detail {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| detail.to_string()),
        other => other.to_string(),
    }
}

/// Decode one frame into the events it carries.
///
/// Binary frames are treated as UTF-8 text. An empty frame carries no
/// events. An `error` field short-circuits everything else in the message.
pub fn decode_frame(frame: &Frame) -> Result<Vec<ServerEvent>, ProtocolError> {
    let text = match frame {
        Frame::Text(text) => std::borrow::Cow::Borrowed(text.as_str()),
        Frame::Binary(bytes) => String::from_utf8_lossy(bytes),
    };
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw: RawServerMessage = serde_json::from_str(&text)?;
    Ok(raw.into_events())
}

impl RawServerMessage {
    fn into_events(self) -> Vec<ServerEvent> {
        if is_truthy(&self.error) {
            let detail = self.error.unwrap_or(Value::Null);
            return vec![ServerEvent::Error {
                message: error_message(&detail),
                detail,
            }];
        }

        let mut events = Vec::new();

        if is_truthy(&self.reply) {
            events.push(ServerEvent::Reply(self.reply.unwrap_or(Value::Null)));
        }
        if self.setup_complete.is_some() {
            events.push(ServerEvent::SetupComplete);
        }

        if let Some(content) = self.server_content {
            content.push_events(&mut events);
        }

        if events.is_empty() {
            events.push(ServerEvent::Unknown);
        }
        events
    }
}

impl RawServerContent {
    fn push_events(self, events: &mut Vec<ServerEvent>) {
        if let Some(text) = self.input_transcription.and_then(RawTranscription::into_text) {
            events.push(ServerEvent::InputTranscription(text));
        }
        if let Some(text) = self.output_transcription.and_then(RawTranscription::into_text) {
            events.push(ServerEvent::OutputTranscription(text));
        }

        let mut turn_complete = is_truthy(&self.turn_complete);
        if let Some(turn) = self.model_turn {
            turn_complete |= is_truthy(&turn.turn_complete);
            for part in turn.parts {
                if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                    events.push(ServerEvent::ModelText(text));
                }
                if let Some(inline) = part.inline_data
                    && let Some(data) = inline.data.filter(|d| !d.is_empty())
                {
                    events.push(ServerEvent::ModelAudio {
                        data,
                        mime_type: inline.mime_type,
                    });
                }
            }
        }

        if is_truthy(&self.interrupted) {
            events.push(ServerEvent::Interrupted);
        }
        if turn_complete {
            events.push(ServerEvent::TurnComplete);
        }
        if is_truthy(&self.activity_end) {
            events.push(ServerEvent::ActivityEnd);
        }
        if self.event.as_ref().and_then(Value::as_str) == Some(MODEL_START_EVENT) {
            events.push(ServerEvent::ModelStart);
        }
    }
}
