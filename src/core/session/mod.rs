//! Duplex voice sessions against the Live API.
//!
//! A [`SessionController`] owns one session at a time: it fetches a
//! short-lived credential, opens the microphone and a WebSocket, streams
//! captured audio upstream and plays model audio back while assembling the
//! transcript.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::future::Future;
//! use std::pin::Pin;
//! use std::sync::Arc;
//! use duplex_voice::core::devices;
//! use duplex_voice::core::session::{
//!     SessionComponents, SessionConfig, SessionController, StatusUpdate, TokenEndpointClient,
//!     TokenEndpointConfig, WebSocketConnector,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let components = SessionComponents {
//!     credentials: Arc::new(TokenEndpointClient::new(TokenEndpointConfig::default())?),
//!     connector: Arc::new(WebSocketConnector::new()),
//!     microphone: devices::default_microphone(),
//!     output: devices::default_output(),
//! };
//!
//! let mut controller = SessionController::new(SessionConfig::default(), components);
//! controller.on_status(Arc::new(|status: StatusUpdate| {
//!     Box::pin(async move { println!("{}", status.message) })
//!         as Pin<Box<dyn Future<Output = ()> + Send>>
//! }));
//!
//! let session = controller.spawn();
//! session.start().await?;
//! // ... talk ...
//! session.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod base;
pub mod controller;
pub mod credentials;
pub mod protocol;
pub mod setup;
pub mod transport;

pub use base::{
    CaptureRequest, DEFAULT_CAPTURE_BLOCK_SIZE, DEFAULT_CAPTURE_SAMPLE_RATE,
    DEFAULT_CONNECT_TIMEOUT_SECONDS, DEFAULT_WS_ENDPOINT, MicrophoneSource, MicrophoneStream,
    SessionConfig, SessionError, SessionResult, SessionState, StatusCallback, StatusUpdate,
    StatusVariant, TranscriptCallback,
};
pub use controller::{SessionComponents, SessionController, SessionHandle};
pub use credentials::{
    CredentialProvider, DEFAULT_TOKEN_ENDPOINT, DEFAULT_TOKEN_TIMEOUT_SECONDS,
    TokenEndpointClient, TokenEndpointConfig, TokenResponse, build_socket_url, redact_url,
};
pub use protocol::{ClientMessage, Frame, ProtocolError, ServerEvent, decode_frame};
pub use setup::SetupBuilder;
pub use transport::{
    TransportCommand, TransportConnector, TransportEvent, TransportHandle, TransportSender,
    WebSocketConnector,
};
