//! Message transport between the session and the Live API.
//!
//! A transport is opened by a [`TransportConnector`] and handed to the
//! session as a [`TransportHandle`]: a sender half that never blocks the
//! caller and an ordered stream of [`TransportEvent`]s.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use super::base::{SessionError, SessionResult};
use super::credentials::redact_url;
use super::protocol::Frame;

/// Capacity of the outbound and inbound channels
const WS_CHANNEL_CAPACITY: usize = 256;

/// Close code sent when the user ends the session
pub const NORMAL_CLOSE_CODE: u16 = 1000;

/// Close code reported when the connection dropped without a close frame
pub const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// Commands from the session to the transport task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Send a text frame
    Send(String),
    /// Close the connection with a code and reason
    Close { code: u16, reason: String },
}

/// What the transport reports back, in delivery order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A data frame from the peer
    Frame(Frame),
    /// The connection failed; a `Closed` event follows
    Error(String),
    /// The connection is closed; nothing follows
    Closed { code: u16, reason: String },
}

/// Sending half of an open transport.
#[derive(Debug, Clone)]
pub struct TransportSender {
    commands: mpsc::Sender<TransportCommand>,
    open: Arc<AtomicBool>,
}

impl TransportSender {
    /// Whether frames can currently be sent
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.commands.is_closed()
    }

    /// Queue a text frame without waiting. Fails when the transport is not
    /// open or its queue is full; the frame is dropped in both cases.
    pub fn send_text(&self, text: String) -> SessionResult<()> {
        if !self.is_open() {
            return Err(SessionError::NotConnected);
        }
        self.commands
            .try_send(TransportCommand::Send(text))
            .map_err(|e| SessionError::Transport(format!("outbound frame dropped: {}", e)))
    }

    /// Request a close. Marks the transport as not open immediately.
    pub fn close(&self, code: u16, reason: &str) {
        self.open.store(false, Ordering::SeqCst);
        let command = TransportCommand::Close {
            code,
            reason: reason.to_string(),
        };
        if let Err(e) = self.commands.try_send(command) {
            debug!("Close request not delivered: {}", e);
        }
    }
}

/// An open transport as returned by a connector.
#[derive(Debug)]
pub struct TransportHandle {
    pub sender: TransportSender,
    pub events: mpsc::Receiver<TransportEvent>,
}

impl TransportHandle {
    /// Assemble a handle from channel ends. `open` is shared with whatever
    /// drives the connection and must be cleared when it closes.
    pub fn new(
        commands: mpsc::Sender<TransportCommand>,
        events: mpsc::Receiver<TransportEvent>,
        open: Arc<AtomicBool>,
    ) -> Self {
        Self {
            sender: TransportSender { commands, open },
            events,
        }
    }
}

/// Opens transports.
#[async_trait]
pub trait TransportConnector: Send + Sync {
    /// Resolve once the transport is open.
    async fn connect(&self, url: &str) -> SessionResult<TransportHandle>;
}

/// [`TransportConnector`] over WebSockets.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> SessionResult<TransportHandle> {
        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| SessionError::TransportOpen(e.to_string()))?;

        info!(endpoint = redact_url(url), "Connected to Live API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (command_tx, mut command_rx) = mpsc::channel::<TransportCommand>(WS_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(WS_CHANNEL_CAPACITY);
        let open = Arc::new(AtomicBool::new(true));
        let task_open = open.clone();

        tokio::spawn(async move {
            let mut close_code = ABNORMAL_CLOSE_CODE;
            let mut close_reason = String::new();

            loop {
                tokio::select! {
                    // Handle outgoing frames
                    command = command_rx.recv() => match command {
                        Some(TransportCommand::Send(text)) => {
                            if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                                error!("Failed to send WebSocket message: {}", e);
                                let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                                break;
                            }
                        }
                        Some(TransportCommand::Close { code, reason }) => {
                            task_open.store(false, Ordering::SeqCst);
                            let frame = CloseFrame {
                                code: CloseCode::from(code),
                                reason: reason.clone().into(),
                            };
                            if let Err(e) = ws_sink.send(Message::Close(Some(frame))).await {
                                debug!("Failed to send close frame: {}", e);
                            }
                            close_code = code;
                            close_reason = reason;
                            break;
                        }
                        None => {
                            // Every sender is gone; nobody is listening anymore
                            let _ = ws_sink.send(Message::Close(None)).await;
                            close_code = NORMAL_CLOSE_CODE;
                            break;
                        }
                    },

                    // Handle incoming frames
                    incoming = ws_stream.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let frame = Frame::Text(text.as_str().to_owned());
                            if event_tx.send(TransportEvent::Frame(frame)).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            if event_tx.send(TransportEvent::Frame(Frame::Binary(data))).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                warn!("Failed to send pong: {}", e);
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            if let Some(frame) = frame {
                                close_code = u16::from(frame.code);
                                close_reason = frame.reason.as_str().to_owned();
                            }
                            info!(code = close_code, reason = %close_reason, "WebSocket closed by server");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            let _ = event_tx.send(TransportEvent::Error(e.to_string())).await;
                            break;
                        }
                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }
                    },
                }
            }

            task_open.store(false, Ordering::SeqCst);
            let _ = ws_sink.close().await;
            let _ = event_tx
                .send(TransportEvent::Closed {
                    code: close_code,
                    reason: close_reason,
                })
                .await;
        });

        Ok(TransportHandle::new(command_tx, event_rx, open))
    }
}
