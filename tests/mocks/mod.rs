//! In-memory collaborators for driving a session controller in tests.
//!
//! - `MockCredentials`: canned token responses or failures
//! - `MockConnector`: hands the server side of each opened transport to the test
//! - `MockMicrophone`: lets the test push capture blocks
//! - `Recorder`: collects status and transcript callbacks

// Allow dead code in test infrastructure - not every test binary uses every mock
#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{Notify, mpsc};

use duplex_voice::core::audio::AudioBlock;
use duplex_voice::core::playback::VirtualClock;
use duplex_voice::core::session::{
    CaptureRequest, CredentialProvider, Frame, MicrophoneSource, MicrophoneStream,
    SessionComponents, SessionError, SessionResult, StatusCallback, StatusUpdate,
    TokenResponse, TranscriptCallback, TransportCommand, TransportConnector, TransportEvent,
    TransportHandle,
};
use duplex_voice::core::transcript::TranscriptUpdate;

/// Upper bound on any wait in these tests
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll `condition` until it holds or the timeout expires.
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Await `future`, failing the test if it takes too long.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(WAIT_TIMEOUT, future)
        .await
        .expect("timed out")
}

// =============================================================================
// Credentials
// =============================================================================

pub struct MockCredentials {
    response: Result<Value, SessionError>,
    calls: AtomicUsize,
}

impl MockCredentials {
    pub fn ok(response: Value) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(response),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: SessionError) -> Arc<Self> {
        Arc::new(Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for MockCredentials {
    async fn fetch(&self) -> SessionResult<TokenResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let value = self.response.clone()?;
        serde_json::from_value(value).map_err(|e| SessionError::InvalidCredential(e.to_string()))
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Server side of a mock transport.
pub struct MockServer {
    pub url: String,
    commands: mpsc::Receiver<TransportCommand>,
    events: mpsc::Sender<TransportEvent>,
    open: Arc<AtomicBool>,
}

impl MockServer {
    /// Next command the client queued
    pub async fn next_command(&mut self) -> Option<TransportCommand> {
        within(self.commands.recv()).await
    }

    /// Next text frame, parsed as JSON. Panics on a close command.
    pub async fn next_message(&mut self) -> Value {
        match self.next_command().await {
            Some(TransportCommand::Send(text)) => serde_json::from_str(&text).expect("json"),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    /// Every command queued so far, without waiting
    pub fn drain_commands(&mut self) -> Vec<TransportCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            commands.push(command);
        }
        commands
    }

    pub async fn send(&self, message: Value) {
        let _ = self
            .events
            .send(TransportEvent::Frame(Frame::Text(message.to_string())))
            .await;
    }

    pub async fn send_raw(&self, text: &str) {
        let _ = self
            .events
            .send(TransportEvent::Frame(Frame::Text(text.to_string())))
            .await;
    }

    pub async fn fail(&self, message: &str) {
        let _ = self
            .events
            .send(TransportEvent::Error(message.to_string()))
            .await;
    }

    /// Close from the server side
    pub async fn close(&self, code: u16, reason: &str) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self
            .events
            .send(TransportEvent::Closed {
                code,
                reason: reason.to_string(),
            })
            .await;
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

pub struct MockConnector {
    servers_tx: mpsc::UnboundedSender<MockServer>,
    servers_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<MockServer>>,
    urls: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
    failure: Option<SessionError>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Self::build(None, None)
    }

    /// Connections wait for `gate` to be notified before opening
    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Self::build(Some(gate), None)
    }

    pub fn failing(error: SessionError) -> Arc<Self> {
        Self::build(None, Some(error))
    }

    fn build(gate: Option<Arc<Notify>>, failure: Option<SessionError>) -> Arc<Self> {
        let (servers_tx, servers_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            servers_tx,
            servers_rx: tokio::sync::Mutex::new(servers_rx),
            urls: Mutex::new(Vec::new()),
            gate,
            failure,
        })
    }

    /// URLs of every connection attempt
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    /// Server side of the next opened transport
    pub async fn accept(&self) -> MockServer {
        let mut servers = self.servers_rx.lock().await;
        within(servers.recv()).await.expect("connector dropped")
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn connect(&self, url: &str) -> SessionResult<TransportHandle> {
        self.urls.lock().push(url.to_string());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let (command_tx, command_rx) = mpsc::channel(256);
        let (event_tx, event_rx) = mpsc::channel(256);
        let open = Arc::new(AtomicBool::new(true));

        let _ = self.servers_tx.send(MockServer {
            url: url.to_string(),
            commands: command_rx,
            events: event_tx,
            open: open.clone(),
        });
        Ok(TransportHandle::new(command_tx, event_rx, open))
    }
}

// =============================================================================
// Microphone
// =============================================================================

#[derive(Default)]
struct MicState {
    acquired: AtomicUsize,
    released: AtomicUsize,
    blocks: Mutex<Option<mpsc::Sender<AudioBlock>>>,
}

pub struct MockMicrophone {
    sample_rate: u32,
    failure: Option<SessionError>,
    state: Arc<MicState>,
}

impl MockMicrophone {
    pub fn new(sample_rate: u32) -> Arc<Self> {
        Arc::new(Self {
            sample_rate,
            failure: None,
            state: Arc::new(MicState::default()),
        })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self {
            sample_rate: 48000,
            failure: Some(SessionError::MicrophoneUnavailable(
                "permission denied".to_string(),
            )),
            state: Arc::new(MicState::default()),
        })
    }

    pub fn acquired(&self) -> usize {
        self.state.acquired.load(Ordering::SeqCst)
    }

    /// Streams that have been stopped (each counted once)
    pub fn released(&self) -> usize {
        self.state.released.load(Ordering::SeqCst)
    }

    pub fn is_capturing(&self) -> bool {
        self.state.blocks.lock().is_some()
    }

    /// Drop the capture channel as a failing device would, without the
    /// session asking for it
    pub fn disconnect(&self) {
        *self.state.blocks.lock() = None;
    }

    /// Deliver a block as the capture callback would. Returns false if
    /// capture is not running.
    pub fn push(&self, block: AudioBlock) -> bool {
        match self.state.blocks.lock().as_ref() {
            Some(blocks) => blocks.try_send(block).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl MicrophoneSource for MockMicrophone {
    async fn acquire(&self, _request: &CaptureRequest) -> SessionResult<Box<dyn MicrophoneStream>> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        self.state.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockMicrophoneStream {
            sample_rate: self.sample_rate,
            state: self.state.clone(),
            stopped: false,
        }))
    }
}

struct MockMicrophoneStream {
    sample_rate: u32,
    state: Arc<MicState>,
    stopped: bool,
}

impl MicrophoneStream for MockMicrophoneStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self, blocks: mpsc::Sender<AudioBlock>) -> SessionResult<()> {
        *self.state.blocks.lock() = Some(blocks);
        Ok(())
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        *self.state.blocks.lock() = None;
        self.state.released.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Callbacks
// =============================================================================

/// Collects everything the controller reports.
#[derive(Clone, Default)]
pub struct Recorder {
    statuses: Arc<Mutex<Vec<StatusUpdate>>>,
    transcripts: Arc<Mutex<Vec<TranscriptUpdate>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_callback(&self) -> StatusCallback {
        let statuses = self.statuses.clone();
        Arc::new(move |update: StatusUpdate| {
            statuses.lock().push(update);
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }

    pub fn transcript_callback(&self) -> TranscriptCallback {
        let transcripts = self.transcripts.clone();
        Arc::new(move |update: TranscriptUpdate| {
            transcripts.lock().push(update);
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }

    pub fn statuses(&self) -> Vec<StatusUpdate> {
        self.statuses.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.statuses.lock().iter().map(|s| s.message.clone()).collect()
    }

    pub fn last_status(&self) -> Option<StatusUpdate> {
        self.statuses.lock().last().cloned()
    }

    pub fn transcripts(&self) -> Vec<TranscriptUpdate> {
        self.transcripts.lock().clone()
    }
}

// =============================================================================
// Harness
// =============================================================================

/// Everything a controller test needs, with handles kept for assertions.
pub struct Harness {
    pub credentials: Arc<MockCredentials>,
    pub connector: Arc<MockConnector>,
    pub microphone: Arc<MockMicrophone>,
    pub clock: VirtualClock,
}

impl Harness {
    pub fn new(
        credentials: Arc<MockCredentials>,
        connector: Arc<MockConnector>,
        microphone: Arc<MockMicrophone>,
    ) -> Self {
        Self {
            credentials,
            connector,
            microphone,
            clock: VirtualClock::new(),
        }
    }

    pub fn components(&self) -> SessionComponents {
        SessionComponents {
            credentials: self.credentials.clone(),
            connector: self.connector.clone(),
            microphone: self.microphone.clone(),
            output: Arc::new(self.clock.factory()),
        }
    }
}
