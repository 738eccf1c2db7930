//! Session controller.
//!
//! Owns the session state machine (`idle → starting → active → closing →
//! idle`) and everything that happens inside an active session: captured
//! blocks are run through speech detection, resampled, encoded and sent;
//! inbound messages are decoded and dispatched to the transcript and the
//! playback scheduler.
//!
//! The controller runs as a single task. Capture blocks, transport events,
//! lifecycle commands and playback completions are all handled one at a
//! time on that task, so no state is shared between threads. Slow start-up
//! work (credentials, microphone, transport open) runs in a separate task
//! and reports back, which keeps `stop()` responsive while a start is in
//! flight.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::base::{
    CaptureRequest, MicrophoneSource, MicrophoneStream, SessionConfig, SessionError,
    SessionResult, SessionState, StatusCallback, StatusUpdate, TranscriptCallback,
};
use super::credentials::{CredentialProvider, build_socket_url, redact_url};
use super::protocol::{ClientMessage, ServerEvent, decode_frame};
use super::transport::{
    ABNORMAL_CLOSE_CODE, NORMAL_CLOSE_CODE, TransportConnector, TransportEvent, TransportHandle,
    TransportSender,
};
use crate::core::audio::{AudioBlock, encode_pcm_chunk, resample};
use crate::core::playback::{AudioOutputFactory, PlaybackScheduler, SourceId};
use crate::core::transcript::{TextMode, TranscriptAggregator, TranscriptUpdate};
use crate::core::vad::SpeechActivityDetector;

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Captured blocks waiting for the controller. Beyond this, blocks are
/// dropped at the source.
const CAPTURE_CHANNEL_CAPACITY: usize = 16;

/// Outbound audio is logged on the first chunk and then every this many
const AUDIO_LOG_INTERVAL: u64 = 50;

/// Close reason sent when the user ends the session
const USER_CLOSE_REASON: &str = "mic_off";

pub const STATUS_REQUESTING: &str = "Requesting microphone and credentials…";
pub const STATUS_CONNECTING: &str = "Connecting…";
pub const STATUS_LISTENING: &str = "Listening… speak whenever you like";
pub const STATUS_CLOSING: &str = "Closing session…";
pub const STATUS_READY: &str = "Ready to listen";
pub const STATUS_CONNECTION_ENDED: &str = "Connection ended";
pub const STATUS_CONNECTION_FAILURE: &str = "Connection failure";
pub const STATUS_MODEL_RESPONDING: &str = "Model is responding…";
pub const STATUS_WAITING_FOR_VOICE: &str = "Waiting for your voice";
pub const STATUS_MICROPHONE_LOST: &str = "Microphone disconnected";

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionComponents {
    pub credentials: Arc<dyn CredentialProvider>,
    pub connector: Arc<dyn TransportConnector>,
    pub microphone: Arc<dyn MicrophoneSource>,
    pub output: Arc<dyn AudioOutputFactory>,
}

enum ControlCommand {
    Start(oneshot::Sender<SessionResult<()>>),
    Stop(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

enum StartEvent {
    CredentialIssued {
        attempt: u64,
    },
    Finished {
        attempt: u64,
        result: SessionResult<AcquiredSession>,
    },
}

/// Everything a start attempt acquired, ready to go active.
struct AcquiredSession {
    setup: Value,
    endpoint: String,
    microphone: Box<dyn MicrophoneStream>,
    transport: TransportHandle,
}

impl AcquiredSession {
    fn release(mut self) {
        self.transport.sender.close(NORMAL_CLOSE_CODE, USER_CLOSE_REASON);
        self.microphone.stop();
    }
}

struct LiveSession {
    id: Uuid,
    sender: TransportSender,
    microphone: Box<dyn MicrophoneStream>,
    chunks_sent: u64,
}

/// Drives one duplex voice session at a time.
///
/// Build it with [`new`](Self::new), register callbacks, then
/// [`spawn`](Self::spawn) it and use the returned [`SessionHandle`].
pub struct SessionController {
    config: SessionConfig,
    components: SessionComponents,
    playback: PlaybackScheduler,
    transcript: TranscriptAggregator,
    detector: SpeechActivityDetector,
    status_callback: Option<StatusCallback>,
    transcript_callback: Option<TranscriptCallback>,

    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    attempt: u64,
    intentional_close: bool,
    session: Option<LiveSession>,

    transport_events: Option<mpsc::Receiver<TransportEvent>>,
    capture_blocks: Option<mpsc::Receiver<AudioBlock>>,
    start_tx: mpsc::UnboundedSender<StartEvent>,
    start_rx: mpsc::UnboundedReceiver<StartEvent>,
    finished_rx: mpsc::UnboundedReceiver<SourceId>,

    pending_starts: Vec<oneshot::Sender<SessionResult<()>>>,
    pending_stops: Vec<oneshot::Sender<()>>,
}

impl SessionController {
    pub fn new(config: SessionConfig, components: SessionComponents) -> Self {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        let (start_tx, start_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(SessionState::Idle);

        let playback =
            PlaybackScheduler::new(config.playback.clone(), components.output.clone(), finished_tx);
        let detector = SpeechActivityDetector::new(config.vad.clone());

        Self {
            config,
            components,
            playback,
            transcript: TranscriptAggregator::new(),
            detector,
            status_callback: None,
            transcript_callback: None,
            state: SessionState::Idle,
            state_tx,
            attempt: 0,
            intentional_close: false,
            session: None,
            transport_events: None,
            capture_blocks: None,
            start_tx,
            start_rx,
            finished_rx,
            pending_starts: Vec::new(),
            pending_stops: Vec::new(),
        }
    }

    /// Register the status callback
    pub fn on_status(&mut self, callback: StatusCallback) {
        self.status_callback = Some(callback);
    }

    /// Register the transcript callback
    pub fn on_transcript(&mut self, callback: TranscriptCallback) {
        self.transcript_callback = Some(callback);
    }

    /// Move the controller onto its own task.
    pub fn spawn(self) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let state = self.state_tx.subscribe();
        tokio::spawn(self.run(command_rx));
        SessionHandle {
            commands: command_tx,
            state,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<ControlCommand>) {
        let mut exiting = false;
        let mut shutdown_replies: Vec<oneshot::Sender<()>> = Vec::new();

        loop {
            if exiting && self.state == SessionState::Idle {
                break;
            }

            tokio::select! {
                command = commands.recv(), if !exiting => match command {
                    Some(ControlCommand::Start(reply)) => self.start_session(reply).await,
                    Some(ControlCommand::Stop(reply)) => {
                        self.stop_session().await;
                        if self.state == SessionState::Idle {
                            let _ = reply.send(());
                        } else {
                            self.pending_stops.push(reply);
                        }
                    }
                    Some(ControlCommand::Shutdown(reply)) => {
                        shutdown_replies.push(reply);
                        exiting = true;
                        self.stop_session().await;
                    }
                    None => {
                        exiting = true;
                        self.stop_session().await;
                    }
                },

                Some(event) = self.start_rx.recv() => self.handle_start_event(event).await,

                block = next_item(&mut self.capture_blocks) => match block {
                    Some(block) => self.handle_capture_block(block),
                    None => self.handle_capture_ended().await,
                },

                event = next_item(&mut self.transport_events) => {
                    let event = event.unwrap_or(TransportEvent::Closed {
                        code: ABNORMAL_CLOSE_CODE,
                        reason: "transport ended".to_string(),
                    });
                    self.handle_transport_event(event).await;
                }

                Some(id) = self.finished_rx.recv() => self.playback.on_source_finished(id),
            }
        }

        debug!("Session controller stopped");
        for reply in shutdown_replies {
            let _ = reply.send(());
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    async fn start_session(&mut self, reply: oneshot::Sender<SessionResult<()>>) {
        match self.state {
            SessionState::Idle => {}
            SessionState::Starting => {
                // Share the outcome of the attempt in flight
                self.pending_starts.push(reply);
                return;
            }
            SessionState::Active => {
                debug!("Start ignored, session already active");
                let _ = reply.send(Ok(()));
                return;
            }
            SessionState::Closing => {
                debug!("Start refused while closing");
                let _ = reply.send(Err(SessionError::Cancelled));
                return;
            }
        }

        self.attempt += 1;
        self.pending_starts.push(reply);
        self.set_state(SessionState::Starting);
        self.emit_status(StatusUpdate::info(STATUS_REQUESTING)).await;

        let attempt = self.attempt;
        let components = self.components.clone();
        let config = self.config.clone();
        let events = self.start_tx.clone();

        tokio::spawn(async move {
            let result = acquire_session(attempt, &components, &config, &events).await;
            // A send failure means the controller is gone; dropping the
            // result releases whatever was acquired.
            let _ = events.send(StartEvent::Finished { attempt, result });
        });
    }

    async fn handle_start_event(&mut self, event: StartEvent) {
        match event {
            StartEvent::CredentialIssued { attempt } => {
                if attempt == self.attempt && self.state == SessionState::Starting {
                    self.emit_status(StatusUpdate::info(STATUS_CONNECTING)).await;
                }
            }
            StartEvent::Finished { attempt, result } => {
                if attempt != self.attempt {
                    warn!(attempt, "Discarding result of a stale start attempt");
                    if let Ok(acquired) = result {
                        acquired.release();
                    }
                    return;
                }

                match (self.state, result) {
                    (SessionState::Starting, Ok(acquired)) => self.activate(acquired).await,
                    (SessionState::Starting, Err(e)) => self.fail_start(e).await,
                    (_, result) => {
                        // A stop arrived while starting
                        if let Ok(acquired) = result {
                            info!("Closing transport opened after stop");
                            acquired.release();
                        }
                        self.teardown(Some(StatusUpdate::info(STATUS_READY))).await;
                    }
                }
            }
        }
    }

    async fn activate(&mut self, acquired: AcquiredSession) {
        let AcquiredSession {
            setup,
            endpoint,
            mut microphone,
            transport,
        } = acquired;
        let TransportHandle { sender, events } = transport;
        let session_id = Uuid::new_v4();

        let opened = ClientMessage::setup(setup)
            .to_json()
            .map_err(|e| SessionError::Serialization(e.to_string()))
            .and_then(|json| sender.send_text(json))
            .and_then(|()| {
                let (block_tx, block_rx) = mpsc::channel(CAPTURE_CHANNEL_CAPACITY);
                microphone.start(block_tx)?;
                Ok(block_rx)
            });

        let blocks = match opened {
            Ok(blocks) => blocks,
            Err(e) => {
                sender.close(NORMAL_CLOSE_CODE, USER_CLOSE_REASON);
                microphone.stop();
                self.fail_start(e).await;
                return;
            }
        };

        info!(
            session_id = %session_id,
            endpoint = %endpoint,
            input_rate = microphone.sample_rate(),
            "Voice session active"
        );

        self.session = Some(LiveSession {
            id: session_id,
            sender,
            microphone,
            chunks_sent: 0,
        });
        self.transport_events = Some(events);
        self.capture_blocks = Some(blocks);
        self.intentional_close = false;
        self.detector.reset();

        self.set_state(SessionState::Active);
        self.emit_status(StatusUpdate::active(STATUS_LISTENING)).await;
        for reply in self.pending_starts.drain(..) {
            let _ = reply.send(Ok(()));
        }
    }

    async fn fail_start(&mut self, e: SessionError) {
        error!("Could not start voice session: {}", e);
        let replies = std::mem::take(&mut self.pending_starts);
        self.emit_status(StatusUpdate::error(e.to_string())).await;
        self.teardown(None).await;
        for reply in replies {
            let _ = reply.send(Err(e.clone()));
        }
    }

    async fn stop_session(&mut self) {
        match self.state {
            SessionState::Idle | SessionState::Closing => {}
            SessionState::Starting => {
                // The start task finishes on its own; its result is
                // released when it arrives.
                self.set_state(SessionState::Closing);
                self.emit_status(StatusUpdate::info(STATUS_CLOSING)).await;
            }
            SessionState::Active => {
                self.set_state(SessionState::Closing);
                self.intentional_close = true;
                self.emit_status(StatusUpdate::info(STATUS_CLOSING)).await;
                self.cleanup_audio();
                self.close_transport();
                self.teardown(Some(StatusUpdate::info(STATUS_READY))).await;
            }
        }
    }

    /// Tear down an active session after a fatal problem, leaving `status`
    /// as the last thing reported.
    async fn abort_session(&mut self, status: StatusUpdate) {
        self.emit_status(status).await;
        self.set_state(SessionState::Closing);
        self.intentional_close = true;
        self.cleanup_audio();
        self.close_transport();
        self.teardown(None).await;
    }

    /// Stop capture and lift barge-in suppression.
    fn cleanup_audio(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.microphone.stop();
        }
        self.capture_blocks = None;
        self.detector.reset();
        self.playback.set_suppressed(false);
    }

    /// End the audio stream politely if still open, then close.
    fn close_transport(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.sender.is_open() {
            match ClientMessage::audio_stream_end().to_json() {
                Ok(json) => {
                    if let Err(e) = session.sender.send_text(json) {
                        warn!("Failed to notify audioStreamEnd: {}", e);
                    }
                }
                Err(e) => warn!("Failed to serialize audioStreamEnd: {}", e),
            }
        }
        session.sender.close(NORMAL_CLOSE_CODE, USER_CLOSE_REASON);
    }

    /// Release everything and return to idle. Safe to call in any state.
    async fn teardown(&mut self, final_status: Option<StatusUpdate>) {
        if let Some(mut session) = self.session.take() {
            session.microphone.stop();
            info!(
                session_id = %session.id,
                chunks_sent = session.chunks_sent,
                "Voice session closed"
            );
        }
        self.transport_events = None;
        self.capture_blocks = None;
        self.detector.reset();
        self.playback.reset().await;

        let closing = [self.transcript.commit_model(), self.transcript.commit_user()];
        for update in closing.into_iter().flatten() {
            self.emit_transcript(update).await;
        }
        self.transcript.reset();

        self.intentional_close = false;
        self.set_state(SessionState::Idle);

        if let Some(status) = final_status {
            self.emit_status(status).await;
        }
        for reply in self.pending_starts.drain(..) {
            let _ = reply.send(Err(SessionError::Cancelled));
        }
        for reply in self.pending_stops.drain(..) {
            let _ = reply.send(());
        }
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    fn handle_capture_block(&mut self, block: AudioBlock) {
        if self.state != SessionState::Active {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.sender.is_open() {
            return;
        }

        let vad = self.detector.process_block(&block.samples);
        if vad.speech_start {
            debug!(energy = vad.energy, "User started speaking");
            self.playback.set_suppressed(true);
        } else if vad.speech_end {
            debug!("User stopped speaking");
            self.playback.set_suppressed(false);
        }

        let target_rate = self.config.capture_sample_rate;
        let samples = resample(&block.samples, block.sample_rate, target_rate);
        let data = encode_pcm_chunk(&samples);
        if data.is_empty() {
            return;
        }

        let json = match ClientMessage::audio(data, target_rate).to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize audio chunk: {}", e);
                return;
            }
        };

        match session.sender.send_text(json) {
            Ok(()) => {
                session.chunks_sent += 1;
                if session.chunks_sent == 1 || session.chunks_sent % AUDIO_LOG_INTERVAL == 0 {
                    debug!(
                        session_id = %session.id,
                        chunks = session.chunks_sent,
                        samples = samples.len(),
                        "Streaming microphone audio"
                    );
                }
            }
            Err(e) => debug!("Dropped captured block: {}", e),
        }
    }

    /// The capture channel closed without the controller asking for it.
    async fn handle_capture_ended(&mut self) {
        self.capture_blocks = None;
        if self.state != SessionState::Active {
            return;
        }
        warn!("Microphone stopped delivering audio");
        self.abort_session(StatusUpdate::error(STATUS_MICROPHONE_LOST))
            .await;
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Frame(frame) => match decode_frame(&frame) {
                Ok(events) => {
                    for event in events {
                        if !self.handle_server_event(event).await {
                            break;
                        }
                    }
                }
                Err(e) => warn!("Dropping inbound frame: {}", e),
            },
            TransportEvent::Error(message) => {
                error!("Live API transport error: {}", message);
                self.emit_status(StatusUpdate::error(STATUS_CONNECTION_FAILURE))
                    .await;
            }
            TransportEvent::Closed { code, reason } => {
                if self.state != SessionState::Active {
                    return;
                }
                info!(code, reason = %reason, "Live API connection closed");
                let unexpected = !self.intentional_close;
                self.set_state(SessionState::Closing);
                self.cleanup_audio();
                let status = unexpected.then(|| StatusUpdate::info(STATUS_CONNECTION_ENDED));
                self.teardown(status).await;
            }
        }
    }

    /// Returns false once the session has been torn down and the rest of
    /// the message must be skipped.
    async fn handle_server_event(&mut self, event: ServerEvent) -> bool {
        if self.state != SessionState::Active {
            return false;
        }

        match event {
            ServerEvent::Error { message, detail } => {
                error!(detail = %detail, "Live API error");
                self.abort_session(StatusUpdate::error(format!("Server error: {}", message)))
                    .await;
                return false;
            }
            ServerEvent::Reply(reply) => info!(reply = %reply, "Live API reply"),
            ServerEvent::SetupComplete => debug!("Live API setup complete"),
            ServerEvent::InputTranscription(text) => {
                if let Some(update) = self.transcript.update_user(&text) {
                    self.emit_transcript(update).await;
                }
            }
            ServerEvent::OutputTranscription(text) => {
                if let Some(update) = self.transcript.append_model(&text, TextMode::Replace) {
                    self.emit_transcript(update).await;
                }
            }
            ServerEvent::ModelText(text) => {
                if let Some(update) = self.transcript.append_model(&text, TextMode::Append) {
                    self.emit_transcript(update).await;
                }
            }
            ServerEvent::ModelAudio { data, mime_type } => {
                if let Err(e) = self.playback.enqueue(&data, mime_type.as_deref()).await {
                    warn!("Audio playback failed: {}", e);
                }
            }
            ServerEvent::Interrupted => {
                debug!("Generation interrupted by server");
                self.playback.interrupt();
            }
            ServerEvent::TurnComplete => {
                if let Some(update) = self.transcript.commit_model() {
                    self.emit_transcript(update).await;
                }
                self.emit_status(StatusUpdate::info(STATUS_WAITING_FOR_VOICE))
                    .await;
            }
            ServerEvent::ActivityEnd => {
                if let Some(update) = self.transcript.commit_user() {
                    self.emit_transcript(update).await;
                }
            }
            ServerEvent::ModelStart => {
                self.emit_status(StatusUpdate::active(STATUS_MODEL_RESPONDING))
                    .await;
            }
            ServerEvent::Unknown => debug!("Ignoring unrecognized server message"),
        }
        true
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "Session state change");
        }
        self.state = state;
        self.state_tx.send_replace(state);
    }

    // Plain fns returning the callback's own future: nothing borrowed from
    // the controller is held while a callback runs.
    fn emit_status(&self, update: StatusUpdate) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        debug!(variant = %update.variant, "Status: {}", update.message);
        match self.status_callback.clone() {
            Some(callback) => callback(update),
            None => Box::pin(async {}),
        }
    }

    fn emit_transcript(
        &self,
        update: TranscriptUpdate,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        match self.transcript_callback.clone() {
            Some(callback) => callback(update),
            None => Box::pin(async {}),
        }
    }
}

/// Fetch a credential, acquire the microphone and open the transport.
/// Anything acquired is released again if a later step fails.
async fn acquire_session(
    attempt: u64,
    components: &SessionComponents,
    config: &SessionConfig,
    events: &mpsc::UnboundedSender<StartEvent>,
) -> SessionResult<AcquiredSession> {
    let token = components.credentials.fetch().await?;
    let access_token = token.access_token().ok_or_else(|| {
        SessionError::InvalidCredential("no access token in credential response".to_string())
    })?;
    let endpoint = token.endpoint(&config.ws_endpoint).to_string();
    let url = build_socket_url(&endpoint, access_token)?;
    let setup = token.setup_payload();
    drop(token);

    let _ = events.send(StartEvent::CredentialIssued { attempt });

    let request = CaptureRequest {
        block_size: config.capture_block_size,
        target_sample_rate: config.capture_sample_rate,
    };
    let mut microphone = components.microphone.acquire(&request).await?;

    let opened =
        tokio::time::timeout(config.connect_timeout(), components.connector.connect(&url)).await;
    let transport = match opened {
        Ok(Ok(transport)) => transport,
        Ok(Err(e)) => {
            microphone.stop();
            return Err(e);
        }
        Err(_) => {
            microphone.stop();
            return Err(SessionError::Timeout(format!(
                "transport did not open within {}s",
                config.connect_timeout_seconds
            )));
        }
    };

    Ok(AcquiredSession {
        setup,
        endpoint: redact_url(&endpoint).to_string(),
        microphone,
        transport,
    })
}

/// Receive from an optional channel; pends forever when there is none.
async fn next_item<T>(receiver: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running [`SessionController`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<ControlCommand>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    /// Start a session. Resolves once it is active, or with the reason it
    /// could not start.
    ///
    /// Already active: resolves `Ok` at once. Starting: shares the outcome
    /// of the attempt in flight. Closing: fails with
    /// [`SessionError::Cancelled`].
    pub async fn start(&self) -> SessionResult<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(ControlCommand::Start(reply))
            .await
            .map_err(|_| SessionError::ControllerStopped)?;
        response
            .await
            .unwrap_or(Err(SessionError::ControllerStopped))
    }

    /// Stop the session. Resolves once the controller is idle. Callable in
    /// any state, any number of times.
    pub async fn stop(&self) {
        let (reply, response) = oneshot::channel();
        if self.commands.send(ControlCommand::Stop(reply)).await.is_ok() {
            let _ = response.await;
        }
    }

    /// Stop any session and end the controller task.
    pub async fn shutdown(&self) {
        let (reply, response) = oneshot::channel();
        if self.commands.send(ControlCommand::Shutdown(reply)).await.is_ok() {
            let _ = response.await;
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait until the controller reaches `target`.
    pub async fn wait_for_state(&self, target: SessionState) -> SessionResult<()> {
        let mut state = self.state.clone();
        state
            .wait_for(|current| *current == target)
            .await
            .map(|_| ())
            .map_err(|_| SessionError::ControllerStopped)
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::devices;
    use crate::core::playback::VirtualClock;
    use crate::core::session::{TokenEndpointClient, TokenEndpointConfig, WebSocketConnector};

    fn assert_send<T: Send>(_: &T) {}

    fn controller() -> SessionController {
        let components = SessionComponents {
            credentials: Arc::new(TokenEndpointClient::new(TokenEndpointConfig::default()).unwrap()),
            connector: Arc::new(WebSocketConnector::new()),
            microphone: devices::default_microphone(),
            output: Arc::new(VirtualClock::new().factory()),
        };
        SessionController::new(SessionConfig::default(), components)
    }

    #[test]
    fn test_controller_task_is_send() {
        let mut controller = controller();
        controller.on_status(Arc::new(|_: StatusUpdate| {
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        }));
        controller.on_transcript(Arc::new(|_: TranscriptUpdate| {
            Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
        }));

        let (_commands, command_rx) = mpsc::channel(1);
        let task = controller.run(command_rx);
        assert_send(&task);
    }

    #[test]
    fn test_emitters_do_not_borrow_controller() {
        let controller = controller();
        let status = controller.emit_status(StatusUpdate::info(STATUS_READY));
        drop(controller);
        assert_send(&status);
    }
}
