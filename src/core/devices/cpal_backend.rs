//! Default host devices through cpal.
//!
//! cpal streams are not `Send`, so every stream lives on a dedicated thread
//! for as long as it is needed and is dropped there when asked to stop.
//! Opening waits for the thread; playing and stopping only post a command,
//! so neither blocks an async caller.

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamError};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::capture::BlockChunker;
use super::mixer::Mixer;
use crate::core::audio::{AudioBlock, float_to_pcm16, pcm16_to_float};
use crate::core::playback::{
    AudioOutput, AudioOutputFactory, PlaybackError, PlaybackResult, PlaybackSegment, SourceId,
};
use crate::core::session::{
    CaptureRequest, MicrophoneSource, MicrophoneStream, SessionError, SessionResult,
};

enum StreamCommand {
    Play,
    Stop,
}

/// Handle to a thread that owns a cpal stream.
struct StreamWorker {
    control: std_mpsc::Sender<StreamCommand>,
    thread: JoinHandle<()>,
}

impl StreamWorker {
    fn play(&self) -> bool {
        self.control.send(StreamCommand::Play).is_ok()
    }

    /// Stop the stream and wait for its thread. Blocking.
    fn join(self) {
        let _ = self.control.send(StreamCommand::Stop);
        if self.thread.join().is_err() {
            error!("Audio stream thread panicked");
        }
    }

    /// Stop the stream without waiting. Inside a runtime the thread is
    /// joined on the blocking pool.
    fn shutdown(self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let _ = self.control.send(StreamCommand::Stop);
                handle.spawn_blocking(move || self.join());
            }
            Err(_) => self.join(),
        }
    }
}

/// Run `open` on a new thread and keep its stream alive until stopped.
/// Blocks until the stream is built, so call it off the async workers.
///
/// `on_play_failed` runs on the stream thread if a later `Play` fails.
fn spawn_stream_thread<S, T, F, E>(
    name: &str,
    open: F,
    on_play_failed: E,
) -> Result<(T, StreamWorker), String>
where
    S: StreamTrait + 'static,
    T: Send + 'static,
    F: FnOnce() -> Result<(S, T), String> + Send + 'static,
    E: FnOnce() + Send + 'static,
{
    let (control_tx, control_rx) = std_mpsc::channel::<StreamCommand>();
    let (ready_tx, ready_rx) = std_mpsc::sync_channel::<Result<T, String>>(1);
    let label = name.to_string();

    let thread = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || match open() {
            Ok((stream, value)) => {
                let _ = ready_tx.send(Ok(value));
                let mut on_play_failed = Some(on_play_failed);
                // Either a stop request or a dropped handle ends the stream
                while let Ok(StreamCommand::Play) = control_rx.recv() {
                    if let Err(e) = stream.play() {
                        error!(stream = %label, "Failed to start stream: {}", e);
                        if let Some(failed) = on_play_failed.take() {
                            failed();
                        }
                        break;
                    }
                }
                drop(stream);
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        })
        .map_err(|e| format!("failed to spawn {}: {}", name, e))?;

    match ready_rx.recv() {
        Ok(Ok(value)) => Ok((
            value,
            StreamWorker {
                control: control_tx,
                thread,
            },
        )),
        Ok(Err(e)) => {
            let _ = thread.join();
            Err(e)
        }
        Err(_) => {
            let _ = thread.join();
            Err(format!("{} exited during start-up", name))
        }
    }
}

// =============================================================================
// Microphone
// =============================================================================

/// Default input device.
#[derive(Debug, Clone, Default)]
pub struct DeviceMicrophone;

impl DeviceMicrophone {
    pub fn new() -> Self {
        Self
    }
}

/// Where the capture callback delivers samples. Empty until the session
/// starts capture; emptied on stop or stream failure, which closes the
/// session's block channel.
type CaptureSlot = Arc<Mutex<Option<BlockChunker>>>;

/// Build the default input stream, paused. Returns its native rate.
fn open_input(slot: CaptureSlot) -> Result<(cpal::Stream, u32), String> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| "no input device found".to_string())?;
    let supported = device.default_input_config().map_err(|e| e.to_string())?;
    let channels = supported.channels() as usize;
    let sample_rate = supported.sample_rate().0;
    let config = supported.config();

    info!(
        device = %device.name().unwrap_or_else(|_| "(unnamed)".to_string()),
        sample_rate,
        channels,
        "Using input device"
    );

    let failed = slot.clone();
    let on_error = move |err: StreamError| {
        error!("Microphone stream error: {}", err);
        failed.lock().take();
    };

    let stream = match supported.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Some(chunker) = slot.lock().as_mut() {
                    chunker.push(data, channels);
                }
            },
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Some(chunker) = slot.lock().as_mut() {
                    chunker.push(&pcm16_to_float(data), channels);
                }
            },
            on_error,
            None,
        ),
        other => return Err(format!("unsupported input sample format {:?}", other)),
    }
    .map_err(|e| format!("failed to build input stream: {}", e))?;

    stream
        .pause()
        .map_err(|e| format!("failed to pause input stream: {}", e))?;
    Ok((stream, sample_rate))
}

#[async_trait]
impl MicrophoneSource for DeviceMicrophone {
    /// Opens the device stream paused, so access problems surface here
    /// rather than once the session is live.
    async fn acquire(&self, request: &CaptureRequest) -> SessionResult<Box<dyn MicrophoneStream>> {
        let slot: CaptureSlot = Arc::new(Mutex::new(None));
        let stream_slot = slot.clone();
        let failed_slot = slot.clone();

        let (sample_rate, worker) = tokio::task::spawn_blocking(move || {
            spawn_stream_thread(
                "mic-capture",
                move || open_input(stream_slot),
                move || {
                    failed_slot.lock().take();
                },
            )
        })
        .await
        .map_err(|e| SessionError::MicrophoneUnavailable(e.to_string()))?
        .map_err(SessionError::MicrophoneUnavailable)?;

        Ok(Box::new(DeviceMicrophoneStream {
            sample_rate,
            block_size: request.block_size,
            slot,
            worker: Some(worker),
            capturing: false,
        }))
    }
}

struct DeviceMicrophoneStream {
    sample_rate: u32,
    block_size: usize,
    slot: CaptureSlot,
    worker: Option<StreamWorker>,
    capturing: bool,
}

impl MicrophoneStream for DeviceMicrophoneStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self, blocks: mpsc::Sender<AudioBlock>) -> SessionResult<()> {
        let Some(worker) = self.worker.as_ref() else {
            return Err(SessionError::MicrophoneUnavailable(
                "microphone already released".to_string(),
            ));
        };
        if self.capturing {
            return Ok(());
        }

        *self.slot.lock() = Some(BlockChunker::new(self.block_size, self.sample_rate, blocks));
        if !worker.play() {
            self.slot.lock().take();
            return Err(SessionError::MicrophoneUnavailable(
                "input stream is gone".to_string(),
            ));
        }
        self.capturing = true;
        debug!("Microphone capture started");
        Ok(())
    }

    fn stop(&mut self) {
        self.slot.lock().take();
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
            debug!("Microphone released");
        }
        self.capturing = false;
    }
}

impl Drop for DeviceMicrophoneStream {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// Output
// =============================================================================

/// Default output device.
#[derive(Debug, Clone, Default)]
pub struct DeviceOutputFactory;

impl DeviceOutputFactory {
    pub fn new() -> Self {
        Self
    }
}

fn open_output(
    finished: mpsc::UnboundedSender<SourceId>,
) -> Result<(cpal::Stream, Arc<Mutex<Mixer>>), String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "no output device found".to_string())?;
    let supported = device
        .default_output_config()
        .map_err(|e| e.to_string())?;
    let channels = supported.channels() as usize;
    let mixer = Arc::new(Mutex::new(Mixer::new(supported.sample_rate().0, finished)));
    let config = supported.config();
    let on_error = |err: StreamError| error!("Playback stream error: {}", err);

    info!(
        device = %device.name().unwrap_or_else(|_| "(unnamed)".to_string()),
        sample_rate = supported.sample_rate().0,
        channels,
        "Using output device"
    );

    let render = mixer.clone();
    let stream = match supported.sample_format() {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                render.lock().render(data, channels)
            },
            on_error,
            None,
        ),
        SampleFormat::I16 => {
            let mut scratch: Vec<f32> = Vec::new();
            device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    render.lock().render(&mut scratch, channels);
                    data.copy_from_slice(&float_to_pcm16(&scratch));
                },
                on_error,
                None,
            )
        }
        other => return Err(format!("unsupported output sample format {:?}", other)),
    }
    .map_err(|e| format!("failed to build output stream: {}", e))?;

    stream
        .play()
        .map_err(|e| format!("failed to start output stream: {}", e))?;
    Ok((stream, mixer))
}

#[async_trait]
impl AudioOutputFactory for DeviceOutputFactory {
    async fn create(
        &self,
        finished: mpsc::UnboundedSender<SourceId>,
    ) -> PlaybackResult<Box<dyn AudioOutput>> {
        let (mixer, worker) = tokio::task::spawn_blocking(move || {
            spawn_stream_thread("audio-playback", move || open_output(finished), || {})
        })
        .await
        .map_err(|e| PlaybackError::OutputUnavailable(e.to_string()))?
        .map_err(PlaybackError::OutputUnavailable)?;

        Ok(Box::new(DeviceOutput {
            mixer,
            worker: Some(worker),
        }))
    }
}

struct DeviceOutput {
    mixer: Arc<Mutex<Mixer>>,
    worker: Option<StreamWorker>,
}

#[async_trait]
impl AudioOutput for DeviceOutput {
    fn current_time(&self) -> f64 {
        self.mixer.lock().current_time()
    }

    fn start(
        &mut self,
        id: SourceId,
        segment: PlaybackSegment,
        start_at: f64,
    ) -> PlaybackResult<()> {
        if self.worker.is_none() {
            return Err(PlaybackError::Schedule("output is closed".to_string()));
        }
        self.mixer.lock().add(id, segment, start_at);
        Ok(())
    }

    fn stop(&mut self, id: SourceId) -> PlaybackResult<()> {
        if !self.mixer.lock().remove(id) {
            debug!(source = %id, "Stop for a source that already ended");
        }
        Ok(())
    }

    async fn close(&mut self) -> PlaybackResult<()> {
        self.mixer.lock().clear();
        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| PlaybackError::Close(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for DeviceOutput {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            warn!("Audio output dropped without close");
            worker.shutdown();
        }
    }
}
