//! Gapless playback scheduling with interrupt and barge-in suppression.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::output::{AudioOutput, AudioOutputFactory, PlaybackResult, PlaybackSegment, SourceId};
use crate::core::audio::{bytes_to_pcm16, decode, parse_sample_rate, pcm16_to_float};

/// Default pre-buffer before the first sound of a burst (ms)
pub const DEFAULT_LEAD_TIME_MS: u64 = 180;

/// Rate assumed when a payload's MIME type carries no usable rate (Hz)
pub const DEFAULT_FALLBACK_SAMPLE_RATE: u32 = 24000;

/// Playback scheduling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Lead time added to the clock when a burst starts (ms)
    pub lead_time_ms: u64,
    /// Sample rate used when the MIME type has none
    pub fallback_sample_rate: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            lead_time_ms: DEFAULT_LEAD_TIME_MS,
            fallback_sample_rate: DEFAULT_FALLBACK_SAMPLE_RATE,
        }
    }
}

impl PlaybackConfig {
    /// Lead time in seconds of output clock
    pub fn lead_time(&self) -> f64 {
        self.lead_time_ms as f64 / 1000.0
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fallback_sample_rate == 0 {
            anyhow::bail!("Playback fallback_sample_rate must be greater than 0");
        }
        if self.lead_time_ms > 5_000 {
            anyhow::bail!("Playback lead_time_ms must not exceed 5000");
        }
        Ok(())
    }
}

/// A segment that has been handed to the output and not yet finished
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledSource {
    pub id: SourceId,
    pub start_at: f64,
    pub duration: f64,
}

/// Schedules model audio back-to-back on an output clock.
///
/// The output is created on the first segment that needs it and released
/// by [`reset`](Self::reset). Segments start exactly where the previous one
/// ends; a new burst starts no earlier than `now + lead_time`.
pub struct PlaybackScheduler {
    config: PlaybackConfig,
    factory: Arc<dyn AudioOutputFactory>,
    finished_tx: mpsc::UnboundedSender<SourceId>,
    output: Option<Box<dyn AudioOutput>>,
    queue: VecDeque<PlaybackSegment>,
    sources: BTreeMap<SourceId, ScheduledSource>,
    next_start_time: f64,
    next_source_id: u64,
    suppressed: bool,
    playing: bool,
}

impl PlaybackScheduler {
    /// Create a scheduler. Natural completions from outputs it creates are
    /// sent on `finished_tx`; the owner feeds them back through
    /// [`on_source_finished`](Self::on_source_finished).
    pub fn new(
        config: PlaybackConfig,
        factory: Arc<dyn AudioOutputFactory>,
        finished_tx: mpsc::UnboundedSender<SourceId>,
    ) -> Self {
        Self {
            config,
            factory,
            finished_tx,
            output: None,
            queue: VecDeque::new(),
            sources: BTreeMap::new(),
            next_start_time: 0.0,
            next_source_id: 0,
            suppressed: false,
            playing: false,
        }
    }

    /// Decode a base64 PCM16 payload and queue it for playback.
    ///
    /// Empty payloads and anything arriving while suppressed are dropped.
    pub async fn enqueue(&mut self, encoded: &str, mime_type: Option<&str>) -> PlaybackResult<()> {
        let bytes = decode(encoded)?;
        let pcm = bytes_to_pcm16(&bytes);
        if pcm.is_empty() || self.suppressed {
            return Ok(());
        }

        self.ensure_output().await?;

        let sample_rate = parse_sample_rate(mime_type, self.config.fallback_sample_rate);
        self.queue
            .push_back(PlaybackSegment::new(pcm16_to_float(&pcm), sample_rate));
        self.drain();
        Ok(())
    }

    async fn ensure_output(&mut self) -> PlaybackResult<()> {
        if self.output.is_some() {
            return Ok(());
        }
        let output = self.factory.create(self.finished_tx.clone()).await?;
        debug!(now = output.current_time(), "Playback output created");
        self.output = Some(output);
        Ok(())
    }

    fn drain(&mut self) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        if self.suppressed || self.queue.is_empty() {
            if self.sources.is_empty() {
                self.playing = false;
            }
            return;
        }

        let lead_start = output.current_time() + self.config.lead_time();
        if self.next_start_time < lead_start {
            self.next_start_time = lead_start;
        }

        while let Some(segment) = self.queue.pop_front() {
            let id = SourceId(self.next_source_id);
            self.next_source_id += 1;

            let start_at = self.next_start_time;
            let duration = segment.duration();

            match output.start(id, segment, start_at) {
                Ok(()) => {
                    self.sources.insert(
                        id,
                        ScheduledSource {
                            id,
                            start_at,
                            duration,
                        },
                    );
                    self.next_start_time = start_at + duration;
                    self.playing = true;
                }
                Err(e) => warn!("Failed to start {}: {}", id, e),
            }
        }
    }

    /// Record the natural end of a source. Ids that were already removed
    /// by an interrupt are ignored.
    pub fn on_source_finished(&mut self, id: SourceId) {
        if self.sources.remove(&id).is_none() {
            return;
        }
        if self.sources.is_empty() && self.queue.is_empty() {
            self.playing = false;
        }
    }

    /// Drop everything queued and stop everything scheduled.
    pub fn interrupt(&mut self) {
        self.queue.clear();
        self.playing = false;

        // Sources leave the set before being stopped, so a completion
        // racing the stop is ignored by `on_source_finished`.
        let sources = std::mem::take(&mut self.sources);

        let Some(output) = self.output.as_mut() else {
            self.next_start_time = 0.0;
            return;
        };
        for id in sources.into_keys() {
            if let Err(e) = output.stop(id) {
                debug!("Stopping {} failed: {}", id, e);
            }
        }
        self.next_start_time = output.current_time();
    }

    /// Barge-in control. Suppressing interrupts playback and drops new
    /// audio until released; releasing starts fresh from "now".
    pub fn set_suppressed(&mut self, suppressed: bool) {
        if self.suppressed == suppressed {
            return;
        }
        self.suppressed = suppressed;

        if suppressed {
            debug!("Playback suppressed");
            self.interrupt();
        } else {
            debug!("Playback released");
            self.next_start_time = self
                .output
                .as_ref()
                .map(|output| output.current_time())
                .unwrap_or(0.0);
            self.drain();
        }
    }

    /// Stop everything, release suppression and close the output.
    /// Safe to call repeatedly.
    pub async fn reset(&mut self) {
        self.interrupt();
        self.suppressed = false;

        if let Some(mut output) = self.output.take() {
            match output.close().await {
                Ok(()) => info!("Playback output closed"),
                Err(e) => warn!("Failed to close playback output: {}", e),
            }
        }
        self.next_start_time = 0.0;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Whether any segment is scheduled and not yet finished
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Sources currently scheduled, in start order
    pub fn scheduled_sources(&self) -> Vec<ScheduledSource> {
        self.sources.values().copied().collect()
    }

    pub fn queued_segments(&self) -> usize {
        self.queue.len()
    }

    /// Output clock time the next segment would start at
    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }
}
