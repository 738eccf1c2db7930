//! Manually driven software output.
//!
//! Nothing is rendered; the clock only moves when [`VirtualClock::advance`]
//! is called. Useful for headless runs, tests and benchmarks where exact
//! control of time is needed.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::output::{
    AudioOutput, AudioOutputFactory, PlaybackError, PlaybackResult, PlaybackSegment, SourceId,
};

/// A segment as it was handed to the virtual output
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledPlayback {
    pub id: SourceId,
    pub start_at: f64,
    pub duration: f64,
    pub sample_rate: u32,
    pub frames: usize,
}

#[derive(Debug, Default)]
struct TimelineState {
    now: f64,
    scheduled: Vec<ScheduledPlayback>,
    playing: BTreeMap<SourceId, f64>,
    stopped: Vec<SourceId>,
    finished: Option<mpsc::UnboundedSender<SourceId>>,
    outputs_created: usize,
    outputs_closed: usize,
    refuse_outputs: bool,
}

/// Shared view of the virtual timeline. Clones observe the same clock.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    state: Arc<Mutex<TimelineState>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory producing outputs bound to this clock
    pub fn factory(&self) -> VirtualOutputFactory {
        VirtualOutputFactory {
            clock: self.clone(),
        }
    }

    pub fn now(&self) -> f64 {
        self.state.lock().now
    }

    /// Move the clock forward, reporting every source that has played out.
    pub fn advance(&self, secs: f64) {
        let mut state = self.state.lock();
        state.now += secs.max(0.0);
        let now = state.now;

        let ended: Vec<SourceId> = state
            .playing
            .iter()
            .filter(|(_, end)| **end <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in ended {
            state.playing.remove(&id);
            if let Some(finished) = &state.finished {
                let _ = finished.send(id);
            }
        }
    }

    /// Everything ever started, in start order
    pub fn scheduled(&self) -> Vec<ScheduledPlayback> {
        self.state.lock().scheduled.clone()
    }

    /// Sources currently audible or waiting for their start time
    pub fn playing(&self) -> Vec<SourceId> {
        self.state.lock().playing.keys().copied().collect()
    }

    /// Sources stopped before their natural end
    pub fn stopped(&self) -> Vec<SourceId> {
        self.state.lock().stopped.clone()
    }

    pub fn outputs_created(&self) -> usize {
        self.state.lock().outputs_created
    }

    pub fn outputs_closed(&self) -> usize {
        self.state.lock().outputs_closed
    }

    /// Make subsequent output creation fail, as a missing device would
    pub fn refuse_outputs(&self, refuse: bool) {
        self.state.lock().refuse_outputs = refuse;
    }
}

/// [`AudioOutputFactory`] for the virtual clock
#[derive(Debug, Clone)]
pub struct VirtualOutputFactory {
    clock: VirtualClock,
}

#[async_trait]
impl AudioOutputFactory for VirtualOutputFactory {
    async fn create(
        &self,
        finished: mpsc::UnboundedSender<SourceId>,
    ) -> PlaybackResult<Box<dyn AudioOutput>> {
        let mut state = self.clock.state.lock();
        if state.refuse_outputs {
            return Err(PlaybackError::OutputUnavailable(
                "virtual output disabled".to_string(),
            ));
        }
        state.finished = Some(finished);
        state.outputs_created += 1;
        drop(state);

        Ok(Box::new(VirtualOutput {
            clock: self.clock.clone(),
        }))
    }
}

struct VirtualOutput {
    clock: VirtualClock,
}

#[async_trait]
impl AudioOutput for VirtualOutput {
    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn start(
        &mut self,
        id: SourceId,
        segment: PlaybackSegment,
        start_at: f64,
    ) -> PlaybackResult<()> {
        let mut state = self.clock.state.lock();
        let duration = segment.duration();
        state.scheduled.push(ScheduledPlayback {
            id,
            start_at,
            duration,
            sample_rate: segment.sample_rate,
            frames: segment.samples.len(),
        });
        state.playing.insert(id, start_at + duration);
        Ok(())
    }

    fn stop(&mut self, id: SourceId) -> PlaybackResult<()> {
        let mut state = self.clock.state.lock();
        if state.playing.remove(&id).is_some() {
            state.stopped.push(id);
        }
        Ok(())
    }

    async fn close(&mut self) -> PlaybackResult<()> {
        let mut state = self.clock.state.lock();
        state.playing.clear();
        state.finished = None;
        state.outputs_closed += 1;
        Ok(())
    }
}
