//! Sample-accurate mixer behind the device output clock.

#![cfg_attr(not(feature = "device-audio"), allow(dead_code))]

use tokio::sync::mpsc;

use crate::core::audio::resample;
use crate::core::playback::{PlaybackSegment, SourceId};

struct Voice {
    id: SourceId,
    start_frame: u64,
    samples: Vec<f32>,
}

impl Voice {
    fn end_frame(&self) -> u64 {
        self.start_frame + self.samples.len() as u64
    }
}

/// Mixes scheduled sources into device buffers. The clock is the number of
/// frames rendered so far, so it only advances while the device pulls audio.
pub(crate) struct Mixer {
    sample_rate: u32,
    frames_rendered: u64,
    voices: Vec<Voice>,
    finished: mpsc::UnboundedSender<SourceId>,
}

impl Mixer {
    pub(crate) fn new(sample_rate: u32, finished: mpsc::UnboundedSender<SourceId>) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frames_rendered: 0,
            voices: Vec::new(),
            finished,
        }
    }

    pub(crate) fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds of audio rendered so far
    pub(crate) fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    /// Schedule `segment` at `start_at` seconds, converted to the device rate.
    pub(crate) fn add(&mut self, id: SourceId, segment: PlaybackSegment, start_at: f64) {
        let samples = resample(&segment.samples, segment.sample_rate, self.sample_rate).into_owned();
        let start_frame = (start_at.max(0.0) * self.sample_rate as f64).round() as u64;
        self.voices.push(Voice {
            id,
            start_frame,
            samples,
        });
    }

    /// Drop a source without reporting it. Returns whether it was present.
    pub(crate) fn remove(&mut self, id: SourceId) -> bool {
        let before = self.voices.len();
        self.voices.retain(|voice| voice.id != id);
        self.voices.len() != before
    }

    pub(crate) fn clear(&mut self) {
        self.voices.clear();
    }

    pub(crate) fn active_sources(&self) -> usize {
        self.voices.len()
    }

    /// Fill an interleaved buffer and report sources that played out.
    pub(crate) fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let base = self.frames_rendered;

        for (offset, frame) in out.chunks_mut(channels).enumerate() {
            let position = base + offset as u64;
            let mut mixed = 0.0f32;
            for voice in &self.voices {
                if position >= voice.start_frame
                    && let Some(sample) = voice.samples.get((position - voice.start_frame) as usize)
                {
                    mixed += sample;
                }
            }
            frame.fill(mixed.clamp(-1.0, 1.0));
        }

        self.frames_rendered += (out.len() / channels) as u64;

        let now = self.frames_rendered;
        let finished = &self.finished;
        self.voices.retain(|voice| {
            if voice.end_frame() <= now {
                let _ = finished.send(voice.id);
                false
            } else {
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_at_scheduled_frame() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut mixer = Mixer::new(4, tx);
        mixer.add(SourceId(1), PlaybackSegment::new(vec![0.5, 0.5], 4), 0.5);

        let mut out = vec![0.0; 4];
        mixer.render(&mut out, 1);
        assert_eq!(out, vec![0.0, 0.0, 0.5, 0.5]);
        assert_eq!(mixer.current_time(), 1.0);
        assert_eq!(rx.try_recv().unwrap(), SourceId(1));
        assert_eq!(mixer.active_sources(), 0);
    }

    #[test]
    fn test_stereo_duplicates_mono() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut mixer = Mixer::new(2, tx);
        mixer.add(SourceId(1), PlaybackSegment::new(vec![0.25, -0.25], 2), 0.0);

        let mut out = vec![0.0; 4];
        mixer.render(&mut out, 2);
        assert_eq!(out, vec![0.25, 0.25, -0.25, -0.25]);
    }

    #[test]
    fn test_removed_source_is_not_reported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut mixer = Mixer::new(4, tx);
        mixer.add(SourceId(3), PlaybackSegment::new(vec![0.5; 8], 4), 0.0);

        let mut out = vec![0.0; 2];
        mixer.render(&mut out, 1);
        assert!(mixer.remove(SourceId(3)));
        mixer.render(&mut out, 1);
        assert_eq!(out, vec![0.0, 0.0]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_resamples_to_device_rate() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut mixer = Mixer::new(48000, tx);
        mixer.add(SourceId(1), PlaybackSegment::new(vec![0.0; 2400], 24000), 0.0);

        let mut out = vec![0.0; 4799];
        mixer.render(&mut out, 1);
        assert_eq!(mixer.active_sources(), 1);
        mixer.render(&mut out[..1], 1);
        assert_eq!(mixer.active_sources(), 0);
    }
}
