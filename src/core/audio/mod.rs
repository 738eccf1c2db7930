//! Audio sample handling shared by capture and playback.

pub mod convert;

pub use convert::{
    bytes_to_pcm16, decode, encode, encode_pcm_chunk, float_to_pcm16, parse_sample_rate,
    pcm_mime_type, pcm16_to_bytes, pcm16_to_float, resample, rms_energy,
};

/// One capture callback's worth of mono float samples in `[-1, 1]`.
///
/// Blocks are consumed as soon as they are processed; nothing downstream
/// keeps a reference to them.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    /// Mono samples
    pub samples: Vec<f32>,
    /// Native sample rate of the device that produced the block
    pub sample_rate: u32,
}

impl AudioBlock {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Block duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
