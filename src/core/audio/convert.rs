//! Sample format conversion for the capture and playback paths.
//!
//! Everything here is pure: float samples in `[-1, 1]`, 16-bit little-endian
//! PCM, the base64 text encoding used on the wire, and a cheap linear
//! resampler.

use std::borrow::Cow;

use base64::prelude::*;
use once_cell::sync::Lazy;
use regex::Regex;

/// Scale applied to positive float samples when converting to PCM16.
const PCM_POSITIVE_SCALE: f32 = 32767.0;

/// Scale applied to negative float samples, and the divisor back to float.
const PCM_NEGATIVE_SCALE: f32 = 32768.0;

/// Matches the `rate=<n>` parameter of an audio MIME type.
static RATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)rate=([0-9]+)").expect("rate pattern is a valid regex")
});

/// Convert float samples to PCM16.
///
/// Samples are clamped to `[-1, 1]`. Negative values scale by 32768,
/// non-negative by 32767, and the result is truncated toward zero.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| {
            let s = sample.clamp(-1.0, 1.0);
            if s < 0.0 {
                (s * PCM_NEGATIVE_SCALE) as i16
            } else {
                (s * PCM_POSITIVE_SCALE) as i16
            }
        })
        .collect()
}

/// Convert PCM16 samples to floats by scaling with 1/32768.
pub fn pcm16_to_float(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| s as f32 / PCM_NEGATIVE_SCALE)
        .collect()
}

/// Serialize PCM16 samples as little-endian bytes.
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Read little-endian PCM16 samples from bytes.
///
/// A trailing odd byte cannot form a sample and is ignored.
pub fn bytes_to_pcm16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encode bytes for the wire. Empty input encodes to an empty string.
pub fn encode(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    BASE64_STANDARD.encode(bytes)
}

/// Decode wire text back to bytes. An empty string decodes to no bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    BASE64_STANDARD.decode(text)
}

/// Linear-interpolation resampler.
///
/// Returns the input untouched when the rates match. Otherwise produces
/// `round(len / ratio)` samples where `ratio = source_rate / target_rate`,
/// clamping the interpolation neighbour to the last input sample.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Cow<'_, [f32]> {
    if source_rate == target_rate || source_rate == 0 || target_rate == 0 {
        return Cow::Borrowed(samples);
    }
    if samples.is_empty() {
        return Cow::Owned(Vec::new());
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (samples.len() as f64 / ratio).round() as usize;
    let last = samples.len() - 1;

    let mut output = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let position = i as f64 * ratio;
        let base = (position.floor() as usize).min(last);
        let next = (base + 1).min(last);
        let weight = (position - base as f64) as f32;
        output.push(samples[base] + (samples[next] - samples[base]) * weight);
    }

    Cow::Owned(output)
}

/// Float block to the base64 PCM16 payload sent upstream.
pub fn encode_pcm_chunk(samples: &[f32]) -> String {
    encode(&pcm16_to_bytes(&float_to_pcm16(samples)))
}

/// Root-mean-square energy of a block. Zero for an empty block.
pub fn rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Sample rate declared by a MIME type such as `audio/pcm;rate=24000`.
///
/// Lenient: a missing, unparsable or zero rate falls back to `fallback`.
pub fn parse_sample_rate(mime_type: Option<&str>, fallback: u32) -> u32 {
    mime_type
        .and_then(|mime| RATE_PATTERN.captures(mime))
        .and_then(|caps| caps.get(1))
        .and_then(|rate| rate.as_str().parse::<u32>().ok())
        .filter(|&rate| rate > 0)
        .unwrap_or(fallback)
}

/// MIME type for PCM16 at `rate`.
pub fn pcm_mime_type(rate: u32) -> String {
    format!("audio/pcm;rate={rate}")
}
