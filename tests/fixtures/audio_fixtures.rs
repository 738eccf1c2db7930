//! Audio Test Fixtures
//!
//! Generated audio keeps inputs reproducible and free of file dependencies.
//!
//! Capture blocks are mono `f32` in `[-1, 1]` at a typical device rate
//! (48kHz). Model audio is base64 PCM16 at 24kHz, as the Live API sends it.

use std::f32::consts::PI;

use duplex_voice::core::audio::{AudioBlock, encode_pcm_chunk};

/// Typical microphone rate
pub const DEVICE_SAMPLE_RATE: u32 = 48000;

/// Rate of model audio
pub const MODEL_SAMPLE_RATE: u32 = 24000;

/// Samples per capture block at the device rate (100ms)
pub const BLOCK_SAMPLES: usize = 4800;

/// Generate silence
pub fn generate_silence(duration_samples: usize) -> Vec<f32> {
    vec![0.0; duration_samples]
}

/// Generate a sine tone
pub fn generate_sine(frequency: f32, amplitude: f32, sample_rate: u32, duration_samples: usize) -> Vec<f32> {
    (0..duration_samples)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// A capture block loud enough to count as speech
pub fn speech_block() -> AudioBlock {
    AudioBlock::new(
        generate_sine(220.0, 0.3, DEVICE_SAMPLE_RATE, BLOCK_SAMPLES),
        DEVICE_SAMPLE_RATE,
    )
}

/// A silent capture block
pub fn silent_block() -> AudioBlock {
    AudioBlock::new(generate_silence(BLOCK_SAMPLES), DEVICE_SAMPLE_RATE)
}

/// Base64 PCM16 model audio of `duration_samples` at 24kHz
pub fn model_audio(duration_samples: usize) -> String {
    encode_pcm_chunk(&generate_sine(440.0, 0.2, MODEL_SAMPLE_RATE, duration_samples))
}

/// `serverContent` message carrying one inline audio part
pub fn model_audio_message(duration_samples: usize) -> serde_json::Value {
    serde_json::json!({
        "serverContent": {
            "modelTurn": {
                "parts": [{
                    "inlineData": {
                        "mimeType": format!("audio/pcm;rate={MODEL_SAMPLE_RATE}"),
                        "data": model_audio(duration_samples),
                    }
                }]
            }
        }
    })
}
