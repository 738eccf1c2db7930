//! Performance benchmarks for the audio hot paths
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use duplex_voice::core::audio::{encode_pcm_chunk, resample};
use duplex_voice::core::playback::{PlaybackConfig, PlaybackScheduler, VirtualClock};
use duplex_voice::core::session::{ClientMessage, Frame, decode_frame};
use duplex_voice::core::vad::{SpeechActivityDetector, VADConfig};

fn sine(samples: usize, rate: u32) -> Vec<f32> {
    (0..samples)
        .map(|i| 0.3 * (2.0 * PI * 220.0 * i as f32 / rate as f32).sin())
        .collect()
}

/// Capture block to wire message: resample, PCM16, base64, JSON
fn bench_capture_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("capture_encode");
    group.measurement_time(Duration::from_secs(5));

    for (rate, block) in [(16000u32, 4096usize), (44100, 4096), (48000, 4800)] {
        let samples = sine(block, rate);
        group.throughput(Throughput::Elements(block as u64));
        group.bench_with_input(
            BenchmarkId::new("block", format!("{}@{}", block, rate)),
            &samples,
            |b, samples| {
                b.iter(|| {
                    let resampled = resample(black_box(samples), rate, 16000);
                    let data = encode_pcm_chunk(&resampled);
                    ClientMessage::audio(data, 16000).to_json()
                });
            },
        );
    }

    group.finish();
}

fn bench_vad(c: &mut Criterion) {
    let speech = sine(4096, 48000);
    let silence = vec![0.0f32; 4096];

    c.bench_function("vad_process_block", |b| {
        let mut detector = SpeechActivityDetector::new(VADConfig::default());
        let mut toggle = false;
        b.iter(|| {
            toggle = !toggle;
            let block = if toggle { &speech } else { &silence };
            detector.process_block(black_box(block))
        });
    });
}

/// Inbound model audio message decoding
fn bench_inbound_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("inbound_decode");

    for samples in [480usize, 2400, 9600] {
        let message = serde_json::json!({
            "serverContent": {
                "outputTranscription": {"text": "Hola, ¿en qué puedo ayudarte?"},
                "modelTurn": {"parts": [{"inlineData": {
                    "mimeType": "audio/pcm;rate=24000",
                    "data": encode_pcm_chunk(&sine(samples, 24000)),
                }}]}
            }
        });
        let frame = Frame::Text(message.to_string());

        group.throughput(Throughput::Bytes(message.to_string().len() as u64));
        group.bench_with_input(BenchmarkId::new("frame", samples), &frame, |b, frame| {
            b.iter(|| decode_frame(black_box(frame)));
        });
    }

    group.finish();
}

/// Scheduling a burst of model audio, then a barge-in
fn bench_playback_scheduling(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let chunk = encode_pcm_chunk(&sine(2400, 24000));

    c.bench_function("schedule_burst_of_10", |b| {
        b.to_async(&rt).iter(|| async {
            let clock = VirtualClock::new();
            let (finished_tx, _finished_rx) = tokio::sync::mpsc::unbounded_channel();
            let mut scheduler = PlaybackScheduler::new(
                PlaybackConfig::default(),
                Arc::new(clock.factory()),
                finished_tx,
            );
            for _ in 0..10 {
                scheduler
                    .enqueue(black_box(&chunk), Some("audio/pcm;rate=24000"))
                    .await
                    .unwrap();
            }
            scheduler.set_suppressed(true);
            scheduler.reset().await;
        });
    });
}

criterion_group!(
    benches,
    bench_capture_encode,
    bench_vad,
    bench_inbound_decode,
    bench_playback_scheduling,
);

criterion_main!(benches);
