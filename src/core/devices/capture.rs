//! Cuts device callbacks into fixed-size mono blocks.

#![cfg_attr(not(feature = "device-audio"), allow(dead_code))]

use tokio::sync::mpsc;
use tracing::warn;

use crate::core::audio::AudioBlock;

/// Dropped blocks are logged on the first drop and then every this many
const DROP_LOG_INTERVAL: u64 = 100;

/// Accumulates interleaved device samples and emits mono blocks of exactly
/// `block_size` samples. Blocks the receiver has no room for are dropped.
pub(crate) struct BlockChunker {
    block_size: usize,
    sample_rate: u32,
    pending: Vec<f32>,
    blocks: mpsc::Sender<AudioBlock>,
    dropped: u64,
}

impl BlockChunker {
    pub(crate) fn new(block_size: usize, sample_rate: u32, blocks: mpsc::Sender<AudioBlock>) -> Self {
        let block_size = block_size.max(1);
        Self {
            block_size,
            sample_rate,
            pending: Vec::with_capacity(block_size * 2),
            blocks,
            dropped: 0,
        }
    }

    /// Feed interleaved samples with `channels` channels.
    pub(crate) fn push(&mut self, interleaved: &[f32], channels: usize) {
        let channels = channels.max(1);
        if channels == 1 {
            self.pending.extend_from_slice(interleaved);
        } else {
            self.pending.extend(
                interleaved
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
            );
        }

        while self.pending.len() >= self.block_size {
            let samples: Vec<f32> = self.pending.drain(..self.block_size).collect();
            let block = AudioBlock::new(samples, self.sample_rate);
            if let Err(mpsc::error::TrySendError::Full(_)) = self.blocks.try_send(block) {
                self.dropped += 1;
                if self.dropped == 1 || self.dropped % DROP_LOG_INTERVAL == 0 {
                    warn!(dropped = self.dropped, "Capture queue full, dropping audio");
                }
            }
        }
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.dropped
    }
}
