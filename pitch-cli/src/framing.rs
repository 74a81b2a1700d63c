//! Sliding-window framing for streamed audio.
//!
//! Device callbacks deliver arbitrary-length buffers. The [`Framer`] keeps
//! the most recent `frame_size` samples and emits a copy every `hop` new
//! samples, so the analysis rate is set by the hop rather than the frame
//! length (a 2048-sample frame at 44.1 kHz with a 735-sample hop gives
//! 60 frames per second).

use std::collections::VecDeque;

#[derive(Debug)]
pub struct Framer {
    frame_size: usize,
    hop: usize,
    window: VecDeque<f32>,
    since_emit: usize,
}

impl Framer {
    /// `hop` is clamped to at least one sample.
    pub fn new(frame_size: usize, hop: usize) -> Self {
        Self {
            frame_size,
            hop: hop.max(1),
            window: VecDeque::with_capacity(frame_size + 1),
            since_emit: 0,
        }
    }

    /// Hop length giving roughly `frames_per_second` frames.
    pub fn hop_for_rate(sample_rate: u32, frames_per_second: u32) -> usize {
        (sample_rate / frames_per_second.max(1)).max(1) as usize
    }

    /// Feeds interleaved samples, downmixing `channels` to mono, and calls
    /// `emit` for every completed frame.
    pub fn push_interleaved(&mut self, data: &[f32], channels: usize, mut emit: impl FnMut(Vec<f32>)) {
        let channels = channels.max(1);
        for chunk in data.chunks(channels) {
            let mono = chunk.iter().sum::<f32>() / chunk.len() as f32;
            self.window.push_back(mono);
            if self.window.len() > self.frame_size {
                self.window.pop_front();
            }
            self.since_emit += 1;
            if self.window.len() == self.frame_size && self.since_emit >= self.hop {
                emit(self.window.iter().copied().collect());
                self.since_emit = 0;
            }
        }
    }
}
