//! # Frame Source Module
//!
//! The boundary between audio acquisition and analysis. A capture backend
//! (microphone, file, test harness) produces fixed-size [`SampleFrame`]s and
//! the session pulls them one at a time through a [`FrameSource`].
//!
//! [`frame_channel`] connects a producer on another thread to the analysis
//! loop with a single-slot crossbeam channel: at most one frame is in flight,
//! and frames the consumer is too slow to take are dropped rather than
//! queued, so processing order always equals capture order.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};

use crate::error::SourceError;

/// Default analysis frame length in samples.
pub const DEFAULT_FRAME_SIZE: usize = 2048;

/// One immutable frame of mono samples in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFrame {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl SampleFrame {
    /// Wraps captured samples.
    ///
    /// # Errors
    /// * `SourceError::SampleRate` - `sample_rate` is zero
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, SourceError> {
        if sample_rate == 0 {
            return Err(SourceError::SampleRate(sample_rate));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Anything that can hand the analysis loop its next frame.
pub trait FrameSource {
    /// Blocks until the next frame is available.
    fn pull_frame(&mut self) -> Result<SampleFrame, SourceError>;

    /// Sample rate of every frame this source produces.
    fn sample_rate(&self) -> u32;
}

/// Producing half of [`frame_channel`].
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: Sender<SampleFrame>,
}

impl FrameSender {
    /// Offers a frame without blocking.
    ///
    /// Returns `false` if the slot is occupied (the frame is dropped) or the
    /// consumer has gone away.
    pub fn offer(&self, frame: SampleFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("analysis busy, dropping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consuming half of [`frame_channel`].
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<SampleFrame>,
    sample_rate: u32,
}

impl ChannelSource {
    /// Returns a frame if one is waiting, without blocking.
    pub fn try_pull_frame(&mut self) -> Result<Option<SampleFrame>, SourceError> {
        match self.rx.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SourceError::Disconnected),
        }
    }

    /// The underlying receiver, for use in `crossbeam_channel::select!`.
    pub fn receiver(&self) -> &Receiver<SampleFrame> {
        &self.rx
    }
}

impl FrameSource for ChannelSource {
    fn pull_frame(&mut self) -> Result<SampleFrame, SourceError> {
        self.rx.recv().map_err(|_| SourceError::Disconnected)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Creates a single-slot frame hand-off between a capture thread and the
/// analysis loop.
pub fn frame_channel(sample_rate: u32) -> (FrameSender, ChannelSource) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (FrameSender { tx }, ChannelSource { rx, sample_rate })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: f32) -> SampleFrame {
        SampleFrame::new(vec![value; 8], 8000).unwrap()
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        assert!(matches!(
            SampleFrame::new(vec![0.0; 4], 0),
            Err(SourceError::SampleRate(0))
        ));
    }

    #[test]
    fn only_one_frame_in_flight() {
        let (tx, mut rx) = frame_channel(8000);
        assert!(tx.offer(frame(0.1)));
        assert!(!tx.offer(frame(0.2)));
        assert_eq!(rx.pull_frame().unwrap(), frame(0.1));
        assert!(rx.try_pull_frame().unwrap().is_none());
        assert!(tx.offer(frame(0.3)));
        assert_eq!(rx.pull_frame().unwrap(), frame(0.3));
    }

    #[test]
    fn dropped_sender_disconnects() {
        let (tx, mut rx) = frame_channel(8000);
        drop(tx);
        assert!(matches!(rx.pull_frame(), Err(SourceError::Disconnected)));
        assert!(matches!(rx.try_pull_frame(), Err(SourceError::Disconnected)));
    }
}
