//! Offline frame source reading a WAV file with `hound`.

use std::path::Path;

use anyhow::{Context, Result, bail};
use hound::{SampleFormat, WavReader};
use pitch_core::source::{FrameSource, SampleFrame};
use pitch_core::SourceError;

use crate::framing::Framer;

/// Serves overlapping frames from a decoded WAV file, then reports
/// `SourceError::Disconnected` once the file is exhausted.
#[derive(Debug)]
pub struct WavSource {
    samples: Vec<f32>,
    sample_rate: u32,
    frame_size: usize,
    hop: usize,
    position: usize,
}

impl WavSource {
    /// Decodes the whole file, downmixed to mono, and serves `frame_size`
    /// frames at `frames_per_second`.
    pub fn open(path: impl AsRef<Path>, frame_size: usize, frames_per_second: u32) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            bail!("{} has a sample rate of zero", path.display());
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<f32>, _>>()
                .context("decoding float samples")?,
            SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<f32>, _>>()
                    .context("decoding integer samples")?
            }
        };

        let channels = spec.channels.max(1) as usize;
        let samples = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect::<Vec<_>>();

        tracing::info!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels,
            seconds = samples.len() as f32 / spec.sample_rate as f32,
            "opened wav input"
        );

        let hop = Framer::hop_for_rate(spec.sample_rate, frames_per_second);
        Ok(Self::from_samples(samples, spec.sample_rate, frame_size, hop))
    }

    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, frame_size: usize, hop: usize) -> Self {
        Self {
            samples,
            sample_rate,
            frame_size,
            hop: hop.max(1),
            position: 0,
        }
    }

    /// Time of the most recently served frame's last sample, in
    /// milliseconds from the start of the file.
    pub fn timestamp_millis(&self) -> u64 {
        let end = (self.position.saturating_sub(self.hop) + self.frame_size) as u64;
        end * 1000 / self.sample_rate as u64
    }
}

impl FrameSource for WavSource {
    fn pull_frame(&mut self) -> Result<SampleFrame, SourceError> {
        let end = self.position + self.frame_size;
        if end > self.samples.len() {
            return Err(SourceError::Disconnected);
        }
        let frame = SampleFrame::new(self.samples[self.position..end].to_vec(), self.sample_rate)?;
        self.position += self.hop;
        Ok(frame)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
