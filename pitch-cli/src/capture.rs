//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL (Cross-Platform Audio Library).
//! Device buffers are framed into fixed-size [`SampleFrame`]s and handed to
//! the analysis loop through the core's single-slot frame channel.
//!
//! ## Features
//! - Default input device selection
//! - Prefers mono 32-bit float input near 44.1 kHz, downmixes otherwise
//! - Overlapping frames at a configurable analysis rate

use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use pitch_core::source::{ChannelSource, SampleFrame, frame_channel};

use crate::framing::Framer;

/// Preferred capture rate in Hz.
pub const TARGET_SAMPLE_RATE: u32 = 44100;

/// A running capture stream. Dropping it stops capture.
pub struct Capture {
    stream: cpal::Stream,
    pub sample_rate: u32,
}

impl Capture {
    pub fn pause(&self) {
        if let Err(e) = self.stream.pause() {
            tracing::warn!("error pausing stream: {e}");
        }
    }
}

/// Starts capture from the default input device.
///
/// # Arguments
/// * `frame_size` - Samples per analysis frame
/// * `frames_per_second` - Analysis rate; frames overlap when this exceeds
///   `sample_rate / frame_size`
///
/// # Returns
/// * `Ok((capture, source))` - Stream handle and the frame source to pull from
/// * `Err(e)` - No usable input device or stream
pub fn start_capture(frame_size: usize, frames_per_second: u32) -> Result<(Capture, ChannelSource)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    tracing::info!("using audio input device: {}", device.name()?);

    let configs = device
        .supported_input_configs()
        .context("querying input configurations")?
        .collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE.clamp(
        supported_config.min_sample_rate().0,
        supported_config.max_sample_rate().0,
    );
    let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let config: cpal::StreamConfig = config.into();

    tracing::info!(sample_rate, channels, "selected input format");

    let (sender, source) = frame_channel(sample_rate);
    let mut framer = Framer::new(frame_size, Framer::hop_for_rate(sample_rate, frames_per_second));

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                framer.push_interleaved(data, channels, |samples| {
                    if let Ok(frame) = SampleFrame::new(samples, sample_rate) {
                        // Dropped when analysis still holds the previous frame.
                        sender.offer(frame);
                    }
                });
            },
            |err| tracing::warn!("an error occurred on the audio stream: {err}"),
            None,
        )
        .context("building input stream")?;

    stream.play().context("starting input stream")?;

    Ok((Capture { stream, sample_rate }, source))
}

/// Picks the f32 input configuration best suited to pitch tracking:
/// fewest channels first, then the range closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let distance = if (min..=max).contains(&target_rate) {
                0
            } else {
                min.abs_diff(target_rate).min(max.abs_diff(target_rate))
            };
            (c.channels(), distance)
        })
}
