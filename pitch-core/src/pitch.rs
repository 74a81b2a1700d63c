//! # Pitch Detection Module
//!
//! Time-domain autocorrelation pitch estimation for monophonic signals.
//!
//! ## Pipeline
//! 1. RMS noise gate rejects silence
//! 2. Low-amplitude leading and trailing edges are trimmed off
//! 3. Unnormalized autocorrelation over every lag of the trimmed frame
//! 4. The zero-lag peak is skipped by walking to the first local minimum
//! 5. The strongest remaining peak gives the period
//!
//! Every degenerate case (empty trim, no minimum, zero lag) comes out as
//! [`PitchEstimate::NoFundamental`], never as NaN or infinity.

use serde::{Deserialize, Serialize};

use crate::config::TunerConfig;
use crate::fft;
use crate::source::SampleFrame;

/// Result of analysing one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    /// Silence, or no detectable periodicity.
    NoFundamental,
    /// Fundamental frequency in Hz; always finite and positive.
    Frequency(f32),
}

impl PitchEstimate {
    /// Wraps a frequency, mapping anything non-finite or non-positive to
    /// `NoFundamental`.
    pub fn from_frequency(freq: f32) -> Self {
        if freq.is_finite() && freq > 0.0 {
            PitchEstimate::Frequency(freq)
        } else {
            PitchEstimate::NoFundamental
        }
    }

    pub fn frequency(&self) -> Option<f32> {
        match *self {
            PitchEstimate::Frequency(f) => Some(f),
            PitchEstimate::NoFundamental => None,
        }
    }
}

/// How the autocorrelation sum is computed. Both agree within floating-point
/// tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutocorrelationMethod {
    /// Direct O(n²) sum over all lags.
    #[default]
    Direct,
    /// Zero-padded FFT, O(n log n).
    Fft,
}

/// Stateless autocorrelation pitch estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchEstimator {
    /// Frames with RMS below this are treated as silence.
    pub silence_rms_threshold: f32,
    /// Samples at or below this magnitude are trimmed from the frame edges.
    pub clip_threshold: f32,
    pub method: AutocorrelationMethod,
}

impl PitchEstimator {
    pub fn new(silence_rms_threshold: f32, clip_threshold: f32) -> Self {
        Self {
            silence_rms_threshold,
            clip_threshold,
            method: AutocorrelationMethod::Direct,
        }
    }

    pub fn with_method(mut self, method: AutocorrelationMethod) -> Self {
        self.method = method;
        self
    }

    pub fn from_config(config: &TunerConfig) -> Self {
        Self::new(config.silence_rms_threshold, config.clip_trim_threshold)
            .with_method(config.autocorrelation)
    }

    /// Estimates the fundamental frequency of one frame.
    pub fn estimate(&self, frame: &SampleFrame) -> PitchEstimate {
        self.estimate_samples(frame.samples(), frame.sample_rate())
    }

    /// Estimates the fundamental frequency of raw samples.
    ///
    /// # Arguments
    /// * `signal` - Mono samples in `[-1, 1]`
    /// * `sample_rate` - Sample rate in Hz
    pub fn estimate_samples(&self, signal: &[f32], sample_rate: u32) -> PitchEstimate {
        if signal.is_empty() || sample_rate == 0 {
            return PitchEstimate::NoFundamental;
        }

        // --- Noise Gate ---
        let level = rms(signal);
        if !level.is_finite() || level < self.silence_rms_threshold {
            return PitchEstimate::NoFundamental;
        }

        let trimmed = trim_edges(signal, self.clip_threshold);
        if trimmed.len() < 2 {
            return PitchEstimate::NoFundamental;
        }

        let correlation = match self.method {
            AutocorrelationMethod::Direct => autocorrelate(trimmed),
            AutocorrelationMethod::Fft => fft::autocorrelate(trimmed),
        };

        match fundamental_lag(&correlation) {
            Some(period) => PitchEstimate::from_frequency(sample_rate as f32 / period as f32),
            None => PitchEstimate::NoFundamental,
        }
    }
}

impl Default for PitchEstimator {
    fn default() -> Self {
        Self::from_config(&TunerConfig::default())
    }
}

/// Root-mean-square amplitude of a signal. Zero for an empty slice.
pub fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

/// Trims the frame to the span between the first and last sample whose
/// magnitude exceeds `threshold`.
///
/// Returns the whole signal when no sample exceeds the threshold.
pub fn trim_edges(signal: &[f32], threshold: f32) -> &[f32] {
    let loud = |s: &f32| s.abs() > threshold;
    match (signal.iter().position(loud), signal.iter().rposition(loud)) {
        (Some(start), Some(end)) => &signal[start..=end],
        _ => signal,
    }
}

/// Unnormalized autocorrelation `c[i] = Σ_j buf[j] * buf[j + i]`.
pub fn autocorrelate(buf: &[f32]) -> Vec<f32> {
    (0..buf.len())
        .map(|lag| {
            buf[..buf.len() - lag]
                .iter()
                .zip(&buf[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Finds the period, in samples, from an autocorrelation sequence.
///
/// Skips the zero-lag peak by walking forward while the sequence falls,
/// then takes the first lag holding the maximum of what remains.
///
/// # Returns
/// * `Some(lag)` - Period in samples, at least 1
/// * `None` - The sequence never stops falling, or the best peak is at
///   lag zero or not positive
pub fn fundamental_lag(correlation: &[f32]) -> Option<usize> {
    let mut start = 0;
    while start + 1 < correlation.len() && correlation[start] > correlation[start + 1] {
        start += 1;
    }
    if start + 1 >= correlation.len() {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for (lag, &value) in correlation.iter().enumerate().skip(start) {
        if best.is_none_or(|(_, peak)| value > peak) {
            best = Some((lag, value));
        }
    }

    match best {
        Some((lag, peak)) if lag > 0 && peak > 0.0 => Some(lag),
        _ => None,
    }
}
