//! # Configuration Module
//!
//! Tunable parameters for the analysis pipeline. Every field has a default,
//! so a JSON file only needs to name the settings it overrides.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::ConfigError;
use crate::pitch::AutocorrelationMethod;
use crate::source::DEFAULT_FRAME_SIZE;
use crate::tuning;

/// Default RMS silence gate.
pub const DEFAULT_SILENCE_RMS_THRESHOLD: f32 = 0.01;

/// RMS silence gate of the more sensitive product variant; picks up quieter
/// input at the cost of reacting to more background noise.
pub const SENSITIVE_SILENCE_RMS_THRESHOLD: f32 = 0.0015;

pub const DEFAULT_CLIP_TRIM_THRESHOLD: f32 = 0.2;

/// About half a second at 60 frames per second.
pub const DEFAULT_SILENCE_HOLD_FRAMES: u32 = 30;

pub const DEFAULT_TRAINING_TOLERANCE_CENTS: f32 = 20.0;

pub const DEFAULT_TARGET_NOTE: &str = "C4";

/// Raw 0-based General MIDI program handed to the recording sink (1 is
/// bright acoustic piano).
pub const DEFAULT_INSTRUMENT: u8 = 1;

/// All recognised options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub silence_rms_threshold: f32,
    pub clip_trim_threshold: f32,
    pub silence_hold_frames: u32,
    pub training_tolerance_cents: f32,
    pub target_note_name: String,
    pub frame_size: usize,
    pub autocorrelation: AutocorrelationMethod,
    /// Clamp the tuner bar position to 0..=100 percent.
    pub clamp_tuner_bar: bool,
    pub instrument: u8,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            silence_rms_threshold: DEFAULT_SILENCE_RMS_THRESHOLD,
            clip_trim_threshold: DEFAULT_CLIP_TRIM_THRESHOLD,
            silence_hold_frames: DEFAULT_SILENCE_HOLD_FRAMES,
            training_tolerance_cents: DEFAULT_TRAINING_TOLERANCE_CENTS,
            target_note_name: DEFAULT_TARGET_NOTE.to_string(),
            frame_size: DEFAULT_FRAME_SIZE,
            autocorrelation: AutocorrelationMethod::Direct,
            clamp_tuner_bar: true,
            instrument: DEFAULT_INSTRUMENT,
        }
    }
}

impl TunerConfig {
    /// Loads a configuration from a JSON file and validates it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut data = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut data))
            .map_err(io_err)?;
        let config: TunerConfig = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        File::create(path)
            .and_then(|mut file| file.write_all(json.as_bytes()))
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Checks every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("silence_rms_threshold", self.silence_rms_threshold)?;
        non_negative("clip_trim_threshold", self.clip_trim_threshold)?;
        positive("training_tolerance_cents", self.training_tolerance_cents)?;
        if self.silence_hold_frames == 0 {
            return Err(ConfigError::OutOfRange {
                field: "silence_hold_frames",
                expected: "at least 1",
                value: 0.0,
            });
        }
        if self.frame_size < 4 || !self.frame_size.is_power_of_two() {
            return Err(ConfigError::FrameSize(self.frame_size));
        }
        if tuning::note_name_to_frequency(&self.target_note_name).is_none() {
            return Err(ConfigError::TargetNote(self.target_note_name.clone()));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "finite and positive",
            value: value as f64,
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected: "finite and non-negative",
            value: value as f64,
        })
    }
}
