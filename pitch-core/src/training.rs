//! # Training Module
//!
//! Ear-training check: is the tracked pitch within a tolerance of a target
//! note chosen by the user?

use crate::config::{DEFAULT_TRAINING_TOLERANCE_CENTS, TunerConfig};
use crate::tuning;

/// Outcome of comparing the current pitch with the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingResult {
    pub in_tune: bool,
    /// Absolute distance from the target in cents.
    pub cents_off: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingEvaluator {
    pub tolerance_cents: f32,
}

impl TrainingEvaluator {
    pub fn new(tolerance_cents: f32) -> Self {
        Self { tolerance_cents }
    }

    pub fn from_config(config: &TunerConfig) -> Self {
        Self::new(config.training_tolerance_cents)
    }

    /// Compares `current_frequency` against the note named `target_note_name`.
    ///
    /// # Returns
    /// * `Some(result)` - Both the target and the current pitch are known
    /// * `None` - The target does not parse or there is no current pitch;
    ///   callers should show an idle message
    pub fn evaluate(&self, current_frequency: Option<f32>, target_note_name: &str) -> Option<TrainingResult> {
        let target = tuning::note_name_to_frequency(target_note_name)?;
        let cents_off = tuning::cents_offset(current_frequency?, target)?.abs();
        Some(TrainingResult {
            in_tune: cents_off < self.tolerance_cents,
            cents_off,
        })
    }
}

impl Default for TrainingEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_TRAINING_TOLERANCE_CENTS)
    }
}
