//! # Session Module
//!
//! The explicit, caller-owned analysis context. A host (timer loop, audio
//! callback, test harness) calls [`Session::tick`] once per captured frame;
//! everything runs synchronously and returns plain data for rendering.
//!
//! ```no_run
//! use pitch_core::{Session, TunerConfig, source::SampleFrame};
//!
//! let mut session = Session::new(TunerConfig::default())?;
//! session.start_session();
//! let frame = SampleFrame::new(vec![0.0; 2048], 44100)?;
//! let report = session.tick(&frame, 0)?;
//! println!("{}", report.display);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::config::TunerConfig;
use crate::error::{ConfigError, ExportError, SessionError, SourceError};
use crate::pitch::{PitchEstimate, PitchEstimator};
use crate::recording::{Recording, RecordingSink};
use crate::source::{FrameSource, SampleFrame};
use crate::tracker::{DisplayState, SignalTracker};
use crate::training::{TrainingEvaluator, TrainingResult};
use crate::tuning;

/// Everything produced by one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub estimate: PitchEstimate,
    pub display: DisplayState,
    /// `None` when the target note does not parse or nothing is tracked.
    pub training: Option<TrainingResult>,
}

#[derive(Debug, Clone)]
pub struct Session {
    config: TunerConfig,
    estimator: PitchEstimator,
    tracker: SignalTracker,
    evaluator: TrainingEvaluator,
    target_note: String,
    running: bool,
}

impl Session {
    /// Builds an idle session from a validated configuration.
    pub fn new(config: TunerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            estimator: PitchEstimator::from_config(&config),
            tracker: SignalTracker::from_config(&config),
            evaluator: TrainingEvaluator::from_config(&config),
            target_note: config.target_note_name.clone(),
            config,
            running: false,
        })
    }

    /// Starts (or restarts) analysis with empty tracking state.
    pub fn start_session(&mut self) {
        if self.running {
            tracing::info!("restarting session");
        } else {
            tracing::info!(target_note = %self.target_note, "session started");
        }
        self.tracker.reset();
        self.running = true;
    }

    /// Stops analysis and discards tracking state.
    ///
    /// An active recording is frozen but not exported; read it through
    /// [`Session::recording`] or [`Session::export_recording`].
    pub fn stop_session(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.tracker.reset();
        self.tracker.recording_mut().stop();
        tracing::info!("session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts a fresh recording, or freezes the active one.
    ///
    /// Returns `true` if recording is now active.
    pub fn toggle_recording(&mut self) -> bool {
        let recording = self.tracker.recording_mut();
        if recording.is_active() {
            recording.stop();
            false
        } else {
            recording.start();
            true
        }
    }

    pub fn is_recording(&self) -> bool {
        self.tracker.recording().is_active()
    }

    /// Sets the training target.
    ///
    /// Names that do not parse are stored anyway and simply produce no
    /// training result. Returns whether the name resolves to a note.
    pub fn set_target_note(&mut self, name: impl Into<String>) -> bool {
        self.target_note = name.into();
        let valid = tuning::note_name_to_frequency(&self.target_note).is_some();
        if valid {
            tracing::debug!(target_note = %self.target_note, "target note set");
        } else {
            tracing::warn!(target_note = %self.target_note, "target note does not parse");
        }
        valid
    }

    pub fn target_note(&self) -> &str {
        &self.target_note
    }

    /// Analyses one frame.
    ///
    /// # Errors
    /// * `SessionError::NotRunning` - The session has not been started
    /// * `SourceError::FrameLength` - The frame does not match `frame_size`
    pub fn tick(&mut self, frame: &SampleFrame, now_millis: u64) -> Result<TickReport, SessionError> {
        if !self.running {
            return Err(SessionError::NotRunning);
        }
        if frame.len() != self.config.frame_size {
            return Err(SourceError::FrameLength {
                expected: self.config.frame_size,
                actual: frame.len(),
            }
            .into());
        }

        let estimate = self.estimator.estimate(frame);
        let recording = self.tracker.recording().is_active();
        let display = self.tracker.update(estimate, now_millis, recording);
        let training = self
            .evaluator
            .evaluate(display.current_frequency(), &self.target_note);

        Ok(TickReport {
            estimate,
            display,
            training,
        })
    }

    /// Pulls the next frame from `source` and analyses it.
    pub fn pump<S: FrameSource + ?Sized>(&mut self, source: &mut S, now_millis: u64) -> Result<TickReport, SessionError> {
        if !self.running {
            return Err(SessionError::NotRunning);
        }
        let frame = source.pull_frame()?;
        self.tick(&frame, now_millis)
    }

    pub fn recording(&self) -> &Recording {
        self.tracker.recording()
    }

    /// Hands the frozen recording to `sink` with the configured instrument.
    pub fn export_recording<S: RecordingSink + ?Sized>(&self, sink: &mut S) -> Result<(), ExportError> {
        self.tracker.recording().export_to(sink, self.config.instrument)
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn tracker(&self) -> &SignalTracker {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine_frame(freq: f32) -> SampleFrame {
        let samples = (0..2048)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / 44100.0).sin())
            .collect();
        SampleFrame::new(samples, 44100).unwrap()
    }

    fn silent_frame() -> SampleFrame {
        SampleFrame::new(vec![0.0; 2048], 44100).unwrap()
    }

    fn running_session() -> Session {
        let mut session = Session::new(TunerConfig::default()).unwrap();
        session.start_session();
        session
    }

    #[test]
    fn tick_requires_running_session() {
        let mut session = Session::new(TunerConfig::default()).unwrap();
        assert!(matches!(session.tick(&silent_frame(), 0), Err(SessionError::NotRunning)));
    }

    #[test]
    fn wrong_frame_length_is_rejected() {
        let mut session = running_session();
        let frame = SampleFrame::new(vec![0.0; 1024], 44100).unwrap();
        assert!(matches!(
            session.tick(&frame, 0),
            Err(SessionError::Source(SourceError::FrameLength { expected: 2048, actual: 1024 }))
        ));
    }

    #[test]
    fn invalid_config_never_builds_a_session() {
        let config = TunerConfig {
            frame_size: 1000,
            ..TunerConfig::default()
        };
        assert!(Session::new(config).is_err());
    }

    #[test]
    fn tick_reports_note_and_training() {
        let mut session = running_session();
        assert!(session.set_target_note("A4"));
        let report = session.tick(&sine_frame(440.0), 0).unwrap();
        assert_eq!(report.display.note_name.as_deref(), Some("A4"));
        let training = report.training.unwrap();
        assert!(training.in_tune);
    }

    #[test]
    fn unparseable_target_gives_no_training() {
        let mut session = running_session();
        assert!(!session.set_target_note("la"));
        assert_eq!(session.target_note(), "la");
        let report = session.tick(&sine_frame(440.0), 0).unwrap();
        assert!(report.display.note_name.is_some());
        assert_eq!(report.training, None);
    }

    #[test]
    fn stop_resets_tracking_and_freezes_recording() {
        let mut session = running_session();
        assert!(session.toggle_recording());
        session.tick(&sine_frame(440.0), 10).unwrap();
        session.stop_session();
        assert!(!session.is_running());
        assert!(session.recording().is_frozen());
        assert_eq!(session.recording().len(), 1);
        assert_eq!(session.tracker().state().last_valid_frequency, None);

        session.start_session();
        let report = session.tick(&silent_frame(), 20).unwrap();
        assert!(report.display.is_unknown());
    }

    #[test]
    fn restart_discards_held_note() {
        let mut session = running_session();
        session.tick(&sine_frame(440.0), 0).unwrap();
        assert!(session.tick(&silent_frame(), 1).unwrap().display.held);
        session.start_session();
        assert!(session.tick(&silent_frame(), 2).unwrap().display.is_unknown());
    }
}
