//! # Signal Tracker Module
//!
//! Smooths frame-by-frame pitch estimates into a stable display. A short
//! run of silent frames keeps showing the last note (without cents, which
//! would be stale); only once the run reaches the hold threshold does the
//! display fall back to "unknown".

use std::fmt;

use crate::config::{DEFAULT_SILENCE_HOLD_FRAMES, TunerConfig};
use crate::pitch::PitchEstimate;
use crate::recording::{RecordedNote, Recording};
use crate::tuning;

/// Tuner bar position when no cents value is shown.
pub const TUNER_BAR_CENTER: f32 = 50.0;

/// Mutable per-session tracking state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackedState {
    pub last_valid_frequency: Option<f32>,
    pub last_valid_note_number: Option<i32>,
    /// Consecutive silent frames since the last valid pitch.
    pub silence_run_length: u32,
}

/// What the presentation layer should show for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    /// `None` when the note is unknown.
    pub note_name: Option<String>,
    pub note_number: Option<i32>,
    /// Hz; 0 when unknown.
    pub frequency: f32,
    /// Deviation from the nearest note; `None` when unknown or held.
    pub cents: Option<f32>,
    /// Percent across the tuner bar, 50 = in tune.
    pub tuner_bar_percent: f32,
    /// True while showing a held note during a short silence.
    pub held: bool,
}

impl DisplayState {
    /// The fully reset display.
    pub fn unknown() -> Self {
        Self {
            note_name: None,
            note_number: None,
            frequency: 0.0,
            cents: None,
            tuner_bar_percent: TUNER_BAR_CENTER,
            held: false,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.note_name.is_none()
    }

    /// The frequency being shown, if any.
    pub fn current_frequency(&self) -> Option<f32> {
        (self.frequency > 0.0).then_some(self.frequency)
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let note = self.note_name.as_deref().unwrap_or("--");
        write!(f, "{note:<4} {:>8.2} Hz", self.frequency)?;
        match self.cents {
            Some(cents) => write!(f, " {cents:>+7.1} c"),
            None => write!(f, "     -- c"),
        }
    }
}

/// Stateful smoothing layer over [`PitchEstimate`]s, owning the session's
/// [`Recording`].
#[derive(Debug, Clone)]
pub struct SignalTracker {
    state: TrackedState,
    hold_frames: u32,
    clamp_tuner_bar: bool,
    recording: Recording,
}

impl SignalTracker {
    pub fn new(hold_frames: u32) -> Self {
        Self {
            state: TrackedState::default(),
            hold_frames,
            clamp_tuner_bar: true,
            recording: Recording::new(),
        }
    }

    pub fn from_config(config: &TunerConfig) -> Self {
        let mut tracker = Self::new(config.silence_hold_frames);
        tracker.clamp_tuner_bar = config.clamp_tuner_bar;
        tracker
    }

    /// Folds one frame's estimate into the tracked state.
    ///
    /// # Arguments
    /// * `estimate` - This frame's pitch estimate
    /// * `now_millis` - Timestamp for the recording
    /// * `recording` - Append the note to the recording (when it is active)
    pub fn update(&mut self, estimate: PitchEstimate, now_millis: u64, recording: bool) -> DisplayState {
        match estimate {
            PitchEstimate::Frequency(freq) => self.observe(freq, now_millis, recording),
            PitchEstimate::NoFundamental => self.observe_silence(),
        }
    }

    fn observe(&mut self, freq: f32, now_millis: u64, recording: bool) -> DisplayState {
        let Some(note) = tuning::nearest_note(freq) else {
            return self.observe_silence();
        };
        self.state.silence_run_length = 0;
        self.state.last_valid_frequency = Some(freq);
        self.state.last_valid_note_number = Some(note.number);

        if recording {
            self.recording.push(RecordedNote {
                note_number: note.number,
                timestamp_millis: now_millis,
            });
        }

        let cents = tuning::cents_offset(freq, note.frequency);
        tracing::trace!(freq, note = %note.name, ?cents, "pitch");
        DisplayState {
            tuner_bar_percent: cents.map_or(TUNER_BAR_CENTER, |c| self.tuner_bar(c)),
            note_name: Some(note.name),
            note_number: Some(note.number),
            frequency: freq,
            cents,
            held: false,
        }
    }

    fn observe_silence(&mut self) -> DisplayState {
        self.state.silence_run_length = self.state.silence_run_length.saturating_add(1);

        if self.state.silence_run_length < self.hold_frames {
            if let (Some(freq), Some(number)) =
                (self.state.last_valid_frequency, self.state.last_valid_note_number)
            {
                return DisplayState {
                    note_name: Some(tuning::note_number_to_name(number)),
                    note_number: Some(number),
                    frequency: freq,
                    cents: None,
                    tuner_bar_percent: TUNER_BAR_CENTER,
                    held: true,
                };
            }
        } else if self.state.silence_run_length == self.hold_frames {
            tracing::debug!(frames = self.hold_frames, "hold expired");
        }
        DisplayState::unknown()
    }

    fn tuner_bar(&self, cents: f32) -> f32 {
        let percent = TUNER_BAR_CENTER + cents / 5.0;
        if self.clamp_tuner_bar {
            percent.clamp(0.0, 100.0)
        } else {
            percent
        }
    }

    /// Forgets all tracked pitch. The recording is left as is.
    pub fn reset(&mut self) {
        self.state = TrackedState::default();
    }

    pub fn state(&self) -> &TrackedState {
        &self.state
    }

    pub fn hold_frames(&self) -> u32 {
        self.hold_frames
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn recording_mut(&mut self) -> &mut Recording {
        &mut self.recording
    }
}

impl Default for SignalTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_HOLD_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4: PitchEstimate = PitchEstimate::Frequency(440.0);
    const SILENT: PitchEstimate = PitchEstimate::NoFundamental;

    #[test]
    fn valid_pitch_populates_display() {
        let mut tracker = SignalTracker::default();
        let display = tracker.update(A4, 0, false);
        assert_eq!(display.note_name.as_deref(), Some("A4"));
        assert_eq!(display.note_number, Some(69));
        assert_eq!(display.frequency, 440.0);
        assert_eq!(display.cents, Some(0.0));
        assert_eq!(display.tuner_bar_percent, 50.0);
        assert!(!display.held);
        assert_eq!(tracker.state().silence_run_length, 0);
    }

    #[test]
    fn holds_note_until_threshold() {
        let mut tracker = SignalTracker::new(30);
        tracker.update(A4, 0, false);
        for frame in 1..30 {
            let display = tracker.update(SILENT, frame, false);
            assert_eq!(display.note_name.as_deref(), Some("A4"), "frame {frame}");
            assert_eq!(display.frequency, 440.0);
            assert_eq!(display.cents, None);
            assert!(display.held);
        }
        let display = tracker.update(SILENT, 30, false);
        assert!(display.is_unknown());
        assert_eq!(display, DisplayState::unknown());
        assert_eq!(tracker.state().silence_run_length, 30);
    }

    #[test]
    fn hold_length_comes_from_config() {
        let config = TunerConfig {
            silence_hold_frames: 3,
            ..TunerConfig::default()
        };
        let mut tracker = SignalTracker::from_config(&config);
        assert_eq!(tracker.hold_frames(), 3);
        assert_eq!(SignalTracker::default().hold_frames(), 30);

        tracker.update(A4, 0, false);
        assert!(tracker.update(SILENT, 1, false).held);
        assert!(tracker.update(SILENT, 2, false).held);
        assert!(tracker.update(SILENT, 3, false).is_unknown());
    }

    #[test]
    fn valid_pitch_resets_silence_run() {
        let mut tracker = SignalTracker::new(3);
        tracker.update(A4, 0, false);
        tracker.update(SILENT, 1, false);
        tracker.update(SILENT, 2, false);
        tracker.update(PitchEstimate::Frequency(261.63), 3, false);
        assert_eq!(tracker.state().silence_run_length, 0);
        let display = tracker.update(SILENT, 4, false);
        assert_eq!(display.note_name.as_deref(), Some("C4"));
    }

    #[test]
    fn silence_without_history_is_unknown() {
        let mut tracker = SignalTracker::default();
        assert!(tracker.update(SILENT, 0, false).is_unknown());
        assert_eq!(tracker.state().silence_run_length, 1);
    }

    #[test]
    fn tuner_bar_follows_cents() {
        let mut tracker = SignalTracker::default();
        // 20 cents sharp of A4
        let freq = 440.0 * 2.0_f32.powf(20.0 / 1200.0);
        let display = tracker.update(PitchEstimate::Frequency(freq), 0, false);
        assert!((display.cents.unwrap() - 20.0).abs() < 0.01);
        assert!((display.tuner_bar_percent - 54.0).abs() < 0.01);
    }

    #[test]
    fn tuner_bar_clamping_is_configurable() {
        let mut clamped = SignalTracker::default();
        clamped.clamp_tuner_bar = false;
        assert_eq!(clamped.tuner_bar(-300.0), -10.0);
        clamped.clamp_tuner_bar = true;
        assert_eq!(clamped.tuner_bar(-300.0), 0.0);
        assert_eq!(clamped.tuner_bar(300.0), 100.0);
    }

    #[test]
    fn records_only_valid_frames_when_requested() {
        let mut tracker = SignalTracker::default();
        tracker.recording_mut().start();
        tracker.update(A4, 100, true);
        tracker.update(SILENT, 116, true);
        tracker.update(PitchEstimate::Frequency(261.63), 132, true);
        tracker.update(A4, 148, false);
        let notes: Vec<_> = tracker
            .recording()
            .notes()
            .iter()
            .map(|n| (n.note_number, n.timestamp_millis))
            .collect();
        assert_eq!(notes, vec![(69, 100), (60, 132)]);
    }

    #[test]
    fn reset_clears_tracked_state() {
        let mut tracker = SignalTracker::default();
        tracker.update(A4, 0, false);
        tracker.update(SILENT, 1, false);
        tracker.reset();
        assert_eq!(tracker.state(), &TrackedState::default());
        assert!(tracker.update(SILENT, 2, false).is_unknown());
    }

    #[test]
    fn display_formatting() {
        let mut tracker = SignalTracker::default();
        let shown = tracker.update(A4, 0, false).to_string();
        assert!(shown.starts_with("A4"));
        assert!(shown.contains("440.00 Hz"));
        assert!(DisplayState::unknown().to_string().starts_with("--"));
    }
}
