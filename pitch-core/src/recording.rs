//! # Recording Module
//!
//! Time-stamped sequence of detected notes. A recording is cleared each
//! time it starts, only grows while active, and is frozen read-only once
//! stopped so a [`RecordingSink`] can export it.

use serde::{Deserialize, Serialize};

use crate::error::ExportError;

/// One detected note, stamped with the frame's wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedNote {
    pub note_number: i32,
    pub timestamp_millis: u64,
}

/// Lifecycle of a [`Recording`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordingState {
    /// Never started.
    #[default]
    Idle,
    /// Appending notes.
    Active,
    /// Stopped; contents are read-only until the next start.
    Frozen,
}

#[derive(Debug, Clone, Default)]
pub struct Recording {
    notes: Vec<RecordedNote>,
    state: RecordingState,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the recording and begins appending.
    pub fn start(&mut self) {
        self.notes.clear();
        self.state = RecordingState::Active;
        tracing::info!("recording started");
    }

    /// Freezes the recording. No-op unless active.
    pub fn stop(&mut self) {
        if self.state == RecordingState::Active {
            self.state = RecordingState::Frozen;
            tracing::info!(notes = self.notes.len(), "recording stopped");
        }
    }

    /// Appends a note. Returns `false`, leaving the recording untouched,
    /// unless it is active.
    pub fn push(&mut self, note: RecordedNote) -> bool {
        if self.state != RecordingState::Active {
            return false;
        }
        self.notes.push(note);
        true
    }

    pub fn notes(&self) -> &[RecordedNote] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == RecordingState::Active
    }

    pub fn is_frozen(&self) -> bool {
        self.state == RecordingState::Frozen
    }

    /// Returns the notes once the recording is frozen and non-empty.
    pub fn exportable(&self) -> Result<&[RecordedNote], ExportError> {
        match self.state {
            RecordingState::Active => Err(ExportError::RecordingActive),
            _ if self.notes.is_empty() => Err(ExportError::EmptyRecording),
            _ => Ok(&self.notes),
        }
    }

    /// Hands the frozen notes to a sink.
    pub fn export_to<S: RecordingSink + ?Sized>(&self, sink: &mut S, instrument: u8) -> Result<(), ExportError> {
        let notes = self.exportable()?;
        tracing::debug!(notes = notes.len(), instrument, "exporting recording");
        sink.consume(notes, instrument)
    }
}

/// Consumer of a frozen recording, responsible for any file format.
///
/// Sinks must not assume real-time spacing between notes; timestamps are
/// informational.
pub trait RecordingSink {
    fn consume(&mut self, notes: &[RecordedNote], instrument: u8) -> Result<(), ExportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect {
        notes: Vec<RecordedNote>,
        instrument: Option<u8>,
    }

    impl RecordingSink for Collect {
        fn consume(&mut self, notes: &[RecordedNote], instrument: u8) -> Result<(), ExportError> {
            self.notes = notes.to_vec();
            self.instrument = Some(instrument);
            Ok(())
        }
    }

    fn note(n: i32, t: u64) -> RecordedNote {
        RecordedNote {
            note_number: n,
            timestamp_millis: t,
        }
    }

    #[test]
    fn push_only_while_active() {
        let mut recording = Recording::new();
        assert!(!recording.push(note(60, 0)));
        recording.start();
        assert!(recording.push(note(60, 1)));
        assert!(recording.push(note(62, 2)));
        recording.stop();
        assert!(recording.is_frozen());
        assert!(!recording.push(note(64, 3)));
        assert_eq!(recording.notes(), &[note(60, 1), note(62, 2)]);
    }

    #[test]
    fn restart_clears_previous_notes() {
        let mut recording = Recording::new();
        recording.start();
        recording.push(note(60, 1));
        recording.stop();
        recording.start();
        assert!(recording.is_empty());
        assert!(recording.is_active());
    }

    #[test]
    fn export_requires_frozen_non_empty_recording() {
        let mut sink = Collect::default();
        let mut recording = Recording::new();
        assert!(matches!(recording.export_to(&mut sink, 1), Err(ExportError::EmptyRecording)));

        recording.start();
        recording.push(note(69, 10));
        assert!(matches!(recording.export_to(&mut sink, 1), Err(ExportError::RecordingActive)));

        recording.stop();
        recording.export_to(&mut sink, 5).unwrap();
        assert_eq!(sink.notes, vec![note(69, 10)]);
        assert_eq!(sink.instrument, Some(5));
    }

    #[test]
    fn stopping_an_idle_recording_does_nothing() {
        let mut recording = Recording::new();
        recording.stop();
        assert_eq!(recording.state(), RecordingState::Idle);
    }
}
