//! # Recording Export
//!
//! Sinks that persist a frozen recording:
//! - [`MidiFileSink`]: single-track Standard MIDI File, one quarter note per
//!   recorded note, timestamps discarded
//! - [`JsonFileSink`]: the raw `{note_number, timestamp_millis}` list

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use midly::num::{u4, u7, u15, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use pitch_core::{ExportError, RecordedNote, RecordingSink};
use serde::Serialize;

/// MIDI ticks per quarter note.
const TICKS_PER_QUARTER: u16 = 480;
const NOTE_VELOCITY: u8 = 64;
const MIDI_MAX: i32 = 127;

/// Builds a single-track MIDI file: a program change, then one quarter
/// note per recorded note in order.
pub fn build_smf(notes: &[RecordedNote], instrument: u8) -> Result<Smf<'static>, ExportError> {
    if notes.is_empty() {
        return Err(ExportError::EmptyRecording);
    }
    if instrument as i32 > MIDI_MAX {
        return Err(ExportError::Encode(format!("instrument {instrument} is not a MIDI program")));
    }

    let channel = u4::new(0);
    let mut track = vec![TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(instrument),
            },
        },
    }];

    for note in notes {
        if !(0..=MIDI_MAX).contains(&note.note_number) {
            tracing::warn!(note = note.note_number, "note outside MIDI range, skipped");
            continue;
        }
        let key = u7::new(note.note_number as u8);
        let vel = u7::new(NOTE_VELOCITY);
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            },
        });
        track.push(TrackEvent {
            delta: u28::new(TICKS_PER_QUARTER as u32),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff { key, vel },
            },
        });
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));
    smf.tracks.push(track);
    Ok(smf)
}

/// Writes the recording as a Standard MIDI File.
#[derive(Debug)]
pub struct MidiFileSink {
    path: PathBuf,
}

impl MidiFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordingSink for MidiFileSink {
    fn consume(&mut self, notes: &[RecordedNote], instrument: u8) -> Result<(), ExportError> {
        let smf = build_smf(notes, instrument)?;
        smf.save(&self.path)?;
        tracing::info!(path = %self.path.display(), notes = notes.len(), "wrote midi file");
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonRecording<'a> {
    instrument: u8,
    notes: &'a [RecordedNote],
}

/// Writes the recording, timestamps included, as JSON.
#[derive(Debug)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordingSink for JsonFileSink {
    fn consume(&mut self, notes: &[RecordedNote], instrument: u8) -> Result<(), ExportError> {
        let json = serde_json::to_string_pretty(&JsonRecording { instrument, notes })
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        tracing::info!(path = %self.path.display(), notes = notes.len(), "wrote json recording");
        Ok(())
    }
}

/// Picks a sink from the file extension: `.mid`/`.midi` or `.json`.
pub fn sink_for_path(path: &Path) -> Option<Box<dyn RecordingSink>> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "mid" | "midi" => Some(Box::new(MidiFileSink::new(path))),
        "json" => Some(Box::new(JsonFileSink::new(path))),
        _ => None,
    }
}
