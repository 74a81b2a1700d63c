//! # Musical Tuning Module
//!
//! Pure conversions between frequency, note number, note name and cents
//! deviation, based on twelve-tone equal temperament with A4 = 440 Hz.
//!
//! ## Conventions
//! - Note numbers follow MIDI numbering: A4 is 69, C4 is 60.
//! - Note names are `<letter>[#]<octave>` with sharps only, e.g. "C#3".
//! - Cents are positive when the measured pitch is sharp, negative when flat.
//!
//! Inputs that would take the logarithm of a non-positive number return
//! `None` instead of producing NaN.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Reference pitch of A4 in Hz.
pub const A4_FREQUENCY: f32 = 440.0;

/// Note number of A4.
pub const A4_NOTE_NUMBER: i32 = 69;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Pitch-class lookup for parsing note names.
static PITCH_CLASSES: Lazy<BTreeMap<&'static str, i32>> = Lazy::new(|| {
    NOTE_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| (*name, i as i32))
        .collect()
});

/// A musical note resolved from a frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// MIDI-style note number (A4 = 69)
    pub number: i32,
    /// Note name (e.g., "A4", "C#3")
    pub name: String,
    /// Equal-tempered frequency of the note in Hz
    pub frequency: f32,
}

/// Converts a frequency to the nearest note number.
///
/// Computes `round(12 * log2(freq / 440) + 69)`.
///
/// # Returns
/// * `Some(n)` - Nearest note number
/// * `None` - `freq` is zero, negative or not finite
pub fn frequency_to_note_number(freq: f32) -> Option<i32> {
    if !(freq.is_finite() && freq > 0.0) {
        return None;
    }
    let number = 12.0 * (freq / A4_FREQUENCY).log2() + A4_NOTE_NUMBER as f32;
    Some(number.round() as i32)
}

/// Returns the name of a note number, e.g. 69 -> "A4", 61 -> "C#4".
///
/// Uses floored division so negative note numbers map to octave -2 and
/// below with a valid pitch class.
pub fn note_number_to_name(n: i32) -> String {
    let octave = n.div_euclid(12) - 1;
    let pitch_class = n.rem_euclid(12) as usize;
    format!("{}{}", NOTE_NAMES[pitch_class], octave)
}

/// Equal-tempered frequency of a note number: `440 * 2^((n - 69) / 12)`.
pub fn note_number_to_frequency(n: i32) -> f32 {
    A4_FREQUENCY * 2.0_f32.powf((n - A4_NOTE_NUMBER) as f32 / 12.0)
}

/// Parses a note name into its note number.
///
/// Accepts an uppercase letter, an optional `#` and a single octave digit.
/// Lowercase letters, flats, multi-digit or missing octaves are rejected.
pub fn note_name_to_number(name: &str) -> Option<i32> {
    let (pitch, octave) = name.split_at_checked(name.len().checked_sub(1)?)?;
    let octave = octave.chars().next()?.to_digit(10)? as i32;
    let pitch_class = PITCH_CLASSES.get(pitch)?;
    Some((octave + 1) * 12 + pitch_class)
}

/// Resolves a note name to its equal-tempered frequency.
///
/// The inverse of [`note_number_to_name`] composed with
/// [`note_number_to_frequency`] for every name that parses.
pub fn note_name_to_frequency(name: &str) -> Option<f32> {
    note_name_to_number(name).map(note_number_to_frequency)
}

/// Calculates the interval between two frequencies in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
///
/// # Returns
/// * `Some(cents)` - `1200 * log2(actual / reference)`; positive = sharp
/// * `None` - either frequency is non-positive or not finite
pub fn cents_offset(actual_freq: f32, reference_freq: f32) -> Option<f32> {
    let valid = |f: f32| f.is_finite() && f > 0.0;
    if !valid(actual_freq) || !valid(reference_freq) {
        return None;
    }
    Some(1200.0 * (actual_freq / reference_freq).log2())
}

/// Finds the equal-tempered note closest to a frequency.
pub fn nearest_note(freq: f32) -> Option<Note> {
    let number = frequency_to_note_number(freq)?;
    Some(Note {
        number,
        name: note_number_to_name(number),
        frequency: note_number_to_frequency(number),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_note_69() {
        assert_eq!(frequency_to_note_number(440.0), Some(69));
        assert_eq!(note_number_to_name(69), "A4");
        assert_eq!(note_number_to_frequency(69), 440.0);
        assert_eq!(note_number_to_name(60), "C4");
        assert_eq!(note_number_to_name(61), "C#4");
    }

    #[test]
    fn note_number_survives_frequency_round_trip() {
        for n in -48..=180 {
            assert_eq!(frequency_to_note_number(note_number_to_frequency(n)), Some(n), "note {n}");
        }
    }

    #[test]
    fn every_valid_name_resolves_back_to_itself() {
        for octave in 0..=9 {
            for pitch in NOTE_NAMES {
                let name = format!("{pitch}{octave}");
                let freq = note_name_to_frequency(&name).unwrap();
                let number = frequency_to_note_number(freq).unwrap();
                assert_eq!(note_number_to_name(number), name);
            }
        }
    }

    #[test]
    fn negative_note_numbers_use_floored_modulo() {
        assert_eq!(note_number_to_name(11), "B-1");
        assert_eq!(note_number_to_name(0), "C-1");
        assert_eq!(note_number_to_name(-1), "B-2");
        assert_eq!(note_number_to_name(-12), "C-2");
    }

    #[test]
    fn malformed_note_names_are_rejected() {
        for bad in ["", "A", "a4", "Bb3", "A10", "H2", "C#", "#4", "E#4", "A-1", "A4 ", "ä4"] {
            assert_eq!(note_name_to_frequency(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn note_names_parse_to_expected_frequencies() {
        assert_eq!(note_name_to_number("C4"), Some(60));
        assert_eq!(note_name_to_number("A#4"), Some(70));
        assert_eq!(note_name_to_number("C0"), Some(12));
        let c4 = note_name_to_frequency("C4").unwrap();
        assert!((c4 - 261.6256).abs() < 0.01);
    }

    #[test]
    fn cents_offset_properties() {
        for f in [27.5_f32, 100.0, 440.0, 1234.5] {
            assert_eq!(cents_offset(f, f), Some(0.0));
            assert!((cents_offset(2.0 * f, f).unwrap() - 1200.0).abs() < 1e-3);
            assert!((cents_offset(f, 2.0 * f).unwrap() + 1200.0).abs() < 1e-3);
        }
        let sharp = cents_offset(466.16, 440.0).unwrap();
        assert!((sharp - 100.0).abs() < 0.1);
    }

    #[test]
    fn non_positive_frequencies_have_no_note() {
        assert_eq!(frequency_to_note_number(0.0), None);
        assert_eq!(frequency_to_note_number(-440.0), None);
        assert_eq!(frequency_to_note_number(f32::NAN), None);
        assert_eq!(frequency_to_note_number(f32::INFINITY), None);
        assert_eq!(cents_offset(440.0, 0.0), None);
        assert_eq!(cents_offset(-1.0, 440.0), None);
    }

    #[test]
    fn nearest_note_snaps_slightly_sharp_pitch() {
        let note = nearest_note(445.0).unwrap();
        assert_eq!(note.number, 69);
        assert_eq!(note.name, "A4");
        assert_eq!(note.frequency, 440.0);
    }
}
