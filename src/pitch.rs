/*
Pitch Names
===========

Melody notation refers to pitches by name: a letter A-G, an optional
accidental (# or b), and an octave digit. Names resolve to equal
temperament frequencies with A4 = 440 Hz as the tuning reference.

The MIDI convention anchors the math: C4 (middle C) = 60, A4 = 69,
frequency = 440 * 2^((midi - 69) / 12).

Enharmonic aliases (C#4 and Db4, F#3 and Gb3, ...) land on the same MIDI
number and therefore the same frequency - the notation treats them as
spelling preferences, nothing more.
*/

/// Frequency substituted for unrecognised pitch names (A4).
pub const FALLBACK_FREQUENCY: f32 = 440.0;

/// Resolve a pitch name like `C4`, `F#3` or `Bb5` to a frequency in Hz.
///
/// Returns `None` for anything that is not a well-formed name in octaves
/// 0 through 8. Callers that must not fail (the note synthesizer)
/// substitute [`FALLBACK_FREQUENCY`].
pub fn frequency(name: &str) -> Option<f32> {
    midi_number(name).map(midi_to_freq)
}

/// Convert a MIDI note number to a frequency in Hz.
#[inline]
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Parse a pitch name to its MIDI note number.
fn midi_number(name: &str) -> Option<u8> {
    let mut chars = name.chars();

    let semitone: i32 = match chars.next()? {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave_text) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let octave: i32 = octave_text.parse().ok()?;
    if !(0..=8).contains(&octave) {
        return None;
    }

    let midi = 12 * (octave + 1) + semitone + accidental;
    u8::try_from(midi).ok()
}
