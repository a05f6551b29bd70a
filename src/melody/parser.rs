//! Melody notation parser.
//!
//! The notation is a flat event list, not a language: whitespace-separated
//! tokens of the shape `<duration>:<pitch-spec>`, where the duration is a
//! positive decimal number of beats and the pitch spec is `REST`, a single
//! pitch name, or `name+name+...` for a chord. `//` starts a comment that
//! runs to the end of the line.
//!
//! ```text
//! // four on the floor
//! 1:C4  1:REST  0.5:E4+G4  0.5:C5
//! ```
//!
//! [`parse`] is deliberately lenient: malformed tokens are skipped so a
//! stray comment fragment can never take the music down. [`parse_strict`]
//! reports the first bad token instead and exists for validating bundled
//! catalog data in tests.

use thiserror::Error;

use super::{NoteEvent, Pitch};

/// Diagnostic for a malformed notation token (strict mode only).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotationError {
    #[error("line {line}: token `{token}` is not of the form <duration>:<pitch>")]
    BadShape { line: usize, token: String },

    #[error("line {line}: `{token}` has an unparsable duration")]
    BadDuration { line: usize, token: String },

    #[error("line {line}: `{token}` names no pitch")]
    EmptyPitch { line: usize, token: String },
}

/// Parse notation text into an ordered event sequence.
///
/// Pure and deterministic. Source order is preserved; malformed tokens
/// are silently dropped. Empty input yields an empty sequence.
pub fn parse(text: &str) -> Vec<NoteEvent> {
    let mut events = Vec::new();
    for_each_token(text, |_, _, token| {
        if let Ok(event) = parse_token(token, 0) {
            events.push(event);
        }
    });
    events
}

/// Like [`parse`], but fails on the first malformed token.
pub fn parse_strict(text: &str) -> Result<Vec<NoteEvent>, NotationError> {
    let mut events = Vec::new();
    let mut first_error = None;
    for_each_token(text, |line, _, token| {
        if first_error.is_some() {
            return;
        }
        match parse_token(token, line) {
            Ok(event) => events.push(event),
            Err(err) => first_error = Some(err),
        }
    });
    match first_error {
        Some(err) => Err(err),
        None => Ok(events),
    }
}

fn for_each_token(text: &str, mut f: impl FnMut(usize, usize, &str)) {
    for (line_no, line) in text.lines().enumerate() {
        let code = match line.split_once("//") {
            Some((before, _comment)) => before,
            None => line,
        };
        for (col, token) in code.split_whitespace().enumerate() {
            f(line_no + 1, col, token);
        }
    }
}

fn parse_token(token: &str, line: usize) -> Result<NoteEvent, NotationError> {
    let (duration_text, pitch_text) =
        token.split_once(':').ok_or_else(|| NotationError::BadShape {
            line,
            token: token.to_string(),
        })?;

    let beats: f32 = duration_text
        .parse()
        .ok()
        .filter(|b: &f32| b.is_finite() && *b > 0.0)
        .ok_or_else(|| NotationError::BadDuration {
            line,
            token: token.to_string(),
        })?;

    let pitch = if pitch_text == "REST" {
        Pitch::Rest
    } else if pitch_text.contains('+') {
        let names: Vec<String> = pitch_text
            .split('+')
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        match names.len() {
            0 => {
                return Err(NotationError::EmptyPitch {
                    line,
                    token: token.to_string(),
                })
            }
            1 => Pitch::Note(names.into_iter().next().unwrap()),
            _ => Pitch::Chord(names),
        }
    } else if pitch_text.is_empty() {
        return Err(NotationError::EmptyPitch {
            line,
            token: token.to_string(),
        });
    } else {
        Pitch::Note(pitch_text.to_string())
    };

    Ok(NoteEvent { beats, pitch })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_notes_and_rests_in_order() {
        let events = parse("1:C4 0.5:REST 0.5:E4");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].beats, 1.0);
        assert_eq!(events[0].pitch, Pitch::Note("C4".into()));
        assert_eq!(events[1].pitch, Pitch::Rest);
        assert_eq!(events[2].pitch, Pitch::Note("E4".into()));
    }

    #[test]
    fn skips_malformed_tokens_silently() {
        let events = parse("0.5:C4 garbage 0.5:REST 1.0:E4");
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].pitch, Pitch::Note("C4".into()));
        assert_eq!(events[1].pitch, Pitch::Rest);
        assert_eq!(events[2].pitch, Pitch::Note("E4".into()));
    }

    #[test]
    fn skips_bad_durations() {
        let events = parse("x:C4 -1:C4 0:C4 nan:C4 2:D4");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].beats, 2.0);
    }

    #[test]
    fn strips_comments_to_end_of_line() {
        let score = "
            // intro
            1:C4 // tonic
            1:G4
        ";
        let events = parse(score);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn chord_is_one_event_with_all_members() {
        let events = parse("0.5:C4+E4+G4");
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].pitch,
            Pitch::Chord(vec!["C4".into(), "E4".into(), "G4".into()])
        );
        assert_eq!(events[0].pitch.voice_count(), 3);
    }

    #[test]
    fn degenerate_chord_collapses_to_note() {
        let events = parse("0.5:C4+");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pitch, Pitch::Note("C4".into()));
    }

    #[test]
    fn empty_input_yields_empty_sequence() {
        assert!(parse("").is_empty());
        assert!(parse("   \n // nothing but comments \n").is_empty());
    }

    #[test]
    fn all_rest_input_is_allowed() {
        let events = parse("1:REST 1:REST");
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.pitch == Pitch::Rest));
    }

    #[test]
    fn unknown_pitch_names_survive_parsing() {
        // Resolution to a frequency happens at synthesis time; the
        // parser only cares about token shape.
        let events = parse("1:Z9");
        assert_eq!(events[0].pitch, Pitch::Note("Z9".into()));
    }

    #[test]
    fn strict_mode_reports_first_bad_token() {
        let err = parse_strict("1:C4 oops 1:E4").unwrap_err();
        assert!(matches!(err, NotationError::BadShape { line: 1, .. }));

        let err = parse_strict("1:C4\nx:E4").unwrap_err();
        assert!(matches!(err, NotationError::BadDuration { line: 2, .. }));
    }

    #[test]
    fn strict_mode_accepts_clean_scores() {
        let events = parse_strict("1:C4 0.25:REST 0.5:E4+G4 // done").unwrap();
        assert_eq!(events.len(), 3);
    }
}
