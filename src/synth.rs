//! Note synthesizer.
//!
//! Stateless front end between the scheduler and the output graph: one
//! call schedules the oscillators and envelope for one melody note (or
//! one chord member). It never fails - a bad pitch name falls back to
//! A4 with a warning rather than stopping the whole melody.

use crate::dsp::{AmpShape, Waveform};
use crate::graph::AudioGraph;
use crate::melody::Pitch;
use crate::pitch;
use crate::voice::{Bus, VoiceSpec};

/// Peak amplitude of a lone melody note, before the gain stages.
const NOTE_PEAK: f32 = 0.3;

/// Notes ring slightly into their successor for legato phrasing. This
/// is purely a synthesis-time parameter: the scheduler's bookkeeping of
/// batch spans never includes the overlap.
const LEGATO_OVERLAP: f32 = 1.1;

/// The melody timbre: a mellow triangle with a square underneath for
/// body, blended equally.
const MELODY_WAVEFORMS: (Waveform, Waveform) = (Waveform::Triangle, Waveform::Square);

pub struct NoteSynth;

impl NoteSynth {
    /// Schedule one audible note at an absolute clock time.
    ///
    /// `chord_size` is the number of simultaneous voices this note is
    /// part of (1 for a lone note); peak amplitude is divided by it so
    /// chords do not clip. A `REST` name is defensively ignored even
    /// though the scheduler filters rests before calling.
    pub fn play_note(
        graph: &mut AudioGraph,
        name: &str,
        start: f64,
        duration_secs: f32,
        chord_size: usize,
    ) {
        if name == "REST" {
            return;
        }

        let frequency = pitch::frequency(name).unwrap_or_else(|| {
            log::warn!("unknown pitch name `{name}`, substituting A4");
            pitch::FALLBACK_FREQUENCY
        });

        let peak = NOTE_PEAK / chord_size.max(1) as f32;

        graph.spawn_voice(VoiceSpec {
            bus: Bus::Melody,
            frequency,
            glide: None,
            start,
            duration: duration_secs * LEGATO_OVERLAP,
            peak,
            waveform: MELODY_WAVEFORMS.0,
            blend: Some(MELODY_WAVEFORMS.1),
            shape: AmpShape::Note,
        });
    }

    /// Schedule every voice of a melody event (note or chord) at the
    /// same start time and duration. Rests spawn nothing.
    pub fn play_event(graph: &mut AudioGraph, pitch: &Pitch, start: f64, duration_secs: f32) {
        match pitch {
            Pitch::Rest => {}
            Pitch::Note(name) => Self::play_note(graph, name, start, duration_secs, 1),
            Pitch::Chord(names) => {
                for name in names {
                    Self::play_note(graph, name, start, duration_secs, names.len());
                }
            }
        }
    }
}
