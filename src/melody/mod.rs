pub mod catalog;
pub mod parser;

pub use catalog::MelodyCatalog;
pub use parser::{parse, parse_strict, NotationError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a single melody event sounds like.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Pitch {
    /// Silence for the event's duration.
    Rest,
    /// A single pitch name (resolved to Hz at synthesis time).
    Note(String),
    /// Several pitches starting and stopping together.
    Chord(Vec<String>),
}

impl Pitch {
    /// Number of voices this pitch will spawn when scheduled.
    pub fn voice_count(&self) -> usize {
        match self {
            Pitch::Rest => 0,
            Pitch::Note(_) => 1,
            Pitch::Chord(names) => names.len(),
        }
    }
}

/// One timed event in a melody: a duration in beats and what to play.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub beats: f32,
    pub pitch: Pitch,
}

/// A named, immutable melody: catalog data parsed once at load time.
#[derive(Debug, Clone)]
pub struct Melody {
    pub id: &'static str,
    pub display_name: &'static str,
    pub tempo_bpm: f32,
    pub events: Vec<NoteEvent>,
}

impl Melody {
    /// Seconds per beat at this melody's tempo.
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.tempo_bpm as f64
    }
}
