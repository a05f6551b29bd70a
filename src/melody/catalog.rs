//! Built-in melody catalog.
//!
//! Each melody is a tempo plus a notation score (see [`super::parser`]).
//! The catalog is parsed once at construction and never mutated; the
//! scheduler treats it as read-only data.

use rand::Rng;

use super::{parser, Melody};

const ODE_TO_JOY: &str = "
    // Beethoven - Ode to Joy (theme)
    1:E4 1:E4 1:F4 1:G4  1:G4 1:F4 1:E4 1:D4
    1:C4 1:C4 1:D4 1:E4  1.5:E4 0.5:D4 2:D4
    1:E4 1:E4 1:F4 1:G4  1:G4 1:F4 1:E4 1:D4
    1:C4 1:C4 1:D4 1:E4  1.5:D4 0.5:C4 2:C4
    // closing chord
    2:C4+E4+G4 2:REST
";

const MOUNTAIN_KING: &str = "
    // Grieg - In the Hall of the Mountain King (simplified)
    0.5:A3 0.5:B3 0.5:C4 0.5:D4  0.5:E4 0.5:C4 1:E4
    0.5:Eb4 0.5:B3 1:Eb4  0.5:D4 0.5:Bb3 1:D4
    0.5:A3 0.5:B3 0.5:C4 0.5:D4  0.5:E4 0.5:C4 0.5:E4 0.5:A4
    0.5:G4 0.5:E4 0.5:C4 0.5:E4  2:G4
    1:REST
";

const GREENSLEEVES: &str = "
    // Traditional - Greensleeves
    1:A3 2:C4 1:D4  1.5:E4 0.5:F4 1:E4
    2:D4 1:B3  1.5:G3 0.5:A3 1:B3
    2:C4 1:A3  1.5:A3 0.5:G#3 1:A3
    2:B3 1:G#3  3:E3
    3:REST
";

const ENTERTAINER: &str = "
    // Joplin - The Entertainer (opening)
    0.5:D4 0.5:D#4 0.5:E4 1:C5 0.5:E4  1:C5 0.5:E4 2:C5
    0.5:C5 0.5:D5 0.5:D#5 0.5:E5 0.5:C5 0.5:D5 1:E5
    0.5:B4 1:D5 2:C5
    // tag
    2:C4+E4+G4+C5 1:REST
";

/// The static melody store: a read-only set of named melodies.
#[derive(Debug, Clone)]
pub struct MelodyCatalog {
    melodies: Vec<Melody>,
}

impl MelodyCatalog {
    /// The melodies shipped with the game.
    pub fn standard() -> Self {
        let scores: [(&'static str, &'static str, f32, &'static str); 4] = [
            ("ode-to-joy", "Ode to Joy", 108.0, ODE_TO_JOY),
            ("mountain-king", "Mountain King", 138.0, MOUNTAIN_KING),
            ("greensleeves", "Greensleeves", 100.0, GREENSLEEVES),
            ("entertainer", "The Entertainer", 96.0, ENTERTAINER),
        ];

        let melodies = scores
            .into_iter()
            .map(|(id, display_name, tempo_bpm, score)| Melody {
                id,
                display_name,
                tempo_bpm,
                events: parser::parse(score),
            })
            .collect();

        Self { melodies }
    }

    /// Build a catalog from pre-parsed melodies (mainly for tests).
    pub fn from_melodies(melodies: Vec<Melody>) -> Self {
        Self { melodies }
    }

    pub fn len(&self) -> usize {
        self.melodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.melodies.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Melody> {
        self.melodies.iter().find(|m| m.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.melodies.iter().map(|m| m.id)
    }

    /// Pick a melody uniformly at random, excluding `exclude` when the
    /// catalog holds more than one melody (avoids immediate repeats).
    pub fn random_other<R: Rng>(&self, exclude: Option<&str>, rng: &mut R) -> Option<&Melody> {
        if self.melodies.is_empty() {
            return None;
        }
        let candidates: Vec<&Melody> = if self.melodies.len() > 1 {
            self.melodies
                .iter()
                .filter(|m| Some(m.id) != exclude)
                .collect()
        } else {
            self.melodies.iter().collect()
        };
        let idx = rng.gen_range(0..candidates.len());
        Some(candidates[idx])
    }
}
