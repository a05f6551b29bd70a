//! One-shot sound effects.
//!
//! Effects are fixed templates keyed by name, played immediately on
//! the Effect bus. They use the same spawn-then-self-remove voice
//! machinery as melody notes but never go through the look-ahead
//! scheduler: one call, one (or a few, for the fanfare) voices, done.
//!
//! The player is stateless. It checks the clock itself; the caller is
//! responsible for the sound-enabled preference.

use crate::dsp::{AmpShape, Waveform};
use crate::graph::AudioGraph;
use crate::voice::{Bus, Glide, VoiceSpec};

/// One tone within an effect template. `delay` offsets the tone from
/// the effect's trigger time (only the fanfare uses it).
#[derive(Debug, Clone, Copy)]
struct Tone {
    delay: f32,
    frequency: f32,
    glide: Option<Glide>,
    duration: f32,
    peak: f32,
    waveform: Waveform,
}

const fn tone(frequency: f32, duration: f32, peak: f32, waveform: Waveform) -> Tone {
    Tone {
        delay: 0.0,
        frequency,
        glide: None,
        duration,
        peak,
        waveform,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// UI click / direction change.
    Click,
    /// Fruit eaten; three pitch variants so rapid eating doesn't drone.
    FruitEaten(usize),
    /// Ran into a wall or yourself.
    Crash,
    /// Something left the board.
    Disappear,
    /// Short rising fanfare (new high score and the like).
    Fanfare,
}

impl SoundEffect {
    /// Parse the host-facing effect name. Unknown names yield None.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "click" => Some(Self::Click),
            "fruit" | "fruit-0" => Some(Self::FruitEaten(0)),
            "fruit-1" => Some(Self::FruitEaten(1)),
            "fruit-2" => Some(Self::FruitEaten(2)),
            "crash" => Some(Self::Crash),
            "disappear" => Some(Self::Disappear),
            "fanfare" => Some(Self::Fanfare),
            _ => None,
        }
    }

    fn tones(&self) -> Vec<Tone> {
        const FRUIT_PITCHES: [f32; 3] = [880.0, 987.77, 1_108.73]; // A5 B5 C#6
        match self {
            Self::Click => vec![tone(1_200.0, 0.035, 0.15, Waveform::Square)],
            Self::FruitEaten(variant) => {
                let base = FRUIT_PITCHES[variant % FRUIT_PITCHES.len()];
                vec![Tone {
                    glide: Some(Glide {
                        target: base * 2.0,
                        seconds: 0.08,
                    }),
                    ..tone(base, 0.12, 0.25, Waveform::Triangle)
                }]
            }
            Self::Crash => vec![Tone {
                glide: Some(Glide {
                    target: 40.0,
                    seconds: 0.35,
                }),
                ..tone(160.0, 0.4, 0.4, Waveform::Saw)
            }],
            Self::Disappear => vec![Tone {
                glide: Some(Glide {
                    target: 110.0,
                    seconds: 0.25,
                }),
                ..tone(660.0, 0.3, 0.2, Waveform::Sine)
            }],
            Self::Fanfare => {
                // C5 E5 G5 C6, each riding over the previous a little.
                let steps = [523.25, 659.25, 783.99, 1_046.50];
                steps
                    .iter()
                    .enumerate()
                    .map(|(i, &f)| Tone {
                        delay: i as f32 * 0.11,
                        duration: if i == steps.len() - 1 { 0.35 } else { 0.15 },
                        ..tone(f, 0.15, 0.25, Waveform::Triangle)
                    })
                    .collect()
            }
        }
    }
}

/// Play an effect immediately. Returns false (scheduling nothing) when
/// the clock is not running - a page that never unlocked audio stays
/// silent without erroring.
pub fn play(graph: &mut AudioGraph, effect: SoundEffect, volume_scale: f32) -> bool {
    if !graph.is_running() {
        log::debug!("effect {effect:?} dropped: clock is {:?}", graph.state());
        return false;
    }
    let now = graph.now();
    let scale = volume_scale.clamp(0.0, 1.0);
    for t in effect.tones() {
        graph.spawn_voice(VoiceSpec {
            bus: Bus::Effect,
            frequency: t.frequency,
            glide: t.glide,
            start: now + t.delay as f64,
            duration: t.duration,
            peak: t.peak * scale,
            waveform: t.waveform,
            blend: None,
            shape: AmpShape::Effect,
        });
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::{MockBackend, MockHandle};

    fn running_graph() -> (AudioGraph, MockHandle) {
        let (backend, handle) = MockBackend::new();
        let mut graph = AudioGraph::new(Box::new(backend));
        graph.request_resume();
        (graph, handle)
    }

    #[test]
    fn effect_names_round_trip() {
        assert_eq!(SoundEffect::from_name("click"), Some(SoundEffect::Click));
        assert_eq!(
            SoundEffect::from_name("fruit-2"),
            Some(SoundEffect::FruitEaten(2))
        );
        assert_eq!(SoundEffect::from_name("warble"), None);
    }

    #[test]
    fn effect_routes_to_effect_bus_immediately() {
        let (mut graph, handle) = running_graph();
        handle.set_state(crate::graph::ClockState::Running);
        assert!(play(&mut graph, SoundEffect::Crash, 1.0));

        let spawned = handle.spawned();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].bus, Bus::Effect);
        assert_eq!(spawned[0].start, handle.now());
        assert_eq!(spawned[0].shape, AmpShape::Effect);
        assert!(spawned[0].glide.is_some());
    }

    #[test]
    fn suspended_clock_drops_effect() {
        let (backend, handle) = MockBackend::new();
        let mut graph = AudioGraph::new(Box::new(backend));
        assert!(!play(&mut graph, SoundEffect::Click, 1.0));
        assert_eq!(handle.spawn_count(), 0);
    }

    #[test]
    fn volume_scale_multiplies_template_peak() {
        let (mut graph, handle) = running_graph();
        play(&mut graph, SoundEffect::Click, 0.5);
        let spawned = handle.spawned();
        assert!((spawned[0].peak - 0.15 * 0.5).abs() < 1e-6);
    }

    #[test]
    fn fanfare_staggers_its_notes() {
        let (mut graph, handle) = running_graph();
        play(&mut graph, SoundEffect::Fanfare, 1.0);

        let spawned = handle.spawned();
        assert_eq!(spawned.len(), 4);
        for pair in spawned.windows(2) {
            assert!(pair[1].start > pair[0].start);
        }
    }

    #[test]
    fn fruit_variants_differ_in_pitch() {
        let (mut graph, handle) = running_graph();
        play(&mut graph, SoundEffect::FruitEaten(0), 1.0);
        play(&mut graph, SoundEffect::FruitEaten(1), 1.0);
        let spawned = handle.spawned();
        assert_ne!(spawned[0].frequency, spawned[1].frequency);
    }
}
