//! Per-note mixer.
//!
//! Owns the live voice set and the two gain stages, and renders mono
//! blocks against a frame-derived clock. The mixer itself is plain data
//! driven by [`MixerCommand`]s so the realtime backend can keep it
//! inside the audio callback (commands arrive over a ring buffer) while
//! tests drive it directly.

use crate::voice::{Bus, Voice, VoiceSpec};

/// Control messages applied at block boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum MixerCommand {
    Spawn(VoiceSpec),
    Silence { bus: Bus, fade_secs: f32 },
    MelodyGain(f32),
    MasterGain(f32),
}

pub struct Mixer {
    sample_rate: f32,
    frames: u64,
    voices: Vec<Voice>,
    melody_gain: f32,
    master_gain: f32,
}

impl Mixer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            frames: 0,
            voices: Vec::with_capacity(32),
            melody_gain: 1.0,
            master_gain: 1.0,
        }
    }

    /// Clock time derived from frames rendered so far.
    pub fn now(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn active(&self, bus: Bus) -> usize {
        let now = self.now();
        self.voices
            .iter()
            .filter(|v| v.bus() == bus && !v.finished(now))
            .count()
    }

    pub fn apply(&mut self, command: MixerCommand) {
        match command {
            MixerCommand::Spawn(spec) => self.voices.push(Voice::new(spec)),
            MixerCommand::Silence { bus, fade_secs } => {
                let now = self.now();
                for voice in self.voices.iter_mut().filter(|v| v.bus() == bus) {
                    voice.silence(now, fade_secs);
                }
            }
            MixerCommand::MelodyGain(gain) => self.melody_gain = gain,
            MixerCommand::MasterGain(gain) => self.master_gain = gain,
        }
    }

    /// Render one mono block and advance the clock by its length.
    pub fn render(&mut self, out: &mut [f32]) {
        let sr = self.sample_rate;
        for (i, sample) in out.iter_mut().enumerate() {
            let t = (self.frames + i as u64) as f64 / sr as f64;
            let mut acc = 0.0f32;
            for voice in self.voices.iter_mut() {
                let s = voice.sample(t, sr);
                acc += match voice.bus() {
                    Bus::Melody => s * self.melody_gain,
                    Bus::Effect => s,
                };
            }
            *sample = acc * self.master_gain;
        }
        self.frames += out.len() as u64;

        // Voices self-remove once their window (or kill fade) closes.
        let now = self.now();
        self.voices.retain(|v| !v.finished(now));
    }
}
