//! Synthesis voices.
//!
//! A voice is one sounding unit: up to two blended oscillators pushed
//! through an amplitude shape, with an absolute start time and duration
//! on the shared audio clock. Voices are fire-and-forget - the mixer
//! drops them the moment their window (plus any kill fade) closes, so
//! the active set never accumulates stale entries.

use crate::dsp::{AmpShape, Oscillator, Waveform};

/// Which gain stage a voice is routed through.
///
/// Melody voices pass through the melody gain before the master gain
/// and are silenced wholesale on pause/stop; effect voices go straight
/// to the master stage so a game-over sting can outlive the music.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    Melody,
    Effect,
}

/// An optional pitch sweep over the life of a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glide {
    /// Frequency to arrive at, in Hz.
    pub target: f32,
    /// How long the sweep takes, in seconds.
    pub seconds: f32,
}

/// Everything needed to construct one voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSpec {
    pub bus: Bus,
    /// Starting frequency in Hz.
    pub frequency: f32,
    pub glide: Option<Glide>,
    /// Absolute start time on the audio clock, in seconds.
    pub start: f64,
    /// Total sounding duration in seconds.
    pub duration: f32,
    /// Peak amplitude (pre gain stages), 0.0 to 1.0.
    pub peak: f32,
    /// Primary oscillator waveform.
    pub waveform: Waveform,
    /// Optional second oscillator, blended equally with the first.
    pub blend: Option<Waveform>,
    pub shape: AmpShape,
}

/// A live voice inside the mixer.
pub struct Voice {
    spec: VoiceSpec,
    osc: Oscillator,
    blend_osc: Option<Oscillator>,
    /// Set when the voice is force-silenced: (clock time, fade seconds).
    kill: Option<(f64, f32)>,
}

impl Voice {
    pub fn new(spec: VoiceSpec) -> Self {
        let osc = Oscillator::new(spec.waveform);
        let blend_osc = spec.blend.map(Oscillator::new);
        Self {
            spec,
            osc,
            blend_osc,
            kill: None,
        }
    }

    pub fn bus(&self) -> Bus {
        self.spec.bus
    }

    pub fn spec(&self) -> &VoiceSpec {
        &self.spec
    }

    /// Begin a short fade-out ending in removal. Safe to call more than
    /// once; the earliest kill wins.
    pub fn silence(&mut self, now: f64, fade_secs: f32) {
        if self.kill.is_none() {
            self.kill = Some((now, fade_secs.max(0.0)));
        }
    }

    /// True once the voice can be dropped from the active set.
    pub fn finished(&self, now: f64) -> bool {
        if let Some((killed_at, fade)) = self.kill {
            if now >= killed_at + fade as f64 {
                return true;
            }
        }
        now >= self.spec.start + self.spec.duration as f64
    }

    /// Render one sample at absolute clock time `now`.
    pub fn sample(&mut self, now: f64, sample_rate: f32) -> f32 {
        let offset = (now - self.spec.start) as f32;
        if offset < 0.0 {
            return 0.0;
        }

        let level = self
            .spec
            .shape
            .level(offset, self.spec.duration, self.spec.peak);
        if level <= 0.0 {
            return 0.0;
        }

        let frequency = match self.spec.glide {
            Some(glide) if glide.seconds > 0.0 => {
                let t = (offset / glide.seconds).min(1.0);
                self.spec.frequency + (glide.target - self.spec.frequency) * t
            }
            Some(glide) => glide.target,
            None => self.spec.frequency,
        };

        let mut sample = self.osc.next_sample(frequency, sample_rate);
        if let Some(blend) = self.blend_osc.as_mut() {
            sample = (sample + blend.next_sample(frequency, sample_rate)) * 0.5;
        }

        sample * level * self.kill_gain(now)
    }

    fn kill_gain(&self, now: f64) -> f32 {
        match self.kill {
            None => 1.0,
            Some((killed_at, fade)) => {
                if fade <= 0.0 {
                    return 0.0;
                }
                let elapsed = (now - killed_at) as f32;
                (1.0 - elapsed / fade).clamp(0.0, 1.0)
            }
        }
    }
}
