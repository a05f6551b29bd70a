#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Audio Oscillator
================

The oscillator is the raw sound source for every voice in the engine.
It generates a repeating waveform at a given frequency; the envelope and
gain stages then shape that raw material into a note or an effect.

Waveform character, briefly:

Sine:     pure tone, no harmonics. Soft chimes, sub tones.
Triangle: odd harmonics falling off as 1/n². Mellow, flute-like.
          The melody timbre blends this with a square for body.
Square:   odd harmonics falling off as 1/n. Hollow, chiptune-ish.
Saw:      all harmonics. Bright and buzzy; used for the crash effect.

The frequency is passed per-sample rather than fixed at construction so
effects can glide their pitch over the life of a voice (the crash and
disappear templates sweep downward).
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Saw,
}

/// Phase-accumulator oscillator.
///
/// Produces one sample at a time; the caller supplies the frequency each
/// sample so glides stay cheap. Phase is kept in [0, 1).
pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    /// Produce the next sample at `frequency` Hz.
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let sample = match self.waveform {
            Waveform::Sine => (core::f32::consts::TAU * self.phase).sin(),
            Waveform::Triangle => {
                // 0 -> 1 -> 0 -> -1 -> 0 over one period
                4.0 * (self.phase - (self.phase + 0.5).floor()).abs() - 1.0
            }
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * self.phase - 1.0,
        };

        self.phase += frequency / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn sine_matches_reference() {
        let mut osc = Oscillator::new(Waveform::Sine);
        let freq = 440.0;

        let mut buffer = vec![0.0f32; 128];
        for sample in buffer.iter_mut() {
            *sample = osc.next_sample(freq, SAMPLE_RATE);
        }

        // sample n should be sin(2pi f n / sr)
        let n = 12;
        let expected = (TAU * freq * n as f32 / SAMPLE_RATE).sin();
        let actual = buffer[n];
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn square_alternates_sign() {
        let mut osc = Oscillator::new(Waveform::Square);
        // 12 kHz at 48 kHz: period of 4 samples, half high, half low
        let samples: Vec<f32> = (0..8).map(|_| osc.next_sample(12_000.0, SAMPLE_RATE)).collect();
        assert_eq!(samples[0], 1.0);
        assert_eq!(samples[2], -1.0);
        assert_eq!(samples[4], 1.0);
    }

    #[test]
    fn output_stays_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Triangle,
            Waveform::Square,
            Waveform::Saw,
        ] {
            let mut osc = Oscillator::new(waveform);
            for _ in 0..1_000 {
                let s = osc.next_sample(733.0, SAMPLE_RATE);
                assert!((-1.0..=1.0).contains(&s), "{waveform:?} produced {s}");
            }
        }
    }

    #[test]
    fn phase_survives_glide() {
        // Changing frequency per-sample must not jump the phase.
        let mut osc = Oscillator::new(Waveform::Sine);
        let mut last = osc.next_sample(200.0, SAMPLE_RATE);
        for i in 0..200 {
            let f = 200.0 + i as f32 * 10.0;
            let s = osc.next_sample(f, SAMPLE_RATE);
            // Max per-sample delta for a sine below 2.2 kHz at 48 kHz
            assert!((s - last).abs() < 0.3);
            last = s;
        }
    }
}
