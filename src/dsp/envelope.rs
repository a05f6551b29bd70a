use crate::MIN_TIME;

/*
Amplitude Shapes
================

Voices in this engine are scheduled against an absolute clock: a voice
knows its start time and total duration up front and is dropped the
moment its window closes. That makes a stateless envelope the natural
fit - instead of a gate-driven state machine we evaluate the amplitude
as a pure function of the offset into the voice.

Two shapes cover everything the game needs:

Note (melody voices)

  Level
  peak ┐  ╱╲_________
       │ ╱           ╲
       │╱             ╲
   0.0 └───────────────╲──→ offset
       rise  hold        duration

  Near-instant rise to the peak, a brief hold at a slightly lower
  sustain level (0.8 x peak), then a linear decay that reaches silence
  exactly at the duration. The hard zero at the end matters: melody
  notes are scheduled with a small legato overlap, and a tail that
  outlived its duration would smear into the next batch.

Effect (one-shot sounds)

  Instant attack, exponential decay to near-zero at the duration.
  Exponential decay reads as "percussive" to the ear; the linear note
  decay reads as "musical". Both shapes clamp to zero outside the
  voice's window so an out-of-range query can never click.
*/

const NOTE_RISE: f32 = 0.015;
const NOTE_HOLD: f32 = 0.05;
const SUSTAIN_RATIO: f32 = 0.8;
const EFFECT_RISE: f32 = 0.002;
const EFFECT_FLOOR: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmpShape {
    /// Rise, hold at 0.8 x peak, linear decay to zero at the duration.
    Note,
    /// Instant attack, exponential decay. Used by the effect player.
    Effect,
}

impl AmpShape {
    /// Amplitude at `offset` seconds into a voice of `duration` seconds.
    ///
    /// Returns 0.0 outside [0, duration). Pure - safe to call for any
    /// offset, in any order, any number of times.
    pub fn level(&self, offset: f32, duration: f32, peak: f32) -> f32 {
        if offset < 0.0 || offset >= duration || duration <= 0.0 {
            return 0.0;
        }

        match self {
            AmpShape::Note => {
                // Short notes compress the rise and hold so the decay
                // always has room to reach zero.
                let rise = NOTE_RISE.min(duration * 0.25).max(MIN_TIME);
                let hold_end = (rise + NOTE_HOLD).min(duration * 0.5);
                let sustain = peak * SUSTAIN_RATIO;

                if offset < rise {
                    peak * (offset / rise)
                } else if offset < hold_end {
                    sustain
                } else {
                    let remaining = duration - hold_end;
                    sustain * ((duration - offset) / remaining.max(MIN_TIME))
                }
            }
            AmpShape::Effect => {
                let rise = EFFECT_RISE.min(duration * 0.25).max(MIN_TIME);
                if offset < rise {
                    return peak * (offset / rise);
                }
                // peak * ratio^(t/duration) hits peak * EFFECT_FLOOR at
                // the end of the voice, matching an exponential ramp to
                // a near-zero target.
                let t = (offset - rise) / (duration - rise).max(MIN_TIME);
                peak * EFFECT_FLOOR.powf(t)
            }
        }
    }
}
