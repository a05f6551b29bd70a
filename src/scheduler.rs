use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::graph::AudioGraph;
use crate::melody::{Melody, MelodyCatalog, Pitch};
use crate::synth::NoteSynth;

/*
Playback Scheduler
==================

The scheduler walks a melody's event list and schedules notes against
the audio clock ahead of real time. Scheduling one note and waiting for
it to end before scheduling the next is fragile - a timer that fires a
few tens of milliseconds late leaves an audible hole. Instead:

1. A batch of BATCH_EVENTS upcoming events is scheduled in one pass,
   each at an absolute clock timestamp. The event index advances modulo
   the melody length, so melodies loop forever and a batch may cross
   the loop seam.
2. The total span the batch covers is summed, and a single re-arm
   deadline is set at REARM_FRACTION of that span. Firing before the
   batch runs out is the jitter tolerance: even when the deadline is
   serviced late there is still clock-timestamped audio ahead of real
   time. A floor keeps degenerate melodies from re-arming in a tight
   loop.
3. `next_event_start` advances by the exact scheduled span each pass,
   so rounding error cannot drift over hours of looping.

There is never more than one pending deadline. Pause and stop clear it
and force-silence the active voices; resume re-anchors the timeline to
"now" and continues from the next unplayed event - missed wall-clock
time is never replayed.

If the clock is found not Running at a scheduling step the batch is
abandoned and the loop is not re-armed: playback silently stalls and
the lifecycle director decides when to start again. `tick` also heals a
silent stall it can detect itself: when the clock has moved far past
`next_event_start` (the platform suspended us mid-play), the timeline
is resynchronized to "now" rather than replayed note-by-note.

State machine: Stopped -> Playing <-> Paused -> Stopped. The melody
selection outlives every transition, so "resume the same tune" and
"pick a new tune without playing it" stay distinct operations.
*/

/// Events scheduled per look-ahead pass.
pub const BATCH_EVENTS: usize = 4;
/// The re-arm deadline sits at this fraction of the batch span.
pub const REARM_FRACTION: f64 = 0.7;
/// Floor on the re-arm delay, seconds.
pub const MIN_REARM_DELAY: f64 = 0.1;
/// Fade applied when force-silencing voices on pause/stop.
pub const SILENCE_FADE_SECS: f32 = 0.05;
/// Clock-vs-timeline gap that triggers a resync instead of catch-up.
pub const DESYNC_THRESHOLD_SECS: f64 = 1.0;

/// Mutable playback position. One instance, owned by the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackCursor {
    pub melody_id: Option<&'static str>,
    pub event_index: usize,
    /// Absolute clock time the next unscheduled event starts at.
    pub next_event_start: f64,
    pub is_playing: bool,
    pub is_paused: bool,
    pub paused_at: f64,
}

impl PlaybackCursor {
    fn new() -> Self {
        Self {
            melody_id: None,
            event_index: 0,
            next_event_start: 0.0,
            is_playing: false,
            is_paused: false,
            paused_at: 0.0,
        }
    }
}

pub struct PlaybackScheduler {
    catalog: MelodyCatalog,
    cursor: PlaybackCursor,
    /// The single outstanding re-arm deadline (absolute clock time).
    rearm_at: Option<f64>,
    rng: Pcg32,
}

impl PlaybackScheduler {
    pub fn new(catalog: MelodyCatalog) -> Self {
        Self::with_seed(catalog, rand::random())
    }

    /// Deterministic melody selection for tests.
    pub fn with_seed(catalog: MelodyCatalog, seed: u64) -> Self {
        Self {
            catalog,
            cursor: PlaybackCursor::new(),
            rearm_at: None,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn cursor(&self) -> &PlaybackCursor {
        &self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.cursor.is_playing
    }

    pub fn is_paused(&self) -> bool {
        self.cursor.is_paused
    }

    /// The pending re-arm deadline, if the look-ahead loop is armed.
    pub fn rearm_deadline(&self) -> Option<f64> {
        self.rearm_at
    }

    pub fn current_melody(&self) -> Option<&Melody> {
        self.cursor.melody_id.and_then(|id| self.catalog.get(id))
    }

    /// Select a melody without touching play state.
    ///
    /// With no explicit id, picks uniformly at random, excluding the
    /// current selection whenever the catalog holds more than one
    /// melody. Returns the selected id, or None if the catalog is
    /// empty or the explicit id is unknown.
    pub fn select_melody(&mut self, explicit: Option<&str>) -> Option<&'static str> {
        let id = match explicit {
            Some(id) => match self.catalog.get(id) {
                Some(melody) => melody.id,
                None => {
                    log::warn!("unknown melody id `{id}`");
                    return None;
                }
            },
            None => self
                .catalog
                .random_other(self.cursor.melody_id, &mut self.rng)?
                .id,
        };

        if self.cursor.melody_id != Some(id) {
            self.cursor.melody_id = Some(id);
            self.cursor.event_index = 0;
        }
        Some(id)
    }

    /// Begin playback from the first event of the selected melody
    /// (auto-selecting one if none is). Returns false - and schedules
    /// nothing - when the clock is not running or there is nothing to
    /// play; the caller owns getting the clock running first.
    pub fn start(&mut self, graph: &mut AudioGraph) -> bool {
        if !graph.is_running() {
            log::debug!("start refused: clock is {:?}", graph.state());
            return false;
        }
        if self.cursor.melody_id.is_none() && self.select_melody(None).is_none() {
            return false;
        }
        let playable = self
            .current_melody()
            .map(|m| !m.events.is_empty())
            .unwrap_or(false);
        if !playable {
            // Fail closed on empty melodies: nothing to play.
            return false;
        }

        // Defensive: a restart while playing must not leave the old
        // batch's deadline or voices behind.
        self.rearm_at = None;
        graph.silence_melody(SILENCE_FADE_SECS);
        if !graph.melody_connected() {
            graph.connect_melody_bus();
        }

        self.cursor.event_index = 0;
        self.cursor.next_event_start = graph.now();
        self.cursor.is_playing = true;
        self.cursor.is_paused = false;

        if !self.schedule_batch(graph) {
            self.cursor.is_playing = false;
            return false;
        }
        true
    }

    /// Pause playback, retaining the cursor position. Only valid from
    /// Playing.
    pub fn pause(&mut self, graph: &mut AudioGraph) -> bool {
        if !self.cursor.is_playing || self.cursor.is_paused {
            return false;
        }
        self.rearm_at = None;
        graph.silence_melody(SILENCE_FADE_SECS);
        self.cursor.paused_at = graph.now();
        self.cursor.is_playing = false;
        self.cursor.is_paused = true;
        true
    }

    /// Continue from the next unplayed event, starting immediately.
    /// Only valid from Paused, and only while the clock is running.
    pub fn resume(&mut self, graph: &mut AudioGraph) -> bool {
        if !self.cursor.is_paused {
            return false;
        }
        if !graph.is_running() {
            log::debug!("resume refused: clock is {:?}", graph.state());
            return false;
        }
        // Re-anchor rather than replay: missed time is gone.
        self.cursor.next_event_start = graph.now();
        self.cursor.is_paused = false;
        self.cursor.is_playing = true;
        if !self.schedule_batch(graph) {
            self.cursor.is_playing = false;
            self.cursor.is_paused = true;
            return false;
        }
        true
    }

    /// Stop playback from any state. Idempotent. The melody selection
    /// survives; the position resets to the first event. With
    /// `full_cleanup` the melody gain stage is also torn down (it is
    /// recreated on the next `start`); without it the nodes stay for a
    /// cheap restart.
    pub fn stop(&mut self, graph: &mut AudioGraph, full_cleanup: bool) {
        self.rearm_at = None;
        graph.silence_melody(SILENCE_FADE_SECS);
        self.cursor.is_playing = false;
        self.cursor.is_paused = false;
        self.cursor.event_index = 0;
        self.cursor.next_event_start = 0.0;
        self.cursor.paused_at = 0.0;
        if full_cleanup {
            graph.disconnect_melody_bus();
        }
    }

    /// If playing: stop, pick a different melody, start it. Otherwise
    /// just change the selection silently (the displayed "up next"
    /// name changes without audible effect).
    pub fn change_to_random_melody(&mut self, graph: &mut AudioGraph) {
        if self.cursor.is_playing {
            self.stop(graph, false);
            self.select_melody(None);
            self.start(graph);
        } else {
            self.select_melody(None);
        }
    }

    /// Timer pump, called from the host loop. Fires the re-arm
    /// deadline when due, and heals a stalled or desynchronized
    /// look-ahead loop.
    pub fn tick(&mut self, graph: &mut AudioGraph) {
        if !self.cursor.is_playing || self.cursor.is_paused {
            return;
        }
        if !graph.is_running() {
            // The director decides when playback comes back.
            return;
        }
        let now = graph.now();

        if now - self.cursor.next_event_start > DESYNC_THRESHOLD_SECS {
            log::debug!(
                "timeline desync ({:.2}s behind clock); resyncing",
                now - self.cursor.next_event_start
            );
            self.cursor.next_event_start = now;
            self.schedule_batch(graph);
            return;
        }

        match self.rearm_at {
            Some(due) if now >= due => {
                self.schedule_batch(graph);
            }
            Some(_) => {}
            None => {
                // A batch was abandoned while the clock was down.
                self.cursor.next_event_start = self.cursor.next_event_start.max(now);
                self.schedule_batch(graph);
            }
        }
    }

    /// Schedule one look-ahead batch and arm the next deadline.
    ///
    /// Returns false (clearing the deadline, scheduling nothing) when
    /// the clock is not running or there is no playable melody.
    fn schedule_batch(&mut self, graph: &mut AudioGraph) -> bool {
        if !graph.is_running() {
            self.rearm_at = None;
            return false;
        }
        let Some(id) = self.cursor.melody_id else {
            self.rearm_at = None;
            return false;
        };

        let (seconds_per_beat, event_count, batch) = {
            let Some(melody) = self.catalog.get(id) else {
                self.rearm_at = None;
                return false;
            };
            if melody.events.is_empty() {
                self.rearm_at = None;
                return false;
            }
            let len = melody.events.len();
            let batch: Vec<(f32, Pitch)> = (0..BATCH_EVENTS)
                .map(|k| {
                    let event = &melody.events[(self.cursor.event_index + k) % len];
                    (event.beats, event.pitch.clone())
                })
                .collect();
            (melody.seconds_per_beat(), len, batch)
        };

        let mut span = 0.0f64;
        for (beats, pitch) in &batch {
            let secs = *beats as f64 * seconds_per_beat;
            NoteSynth::play_event(
                graph,
                pitch,
                self.cursor.next_event_start + span,
                secs as f32,
            );
            span += secs;
        }

        self.cursor.event_index = (self.cursor.event_index + BATCH_EVENTS) % event_count;
        self.cursor.next_event_start += span;

        let delay = (span * REARM_FRACTION).max(MIN_REARM_DELAY);
        self.rearm_at = Some(graph.now() + delay);
        true
    }
}
