/*
Audio Output Graph
==================

One shared output chain for everything the game plays:

    per-note mixer -> melody gain -> master gain -> output

The graph wraps a backend that owns the actual clock and voice set.
Two backends exist: `CpalBackend` drives a real output stream and
derives its clock from frames rendered, `mock::MockBackend` is a
manually-stepped clock for tests.

Lifecycle rules (enforced by the director, expressed here):
- the clock may report Running, Suspended, Interrupted or Closed, and
  a resume request is not guaranteed to complete synchronously;
- melody voices are refused while the melody bus is disconnected
  (after a full-cleanup stop) - effect voices still pass through;
- no voice is ever spawned against a clock that is not Running.
*/

pub mod mixer;
pub mod mock;

#[cfg(feature = "rtrb")]
mod cpal_backend;
#[cfg(feature = "rtrb")]
pub use cpal_backend::CpalBackend;

use crate::voice::{Bus, VoiceSpec};

/// Default gain applied to the whole output.
pub const DEFAULT_MASTER_GAIN: f32 = 0.8;
/// Default gain applied to melody voices before the master stage.
pub const DEFAULT_MELODY_GAIN: f32 = 0.5;

/// Reported state of the underlying audio clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Running,
    Suspended,
    /// Platform took the output away (phone call, app switch).
    Interrupted,
    Closed,
}

/// The seam between the playback core and the platform audio API.
pub trait AudioBackend {
    /// Current audio-clock time in seconds. Frozen while not Running.
    fn now(&self) -> f64;

    fn state(&self) -> ClockState;

    /// Ask the clock to start running. Returns true if it is Running on
    /// return; false means the request is pending (or refused) and the
    /// caller must re-check `state()` later - never assume synchronous
    /// readiness.
    fn request_resume(&mut self) -> bool;

    fn suspend(&mut self);

    fn close(&mut self);

    fn spawn_voice(&mut self, spec: VoiceSpec);

    /// Force-silence every voice on a bus with a short fade.
    fn silence(&mut self, bus: Bus, fade_secs: f32);

    fn active_voices(&self, bus: Bus) -> usize;

    fn set_melody_gain(&mut self, gain: f32);

    fn set_master_gain(&mut self, gain: f32);
}

/// Handle to the shared output graph: one backend plus the gain-stage
/// bookkeeping. At most one graph exists per session; only the director
/// creates or destroys it.
pub struct AudioGraph {
    backend: Box<dyn AudioBackend>,
    melody_connected: bool,
    melody_gain: f32,
    master_gain: f32,
}

impl AudioGraph {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        let mut graph = Self {
            backend,
            melody_connected: true,
            melody_gain: DEFAULT_MELODY_GAIN,
            master_gain: DEFAULT_MASTER_GAIN,
        };
        graph.backend.set_melody_gain(graph.melody_gain);
        graph.backend.set_master_gain(graph.master_gain);
        graph
    }

    pub fn now(&self) -> f64 {
        self.backend.now()
    }

    pub fn state(&self) -> ClockState {
        self.backend.state()
    }

    pub fn is_running(&self) -> bool {
        self.backend.state() == ClockState::Running
    }

    pub fn request_resume(&mut self) -> bool {
        if self.backend.state() == ClockState::Closed {
            log::warn!("resume requested on a closed audio graph");
            return false;
        }
        self.backend.request_resume()
    }

    pub fn suspend(&mut self) {
        self.backend.suspend();
    }

    pub fn close(&mut self) {
        self.backend.close();
    }

    /// Schedule a voice. Dropped (with a debug log) when the clock is
    /// not running, or when a melody voice arrives while the melody bus
    /// is disconnected.
    pub fn spawn_voice(&mut self, spec: VoiceSpec) {
        if !self.is_running() {
            log::debug!("dropping voice spawn: clock is {:?}", self.state());
            return;
        }
        if spec.bus == Bus::Melody && !self.melody_connected {
            log::debug!("dropping melody voice: melody bus disconnected");
            return;
        }
        self.backend.spawn_voice(spec);
    }

    pub fn silence_melody(&mut self, fade_secs: f32) {
        self.backend.silence(Bus::Melody, fade_secs);
    }

    pub fn active_melody_voices(&self) -> usize {
        self.backend.active_voices(Bus::Melody)
    }

    pub fn active_effect_voices(&self) -> usize {
        self.backend.active_voices(Bus::Effect)
    }

    /// Tear down the melody gain stage (full-cleanup stop). Melody
    /// voices are refused until [`AudioGraph::connect_melody_bus`].
    pub fn disconnect_melody_bus(&mut self) {
        self.melody_connected = false;
        self.backend.set_melody_gain(0.0);
    }

    /// Recreate the melody gain stage ahead of a fresh start.
    pub fn connect_melody_bus(&mut self) {
        self.melody_connected = true;
        self.backend.set_melody_gain(self.melody_gain);
    }

    pub fn melody_connected(&self) -> bool {
        self.melody_connected
    }

    pub fn set_melody_volume(&mut self, gain: f32) {
        self.melody_gain = gain.clamp(0.0, 1.0);
        if self.melody_connected {
            self.backend.set_melody_gain(self.melody_gain);
        }
    }

    pub fn set_master_volume(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 1.0);
        self.backend.set_master_gain(self.master_gain);
    }
}
