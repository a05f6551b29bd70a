//! Manually-stepped backend for tests.
//!
//! The mock keeps the full spawn history and a live-voice list that
//! self-prunes as the scripted clock advances, mirroring the real
//! mixer's "ended" behavior. The handle side lets a test advance time,
//! script the clock state (including a resume request that does not
//! complete synchronously), and inspect what was scheduled.

use std::cell::RefCell;
use std::rc::Rc;

use super::{AudioBackend, ClockState};
use crate::voice::{Bus, VoiceSpec};

struct MockState {
    time: f64,
    clock: ClockState,
    resume_immediately: bool,
    resume_requests: usize,
    spawned: Vec<VoiceSpec>,
    live: Vec<(Bus, f64)>,
    melody_gain: f32,
    master_gain: f32,
}

pub struct MockBackend {
    state: Rc<RefCell<MockState>>,
}

/// Test-side handle onto the same state as the backend.
#[derive(Clone)]
pub struct MockHandle {
    state: Rc<RefCell<MockState>>,
}

impl MockBackend {
    /// Fresh backend in the Suspended state (a new platform context is
    /// not running until resumed), with synchronous resume allowed.
    pub fn new() -> (Self, MockHandle) {
        let state = Rc::new(RefCell::new(MockState {
            time: 0.0,
            clock: ClockState::Suspended,
            resume_immediately: true,
            resume_requests: 0,
            spawned: Vec::new(),
            live: Vec::new(),
            melody_gain: 1.0,
            master_gain: 1.0,
        }));
        (
            Self {
                state: state.clone(),
            },
            MockHandle { state },
        )
    }
}

impl AudioBackend for MockBackend {
    fn now(&self) -> f64 {
        self.state.borrow().time
    }

    fn state(&self) -> ClockState {
        self.state.borrow().clock
    }

    fn request_resume(&mut self) -> bool {
        let mut s = self.state.borrow_mut();
        s.resume_requests += 1;
        if s.clock == ClockState::Closed {
            return false;
        }
        if s.resume_immediately {
            s.clock = ClockState::Running;
            true
        } else {
            // Pending: the test flips the clock later via the handle.
            false
        }
    }

    fn suspend(&mut self) {
        let mut s = self.state.borrow_mut();
        if s.clock != ClockState::Closed {
            s.clock = ClockState::Suspended;
        }
    }

    fn close(&mut self) {
        let mut s = self.state.borrow_mut();
        s.clock = ClockState::Closed;
        s.live.clear();
    }

    fn spawn_voice(&mut self, spec: VoiceSpec) {
        let mut s = self.state.borrow_mut();
        s.live.push((spec.bus, spec.start + spec.duration as f64));
        s.spawned.push(spec);
    }

    fn silence(&mut self, bus: Bus, _fade_secs: f32) {
        self.state.borrow_mut().live.retain(|(b, _)| *b != bus);
    }

    fn active_voices(&self, bus: Bus) -> usize {
        self.state
            .borrow()
            .live
            .iter()
            .filter(|(b, _)| *b == bus)
            .count()
    }

    fn set_melody_gain(&mut self, gain: f32) {
        self.state.borrow_mut().melody_gain = gain;
    }

    fn set_master_gain(&mut self, gain: f32) {
        self.state.borrow_mut().master_gain = gain;
    }
}

impl MockHandle {
    /// Advance the clock. Time only moves while Running, and voices
    /// whose windows close along the way self-remove.
    pub fn advance(&self, seconds: f64) {
        let mut s = self.state.borrow_mut();
        if s.clock != ClockState::Running {
            return;
        }
        s.time += seconds;
        let now = s.time;
        s.live.retain(|(_, end)| *end > now);
    }

    pub fn set_state(&self, clock: ClockState) {
        self.state.borrow_mut().clock = clock;
    }

    /// Whether a resume request completes synchronously (true) or
    /// leaves the clock as-is until [`MockHandle::set_state`] (false).
    pub fn allow_synchronous_resume(&self, allow: bool) {
        self.state.borrow_mut().resume_immediately = allow;
    }

    pub fn now(&self) -> f64 {
        self.state.borrow().time
    }

    pub fn spawned(&self) -> Vec<VoiceSpec> {
        self.state.borrow().spawned.clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.state.borrow().spawned.len()
    }

    pub fn clear_spawned(&self) {
        self.state.borrow_mut().spawned.clear();
    }

    pub fn active(&self, bus: Bus) -> usize {
        self.state
            .borrow()
            .live
            .iter()
            .filter(|(b, _)| *b == bus)
            .count()
    }

    pub fn resume_requests(&self) -> usize {
        self.state.borrow().resume_requests
    }

    pub fn melody_gain(&self) -> f32 {
        self.state.borrow().melody_gain
    }
}
