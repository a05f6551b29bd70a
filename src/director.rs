use crate::error::AudioError;
use crate::graph::{AudioBackend, AudioGraph};
use crate::melody::MelodyCatalog;
use crate::prefs::{self, PrefStore, MUSIC_KEY, SOUND_KEY};
use crate::scheduler::PlaybackScheduler;
use crate::sfx::{self, SoundEffect};

/*
Audio Lifecycle Director
========================

The one component allowed to create or destroy the audio graph, and
the sole decision-maker for "should music be playing right now". The
host game calls the `on_*` hooks from its event handlers and pumps
`poll` from its main loop; everything else in the crate receives the
graph as a parameter and holds no lifecycle opinion of its own.

Rules the hooks encode:

- No audio API is touched before the first user interaction (platform
  autoplay policy). The first interaction creates the graph and asks
  for a synchronous resume right inside the handler; a later async
  resume may be silently refused. Failure is recorded, not raised, and
  retried on the next interaction.
- A resume request is never assumed to complete synchronously. When a
  start decision lands on a clock that is Suspended or Interrupted,
  the start is deferred as a one-shot action that `poll` fires once
  the clock reports Running. Issuing a new deferred action replaces
  any previous one, so a rapid pause/resume/pause can never queue two
  competing starts.
- Game over stops the music but keeps the graph alive so trailing
  effects still sound, then a delayed full cleanup releases the melody
  chain. The delay is cancelled if a new game starts first.
- Every hook degrades to "no audio" rather than propagating an error
  into gameplay code.
*/

/// Seconds after game over before the melody chain is fully released.
pub const CLEANUP_DELAY_SECS: f64 = 2.0;

/// Host-side game state the director reads before start/resume
/// decisions.
pub trait GameQuery {
    /// Started, not paused, not over.
    fn is_active_play(&self) -> bool;
}

/// Creates audio backends on demand. Implemented for closures so tests
/// can hand out mock backends and the bin can hand out cpal ones.
pub trait BackendFactory {
    fn create(&mut self) -> Result<Box<dyn AudioBackend>, AudioError>;
}

impl<F> BackendFactory for F
where
    F: FnMut() -> Result<Box<dyn AudioBackend>, AudioError>,
{
    fn create(&mut self) -> Result<Box<dyn AudioBackend>, AudioError> {
        self()
    }
}

/// One-shot actions waiting for the clock to report Running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// Start playback (deferred game-start or music-toggle).
    StartPlayback,
    /// Returning from hidden: resume if music was audibly playing.
    VisibilityResume,
}

pub struct AudioDirector {
    factory: Box<dyn BackendFactory>,
    prefs: Box<dyn PrefStore>,
    graph: Option<AudioGraph>,
    scheduler: PlaybackScheduler,
    sound_enabled: bool,
    music_enabled: bool,
    /// The user has interacted at least once this session.
    interacted: bool,
    /// Music was playing when the user paused (so unpause knows
    /// whether to resume or stay silent).
    music_was_playing: bool,
    /// Music was playing when the page went hidden (distinct from a
    /// user pause).
    resume_on_visible: bool,
    deferred: Option<Deferred>,
    /// Pending delayed full cleanup (absolute clock time).
    cleanup_at: Option<f64>,
}

impl AudioDirector {
    pub fn new(
        factory: Box<dyn BackendFactory>,
        prefs: Box<dyn PrefStore>,
        catalog: MelodyCatalog,
    ) -> Self {
        Self::with_scheduler(factory, prefs, PlaybackScheduler::new(catalog))
    }

    /// Deterministic melody selection for tests.
    pub fn with_seed(
        factory: Box<dyn BackendFactory>,
        prefs: Box<dyn PrefStore>,
        catalog: MelodyCatalog,
        seed: u64,
    ) -> Self {
        Self::with_scheduler(factory, prefs, PlaybackScheduler::with_seed(catalog, seed))
    }

    fn with_scheduler(
        factory: Box<dyn BackendFactory>,
        prefs: Box<dyn PrefStore>,
        scheduler: PlaybackScheduler,
    ) -> Self {
        let sound_enabled = prefs::flag(prefs.as_ref(), SOUND_KEY);
        let music_enabled = prefs::flag(prefs.as_ref(), MUSIC_KEY);
        Self {
            factory,
            prefs,
            graph: None,
            scheduler,
            sound_enabled,
            music_enabled,
            interacted: false,
            music_was_playing: false,
            resume_on_visible: false,
            deferred: None,
            cleanup_at: None,
        }
    }

    pub fn is_sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    pub fn is_music_enabled(&self) -> bool {
        self.music_enabled
    }

    pub fn is_music_playing(&self) -> bool {
        self.scheduler.is_playing()
    }

    /// `(id, display name)` of the selected melody, if any.
    pub fn current_melody(&self) -> Option<(&'static str, &'static str)> {
        self.scheduler
            .current_melody()
            .map(|m| (m.id, m.display_name))
    }

    /// Whether the graph exists and its clock is running.
    pub fn audio_ready(&self) -> bool {
        self.graph.as_ref().map(AudioGraph::is_running).unwrap_or(false)
    }

    /// First (or any subsequent) user interaction. Creates the graph
    /// and attempts a synchronous resume inside the handler, as the
    /// platform requires. Returns whether audio is ready; a failure
    /// here is retried on the next interaction.
    pub fn on_first_interaction(&mut self) -> bool {
        self.interacted = true;
        if self.audio_ready() {
            return true;
        }
        self.ensure_graph() && self.audio_ready()
    }

    /// A game round begins. A brand-new session (`is_first_start`)
    /// rebuilds the graph from scratch so nothing leaks between
    /// sessions; restarts reuse it. Returns whether music actually
    /// started (deferred starts count as false until they fire).
    pub fn on_game_start(&mut self, is_first_start: bool, game: &dyn GameQuery) -> bool {
        if !self.interacted {
            log::debug!("game start before first interaction; no audio this round");
            return false;
        }
        // A new game outruns any pending post-game-over cleanup.
        self.cleanup_at = None;
        self.music_was_playing = false;

        if is_first_start {
            if let Some(graph) = self.graph.as_mut() {
                graph.close();
            }
            self.graph = None;
        }
        if !self.ensure_graph() {
            return false;
        }

        if !self.music_enabled || !game.is_active_play() {
            return false;
        }

        let Some(graph) = self.graph.as_mut() else {
            return false;
        };
        if graph.is_running() {
            self.deferred = None;
            self.scheduler.start(graph)
        } else {
            // Wait for the clock instead of busy-polling it.
            graph.request_resume();
            self.deferred = Some(Deferred::StartPlayback);
            false
        }
    }

    /// User paused the game.
    pub fn on_pause(&mut self) {
        self.music_was_playing = self.scheduler.is_playing();
        if let Some(graph) = self.graph.as_mut() {
            if self.music_was_playing {
                self.scheduler.pause(graph);
            }
        }
    }

    /// User unpaused. Music comes back only if it was playing before
    /// the pause and is still enabled.
    pub fn on_unpause(&mut self) {
        if !self.music_was_playing || !self.music_enabled {
            return;
        }
        self.music_was_playing = false;
        if let Some(graph) = self.graph.as_mut() {
            self.scheduler.resume(graph);
        }
    }

    /// The round ended. Music stops but the graph stays up so the
    /// game-over effects can play; a delayed full cleanup follows
    /// unless a new game cancels it first.
    pub fn on_game_over(&mut self) {
        self.deferred = None;
        if let Some(graph) = self.graph.as_mut() {
            self.scheduler.stop(graph, false);
            self.cleanup_at = Some(graph.now() + CLEANUP_DELAY_SECS);
        }
    }

    /// Preparing a fresh round after game over: full stop, new melody
    /// for variety. Starting is left to the next `on_game_start`.
    pub fn on_reset(&mut self) {
        self.deferred = None;
        self.cleanup_at = None;
        if let Some(graph) = self.graph.as_mut() {
            self.scheduler.stop(graph, true);
        }
        self.scheduler.select_melody(None);
    }

    /// The host window was hidden or shown.
    pub fn on_visibility_change(&mut self, visible: bool) {
        if !visible {
            if self.scheduler.is_playing() {
                if let Some(graph) = self.graph.as_mut() {
                    self.scheduler.pause(graph);
                }
                self.resume_on_visible = true;
            }
            return;
        }

        let Some(graph) = self.graph.as_mut() else {
            return;
        };
        if graph.is_running() {
            self.finish_visibility_resume();
        } else {
            graph.request_resume();
            self.deferred = Some(Deferred::VisibilityResume);
        }
    }

    /// Flip the sound-effects preference; persisted immediately.
    pub fn toggle_sound(&mut self) -> bool {
        self.sound_enabled = !self.sound_enabled;
        prefs::set_flag(self.prefs.as_mut(), SOUND_KEY, self.sound_enabled);
        self.sound_enabled
    }

    /// Flip the music preference. Off stops playback immediately; on
    /// starts it only when the game is actively in play.
    pub fn toggle_music(&mut self, game: &dyn GameQuery) -> bool {
        self.music_enabled = !self.music_enabled;
        prefs::set_flag(self.prefs.as_mut(), MUSIC_KEY, self.music_enabled);

        if !self.music_enabled {
            self.deferred = None;
            if let Some(graph) = self.graph.as_mut() {
                self.scheduler.stop(graph, false);
            }
        } else if game.is_active_play() {
            if let Some(graph) = self.graph.as_mut() {
                if graph.is_running() {
                    self.scheduler.start(graph);
                } else {
                    graph.request_resume();
                    self.deferred = Some(Deferred::StartPlayback);
                }
            }
        }
        self.music_enabled
    }

    /// User asked for a different tune. Audible only when music is
    /// enabled and the game is actively in play; otherwise only the
    /// displayed selection changes.
    pub fn change_melody(&mut self, game: &dyn GameQuery) {
        let audible = self.music_enabled && game.is_active_play() && self.audio_ready();
        match self.graph.as_mut() {
            Some(graph) if audible => self.scheduler.change_to_random_melody(graph),
            _ => {
                self.scheduler.select_melody(None);
            }
        }
    }

    /// Play a one-shot effect by host-facing name. No-ops (returning
    /// false) when sound is disabled, the name is unknown, or audio is
    /// not ready.
    pub fn play_effect(&mut self, name: &str, volume_scale: f32) -> bool {
        if !self.sound_enabled {
            return false;
        }
        let Some(effect) = SoundEffect::from_name(name) else {
            log::warn!("unknown sound effect `{name}`");
            return false;
        };
        match self.graph.as_mut() {
            Some(graph) => sfx::play(graph, effect, volume_scale),
            None => false,
        }
    }

    /// Main-loop pump: fires the delayed cleanup and the one-shot
    /// deferred action when due, then ticks the scheduler's re-arm
    /// loop.
    pub fn poll(&mut self, game: &dyn GameQuery) {
        let Some(graph) = self.graph.as_mut() else {
            return;
        };

        if let Some(at) = self.cleanup_at {
            if graph.now() >= at {
                self.cleanup_at = None;
                self.scheduler.stop(graph, true);
            }
        }

        if graph.is_running() {
            match self.deferred.take() {
                Some(Deferred::StartPlayback) => {
                    if self.music_enabled && game.is_active_play() {
                        self.scheduler.start(graph);
                    }
                }
                Some(Deferred::VisibilityResume) => self.finish_visibility_resume(),
                None => {}
            }
        }

        if let Some(graph) = self.graph.as_mut() {
            self.scheduler.tick(graph);
        }
    }

    /// The clock came back after a hidden period: restart playback
    /// from the current melody (no reselection) if it was audibly
    /// playing when we went hidden.
    fn finish_visibility_resume(&mut self) {
        if !self.resume_on_visible {
            return;
        }
        self.resume_on_visible = false;
        if !self.music_enabled {
            return;
        }
        if let Some(graph) = self.graph.as_mut() {
            self.scheduler.resume(graph);
        }
    }

    /// Create the graph if needed and request a resume. True when a
    /// graph exists afterwards (its clock may still be pending).
    fn ensure_graph(&mut self) -> bool {
        if self.graph.is_none() {
            match self.factory.create() {
                Ok(backend) => self.graph = Some(AudioGraph::new(backend)),
                Err(e) => {
                    log::warn!("audio unavailable: {e}");
                    return false;
                }
            }
        }
        if let Some(graph) = self.graph.as_mut() {
            if !graph.is_running() {
                graph.request_resume();
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::mock::{MockBackend, MockHandle};
    use crate::graph::ClockState;
    use crate::melody::{parser, Melody};
    use crate::prefs::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Game {
        active: bool,
    }

    impl GameQuery for Game {
        fn is_active_play(&self) -> bool {
            self.active
        }
    }

    /// Factory handing out mock backends, exposing each handle.
    fn mock_factory(handles: Rc<RefCell<Vec<MockHandle>>>) -> Box<dyn BackendFactory> {
        Box::new(move || -> Result<Box<dyn AudioBackend>, AudioError> {
            let (backend, handle) = MockBackend::new();
            handles.borrow_mut().push(handle);
            Ok(Box::new(backend))
        })
    }

    fn catalog() -> MelodyCatalog {
        MelodyCatalog::from_melodies(vec![
            Melody {
                id: "a",
                display_name: "A",
                tempo_bpm: 60.0,
                events: parser::parse("1:C4 1:D4 1:E4 1:F4"),
            },
            Melody {
                id: "b",
                display_name: "B",
                tempo_bpm: 60.0,
                events: parser::parse("1:G4 1:A4 1:B4 1:C5"),
            },
        ])
    }

    fn director() -> (AudioDirector, Rc<RefCell<Vec<MockHandle>>>) {
        let handles = Rc::new(RefCell::new(Vec::new()));
        let director = AudioDirector::with_seed(
            mock_factory(handles.clone()),
            Box::new(MemoryStore::new()),
            catalog(),
            7,
        );
        (director, handles)
    }

    fn latest(handles: &Rc<RefCell<Vec<MockHandle>>>) -> MockHandle {
        handles.borrow().last().expect("a graph was created").clone()
    }

    #[test]
    fn nothing_happens_before_first_interaction() {
        let (mut director, handles) = director();
        let game = Game { active: true };

        assert!(!director.on_game_start(true, &game));
        assert!(!director.play_effect("click", 1.0));
        assert!(handles.borrow().is_empty(), "no graph may exist yet");
    }

    #[test]
    fn first_interaction_unlocks_audio() {
        let (mut director, handles) = director();

        assert!(director.on_first_interaction());
        assert!(director.audio_ready());
        assert_eq!(handles.borrow().len(), 1);
    }

    #[test]
    fn failed_unlock_is_retried_on_next_interaction() {
        let attempts = Rc::new(RefCell::new(0));
        let counter = attempts.clone();
        let handles: Rc<RefCell<Vec<MockHandle>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = handles.clone();
        let factory = Box::new(move || {
            *counter.borrow_mut() += 1;
            if *counter.borrow() == 1 {
                Err(AudioError::NoOutputDevice)
            } else {
                let (backend, handle) = MockBackend::new();
                sink.borrow_mut().push(handle);
                Ok(Box::new(backend) as Box<dyn AudioBackend>)
            }
        });
        let mut director =
            AudioDirector::with_seed(factory, Box::new(MemoryStore::new()), catalog(), 7);

        assert!(!director.on_first_interaction());
        assert!(director.on_first_interaction());
        assert_eq!(*attempts.borrow(), 2);
    }

    #[test]
    fn game_start_plays_music_when_enabled_and_active() {
        let (mut director, handles) = director();
        let game = Game { active: true };

        director.on_first_interaction();
        assert!(director.on_game_start(true, &game));
        assert!(director.is_music_playing());
        assert!(latest(&handles).spawn_count() > 0);
    }

    #[test]
    fn first_start_rebuilds_the_graph() {
        let (mut director, handles) = director();
        let game = Game { active: true };

        director.on_first_interaction();
        director.on_game_start(true, &game);
        assert_eq!(handles.borrow().len(), 1);

        // Restart after game over reuses the graph.
        director.on_game_over();
        director.on_game_start(false, &game);
        assert_eq!(handles.borrow().len(), 1);

        // A brand-new session rebuilds it.
        director.on_game_start(true, &game);
        assert_eq!(handles.borrow().len(), 2);
    }

    #[test]
    fn suspended_clock_defers_the_start() {
        let (mut director, handles) = director();
        let game = Game { active: true };

        director.on_first_interaction();
        let handle = latest(&handles);
        handle.allow_synchronous_resume(false);
        handle.set_state(ClockState::Suspended);

        assert!(!director.on_game_start(false, &game));
        assert!(!director.is_music_playing());

        // The clock comes up later; poll fires the deferred start.
        handle.set_state(ClockState::Running);
        director.poll(&game);
        assert!(director.is_music_playing());
    }

    #[test]
    fn pause_and_unpause_round_trip_music() {
        let (mut director, _handles) = director();
        let game = Game { active: true };
        director.on_first_interaction();
        director.on_game_start(true, &game);

        director.on_pause();
        assert!(!director.is_music_playing());

        director.on_unpause();
        assert!(director.is_music_playing());
    }

    #[test]
    fn unpause_stays_silent_if_music_was_not_playing() {
        let (mut director, _handles) = director();
        let game = Game { active: true };
        director.on_first_interaction();
        director.toggle_music(&game); // off, nothing playing
        director.on_game_start(true, &game);

        director.on_pause();
        director.on_unpause();
        assert!(!director.is_music_playing());
    }

    #[test]
    fn game_over_keeps_graph_for_effects_then_cleans_up() {
        let (mut director, handles) = director();
        let game = Game { active: true };
        director.on_first_interaction();
        director.on_game_start(true, &game);
        let handle = latest(&handles);

        director.on_game_over();
        assert!(!director.is_music_playing());
        // Effects still route through the surviving graph.
        assert!(director.play_effect("crash", 1.0));

        // After the delay, the melody chain is fully released.
        handle.advance(CLEANUP_DELAY_SECS + 0.1);
        director.poll(&game);
        assert!(!director.play_effect("nonsense", 1.0));
        handle.clear_spawned();
        assert!(!director.on_game_start(false, &Game { active: false }));
    }

    #[test]
    fn new_game_cancels_pending_cleanup() {
        let (mut director, handles) = director();
        let game = Game { active: true };
        director.on_first_interaction();
        director.on_game_start(true, &game);
        let handle = latest(&handles);

        director.on_game_over();
        director.on_game_start(false, &game);
        handle.advance(CLEANUP_DELAY_SECS + 1.0);
        director.poll(&game);

        // Still playing: the cleanup never fired.
        assert!(director.is_music_playing());
    }

    #[test]
    fn toggle_music_off_stops_immediately_on_only_mid_game() {
        let (mut director, _handles) = director();
        let game = Game { active: true };
        director.on_first_interaction();
        director.on_game_start(true, &game);

        assert!(!director.toggle_music(&game));
        assert!(!director.is_music_playing());

        // Toggling on while not in active play must stay silent.
        assert!(director.toggle_music(&Game { active: false }));
        assert!(!director.is_music_playing());

        // Toggling mid-game starts playback.
        director.toggle_music(&game);
        director.toggle_music(&game);
        assert!(director.is_music_playing());
    }

    #[test]
    fn toggles_persist_to_the_store() {
        let handles = Rc::new(RefCell::new(Vec::new()));
        let mut store = MemoryStore::new();
        crate::prefs::set_flag(&mut store, MUSIC_KEY, false);
        let mut director = AudioDirector::with_seed(
            mock_factory(handles),
            Box::new(store),
            catalog(),
            7,
        );

        assert!(!director.is_music_enabled(), "persisted flag is honored");
        assert!(director.toggle_music(&Game { active: false }));
        assert!(!director.toggle_sound());
        assert!(director.is_music_enabled());
        assert!(!director.is_sound_enabled());
    }

    #[test]
    fn sound_effects_respect_the_preference() {
        let (mut director, handles) = director();
        director.on_first_interaction();

        assert!(director.play_effect("click", 1.0));
        director.toggle_sound();
        assert!(!director.play_effect("click", 1.0));
        assert_eq!(latest(&handles).spawn_count(), 1);
    }

    #[test]
    fn change_melody_mid_game_is_audible_otherwise_silent() {
        let (mut director, handles) = director();
        let game = Game { active: true };
        director.on_first_interaction();
        director.on_game_start(true, &game);
        let before = director.current_melody().unwrap().0;

        director.change_melody(&game);
        let after = director.current_melody().unwrap().0;
        assert_ne!(before, after);
        assert!(director.is_music_playing());

        // Not in active play: the label changes, no sound.
        director.on_game_over();
        latest(&handles).clear_spawned();
        director.change_melody(&Game { active: false });
        assert!(!director.is_music_playing());
        assert_eq!(latest(&handles).spawn_count(), 0);
    }

    #[test]
    fn hidden_then_visible_resumes_same_melody() {
        let (mut director, handles) = director();
        let game = Game { active: true };
        director.on_first_interaction();
        director.on_game_start(true, &game);
        let melody = director.current_melody().unwrap().0;
        let handle = latest(&handles);

        director.on_visibility_change(false);
        assert!(!director.is_music_playing());

        // Coming back, the clock is suspended and resumes async.
        handle.allow_synchronous_resume(false);
        handle.set_state(ClockState::Suspended);
        director.on_visibility_change(true);
        assert!(!director.is_music_playing());

        handle.set_state(ClockState::Running);
        director.poll(&game);
        assert!(director.is_music_playing());
        assert_eq!(director.current_melody().unwrap().0, melody);
    }

    #[test]
    fn reset_reselects_without_starting() {
        let (mut director, _handles) = director();
        let game = Game { active: true };
        director.on_first_interaction();
        director.on_game_start(true, &game);
        let before = director.current_melody().unwrap().0;

        director.on_game_over();
        director.on_reset();
        assert!(!director.is_music_playing());
        assert_ne!(director.current_melody().unwrap().0, before);
    }
}
