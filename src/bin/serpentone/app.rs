//! Game loop and input handling.
//!
//! The snake itself is deliberately plain; this binary exists to drive
//! the audio lifecycle the way a real host would. Every meaningful
//! game event maps onto one director hook: the first keypress unlocks
//! audio, space starts/pauses, terminal focus doubles as visibility,
//! and the main loop pumps `poll` so deferred starts and the
//! look-ahead re-arm fire on time.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use rand::Rng;
use ratatui::DefaultTerminal;

use serpentone::director::{AudioDirector, GameQuery};

use super::ui;

pub const GRID_WIDTH: u16 = 32;
pub const GRID_HEIGHT: u16 = 20;

/// Snake advances one cell per step.
const STEP: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Over,
}

/// Snapshot handed to the director for its start/resume decisions.
#[derive(Clone, Copy)]
struct Query(Phase);

impl GameQuery for Query {
    fn is_active_play(&self) -> bool {
        self.0 == Phase::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

pub struct App {
    pub phase: Phase,
    pub snake: VecDeque<(u16, u16)>,
    pub food: (u16, u16),
    pub score: u32,
    pub best: u32,
    direction: Direction,
    /// Next direction, applied at the step boundary so two quick
    /// keypresses cannot fold the snake onto itself.
    pending: Direction,
    director: AudioDirector,
    started_once: bool,
    last_step: Instant,
    should_quit: bool,
}

impl App {
    pub fn new(director: AudioDirector) -> Self {
        let mut app = Self {
            phase: Phase::Idle,
            snake: VecDeque::new(),
            food: (0, 0),
            score: 0,
            best: 0,
            direction: Direction::Right,
            pending: Direction::Right,
            director,
            started_once: false,
            last_step: Instant::now(),
            should_quit: false,
        };
        app.reset_board();
        app
    }

    pub fn director(&self) -> &AudioDirector {
        &self.director
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while !self.should_quit {
            self.director.poll(&Query(self.phase));

            if self.phase == Phase::Running && self.last_step.elapsed() >= STEP {
                self.last_step = Instant::now();
                self.step();
            }

            terminal.draw(|frame| ui::render(frame, self))?;

            if event::poll(Duration::from_millis(16))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key.code);
                    }
                    Event::FocusLost => self.handle_focus(false),
                    Event::FocusGained => self.handle_focus(true),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        // Any keypress counts as the unlocking gesture.
        self.director.on_first_interaction();

        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') => self.handle_space(),
            KeyCode::Up | KeyCode::Char('w') => self.steer(Direction::Up),
            KeyCode::Down | KeyCode::Char('s') => self.steer(Direction::Down),
            KeyCode::Left | KeyCode::Char('a') => self.steer(Direction::Left),
            KeyCode::Right | KeyCode::Char('d') => self.steer(Direction::Right),
            KeyCode::Char('m') => {
                self.director.toggle_music(&Query(self.phase));
            }
            KeyCode::Char('x') => {
                self.director.toggle_sound();
            }
            KeyCode::Char('n') => {
                self.director.change_melody(&Query(self.phase));
            }
            _ => {}
        }
    }

    fn handle_space(&mut self) {
        match self.phase {
            Phase::Idle => {
                self.phase = Phase::Running;
                self.last_step = Instant::now();
                self.director
                    .on_game_start(!self.started_once, &Query(self.phase));
                self.started_once = true;
            }
            Phase::Running => {
                self.phase = Phase::Paused;
                self.director.on_pause();
            }
            Phase::Paused => {
                self.phase = Phase::Running;
                self.last_step = Instant::now();
                self.director.on_unpause();
            }
            Phase::Over => {
                self.director.on_reset();
                self.reset_board();
                self.phase = Phase::Running;
                self.last_step = Instant::now();
                self.director.on_game_start(false, &Query(self.phase));
            }
        }
    }

    fn handle_focus(&mut self, visible: bool) {
        // Terminal focus is the closest thing to page visibility.
        if !visible && self.phase == Phase::Running {
            self.phase = Phase::Paused;
        }
        self.director.on_visibility_change(visible);
    }

    fn steer(&mut self, direction: Direction) {
        if self.phase != Phase::Running {
            return;
        }
        if direction != self.direction.opposite() {
            self.pending = direction;
            self.director.play_effect("click", 0.4);
        }
    }

    fn step(&mut self) {
        self.direction = self.pending;
        let (dx, dy) = self.direction.delta();
        let head = self.snake.front().copied().unwrap_or((0, 0));
        let nx = head.0 as i32 + dx;
        let ny = head.1 as i32 + dy;

        let hit_wall =
            nx < 0 || ny < 0 || nx >= GRID_WIDTH as i32 || ny >= GRID_HEIGHT as i32;
        let next = (nx.max(0) as u16, ny.max(0) as u16);
        if hit_wall || self.snake.contains(&next) {
            self.game_over();
            return;
        }

        self.snake.push_front(next);
        if next == self.food {
            self.score += 1;
            if self.score % 5 == 0 {
                self.director.play_effect("fanfare", 1.0);
            } else {
                let variant = format!("fruit-{}", self.score % 3);
                self.director.play_effect(&variant, 1.0);
            }
            self.place_food();
        } else {
            self.snake.pop_back();
        }
    }

    fn game_over(&mut self) {
        self.phase = Phase::Over;
        self.best = self.best.max(self.score);
        self.director.on_game_over();
        self.director.play_effect("crash", 1.0);
    }

    fn reset_board(&mut self) {
        self.snake.clear();
        let cy = GRID_HEIGHT / 2;
        for i in 0..3 {
            self.snake.push_back((GRID_WIDTH / 2 - i, cy));
        }
        self.direction = Direction::Right;
        self.pending = Direction::Right;
        self.score = 0;
        self.place_food();
    }

    fn place_food(&mut self) {
        let mut rng = rand::thread_rng();
        loop {
            let candidate = (
                rng.gen_range(0..GRID_WIDTH),
                rng.gen_range(0..GRID_HEIGHT),
            );
            if !self.snake.contains(&candidate) {
                self.food = candidate;
                return;
            }
        }
    }
}
