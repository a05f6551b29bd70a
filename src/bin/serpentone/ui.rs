//! Rendering: status bar, board, help line.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::app::{App, Phase, GRID_HEIGHT, GRID_WIDTH};

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                // Status bar
            Constraint::Length(GRID_HEIGHT + 2),  // Board
            Constraint::Length(1),                // Help bar
        ])
        .split(frame.area());

    render_status(frame, chunks[0], app);
    render_board(frame, chunks[1], app);

    let help = Paragraph::new(" [Space] Start/Pause  [Arrows/WASD] Steer  [N] Next tune  [M] Music  [X] Sound  [Q] Quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[2]);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" serpentone ").borders(Borders::ALL);

    let phase_str = match app.phase {
        Phase::Idle => "Press Space",
        Phase::Running => "Playing",
        Phase::Paused => "Paused",
        Phase::Over => "Game Over",
    };
    let phase_color = match app.phase {
        Phase::Running => Color::Green,
        Phase::Paused => Color::Yellow,
        Phase::Over => Color::Red,
        Phase::Idle => Color::White,
    };

    let director = app.director();
    let melody = director
        .current_melody()
        .map(|(_, name)| name)
        .unwrap_or("-");
    let flag = |enabled: bool| if enabled { "on" } else { "off" };

    let line = Line::from(vec![
        Span::styled(
            format!(" {phase_str}  "),
            Style::default().fg(phase_color),
        ),
        Span::styled(
            format!("Score: {}  Best: {}  ", app.score, app.best),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("♪ {melody}  "),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            format!(
                "music {}  sound {}",
                flag(director.is_music_enabled()),
                flag(director.is_sound_enabled())
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_board(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::with_capacity(GRID_HEIGHT as usize);
    for y in 0..GRID_HEIGHT.min(inner.height) {
        let mut spans = Vec::with_capacity(GRID_WIDTH as usize);
        for x in 0..GRID_WIDTH {
            let cell = (x, y);
            let span = if app.snake.front() == Some(&cell) {
                Span::styled("█", Style::default().fg(Color::LightGreen))
            } else if app.snake.contains(&cell) {
                Span::styled("█", Style::default().fg(Color::Green))
            } else if app.food == cell {
                Span::styled("●", Style::default().fg(Color::Red))
            } else {
                Span::raw(" ")
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}
