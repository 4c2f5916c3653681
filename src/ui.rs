use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{key_for_cell, App},
    board::{Category, Cell},
    high_score::HighScoreStore,
    random::RandomSource,
    session::{SessionEvent, SessionPhase, SessionSnapshot},
    timer::Timer,
};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;
const HEADER_HEIGHT: u16 = 3;
const FOOTER_HEIGHT: u16 = 2;

fn category_color(category: Category) -> Color {
    match category {
        Category::Red => Color::Red,
        Category::Blue => Color::Blue,
        Category::Green => Color::Green,
        Category::Yellow => Color::Yellow,
        Category::Purple => Color::Magenta,
    }
}

fn screen_chunks(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(0),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

/// Region of the frame holding the cell grid
pub fn board_area(area: Rect) -> Rect {
    screen_chunks(area)[1]
}

/// Near-square grid, row-major, one rect per cell
pub fn board_layout(area: Rect, num_cells: usize) -> Vec<Rect> {
    if num_cells == 0 {
        return Vec::new();
    }
    let cols = (num_cells as f64).sqrt().ceil() as usize;
    let rows = num_cells.div_ceil(cols);

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(area);

    row_areas
        .iter()
        .flat_map(|row| {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, cols as u32); cols])
                .split(*row)
                .to_vec()
        })
        .take(num_cells)
        .collect()
}

/// Cell id under a terminal position, given the full frame area
pub fn cell_at(area: Rect, num_cells: usize, column: u16, row: u16) -> Option<usize> {
    board_layout(board_area(area), num_cells)
        .iter()
        .position(|rect| rect.contains(Position::new(column, row)))
}

fn render_cell(cell: &Cell, area: Rect, buf: &mut Buffer) {
    let key = key_for_cell(cell.id).unwrap_or('?');
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let (block_style, lines) = if cell.active {
        let color = category_color(cell.category);
        (
            Style::default().fg(Color::Black).bg(color).patch(bold),
            vec![
                Line::from(key.to_string()),
                Line::from(format!("{} +{}", cell.category, cell.category.points())),
            ],
        )
    } else {
        (
            Style::default().add_modifier(Modifier::DIM),
            vec![Line::from(key.to_string())],
        )
    };

    let block = Block::default().borders(Borders::ALL).style(block_style);
    let inner = block.inner(area);
    block.render(area, buf);

    // vertically center the label
    let pad = inner.height.saturating_sub(lines.len() as u16) / 2;
    let label_area = Rect {
        y: inner.y + pad,
        height: inner.height.saturating_sub(pad),
        ..inner
    };
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(label_area, buf);
}

fn header_line(snap: &SessionSnapshot) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let lives = (0..snap.max_misses)
        .map(|i| if i < snap.misses_left() { '●' } else { '○' })
        .join("");

    Line::from(vec![
        Span::styled("score ", Style::default().add_modifier(Modifier::DIM)),
        Span::styled(snap.score.to_string(), bold),
        Span::raw("   "),
        Span::styled("best ", Style::default().add_modifier(Modifier::DIM)),
        Span::styled(snap.high_score.to_string(), bold.fg(Color::Yellow)),
        Span::raw("   "),
        Span::styled(lives, Style::default().fg(Color::Red)),
        Span::raw("   "),
        Span::styled(
            format!("{:.1}s", snap.current_delay.as_secs_f64()),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ])
}

fn event_line(event: Option<&SessionEvent>) -> Line<'static> {
    let italic = Style::default().add_modifier(Modifier::ITALIC);
    match event {
        Some(SessionEvent::Hit {
            points,
            new_high_score: true,
            ..
        }) => Line::from(Span::styled(
            format!("+{} new high score!", points),
            italic.fg(Color::Yellow),
        )),
        Some(SessionEvent::Hit {
            points, category, ..
        }) => Line::from(Span::styled(
            format!("+{}", points),
            italic.fg(category_color(*category)),
        )),
        Some(SessionEvent::Missed { .. }) => {
            Line::from(Span::styled("missed!", italic.fg(Color::Red)))
        }
        Some(SessionEvent::HighScoreCleared) => {
            Line::from(Span::styled("high score cleared", italic))
        }
        _ => Line::from(Span::styled("tap the lit cell", italic.add_modifier(Modifier::DIM))),
    }
}

fn render_game_over(snap: &SessionSnapshot, area: Rect, buf: &mut Buffer) {
    let title = "GAME OVER";
    let detail = format!("final score {}", snap.score);
    let best = match snap.high_score_set_at {
        Some(at) => format!("best {}, set {}", snap.high_score, at.format("%Y-%m-%d")),
        None => format!("best {}", snap.high_score),
    };
    let hint = "r to play again, esc to quit";

    let width = [title.width(), detail.width(), best.width(), hint.width()]
        .into_iter()
        .max()
        .unwrap_or(0) as u16
        + 4;
    let width = width.min(area.width);
    let height = 6.min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    Clear.render(popup, buf);
    Paragraph::new(vec![
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(detail),
        Line::from(best),
        Line::from(Span::styled(
            hint,
            Style::default().add_modifier(Modifier::DIM),
        )),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL))
    .wrap(Wrap { trim: true })
    .render(popup, buf);
}

impl<T: Timer, H: HighScoreStore, R: RandomSource> Widget for &App<T, H, R> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snap = self.snapshot();
        let [header, board, footer] = screen_chunks(area);

        Paragraph::new(header_line(&snap))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM))
            .render(header, buf);

        for (cell, rect) in snap
            .board
            .cells()
            .iter()
            .zip(board_layout(board, snap.board.len()))
        {
            render_cell(cell, rect, buf);
        }

        let footer_lines = vec![
            event_line(self.last_event.as_ref()),
            Line::from(Span::styled(
                "keys or mouse to tap, esc to quit",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ];
        Paragraph::new(footer_lines)
            .alignment(Alignment::Center)
            .render(footer, buf);

        if snap.phase() == SessionPhase::Ended {
            render_game_over(&snap, board, buf);
        }
    }
}
