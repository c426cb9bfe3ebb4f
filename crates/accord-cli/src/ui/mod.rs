//! TUI rendering. Orchestrates all panes.

pub mod gate;
pub mod screens;

use chrono::Local;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::{
  app::{App, Screen},
  gate::Gate,
};

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame. Takes `&mut` because the gate
/// learns its viewport size while drawing.
pub fn draw(f: &mut Frame, app: &mut App) {
  let area = f.area();

  // Vertical stack: header, body, status bar.
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  if app.gate.is_passthrough() {
    screens::draw(f, rows[1], app);
  } else {
    gate::draw(f, rows[1], &mut app.gate);
  }
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let date = Local::now().format("%Y-%m-%d").to_string();

  let who = app
    .me
    .as_ref()
    .and_then(|me| me.email.as_deref().or(me.name.as_deref()))
    .unwrap_or("");

  let left = Span::styled(
    " accord",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("{who}  {date} "),
    Style::default().fg(Color::Gray),
  );

  // Simple left-right header: pad the middle.
  let left_width = left.content.chars().count() as u16;
  let right_width = right.content.chars().count() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, hints) = match &app.gate {
    Gate::Loading => ("LOADING", "q quit"),
    Gate::Error(_) => ("ERROR", "r retry  q quit"),
    Gate::Open(_) => (
      "TERMS",
      "↑↓/jk scroll  PgUp/PgDn page  G bottom  Space agree  Enter accept  q quit",
    ),
    Gate::Passthrough => match app.screen {
      Screen::Dashboard => ("HOME", "Tab next  s settings  r refresh  q quit"),
      Screen::History => ("HISTORY", "Tab next  r refresh  q quit"),
      Screen::Settings => ("SETTINGS", "↑↓ field  Enter save  Esc back  Tab next"),
    },
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let hint_span = Span::styled(
    format!("  {status}"),
    Style::default().fg(Color::Gray),
  );

  let line = Line::from(vec![mode_span, hint_span]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
