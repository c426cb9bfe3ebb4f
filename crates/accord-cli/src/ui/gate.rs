//! Gate screens: loading, error, and the terms modal.

use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::gate::{Gate, TermsView, wrap_lines};

/// Render whichever gate state is active into `area`.
pub fn draw(f: &mut Frame, area: Rect, gate: &mut Gate) {
  match gate {
    Gate::Loading => draw_centered(f, area, vec![Line::from("Loading…")], Color::Gray),
    Gate::Error(message) => {
      let lines = vec![
        Line::from(Span::styled(
          "Unable to Load Terms",
          Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(message.as_str()),
        Line::from(""),
        Line::from(Span::styled(
          "Press r to try again.",
          Style::default().fg(Color::Gray),
        )),
      ];
      draw_centered(f, area, lines, Color::Red);
    }
    Gate::Open(view) => draw_modal(f, area, view),
    Gate::Passthrough => {}
  }
}

fn draw_centered(f: &mut Frame, area: Rect, lines: Vec<Line>, border: Color) {
  let height = lines.len() as u16 + 2;
  let width = area.width.min(60);
  let rect = Rect {
    x: area.x + (area.width - width) / 2,
    y: area.y + area.height.saturating_sub(height) / 2,
    width,
    height: height.min(area.height),
  };
  let block = Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));
  f.render_widget(
    Paragraph::new(lines)
      .block(block)
      .alignment(Alignment::Center)
      .wrap(Wrap { trim: true }),
    rect,
  );
}

// ─── Modal ────────────────────────────────────────────────────────────────────

fn draw_modal(f: &mut Frame, area: Rect, view: &mut TermsView) {
  let block = Block::default()
    .title(format!(" Terms of Service v{} ", view.terms.version))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));
  let inner = block.inner(area);
  f.render_widget(block, area);

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(2), // intro
      Constraint::Min(3),    // terms text
      Constraint::Length(4), // footer
    ])
    .split(inner);

  let intro = vec![
    Line::from("Please read and accept our terms to continue."),
    Line::from(Span::styled(
      format!("Effective {}", view.terms.effective_date.format("%B %-d, %Y")),
      Style::default().fg(Color::Gray),
    )),
  ];
  f.render_widget(Paragraph::new(intro), rows[0]);

  // Wrap ourselves so the line count the view sees matches what is drawn.
  let text_area = rows[1];
  let lines = wrap_lines(&view.terms.content, text_area.width.saturating_sub(1));
  view.set_viewport(lines.len(), text_area.height);

  let body: Vec<Line> = lines.into_iter().map(Line::from).collect();
  f.render_widget(Paragraph::new(body).scroll((view.scroll, 0)), text_area);

  draw_footer(f, rows[2], view);
}

fn draw_footer(f: &mut Frame, area: Rect, view: &TermsView) {
  let mut lines = Vec::new();

  if !view.reached_bottom {
    lines.push(Line::from(Span::styled(
      "⬇ Please scroll to the bottom to continue",
      Style::default().fg(Color::Yellow),
    )));
  } else if let Some(err) = &view.error {
    lines.push(Line::from(Span::styled(err.as_str(), Style::default().fg(Color::Red))));
  } else {
    lines.push(Line::from(""));
  }

  let mark = if view.acknowledged { "[x]" } else { "[ ]" };
  let checkbox_style = if view.checkbox_enabled() {
    Style::default()
  } else {
    Style::default().fg(Color::DarkGray)
  };
  lines.push(Line::from(Span::styled(
    format!("{mark} I have read and agree to the Terms of Service"),
    checkbox_style,
  )));
  lines.push(Line::from(""));

  let (label, style) = if view.pending {
    ("  Accepting…  ", Style::default().fg(Color::Gray).bg(Color::DarkGray))
  } else if view.can_accept() {
    (
      "  Accept Terms  ",
      Style::default()
        .fg(Color::White)
        .bg(Color::Blue)
        .add_modifier(Modifier::BOLD),
    )
  } else {
    ("  Accept Terms  ", Style::default().fg(Color::Gray).bg(Color::DarkGray))
  };
  lines.push(Line::from(Span::styled(label, style)));

  f.render_widget(Paragraph::new(lines), area);
}
