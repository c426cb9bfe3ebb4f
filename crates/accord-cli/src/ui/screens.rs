//! Screens behind the gate: dashboard, acceptance history, settings.

use accord_core::password::Requirement;
use ratatui::{
  Frame,
  layout::{Constraint, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Row, Table},
};

use crate::app::{App, Field, Screen};

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  match app.screen {
    Screen::Dashboard => draw_dashboard(f, area, app),
    Screen::History => draw_history(f, area, app),
    Screen::Settings => draw_settings(f, area, app),
  }
}

fn pane(title: &str) -> Block<'static> {
  Block::default()
    .title(format!(" {title} "))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray))
}

fn label(text: &str) -> Span<'static> {
  Span::styled(
    format!("{text:<18}"),
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
  )
}

// ─── Dashboard ────────────────────────────────────────────────────────────────

fn draw_dashboard(f: &mut Frame, area: Rect, app: &App) {
  let first_name = app
    .me
    .as_ref()
    .and_then(|me| me.name.as_deref())
    .and_then(|n| n.split_whitespace().next())
    .unwrap_or("there");

  let mut lines = vec![
    Line::from(Span::styled(
      format!("Hello, {first_name}!"),
      Style::default().add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
  ];

  if let Some(me) = &app.me {
    lines.push(Line::from(vec![label("Email"), Span::raw(me.email.clone().unwrap_or_default())]));
    lines.push(Line::from(vec![
      label("Password"),
      Span::raw(if me.has_password { "set" } else { "not set" }),
    ]));
    if let Some(created) = me.created_at {
      lines.push(Line::from(vec![
        label("Member since"),
        Span::raw(created.format("%Y-%m-%d").to_string()),
      ]));
    }
  }

  if let Some(latest) = app.history.first() {
    lines.push(Line::from(vec![
      label("Terms accepted"),
      Span::raw(format!(
        "v{} on {}",
        latest.terms.version,
        latest.acceptance.accepted_at.format("%Y-%m-%d %H:%M UTC")
      )),
    ]));
  }

  f.render_widget(Paragraph::new(lines).block(pane("Dashboard")), area);
}

// ─── History ──────────────────────────────────────────────────────────────────

fn draw_history(f: &mut Frame, area: Rect, app: &App) {
  if app.history.is_empty() {
    let empty = Paragraph::new("No acceptances recorded.")
      .style(Style::default().fg(Color::DarkGray))
      .block(pane("Acceptances"));
    f.render_widget(empty, area);
    return;
  }

  let header = Row::new(["Version", "Effective", "Accepted", "From"])
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

  let rows = app.history.iter().map(|r| {
    Row::new([
      r.terms.version.clone(),
      r.terms.effective_date.format("%Y-%m-%d").to_string(),
      r.acceptance.accepted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
      r.acceptance.ip_address.clone(),
    ])
  });

  let table = Table::new(rows, [
    Constraint::Length(12),
    Constraint::Length(12),
    Constraint::Length(21),
    Constraint::Min(10),
  ])
  .header(header)
  .block(pane(&format!("Acceptances ({})", app.history.len())));

  f.render_widget(table, area);
}

// ─── Settings ─────────────────────────────────────────────────────────────────

fn draw_settings(f: &mut Frame, area: Rect, app: &App) {
  let form = &app.settings;
  let has_password = app.me.as_ref().is_some_and(|me| me.has_password);

  let field = |name: &str, value: String, which: Field| {
    let focused = form.focus == which;
    let style = if focused {
      Style::default().bg(Color::Blue).fg(Color::White)
    } else {
      Style::default()
    };
    let cursor = if focused { "▏" } else { "" };
    Line::from(vec![
      label(name),
      Span::styled(format!("{value}{cursor}"), style),
    ])
  };

  let masked = |s: &str| "•".repeat(s.chars().count());

  let mut lines = vec![
    field("Display name", form.name.clone(), Field::Name),
    Line::from(""),
  ];
  lines.push(field(
    "Current password",
    masked(&form.current_password),
    Field::CurrentPassword,
  ));
  if !has_password {
    lines.push(Line::from(Span::styled(
      "No password set yet; leave current password empty.",
      Style::default().fg(Color::DarkGray),
    )));
  }
  lines.push(field("New password", masked(&form.new_password), Field::NewPassword));
  lines.push(field(
    "Confirm password",
    masked(&form.confirm_password),
    Field::ConfirmPassword,
  ));
  lines.push(Line::from(""));

  for req in Requirement::ALL {
    let (mark, color) = if req.is_met_by(&form.new_password) {
      ("✓", Color::Green)
    } else {
      ("✗", Color::DarkGray)
    };
    lines.push(Line::from(Span::styled(
      format!("  {mark} {req}"),
      Style::default().fg(color),
    )));
  }
  if !form.confirm_password.is_empty() && form.confirm_password != form.new_password {
    lines.push(Line::from(Span::styled(
      "  Passwords do not match",
      Style::default().fg(Color::Red),
    )));
  }

  f.render_widget(Paragraph::new(lines).block(pane("Settings")), area);
}
