//! The terms gate: blocks the rest of the UI until the current terms are
//! accepted.
//!
//! ```text
//! Loading ──ok, needs acceptance──▶ Open ──accepted──▶ Loading ──▶ Passthrough
//!    │  ╲                            │
//!    │   ╲──ok, nothing to do──▶ Passthrough
//!    ▼                               └─failed─▶ Open (with error)
//!  Error ──retry──▶ Loading
//! ```
//!
//! Nothing here does I/O; the app feeds results in and reads the state out.

use accord_core::terms::{CurrentTerms, TermsStatus};
use uuid::Uuid;

// ─── Gate ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
  Loading,
  Error(String),
  Open(TermsView),
  Passthrough,
}

impl Gate {
  /// Apply the result of a status query.
  pub fn on_status(result: Result<TermsStatus, String>) -> Self {
    match result {
      Ok(status) if status.needs_acceptance => {
        Gate::Open(TermsView::new(status.current_terms))
      }
      Ok(_) => Gate::Passthrough,
      Err(message) => Gate::Error(message),
    }
  }

  /// `Error → Loading`; any other state is left alone.
  pub fn retry(&mut self) -> bool {
    if matches!(self, Gate::Error(_)) {
      *self = Gate::Loading;
      true
    } else {
      false
    }
  }

  pub fn is_passthrough(&self) -> bool { matches!(self, Gate::Passthrough) }
}

// ─── Terms view ───────────────────────────────────────────────────────────────

/// Reading and acknowledgement state for the terms on display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsView {
  pub terms:          CurrentTerms,
  /// First visible line.
  pub scroll:         u16,
  /// Largest useful `scroll`; zero when everything fits.
  pub max_scroll:     u16,
  /// Sticky: once the bottom has been seen it stays seen.
  pub reached_bottom: bool,
  pub acknowledged:   bool,
  /// An accept request is in flight.
  pub pending:        bool,
  /// Message from the last failed accept.
  pub error:          Option<String>,
  sized:              bool,
}

impl TermsView {
  pub fn new(terms: CurrentTerms) -> Self {
    Self {
      terms,
      scroll: 0,
      max_scroll: 0,
      reached_bottom: false,
      acknowledged: false,
      pending: false,
      error: None,
      sized: false,
    }
  }

  /// Tell the view how tall the wrapped content is and how much of it fits.
  /// Called on every frame; content that fits counts as read.
  pub fn set_viewport(&mut self, content_lines: usize, height: u16) {
    let overflow = content_lines.saturating_sub(height as usize);
    self.max_scroll = u16::try_from(overflow).unwrap_or(u16::MAX);
    self.scroll = self.scroll.min(self.max_scroll);
    self.sized = true;
    self.check_bottom();
  }

  pub fn scroll_down(&mut self, lines: u16) {
    self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll);
    self.check_bottom();
  }

  pub fn scroll_up(&mut self, lines: u16) {
    self.scroll = self.scroll.saturating_sub(lines);
  }

  pub fn scroll_to_bottom(&mut self) {
    self.scroll = self.max_scroll;
    self.check_bottom();
  }

  fn check_bottom(&mut self) {
    if self.sized && self.scroll >= self.max_scroll {
      self.reached_bottom = true;
    }
  }

  /// The checkbox is inert until the bottom has been reached.
  pub fn checkbox_enabled(&self) -> bool { self.reached_bottom && !self.pending }

  /// Flip the acknowledgement. Returns `false` if the checkbox is disabled.
  pub fn toggle_acknowledged(&mut self) -> bool {
    if !self.checkbox_enabled() {
      return false;
    }
    self.acknowledged = !self.acknowledged;
    true
  }

  pub fn can_accept(&self) -> bool {
    self.reached_bottom && self.acknowledged && !self.pending
  }

  /// Mark an accept as in flight and return the terms id to send, or `None`
  /// if accepting is not allowed right now.
  pub fn begin_accept(&mut self) -> Option<Uuid> {
    if !self.can_accept() {
      return None;
    }
    self.pending = true;
    self.error = None;
    Some(self.terms.id)
  }

  /// The accept request failed; stay open so the user can try again.
  pub fn accept_failed(&mut self, message: String) {
    self.pending = false;
    self.error = Some(message);
  }
}

// ─── Text layout ──────────────────────────────────────────────────────────────

/// Greedy word wrap to `width` columns. Blank lines are kept; words longer
/// than a line are split.
pub fn wrap_lines(text: &str, width: u16) -> Vec<String> {
  let width = usize::from(width.max(1));
  let mut out = Vec::new();

  for raw in text.lines() {
    let mut line = String::new();
    let mut len = 0;

    for word in raw.split_whitespace() {
      let mut word: Vec<char> = word.chars().collect();

      while word.len() > width {
        if len > 0 {
          out.push(std::mem::take(&mut line));
          len = 0;
        }
        let rest = word.split_off(width);
        out.push(word.into_iter().collect());
        word = rest;
      }
      if word.is_empty() {
        continue;
      }

      let needed = if len == 0 { word.len() } else { len + 1 + word.len() };
      if needed > width {
        out.push(std::mem::take(&mut line));
        len = 0;
      }
      if len > 0 {
        line.push(' ');
        len += 1;
      }
      line.extend(word.iter());
      len += word.len();
    }

    out.push(line);
  }

  out
}
