//! Application state machine and event dispatcher.
//!
//! Key handling never touches the network. It only updates state and queues
//! an [`Action`]; the event loop draws a frame (so "Accepting…" is visible)
//! and then runs the action.

use std::sync::Arc;

use accord_core::{password, terms::AcceptanceRecord};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use uuid::Uuid;

use crate::{
  client::{ApiClient, Me},
  gate::Gate,
};

const PAGE: u16 = 10;

// ─── Screen ───────────────────────────────────────────────────────────────────

/// Screens reachable once the gate lets the user through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  Dashboard,
  History,
  Settings,
}

impl Screen {
  fn next(self) -> Self {
    match self {
      Screen::Dashboard => Screen::History,
      Screen::History => Screen::Settings,
      Screen::Settings => Screen::Dashboard,
    }
  }
}

/// Work queued by a key press, run by the event loop after the next draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  LoadStatus,
  Accept(Uuid),
  LoadDashboard,
  SaveName,
  SavePassword,
}

// ─── Settings form ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  Name,
  CurrentPassword,
  NewPassword,
  ConfirmPassword,
}

#[derive(Debug, Clone)]
pub struct SettingsForm {
  pub focus:            Field,
  pub name:             String,
  pub current_password: String,
  pub new_password:     String,
  pub confirm_password: String,
}

impl SettingsForm {
  fn new() -> Self {
    Self {
      focus:            Field::Name,
      name:             String::new(),
      current_password: String::new(),
      new_password:     String::new(),
      confirm_password: String::new(),
    }
  }

  fn focused_mut(&mut self) -> &mut String {
    match self.focus {
      Field::Name => &mut self.name,
      Field::CurrentPassword => &mut self.current_password,
      Field::NewPassword => &mut self.new_password,
      Field::ConfirmPassword => &mut self.confirm_password,
    }
  }

  fn focus_next(&mut self) {
    self.focus = match self.focus {
      Field::Name => Field::CurrentPassword,
      Field::CurrentPassword => Field::NewPassword,
      Field::NewPassword => Field::ConfirmPassword,
      Field::ConfirmPassword => Field::Name,
    };
  }

  fn focus_prev(&mut self) {
    self.focus = match self.focus {
      Field::Name => Field::ConfirmPassword,
      Field::CurrentPassword => Field::Name,
      Field::NewPassword => Field::CurrentPassword,
      Field::ConfirmPassword => Field::NewPassword,
    };
  }

  /// Why the new password cannot be submitted yet, checked before any
  /// request: policy first, then the confirmation.
  pub fn password_problem(&self) -> Option<String> {
    let unmet = password::unmet_requirements(&self.new_password);
    if !unmet.is_empty() {
      let missing: Vec<String> = unmet.iter().map(ToString::to_string).collect();
      return Some(format!("Password must contain {}", missing.join(", ")));
    }
    (self.new_password != self.confirm_password).then(|| "Passwords do not match".into())
  }

  fn clear_passwords(&mut self) {
    self.current_password.clear();
    self.new_password.clear();
    self.confirm_password.clear();
  }
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub gate:       Gate,
  pub screen:     Screen,
  pub me:         Option<Me>,
  /// The signed-in user's acceptances, newest first.
  pub history:    Vec<AcceptanceRecord>,
  pub settings:   SettingsForm,
  /// One-line status message shown in the status bar.
  pub status_msg: String,
  /// Shared HTTP client.
  pub client:     Arc<ApiClient>,
  queued:         Option<Action>,
}

impl App {
  /// Create an [`App`] that starts by querying the terms status.
  pub fn new(client: ApiClient) -> Self {
    Self {
      gate:       Gate::Loading,
      screen:     Screen::Dashboard,
      me:         None,
      history:    Vec::new(),
      settings:   SettingsForm::new(),
      status_msg: String::new(),
      client:     Arc::new(client),
      queued:     Some(Action::LoadStatus),
    }
  }

  pub fn take_action(&mut self) -> Option<Action> { self.queued.take() }

  fn queue(&mut self, action: Action) { self.queued = Some(action); }

  // ── Actions ───────────────────────────────────────────────────────────────

  pub async fn run(&mut self, action: Action) {
    match action {
      Action::LoadStatus => self.load_status().await,
      Action::Accept(id) => self.accept(id).await,
      Action::LoadDashboard => self.load_dashboard().await,
      Action::SaveName => self.save_name().await,
      Action::SavePassword => self.save_password().await,
    }
  }

  async fn load_status(&mut self) {
    let result = self.client.terms_status().await.map_err(|e| e.to_string());
    self.gate = Gate::on_status(result);
    if self.gate.is_passthrough() {
      self.load_dashboard().await;
    }
  }

  async fn accept(&mut self, terms_id: Uuid) {
    match self.client.accept_terms(terms_id).await {
      Ok(outcome) => {
        tracing::info!(%terms_id, already = outcome.already_accepted, "terms accepted");
        self.status_msg = if outcome.already_accepted {
          "Terms were already accepted".into()
        } else {
          "Terms accepted".into()
        };
        // Re-query rather than assume; the server decides.
        self.gate = Gate::Loading;
        self.queue(Action::LoadStatus);
      }
      Err(e) => {
        tracing::warn!(%terms_id, error = %e, "accepting terms failed");
        if let Gate::Open(view) = &mut self.gate {
          view.accept_failed(format!("Failed to accept terms: {e}"));
        }
      }
    }
  }

  async fn load_dashboard(&mut self) {
    match self.client.me().await {
      Ok(me) => {
        self.settings.name = me.name.clone().unwrap_or_default();
        self.me = Some(me);
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
    match self.client.acceptances().await {
      Ok(history) => self.history = history,
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  async fn save_name(&mut self) {
    match self.client.update_name(&self.settings.name).await {
      Ok(user) => {
        self.settings.name = user.name.clone().unwrap_or_default();
        if let Some(me) = &mut self.me {
          me.name = user.name;
        }
        self.status_msg = "Name updated".into();
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  async fn save_password(&mut self) {
    let current = Some(self.settings.current_password.as_str()).filter(|p| !p.is_empty());
    match self
      .client
      .update_password(current, &self.settings.new_password)
      .await
    {
      Ok(()) => {
        self.settings.clear_passwords();
        if let Some(me) = &mut self.me {
          me.has_password = true;
        }
        self.status_msg = "Password updated".into();
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    // Global: Ctrl-C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return false;
    }

    if self.gate.is_passthrough() {
      self.handle_screen_key(key)
    } else {
      self.handle_gate_key(key)
    }
  }

  fn handle_gate_key(&mut self, key: KeyEvent) -> bool {
    if key.code == KeyCode::Char('q') {
      return false;
    }

    if key.code == KeyCode::Char('r') && self.gate.retry() {
      self.queue(Action::LoadStatus);
      return true;
    }

    match &mut self.gate {
      Gate::Open(view) => match key.code {
        KeyCode::Down | KeyCode::Char('j') => view.scroll_down(1),
        KeyCode::Up | KeyCode::Char('k') => view.scroll_up(1),
        KeyCode::PageDown => view.scroll_down(PAGE),
        KeyCode::PageUp => view.scroll_up(PAGE),
        KeyCode::End | KeyCode::Char('G') => view.scroll_to_bottom(),
        KeyCode::Home | KeyCode::Char('g') => view.scroll_up(u16::MAX),
        KeyCode::Char(' ') => {
          if !view.toggle_acknowledged() && !view.pending {
            self.status_msg = "Scroll to the bottom to continue".into();
          }
        }
        KeyCode::Enter => {
          if let Some(id) = view.begin_accept() {
            self.queue(Action::Accept(id));
          }
        }
        _ => {}
      },
      Gate::Loading | Gate::Error(_) | Gate::Passthrough => {}
    }
    true
  }

  fn handle_screen_key(&mut self, key: KeyEvent) -> bool {
    if key.code == KeyCode::Tab {
      self.screen = self.screen.next();
      self.status_msg.clear();
      return true;
    }

    match self.screen {
      Screen::Dashboard | Screen::History => match key.code {
        KeyCode::Char('q') => return false,
        KeyCode::Char('r') => {
          self.gate = Gate::Loading;
          self.queue(Action::LoadStatus);
        }
        KeyCode::Char('s') => self.screen = Screen::Settings,
        _ => {}
      },
      Screen::Settings => self.handle_settings_key(key),
    }
    true
  }

  fn handle_settings_key(&mut self, key: KeyEvent) {
    let form = &mut self.settings;
    match key.code {
      KeyCode::Esc => self.screen = Screen::Dashboard,
      KeyCode::Down => form.focus_next(),
      KeyCode::Up => form.focus_prev(),
      KeyCode::Backspace => {
        form.focused_mut().pop();
      }
      KeyCode::Char(c) => form.focused_mut().push(c),
      KeyCode::Enter => match form.focus {
        Field::Name => self.queue(Action::SaveName),
        Field::CurrentPassword | Field::NewPassword | Field::ConfirmPassword => {
          match form.password_problem() {
            Some(problem) => self.status_msg = problem,
            None => self.queue(Action::SavePassword),
          }
        }
      },
      _ => {}
    }
  }
}
