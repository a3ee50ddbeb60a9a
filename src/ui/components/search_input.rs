use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the search overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Overlay closed (Enter or Escape)
  Closed,
}

/// Search overlay, activated with `/`.
///
/// Search is not wired to any backend; the overlay answers every query with
/// "No results found". It exists so the chrome matches the rest of the
/// application while the service side catches up.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  /// Check if search is currently active
  pub fn is_active(&self) -> bool {
    self.active
  }

  fn activate(&mut self) {
    self.active = true;
    self.input.clear();
  }

  /// Handle a key event. Call this regardless of active state - it handles
  /// activation too.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) | InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Closed)
      }
      InputResult::Consumed => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60);
    let height = 4; // Input line + result line

    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Search ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let query = self.input.value();
    let result_line = if query.is_empty() {
      Line::from(Span::styled(
        "Start typing to search",
        Style::default().fg(Color::DarkGray),
      ))
    } else {
      Line::from(Span::styled(
        format!("No results found for \"{}\"", query),
        Style::default().fg(Color::DarkGray),
      ))
    };

    let lines = vec![
      Line::from(vec![
        Span::styled("/", Style::default().fg(Color::Yellow)),
        Span::raw(query),
        Span::styled("_", Style::default().fg(Color::Yellow)),
      ]),
      result_line,
    ];
    frame.render_widget(Paragraph::new(lines), inner);
  }
}
