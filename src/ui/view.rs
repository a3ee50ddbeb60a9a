use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, Copy)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self { key, label }
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input and return actions for the App to execute,
/// giving a clean delegation chain: App → View → Components.
///
/// Views that load data asynchronously hold a Query or InfiniteQuery and
/// poll it in tick(). A popped view is simply dropped, which also drops its
/// query receivers; results that arrive afterwards are discarded.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to allow views to poll async queries. May request
  /// an action, e.g. popping once a pending mutation completes.
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Called when this view becomes the top of the stack again after the
  /// view above it was popped.
  fn resume(&mut self) {}

  /// Whether the view is capturing free-form text. While true the App keeps
  /// the `:` and `/` activation keys away from the global overlays.
  fn is_editing(&self) -> bool {
    false
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command"),
      Shortcut::new("/", "search"),
      Shortcut::new("q", "back"),
    ]
  }
}
