use crate::api::CachedBlogClient;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, SearchEvent, SearchInput};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{BrowseView, WriteView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Main application: the view stack plus the global chrome overlays.
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` command palette
  command: CommandInput,

  /// `/` search overlay
  search: SearchInput,

  /// Application configuration
  config: Config,

  /// Cached blog client shared by all views
  store: CachedBlogClient,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let store = CachedBlogClient::new(&config)?;

    Ok(Self {
      view_stack: vec![Box::new(BrowseView::new(store.clone()))],
      command: CommandInput::new(),
      search: SearchInput::new(),
      config,
      store,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    info!("connected to {}", self.config.api.url);

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      if let Some(event) = events.next().await {
        match event {
          Event::Key(key) => self.handle_key(key),
          Event::Tick => self.tick(),
        }
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let title = self.config.title.as_deref().unwrap_or("weblog");
    let shortcuts = self
      .view_stack
      .last()
      .map(|view| view.shortcuts())
      .unwrap_or_default();
    draw_header(frame, chunks[0], title, &self.config.api.url, &shortcuts);

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }

    let breadcrumb: Vec<String> = self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect();
    draw_footer(frame, chunks[2], &breadcrumb);

    // Overlays go on top of the content area
    self.search.render_overlay(frame, chunks[1]);
    self.command.render_overlay(frame, chunks[1]);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // While a view is capturing text, keep the overlay activation keys away
    // from the chrome. Active overlays still see every key.
    let editing = self
      .view_stack
      .last()
      .map(|view| view.is_editing())
      .unwrap_or(false);

    if self.command.is_active() || !editing {
      match self.command.handle_key(key) {
        KeyResult::Handled => return,
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) => return,
        KeyResult::NotHandled => {}
      }
    }

    if self.search.is_active() || !editing {
      match self.search.handle_key(key) {
        KeyResult::Handled => return,
        KeyResult::Event(SearchEvent::Closed) => return,
        KeyResult::NotHandled => {}
      }
    }

    if let Some(view) = self.view_stack.last_mut() {
      let action = view.handle_key(key);
      self.apply_action(action);
    }
  }

  fn tick(&mut self) {
    if let Some(view) = self.view_stack.last_mut() {
      let action = view.tick();
      self.apply_action(action);
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    info!("command: {}", cmd);
    match cmd {
      "blogs" => {
        // Reset to a fresh root view
        self.view_stack.clear();
        self
          .view_stack
          .push(Box::new(BrowseView::new(self.store.clone())));
      }
      "write" => {
        self
          .view_stack
          .push(Box::new(WriteView::new(self.store.clone())));
      }
      "quit" => {
        self.should_quit = true;
      }
      _ => {
        // Unknown command
      }
    }
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          if let Some(view) = self.view_stack.last_mut() {
            view.resume();
          }
        } else {
          self.should_quit = true;
        }
      }
    }
  }
}
