use crate::api::types::{Blog, CreateBlogInput};
use crate::api::CachedBlogClient;
use crate::query::Query;
use crate::ui::components::TextInput;
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tracing::info;

/// Cover image used when the author leaves the field empty.
const DEFAULT_COVER_IMAGE: &str =
  "https://images.pexels.com/photos/1591056/pexels-photo-1591056.jpeg";

/// Topic applied when the author adds none.
const DEFAULT_TOPIC: &str = "GENERAL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
  Cover,
  Title,
  Description,
  Topics,
  Content,
}

impl Field {
  fn next(self) -> Self {
    match self {
      Field::Cover => Field::Title,
      Field::Title => Field::Description,
      Field::Description => Field::Topics,
      Field::Topics => Field::Content,
      Field::Content => Field::Cover,
    }
  }

  fn previous(self) -> Self {
    match self {
      Field::Cover => Field::Content,
      Field::Title => Field::Cover,
      Field::Description => Field::Title,
      Field::Topics => Field::Description,
      Field::Content => Field::Topics,
    }
  }
}

/// Assemble the publish payload. Title, description, and content must be
/// non-empty after trimming; cover image and topics fall back to defaults.
/// Rejection happens here, before anything touches the network.
fn build_input(
  title: &str,
  description: &str,
  content: &str,
  cover_image: &str,
  topics: &[String],
) -> Result<CreateBlogInput, String> {
  let title = title.trim();
  if title.is_empty() {
    return Err("Title is required".to_string());
  }
  let description = description.trim();
  if description.is_empty() {
    return Err("Description is required".to_string());
  }
  let content = content.trim();
  if content.is_empty() {
    return Err("Content is required".to_string());
  }

  let cover_image = match cover_image.trim() {
    "" => DEFAULT_COVER_IMAGE,
    url => url,
  };
  let category = if topics.is_empty() {
    vec![DEFAULT_TOPIC.to_string()]
  } else {
    topics.to_vec()
  };

  Ok(CreateBlogInput {
    title: title.to_string(),
    description: description.to_string(),
    content: content.to_string(),
    cover_image: cover_image.to_string(),
    category,
  })
}

/// Form for publishing a new post.
pub struct WriteView {
  store: CachedBlogClient,

  cover: TextInput,
  title: TextInput,
  description: TextInput,
  content: TextInput,
  topic: TextInput,
  topics: Vec<String>,

  field: Field,
  validation_error: Option<String>,

  /// In-flight publish; the form is locked while it is pending.
  publish: Option<Query<Blog>>,
}

impl WriteView {
  pub fn new(store: CachedBlogClient) -> Self {
    Self {
      store,
      cover: TextInput::new(),
      title: TextInput::new(),
      description: TextInput::new(),
      content: TextInput::new(),
      topic: TextInput::new(),
      topics: Vec::new(),
      field: Field::Cover,
      validation_error: None,
      publish: None,
    }
  }

  fn is_publishing(&self) -> bool {
    self
      .publish
      .as_ref()
      .map(|q| q.is_fetching())
      .unwrap_or(false)
  }

  fn publish_error(&self) -> Option<&str> {
    self.publish.as_ref().and_then(|q| q.error())
  }

  fn active_input_mut(&mut self) -> &mut TextInput {
    match self.field {
      Field::Cover => &mut self.cover,
      Field::Title => &mut self.title,
      Field::Description => &mut self.description,
      Field::Topics => &mut self.topic,
      Field::Content => &mut self.content,
    }
  }

  /// Add the pending topic input as an uppercase tag, skipping duplicates.
  fn add_topic(&mut self) {
    let topic = self.topic.take().trim().to_uppercase();
    if !topic.is_empty() && !self.topics.contains(&topic) {
      self.topics.push(topic);
    }
  }

  fn submit(&mut self) {
    let input = match build_input(
      &self.title.value(),
      &self.description.value(),
      &self.content.value(),
      &self.cover.value(),
      &self.topics,
    ) {
      Ok(input) => input,
      Err(msg) => {
        self.validation_error = Some(msg);
        return;
      }
    };
    self.validation_error = None;

    info!("publishing new blog post: {}", input.title);

    let store = self.store.clone();
    let mut query = Query::new(move || {
      let store = store.clone();
      let input = input.clone();
      async move { store.create(&input).await.map_err(|e| e.to_string()) }
    });
    query.fetch();
    self.publish = Some(query);
  }

  fn render_field(
    &self,
    frame: &mut Frame,
    area: Rect,
    label: &str,
    field: Field,
    value: String,
    placeholder: &str,
  ) {
    let active = self.field == field && !self.is_publishing();
    let border = if active {
      Style::default().fg(Color::Yellow)
    } else {
      Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
      .title(format!(" {} ", label))
      .borders(Borders::ALL)
      .border_style(border);

    let mut spans = Vec::new();
    if value.is_empty() && !active {
      spans.push(Span::styled(
        placeholder.to_string(),
        Style::default().fg(Color::DarkGray),
      ));
    } else {
      spans.push(Span::raw(value));
    }
    if active {
      spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
      .block(block)
      .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }

  fn render_topics(&self, frame: &mut Frame, area: Rect) {
    let active = self.field == Field::Topics && !self.is_publishing();
    let border = if active {
      Style::default().fg(Color::Yellow)
    } else {
      Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
      .title(" Topics ")
      .borders(Borders::ALL)
      .border_style(border);

    let mut input_spans = Vec::new();
    let value = self.topic.value();
    if value.is_empty() && !active {
      input_spans.push(Span::styled(
        "Add topic (e.g., Tech, Finance)",
        Style::default().fg(Color::DarkGray),
      ));
    } else {
      input_spans.push(Span::raw(value));
    }
    if active {
      input_spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    }

    let mut tag_spans = Vec::new();
    for (i, topic) in self.topics.iter().enumerate() {
      if i > 0 {
        tag_spans.push(Span::raw(" "));
      }
      tag_spans.push(Span::styled(
        format!("[{}]", topic),
        Style::default().fg(Color::Cyan),
      ));
    }
    if self.topics.is_empty() {
      tag_spans.push(Span::styled(
        format!("defaults to [{}]", DEFAULT_TOPIC),
        Style::default().fg(Color::DarkGray),
      ));
    }

    let paragraph =
      Paragraph::new(vec![Line::from(input_spans), Line::from(tag_spans)]).block(block);
    frame.render_widget(paragraph, area);
  }

  fn render_status(&self, frame: &mut Frame, area: Rect) {
    let line = if self.is_publishing() {
      Line::from(Span::styled(
        " Publishing...",
        Style::default().fg(Color::Yellow),
      ))
    } else if let Some(err) = self.publish_error() {
      Line::from(Span::styled(
        format!(" Failed to publish: {} (Ctrl-S to retry)", err),
        Style::default().fg(Color::Red),
      ))
    } else if let Some(err) = &self.validation_error {
      Line::from(Span::styled(
        format!(" {}", err),
        Style::default().fg(Color::Red),
      ))
    } else {
      Line::from(Span::styled(
        " Ctrl-S publish   Tab next field   Enter add topic / newline   Esc cancel",
        Style::default().fg(Color::DarkGray),
      ))
    };

    frame.render_widget(Paragraph::new(line), area);
  }
}

impl View for WriteView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Locked while the publish request is pending
    if self.is_publishing() {
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.submit();
        return ViewAction::None;
      }
      KeyCode::Tab | KeyCode::Down => {
        self.field = self.field.next();
        return ViewAction::None;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.field = self.field.previous();
        return ViewAction::None;
      }
      KeyCode::Enter => {
        match self.field {
          Field::Topics => self.add_topic(),
          // The body is the one multi-line field
          Field::Content => self.content.insert('\n'),
          _ => self.field = self.field.next(),
        }
        return ViewAction::None;
      }
      KeyCode::Backspace if self.field == Field::Topics && self.topic.is_empty() => {
        self.topics.pop();
        return ViewAction::None;
      }
      _ => {}
    }

    self.active_input_mut().handle_key(key);
    self.validation_error = None;
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3), // Cover image
        Constraint::Length(3), // Title
        Constraint::Length(3), // Description
        Constraint::Length(4), // Topics (input + tags)
        Constraint::Min(6),    // Content
        Constraint::Length(1), // Status line
      ])
      .split(area);

    self.render_field(
      frame,
      chunks[0],
      "Cover Image",
      Field::Cover,
      self.cover.value(),
      "https://example.com/image.jpg",
    );
    self.render_field(
      frame,
      chunks[1],
      "Title *",
      Field::Title,
      self.title.value(),
      "Blog Title",
    );
    self.render_field(
      frame,
      chunks[2],
      "Short Description *",
      Field::Description,
      self.description.value(),
      "Brief description of your blog...",
    );
    self.render_topics(frame, chunks[3]);
    self.render_field(
      frame,
      chunks[4],
      "Content *",
      Field::Content,
      self.content.value(),
      "Write your blog content here...",
    );
    self.render_status(frame, chunks[5]);
  }

  fn breadcrumb_label(&self) -> String {
    "Write".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(publish) = &mut self.publish {
      if publish.poll() && publish.is_success() {
        info!("blog post published");
        // Back to the list, which will refetch through the invalidated cache
        return ViewAction::Pop;
      }
    }
    ViewAction::None
  }

  fn is_editing(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("C-s", "publish"),
      Shortcut::new("Tab", "next field"),
      Shortcut::new("Esc", "cancel"),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(view: &mut WriteView, s: &str) {
    for c in s.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn test_view() -> WriteView {
    let store = CachedBlogClient::new(&Config::default()).unwrap();
    WriteView::new(store)
  }

  #[test]
  fn test_build_input_requires_title_description_content() {
    assert!(build_input("", "d", "c", "", &[]).is_err());
    assert!(build_input("t", "  ", "c", "", &[]).is_err());
    assert!(build_input("t", "d", "", "", &[]).is_err());
    assert!(build_input("t", "d", "c", "", &[]).is_ok());
  }

  #[test]
  fn test_build_input_applies_defaults() {
    let input = build_input("t", "d", "c", "  ", &[]).unwrap();
    assert_eq!(input.cover_image, DEFAULT_COVER_IMAGE);
    assert_eq!(input.category, vec![DEFAULT_TOPIC.to_string()]);
  }

  #[test]
  fn test_build_input_trims_fields() {
    let input = build_input(" t ", " d ", " c ", "", &["TECH".to_string()]).unwrap();
    assert_eq!(input.title, "t");
    assert_eq!(input.description, "d");
    assert_eq!(input.content, "c");
    assert_eq!(input.category, vec!["TECH".to_string()]);
  }

  #[tokio::test]
  async fn test_topics_are_added_uppercase_without_duplicates() {
    let mut view = test_view();
    view.field = Field::Topics;

    type_str(&mut view, "tech");
    view.handle_key(key(KeyCode::Enter));
    type_str(&mut view, "Tech");
    view.handle_key(key(KeyCode::Enter));
    type_str(&mut view, "finance");
    view.handle_key(key(KeyCode::Enter));

    assert_eq!(view.topics, vec!["TECH".to_string(), "FINANCE".to_string()]);
  }

  #[tokio::test]
  async fn test_backspace_on_empty_topic_input_removes_last_tag() {
    let mut view = test_view();
    view.field = Field::Topics;

    type_str(&mut view, "tech");
    view.handle_key(key(KeyCode::Enter));
    view.handle_key(key(KeyCode::Backspace));

    assert!(view.topics.is_empty());
  }

  #[tokio::test]
  async fn test_submit_with_empty_required_fields_never_hits_the_network() {
    let mut view = test_view();
    view.field = Field::Description;
    type_str(&mut view, "x");
    view.field = Field::Content;
    type_str(&mut view, "y");

    // Title still empty: rejected locally, no publish query created
    view.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));

    assert!(view.publish.is_none());
    assert_eq!(view.validation_error.as_deref(), Some("Title is required"));
  }

  #[tokio::test]
  async fn test_enter_inserts_newline_in_content() {
    let mut view = test_view();
    view.field = Field::Content;

    type_str(&mut view, "one");
    view.handle_key(key(KeyCode::Enter));
    type_str(&mut view, "two");

    assert_eq!(view.content.value(), "one\ntwo");
  }

  #[tokio::test]
  async fn test_escape_cancels_the_form() {
    let mut view = test_view();
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewAction::Pop));
  }
}
