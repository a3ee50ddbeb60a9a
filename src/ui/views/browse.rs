use crate::api::types::{Blog, Page};
use crate::api::CachedBlogClient;
use crate::query::{InfiniteQuery, Query, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_date, reading_time, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::WriteView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

/// How close to the end of the loaded list the selection may get before the
/// next page is requested.
const LOAD_MORE_THRESHOLD: usize = 2;

/// The main view: infinite blog list on the left, reading pane on the right.
pub struct BrowseView {
  store: CachedBlogClient,
  blogs: InfiniteQuery<Page>,

  /// Reading pane query; absent until a post is selected. With no selection
  /// there is no fetch, no loading state, and no error.
  detail: Option<Query<Blog>>,
  selected_id: Option<u64>,

  list_state: ListState,
  detail_scroll: u16,
}

impl BrowseView {
  pub fn new(store: CachedBlogClient) -> Self {
    let pages_store = store.clone();
    let mut blogs = InfiniteQuery::new(move |seen| {
      let store = pages_store.clone();
      async move {
        match seen {
          Some(count) => store.load_more(count).await.map_err(|e| e.to_string()),
          None => store.blog_pages().await.map_err(|e| e.to_string()),
        }
      }
    });

    // Start fetching immediately
    blogs.fetch();

    Self {
      store,
      blogs,
      detail: None,
      selected_id: None,
      list_state: ListState::default(),
      detail_scroll: 0,
    }
  }

  /// All loaded posts, in page order.
  fn loaded_blogs(&self) -> Vec<&Blog> {
    self
      .blogs
      .pages()
      .iter()
      .flat_map(|page| page.blogs.iter())
      .collect()
  }

  fn has_next_page(&self) -> bool {
    self
      .blogs
      .pages()
      .last()
      .map(|page| page.has_next())
      .unwrap_or(false)
  }

  /// Request the next page once the selection gets near the end of the
  /// loaded list. The query layer collapses repeated requests while one is
  /// in flight.
  fn maybe_fetch_next(&mut self) {
    let len = self.loaded_blogs().len();
    let near_end = self
      .list_state
      .selected()
      .map(|i| i + LOAD_MORE_THRESHOLD >= len.saturating_sub(1))
      .unwrap_or(false);

    if near_end && self.has_next_page() && self.blogs.next_error().is_none() {
      self.blogs.fetch_next();
    }
  }

  /// Point the reading pane at a post. Re-selecting the same post is a
  /// no-op; the cached entry would answer anyway.
  fn select_blog(&mut self, id: u64) {
    if self.selected_id == Some(id) {
      return;
    }
    self.selected_id = Some(id);
    self.detail_scroll = 0;

    let store = self.store.clone();
    let mut query = Query::new(move || {
      let store = store.clone();
      async move { store.blog(id).await.map_err(|e| e.to_string()) }
    });
    query.fetch();
    self.detail = Some(query);
  }

  fn refresh(&mut self) {
    // A failed next-page request is retried in place; otherwise reload the
    // whole sequence and the open post.
    if self.blogs.next_error().is_some() {
      self.blogs.retry_next();
    } else {
      self.blogs.refetch();
      if let Some(detail) = &mut self.detail {
        detail.refetch();
      }
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let blogs = self.loaded_blogs();
    let len = blogs.len();

    let title = match self.blogs.state() {
      QueryState::Loading => " Blogs (loading...) ".to_string(),
      QueryState::Error(_) => " Blogs ".to_string(),
      _ => format!(" Blogs ({}{}) ", len, if self.has_next_page() { "+" } else { "" }),
    };

    let mut block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if let Some(err) = self.blogs.next_error() {
      block = block.title_bottom(Line::styled(
        format!(" {} - press 'r' to retry ", truncate(err, 40)),
        Style::default().fg(Color::Red),
      ));
    } else if self.blogs.is_fetching_next() {
      block = block.title_bottom(Line::styled(
        " Loading more... ",
        Style::default().fg(Color::DarkGray),
      ));
    } else if !self.has_next_page() && len > 0 {
      block = block.title_bottom(Line::styled(
        " No more blogs to load ",
        Style::default().fg(Color::DarkGray),
      ));
    }

    if len == 0 {
      let content = if let Some(e) = self.blogs.error() {
        format!("Failed to load blogs: {}\n\nPress 'r' to retry.", e)
      } else if self.blogs.is_loading() {
        "Loading blogs...".to_string()
      } else {
        "No blogs yet. Be the first to write!".to_string()
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = blogs
      .iter()
      .map(|blog| {
        let meta = Line::from(vec![
          Span::styled(
            blog.category.join(" "),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw("  "),
          Span::styled(format_date(&blog.date), Style::default().fg(Color::DarkGray)),
        ]);
        ListItem::new(vec![
          Line::from(Span::styled(
            truncate(&blog.title, width),
            Style::default().bold(),
          )),
          meta,
        ])
      })
      .collect();

    ensure_valid_selection(&mut self.list_state, len);

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_detail(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.selected_id {
      Some(id) => format!(" Blog #{} ", id),
      None => " Read ".to_string(),
    };

    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(query) = &self.detail else {
      // Inert until a post is selected
      let paragraph = Paragraph::new(
        "No blog selected\n\nSelect a blog from the list to read its content",
      )
      .alignment(Alignment::Center)
      .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    };

    let blog = match query.state() {
      QueryState::Idle | QueryState::Loading => {
        let paragraph =
          Paragraph::new("Loading blog...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, inner);
        return;
      }
      QueryState::Error(error) => {
        let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
          .wrap(Wrap { trim: true })
          .style(Style::default().fg(Color::Red));
        frame.render_widget(paragraph, inner);
        return;
      }
      QueryState::Success(blog) => blog,
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
      format!("cover  {}", truncate(&blog.cover_image, inner.width.saturating_sub(8) as usize)),
      Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::default());

    if !blog.category.is_empty() {
      let mut spans = Vec::new();
      for (i, cat) in blog.category.iter().enumerate() {
        if i > 0 {
          spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
          format!("[{}]", cat),
          Style::default().fg(Color::Cyan),
        ));
      }
      lines.push(Line::from(spans));
    }

    lines.push(Line::from(Span::styled(
      blog.title.clone(),
      Style::default().bold(),
    )));
    lines.push(Line::from(Span::styled(
      format!(
        "{} · {} min read",
        format_date(&blog.date),
        reading_time(&blog.content)
      ),
      Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::default());

    let author_name = blog
      .author
      .as_ref()
      .map(|a| a.name.as_str())
      .unwrap_or("CA Monk Team");
    let author_bio = blog
      .author
      .as_ref()
      .and_then(|a| a.bio.as_deref())
      .unwrap_or("Passionate about sharing knowledge and insights with our community.");
    lines.push(Line::from(vec![
      Span::styled("Written by ", Style::default().fg(Color::DarkGray)),
      Span::styled(author_name.to_string(), Style::default().fg(Color::Yellow)),
    ]));
    lines.push(Line::from(Span::styled(
      author_bio.to_string(),
      Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
      "─".repeat(inner.width as usize),
      Style::default().fg(Color::DarkGray),
    )));

    lines.push(Line::from(Span::styled(
      blog.description.clone(),
      Style::default().add_modifier(Modifier::ITALIC),
    )));
    lines.push(Line::default());

    for content_line in blog.content.lines() {
      lines.push(Line::from(content_line.to_string()));
    }

    let paragraph = Paragraph::new(lines)
      .wrap(Wrap { trim: false })
      .scroll((self.detail_scroll, 0));
    frame.render_widget(paragraph, inner);
  }
}

impl View for BrowseView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        self.maybe_fetch_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Enter => {
        let id = self
          .list_state
          .selected()
          .and_then(|idx| self.loaded_blogs().get(idx).map(|blog| blog.id));
        if let Some(id) = id {
          self.select_blog(id);
        }
      }
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('w') => {
        return ViewAction::Push(Box::new(WriteView::new(self.store.clone())));
      }
      KeyCode::PageDown => {
        self.detail_scroll = self.detail_scroll.saturating_add(5);
      }
      KeyCode::PageUp => {
        self.detail_scroll = self.detail_scroll.saturating_sub(5);
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(42), Constraint::Percentage(58)])
      .split(area);

    self.render_list(frame, chunks[0]);
    self.render_detail(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Blogs".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    // Revalidate in the background once the data passes the stale window;
    // the current list stays visible meanwhile.
    if self.blogs.is_stale() {
      self.blogs.fetch();
    }
    self.blogs.poll();

    if let Some(detail) = &mut self.detail {
      if detail.is_stale() {
        detail.fetch();
      }
      detail.poll();
    }
    ViewAction::None
  }

  fn resume(&mut self) {
    // Coming back from the write view. A successful publish marked the list
    // cache stale, so this fetch turns into a real refetch; otherwise it is
    // answered from cache.
    self.blogs.fetch();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("j/k", "navigate"),
      Shortcut::new("Enter", "read"),
      Shortcut::new("w", "write"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "quit"),
    ]
  }
}
