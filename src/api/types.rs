use serde::{Deserialize, Serialize};

/// A published blog post as the service returns it.
///
/// Posts are immutable once created; `id` and `date` are assigned by the
/// service, never by this client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blog {
  pub id: u64,
  pub title: String,
  pub description: String,
  pub content: String,
  #[serde(default)]
  pub category: Vec<String>,
  /// ISO-8601 creation timestamp
  #[serde(default)]
  pub date: String,
  #[serde(rename = "coverImage", default)]
  pub cover_image: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author: Option<Author>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bio: Option<String>,
}

/// Fields supplied by the author when publishing a new post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateBlogInput {
  pub title: String,
  pub description: String,
  pub content: String,
  #[serde(rename = "coverImage")]
  pub cover_image: String,
  pub category: Vec<String>,
}

/// One fetched batch of blogs plus the index of the next page.
///
/// `next_page` is `None` once the requested page reaches the server-reported
/// page count, which is how the end of the collection is signalled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
  pub blogs: Vec<Blog>,
  pub next_page: Option<u32>,
}

impl Page {
  pub fn has_next(&self) -> bool {
    self.next_page.is_some()
  }
}
